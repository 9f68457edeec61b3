use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::{Bytes, BytesMut};
use tokio::net::{lookup_host, UdpSocket};
use tracing::{debug, trace};

use crate::core::{Error, Result};
use crate::util::join_host_port;

/// Datagram transport used by the query client
///
/// The client wraps every call in its own deadline, so implementations do not
/// need to enforce timeouts. `close` is invoked exactly once for every socket
/// returned by `open`.
pub trait Transport: Send + Sync {
    /// Connected datagram socket
    type Socket: Send;

    /// Resolves `host` and `port` to a single address
    fn resolve(&self, host: &str, port: u16) -> impl Future<Output = Result<SocketAddr>> + Send;

    /// Opens a socket connected to `addr`
    fn open(&self, addr: SocketAddr) -> impl Future<Output = Result<Self::Socket>> + Send;

    /// Sends `buf` as one datagram; a partial send is an error
    fn write_exact(
        &self,
        socket: &mut Self::Socket,
        buf: &[u8],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Receives one datagram of at most `max` bytes
    fn read(&self, socket: &mut Self::Socket, max: usize)
        -> impl Future<Output = Result<Bytes>> + Send;

    /// Releases the socket
    fn close(&self, socket: Self::Socket);
}

/// UDP transport on top of tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpTransport;

impl UdpTransport {
    /// Creates a new UDP transport
    pub fn new() -> Self {
        UdpTransport
    }
}

impl Transport for UdpTransport {
    type Socket = UdpSocket;

    async fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr> {
        let target = join_host_port(host, port);
        let resolution = |source| Error::Resolution {
            host: target.clone(),
            source,
        };

        let mut addrs = lookup_host(target.as_str()).await.map_err(resolution)?;
        let addr = addrs.next().ok_or_else(|| {
            resolution(io::Error::new(io::ErrorKind::NotFound, "no addresses found"))
        })?;
        debug!("Resolved {} to {}", target, addr);
        Ok(addr)
    }

    async fn open(&self, addr: SocketAddr) -> Result<UdpSocket> {
        let bind_addr: SocketAddr = match addr {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let connect = |source| Error::Connect { addr, source };

        let socket = UdpSocket::bind(bind_addr).await.map_err(connect)?;
        socket.connect(addr).await.map_err(connect)?;
        trace!("Opened UDP socket {:?} -> {}", socket.local_addr().ok(), addr);
        Ok(socket)
    }

    async fn write_exact(&self, socket: &mut UdpSocket, buf: &[u8]) -> Result<()> {
        let sent = socket.send(buf).await.map_err(Error::Write)?;
        if sent != buf.len() {
            return Err(Error::Write(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sent {} of {} bytes", sent, buf.len()),
            )));
        }
        trace!("Sent {} bytes", sent);
        Ok(())
    }

    async fn read(&self, socket: &mut UdpSocket, max: usize) -> Result<Bytes> {
        // One spare byte so an oversized datagram is not silently truncated to `max`
        let mut buf = BytesMut::zeroed(max + 1);
        let len = socket.recv(&mut buf).await.map_err(Error::Read)?;
        buf.truncate(len);
        trace!("Received {} bytes", len);
        Ok(buf.freeze())
    }

    fn close(&self, socket: UdpSocket) {
        drop(socket);
    }
}
