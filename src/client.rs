//! Single-shot NTP query client
//!
//! Each call resolves the server, opens a fresh socket, sends one client-mode
//! request and waits for one reply, all under the request's deadline. The
//! socket is closed on every path once it has been opened. Nothing is retried
//! and nothing is shared between calls.
//!
//! # Examples
//!
//! ```no_run
//! use sntp_query::{query_detailed, Request};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> sntp_query::Result<()> {
//!     let request = Request::new("pool.ntp.org").timeout(Duration::from_secs(2));
//!     let response = query_detailed(&request).await?;
//!     println!("offset {} (stratum {})", response.offset, response.stratum);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use futures::future::join_all;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::core::{Error, Request, Response, Result};
use crate::network::{Transport, UdpTransport};
use crate::protocol::{Completed, Exchange, PACKET_SIZE};
use crate::sync::{OffsetEstimate, Timestamps};

/// NTP client over a pluggable transport
#[derive(Debug, Clone, Default)]
pub struct NtpClient<T = UdpTransport> {
    transport: T,
}

impl NtpClient<UdpTransport> {
    /// Creates a client on the default UDP transport
    pub fn new() -> Self {
        NtpClient {
            transport: UdpTransport::new(),
        }
    }
}

impl<T: Transport> NtpClient<T> {
    /// Creates a client on a custom transport
    pub fn with_transport(transport: T) -> Self {
        NtpClient { transport }
    }

    /// Queries `host` with the default port, version and timeout
    pub async fn query(&self, host: &str) -> Result<DateTime<Local>> {
        self.query_with(&Request::new(host)).await
    }

    /// Returns the server's receive time in local time
    pub async fn query_with(&self, request: &Request) -> Result<DateTime<Local>> {
        Ok(self.query_detailed(request).await?.remote)
    }

    /// Runs one exchange and returns the full response
    pub async fn query_detailed(&self, request: &Request) -> Result<Response> {
        request.validate()?;

        let deadline = deadline_after(request.timeout);
        let expired = || Error::Timeout(request.timeout);

        let addr = timeout_at(deadline, self.transport.resolve(&request.host, request.port))
            .await
            .map_err(|_| expired())??;
        let mut socket = timeout_at(deadline, self.transport.open(addr))
            .await
            .map_err(|_| expired())??;

        let mut exchange = Exchange::new();
        let result =
            timeout_at(deadline, self.exchange(&mut socket, &mut exchange, request.version)).await;
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(_) => Err(exchange.fail(expired())),
        };
        self.transport.close(socket);

        let completed = outcome.map_err(|e| {
            debug!("Query to {} failed in state {}: {}", addr, exchange.state().name(), e);
            e
        })?;
        Ok(build_response(&completed))
    }

    /// Queries several servers concurrently. Results are in request order and
    /// each query is fully independent of the others.
    pub async fn query_many(&self, requests: &[Request]) -> Vec<Result<Response>> {
        join_all(requests.iter().map(|request| self.query_detailed(request))).await
    }

    async fn exchange(
        &self,
        socket: &mut T::Socket,
        exchange: &mut Exchange,
        version: u8,
    ) -> Result<Completed> {
        let request = exchange.prepare(version)?;

        let sent_at = Utc::now();
        if let Err(e) = self.transport.write_exact(socket, &request).await {
            return Err(exchange.fail(e));
        }
        exchange.sent(sent_at)?;

        let datagram = match self.transport.read(socket, PACKET_SIZE).await {
            Ok(datagram) => datagram,
            Err(e) => return Err(exchange.fail(e)),
        };
        let received_at = Utc::now();

        exchange.received(&datagram, received_at)
    }
}

/// Roughly 30 years; stands in for timeouts too large to add to an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

fn build_response(completed: &Completed) -> Response {
    let reply = &completed.reply;
    let timestamps = Timestamps::from(completed);
    let estimate = OffsetEstimate::compute(&timestamps);

    debug!(
        "Reply stratum {} offset {} delay {}",
        reply.stratum, estimate.offset, estimate.delay
    );
    let kiss_code = reply.kiss_code();
    if reply.stratum == 0 {
        warn!("Server replied with stratum 0 (kiss code {:?})", kiss_code);
    }

    Response {
        local: timestamps.t1.with_timezone(&Local),
        remote: timestamps.t2.with_timezone(&Local),
        offset: estimate.offset,
        delay: estimate.delay,
        stratum: reply.stratum,
        leap: reply.leap(),
        reference_id: reply.reference_id,
        kiss_code,
        root_delay: reply.root_delay(),
        root_dispersion: reply.root_dispersion(),
    }
}

/// Queries `host` with the default port (123), version (4) and timeout (5s)
pub async fn query(host: &str) -> Result<DateTime<Local>> {
    NtpClient::new().query(host).await
}

/// Queries with explicit request parameters
pub async fn query_with(request: &Request) -> Result<DateTime<Local>> {
    NtpClient::new().query_with(request).await
}

/// Queries with explicit request parameters and returns offset, stratum and
/// the other reply details
pub async fn query_detailed(request: &Request) -> Result<Response> {
    NtpClient::new().query_detailed(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::protocol::{encode, LeapIndicator, NtpTimestamp, Packet};
    use bytes::Bytes;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, Default)]
    struct Calls {
        resolve: AtomicUsize,
        open: AtomicUsize,
        write: AtomicUsize,
        read: AtomicUsize,
        close: AtomicUsize,
    }

    impl Calls {
        fn total(&self) -> usize {
            [&self.resolve, &self.open, &self.write, &self.read, &self.close]
                .iter()
                .map(|c| c.load(Ordering::SeqCst))
                .sum()
        }
    }

    #[derive(Debug, Clone)]
    enum Script {
        Reply(Bytes),
        Hang,
        UnknownHost,
        ReadError,
    }

    /// Transport double that replays a scripted reply and counts calls
    #[derive(Debug, Clone)]
    struct ScriptedTransport {
        script: Script,
        calls: Arc<Calls>,
    }

    impl ScriptedTransport {
        fn new(script: Script) -> Self {
            ScriptedTransport {
                script,
                calls: Arc::new(Calls::default()),
            }
        }
    }

    impl Transport for ScriptedTransport {
        type Socket = ();

        async fn resolve(&self, host: &str, _port: u16) -> Result<SocketAddr> {
            self.calls.resolve.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::UnknownHost => Err(Error::Resolution {
                    host: host.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "unknown host"),
                }),
                _ => Ok("192.0.2.1:123".parse().unwrap()),
            }
        }

        async fn open(&self, _addr: SocketAddr) -> Result<()> {
            self.calls.open.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn write_exact(&self, _socket: &mut (), buf: &[u8]) -> Result<()> {
            self.calls.write.fetch_add(1, Ordering::SeqCst);
            assert_eq!(buf.len(), PACKET_SIZE);
            Ok(())
        }

        async fn read(&self, _socket: &mut (), _max: usize) -> Result<Bytes> {
            self.calls.read.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Reply(bytes) => Ok(bytes.clone()),
                Script::Hang => std::future::pending().await,
                Script::ReadError => Err(Error::Read(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))),
                Script::UnknownHost => unreachable!(),
            }
        }

        fn close(&self, _socket: ()) {
            self.calls.close.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn server_reply(ahead: chrono::TimeDelta, stratum: u8) -> Bytes {
        let server_now = Utc::now() + ahead;
        let reply = Packet {
            li_vn_mode: 0b00_100_100,
            stratum,
            reference_id: u32::from_be_bytes(*b"GPS\0"),
            root_delay: 0x0000_8000,
            receive_timestamp: NtpTimestamp::from_datetime(&server_now),
            transmit_timestamp: NtpTimestamp::from_datetime(&server_now),
            ..Packet::default()
        };
        encode(reply).unwrap()
    }

    #[tokio::test]
    async fn test_detailed_query() {
        let transport =
            ScriptedTransport::new(Script::Reply(server_reply(chrono::TimeDelta::seconds(10), 1)));
        let client = NtpClient::with_transport(transport.clone());

        let response = assert_ok!(client.query_detailed(&Request::new("ntp.test")).await);
        let offset = response.offset.num_milliseconds();
        assert!((9_900..=10_100).contains(&offset), "offset {}ms", offset);
        assert!(response.delay.num_milliseconds().abs() < 100);
        assert_eq!(response.stratum, 1);
        assert_eq!(response.leap, LeapIndicator::NoWarning);
        assert_eq!(response.root_delay, Duration::from_millis(500));
        assert!(!response.is_kiss_of_death());
        assert!(response.remote > response.local);

        assert_eq!(transport.calls.write.load(Ordering::SeqCst), 1);
        assert_eq!(transport.calls.read.load(Ordering::SeqCst), 1);
        assert_eq!(transport.calls.close.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_query_returns_remote_time() {
        let transport =
            ScriptedTransport::new(Script::Reply(server_reply(chrono::TimeDelta::hours(1), 2)));
        let client = NtpClient::with_transport(transport);

        let remote = assert_ok!(client.query("ntp.test").await);
        let ahead = remote.with_timezone(&Utc) - Utc::now();
        assert!((ahead.num_seconds() - 3600).abs() <= 1);
    }

    #[tokio::test]
    async fn test_invalid_version_does_no_io() {
        let transport = ScriptedTransport::new(Script::Hang);
        let client = NtpClient::with_transport(transport.clone());

        let err = assert_err!(client.query_with(&Request::new("ntp.test").version(5)).await);
        assert_eq!(err.kind(), ErrorKind::InvalidVersion);
        assert_eq!(transport.calls.total(), 0);
    }

    #[tokio::test]
    async fn test_timeout_when_reply_never_arrives() {
        let transport = ScriptedTransport::new(Script::Hang);
        let client = NtpClient::with_transport(transport.clone());
        let request = Request::new("ntp.test").timeout(Duration::from_millis(100));

        let started = std::time::Instant::now();
        let err = assert_err!(client.query_detailed(&request).await);
        let elapsed = started.elapsed();

        assert!(matches!(err, Error::Timeout(t) if t == Duration::from_millis(100)));
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_secs(2));
        assert_eq!(transport.calls.close.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unbounded_timeout_completes() {
        let transport =
            ScriptedTransport::new(Script::Reply(server_reply(chrono::TimeDelta::seconds(2), 3)));
        let client = NtpClient::with_transport(transport.clone());
        let request = Request::new("ntp.test").timeout(Duration::MAX);

        let response = assert_ok!(client.query_detailed(&request).await);
        assert_eq!(response.stratum, 3);
        assert_eq!(transport.calls.close.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deadline_saturates() {
        let before = Instant::now();
        let deadline = deadline_after(Duration::MAX);
        assert!(deadline >= before + FAR_FUTURE);
        assert!(deadline_after(Duration::from_secs(1)) < before + Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_short_reply_is_malformed_and_closes() {
        let reply = server_reply(chrono::TimeDelta::zero(), 2);
        let transport = ScriptedTransport::new(Script::Reply(reply.slice(..40)));
        let client = NtpClient::with_transport(transport.clone());

        let err = assert_err!(client.query_detailed(&Request::new("ntp.test")).await);
        assert_eq!(err.kind(), ErrorKind::MalformedPacket);
        assert_eq!(transport.calls.close.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_read_error_closes_socket() {
        let transport = ScriptedTransport::new(Script::ReadError);
        let client = NtpClient::with_transport(transport.clone());

        let err = assert_err!(client.query_detailed(&Request::new("ntp.test")).await);
        assert_eq!(err.kind(), ErrorKind::Read);
        assert_eq!(transport.calls.close.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolution_failure_opens_nothing() {
        let transport = ScriptedTransport::new(Script::UnknownHost);
        let client = NtpClient::with_transport(transport.clone());

        let err = assert_err!(client.query_detailed(&Request::new("nowhere.test")).await);
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert_eq!(transport.calls.open.load(Ordering::SeqCst), 0);
        assert_eq!(transport.calls.close.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stratum_zero_is_surfaced() {
        let mut packet = Packet {
            li_vn_mode: 0b11_100_100,
            stratum: 0,
            reference_id: u32::from_be_bytes(*b"DENY"),
            ..Packet::default()
        };
        packet.receive_timestamp = NtpTimestamp::from_datetime(&Utc::now());
        packet.transmit_timestamp = packet.receive_timestamp;
        let transport = ScriptedTransport::new(Script::Reply(encode(packet).unwrap()));
        let client = NtpClient::with_transport(transport);

        let response = assert_ok!(client.query_detailed(&Request::new("ntp.test")).await);
        assert!(response.is_kiss_of_death());
        assert_eq!(response.kiss_code.as_deref(), Some("DENY"));
        assert_eq!(response.leap, LeapIndicator::Unknown);
    }

    #[tokio::test]
    async fn test_query_many_is_independent() {
        let transport =
            ScriptedTransport::new(Script::Reply(server_reply(chrono::TimeDelta::seconds(3), 2)));
        let client = NtpClient::with_transport(transport.clone());
        let requests = vec![
            Request::new("a.test"),
            Request::new("b.test").version(9),
            Request::new("c.test").version(3),
        ];

        let results = client.query_many(&requests).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err().kind(), ErrorKind::InvalidVersion);
        assert!(results[2].is_ok());
        assert_eq!(transport.calls.close.load(Ordering::SeqCst), 2);
    }
}
