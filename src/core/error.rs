use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by an NTP query
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid NTP version {0}: only versions 3 and 4 are supported")]
    InvalidVersion(u8),

    #[error("Failed to resolve {host}: {source}")]
    Resolution {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open socket to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to send request: {0}")]
    Write(#[source] io::Error),

    #[error("Failed to read reply: {0}")]
    Read(#[source] io::Error),

    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Discriminant of an [`Error`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidVersion,
    Resolution,
    Connect,
    Timeout,
    Write,
    Read,
    MalformedPacket,
    InvalidState,
    Io,
}

impl Error {
    /// Creates a new malformed packet error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedPacket(msg.into())
    }

    /// Creates a new invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Returns the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidVersion(_) => ErrorKind::InvalidVersion,
            Error::Resolution { .. } => ErrorKind::Resolution,
            Error::Connect { .. } => ErrorKind::Connect,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Write(_) => ErrorKind::Write,
            Error::Read(_) => ErrorKind::Read,
            Error::MalformedPacket(_) => ErrorKind::MalformedPacket,
            Error::InvalidState(_) => ErrorKind::InvalidState,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}
