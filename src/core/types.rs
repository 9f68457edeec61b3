use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use serde::{Deserialize, Serialize};

use super::{Error, Result, DEFAULT_PORT, DEFAULT_TIMEOUT, DEFAULT_VERSION};
use crate::protocol::{LeapIndicator, SUPPORTED_VERSIONS};

/// Parameters of a single NTP query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Server host name or IP literal
    pub host: String,
    /// Server UDP port
    #[serde(default = "default_port")]
    pub port: u16,
    /// NTP version to advertise (3 or 4)
    #[serde(default = "default_version")]
    pub version: u8,
    /// Deadline for the whole exchange
    #[serde(default = "default_timeout")]
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub timeout: Duration,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_version() -> u8 {
    DEFAULT_VERSION
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl Request {
    /// Creates a request for `host` with the default port, version and timeout
    pub fn new(host: impl Into<String>) -> Self {
        Request {
            host: host.into(),
            port: DEFAULT_PORT,
            version: DEFAULT_VERSION,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the server port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the NTP version
    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Sets the exchange timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks the request before any network I/O is attempted
    pub fn validate(&self) -> Result<()> {
        if SUPPORTED_VERSIONS.contains(&self.version) {
            Ok(())
        } else {
            Err(Error::InvalidVersion(self.version))
        }
    }
}

/// Outcome of a successful NTP query
#[derive(Debug, Clone)]
pub struct Response {
    /// Local wall-clock instant just before the request was sent (T1)
    pub local: DateTime<Local>,
    /// Server receive timestamp (T2) in local time
    pub remote: DateTime<Local>,
    /// Clock offset; positive when the local clock is behind the server
    pub offset: TimeDelta,
    /// Round-trip delay minus server processing time
    pub delay: TimeDelta,
    /// Server stratum; 0 means unsynchronized or Kiss-o'-Death
    pub stratum: u8,
    /// Leap indicator reported by the server
    pub leap: LeapIndicator,
    /// Raw reference identifier
    pub reference_id: u32,
    /// Kiss code carried in the reference identifier of a stratum 0 reply
    pub kiss_code: Option<String>,
    /// Server's total round-trip delay to its reference clock
    pub root_delay: Duration,
    /// Server's dispersion relative to its reference clock
    pub root_dispersion: Duration,
}

impl Response {
    /// Whether the server reported stratum 0
    pub fn is_kiss_of_death(&self) -> bool {
        self.stratum == 0
    }
}
