//! Core types for the NTP query client
//!
//! This module contains the error type, the request/response types and the
//! fallback defaults used when a caller does not override them.

pub mod error;
pub mod types;
pub mod serde;

use std::time::Duration;

pub use self::error::{Error, ErrorKind, Result};
pub use self::types::{Request, Response};

/// Default NTP server port
pub const DEFAULT_PORT: u16 = 123;

/// Default NTP version
pub const DEFAULT_VERSION: u8 = 4;

/// Default deadline for a whole request/response exchange
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
