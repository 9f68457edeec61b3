//! sntp_query: single-shot NTP client
//!
//! This library sends one RFC 5905 client-mode request to an NTP server over UDP
//! and derives the local clock offset and network delay from the reply.
//!
//! The building blocks are public: the 48-byte packet codec in [`protocol`],
//! the offset estimator in [`sync`], and the [`network::Transport`] trait the
//! client performs its I/O through.
pub mod core;

pub mod client;
pub mod network;
pub mod protocol;
pub mod sync;
mod util;

// Re-export commonly used items
pub use crate::client::{query, query_detailed, query_with, NtpClient};
pub use crate::core::{Error, ErrorKind, Request, Response, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
