//! Network transport module
//!
//! This module defines the datagram transport the query client talks through,
//! and its default UDP implementation.

mod transport;

pub use self::transport::{Transport, UdpTransport};
