//! Synchronization module
//!
//! Derives round-trip delay and clock offset from the timestamps of a
//! single request/response exchange.

pub mod offset;

pub use self::offset::{OffsetEstimate, Timestamps};
