//! Protocol implementation module
//!
//! This module defines the NTP packet, its fixed 48-byte big-endian encoding,
//! and the state machine of a single request/response exchange.

pub mod codec;
pub mod packet;
pub mod state;
pub mod timestamp;

pub use self::codec::{decode_reply, encode, encode_request, NtpCodec};
pub use self::packet::{LeapIndicator, Mode, Packet};
pub use self::state::{Completed, Exchange, ExchangeState};
pub use self::timestamp::NtpTimestamp;

/// Size of an NTP header without extension fields or MAC
pub const PACKET_SIZE: usize = 48;

/// NTP versions this client will speak
pub const SUPPORTED_VERSIONS: [u8; 2] = [3, 4];
