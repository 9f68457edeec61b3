use std::time::Duration;

use super::timestamp::{short_format_to_duration, NtpTimestamp};

/// Leap indicator, bits 7-6 of the first packet byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeapIndicator {
    /// No leap second pending
    NoWarning,
    /// Last minute of the day has 61 seconds
    AddSecond,
    /// Last minute of the day has 59 seconds
    DelSecond,
    /// Clock unsynchronized
    Unknown,
}

impl From<u8> for LeapIndicator {
    fn from(bits: u8) -> Self {
        match bits & 0b11 {
            0 => LeapIndicator::NoWarning,
            1 => LeapIndicator::AddSecond,
            2 => LeapIndicator::DelSecond,
            _ => LeapIndicator::Unknown,
        }
    }
}

/// Association mode, bits 2-0 of the first packet byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Reserved = 0,
    SymmetricActive = 1,
    SymmetricPassive = 2,
    Client = 3,
    Server = 4,
    Broadcast = 5,
    Control = 6,
    ReservedPrivate = 7,
}

impl From<u8> for Mode {
    fn from(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Mode::Reserved,
            1 => Mode::SymmetricActive,
            2 => Mode::SymmetricPassive,
            3 => Mode::Client,
            4 => Mode::Server,
            5 => Mode::Broadcast,
            6 => Mode::Control,
            _ => Mode::ReservedPrivate,
        }
    }
}

/// Bit-mask helpers for the packed LI/VN/Mode byte
pub mod bits {
    /// Replaces the mode bits (2-0)
    pub fn with_mode(li_vn_mode: u8, mode: u8) -> u8 {
        (li_vn_mode & 0xf8) | (mode & 0x07)
    }

    /// Replaces the version bits (5-3)
    pub fn with_version(li_vn_mode: u8, version: u8) -> u8 {
        (li_vn_mode & 0xc7) | ((version & 0x07) << 3)
    }

    /// Replaces the leap indicator bits (7-6)
    pub fn with_leap(li_vn_mode: u8, leap: u8) -> u8 {
        (li_vn_mode & 0x3f) | ((leap & 0x03) << 6)
    }

    pub fn mode(li_vn_mode: u8) -> u8 {
        li_vn_mode & 0x07
    }

    pub fn version(li_vn_mode: u8) -> u8 {
        (li_vn_mode >> 3) & 0x07
    }

    pub fn leap(li_vn_mode: u8) -> u8 {
        li_vn_mode >> 6
    }
}

/// NTP packet header as laid out on the wire (RFC 5905 §7.3)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Packet {
    /// Leap indicator (2) + version (3) + mode (3)
    pub li_vn_mode: u8,
    pub stratum: u8,
    /// Maximum poll interval, log2 seconds
    pub poll: i8,
    /// Clock precision, log2 seconds
    pub precision: i8,
    /// 16.16 fixed point
    pub root_delay: u32,
    /// 16.16 fixed point
    pub root_dispersion: u32,
    pub reference_id: u32,
    pub reference_timestamp: NtpTimestamp,
    pub origin_timestamp: NtpTimestamp,
    pub receive_timestamp: NtpTimestamp,
    pub transmit_timestamp: NtpTimestamp,
}

impl Packet {
    /// Builds a zeroed client-mode request for the given version
    pub fn client_request(version: u8) -> Self {
        let mut packet = Packet::default();
        packet.set_mode(Mode::Client);
        packet.set_version(version);
        packet
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.li_vn_mode = bits::with_mode(self.li_vn_mode, mode as u8);
    }

    pub fn set_version(&mut self, version: u8) {
        self.li_vn_mode = bits::with_version(self.li_vn_mode, version);
    }

    pub fn set_leap(&mut self, leap: LeapIndicator) {
        self.li_vn_mode = bits::with_leap(self.li_vn_mode, leap as u8);
    }

    pub fn mode(&self) -> Mode {
        Mode::from(bits::mode(self.li_vn_mode))
    }

    pub fn version(&self) -> u8 {
        bits::version(self.li_vn_mode)
    }

    pub fn leap(&self) -> LeapIndicator {
        LeapIndicator::from(bits::leap(self.li_vn_mode))
    }

    /// Root delay as a duration
    pub fn root_delay(&self) -> Duration {
        short_format_to_duration(self.root_delay)
    }

    /// Root dispersion as a duration
    pub fn root_dispersion(&self) -> Duration {
        short_format_to_duration(self.root_dispersion)
    }

    /// ASCII kiss code of a stratum 0 packet, e.g. "RATE" or "DENY"
    pub fn kiss_code(&self) -> Option<String> {
        if self.stratum != 0 {
            return None;
        }
        let code = self.reference_id.to_be_bytes();
        if code.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            Some(String::from_utf8_lossy(&code).trim_end().to_string())
        } else {
            None
        }
    }
}
