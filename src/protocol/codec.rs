use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::{Error, Result};
use super::packet::Packet;
use super::timestamp::NtpTimestamp;
use super::PACKET_SIZE;

/// Codec for fixed-size 48-byte NTP packets
#[derive(Clone, Copy, Debug, Default)]
pub struct NtpCodec;

impl NtpCodec {
    /// Creates a new packet codec
    pub fn new() -> Self {
        NtpCodec
    }
}

fn put_timestamp(dst: &mut BytesMut, ts: NtpTimestamp) {
    dst.put_u32(ts.seconds);
    dst.put_u32(ts.fraction);
}

fn get_timestamp(src: &mut BytesMut) -> NtpTimestamp {
    let seconds = src.get_u32();
    let fraction = src.get_u32();
    NtpTimestamp { seconds, fraction }
}

impl Decoder for NtpCodec {
    type Item = Packet;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < PACKET_SIZE {
            // Need the whole header
            return Ok(None);
        }

        Ok(Some(Packet {
            li_vn_mode: src.get_u8(),
            stratum: src.get_u8(),
            poll: src.get_i8(),
            precision: src.get_i8(),
            root_delay: src.get_u32(),
            root_dispersion: src.get_u32(),
            reference_id: src.get_u32(),
            reference_timestamp: get_timestamp(src),
            origin_timestamp: get_timestamp(src),
            receive_timestamp: get_timestamp(src),
            transmit_timestamp: get_timestamp(src),
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.decode(src)? {
            Some(packet) => Ok(Some(packet)),
            None if src.is_empty() => Ok(None),
            None => Err(Error::malformed(format!(
                "truncated packet: {} of {} bytes",
                src.len(),
                PACKET_SIZE
            ))),
        }
    }
}

impl Encoder<Packet> for NtpCodec {
    type Error = Error;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(PACKET_SIZE);
        dst.put_u8(item.li_vn_mode);
        dst.put_u8(item.stratum);
        dst.put_i8(item.poll);
        dst.put_i8(item.precision);
        dst.put_u32(item.root_delay);
        dst.put_u32(item.root_dispersion);
        dst.put_u32(item.reference_id);
        put_timestamp(dst, item.reference_timestamp);
        put_timestamp(dst, item.origin_timestamp);
        put_timestamp(dst, item.receive_timestamp);
        put_timestamp(dst, item.transmit_timestamp);
        Ok(())
    }
}

/// Serializes a packet into exactly 48 bytes
pub fn encode(packet: Packet) -> Result<Bytes> {
    let mut dst = BytesMut::with_capacity(PACKET_SIZE);
    NtpCodec.encode(packet, &mut dst)?;
    Ok(dst.freeze())
}

/// Serializes a fresh client-mode request for `version`
pub fn encode_request(version: u8) -> Result<Bytes> {
    encode(Packet::client_request(version))
}

/// Parses one reply datagram, which must be exactly 48 bytes
pub fn decode_reply(bytes: &[u8]) -> Result<Packet> {
    if bytes.len() != PACKET_SIZE {
        return Err(Error::malformed(format!(
            "expected {} bytes, got {}",
            PACKET_SIZE,
            bytes.len()
        )));
    }

    let mut src = BytesMut::from(bytes);
    NtpCodec
        .decode_eof(&mut src)?
        .ok_or_else(|| Error::malformed("empty packet"))
}
