//! RTP (RFC 3550) fixed-header codec.
//!
//! Only the 12-byte fixed header is modelled — no CSRC list, no
//! extension header, no padding. `decode` is total over malformed
//! input: it returns a [`RtpError`] rather than panicking.

use bytes::{Buf, BufMut, Bytes};

use crate::error::RtpError;

const VERSION: u8 = 2;
const FIXED_HEADER_LEN: usize = 12;

/// The fixed 12-byte RTP header, minus the fields this crate has no use
/// for (CSRC count is always encoded as 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    /// Build a header. Fails if `payload_type` doesn't fit in 7 bits.
    pub fn new(
        sequence_number: u16,
        timestamp: u32,
        marker: bool,
        payload_type: u8,
        ssrc: u32,
    ) -> Result<Self, RtpError> {
        if payload_type & 0x80 != 0 {
            return Err(RtpError::PayloadTypeOutOfRange(payload_type));
        }
        Ok(RtpHeader {
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
        })
    }

    pub const ENCODED_LEN: usize = FIXED_HEADER_LEN;

    pub fn encode(&self, buf: &mut impl BufMut) {
        // V=2, P=0, X=0, CC=0
        buf.put_u8(VERSION << 6);
        buf.put_u8(((self.marker as u8) << 7) | (self.payload_type & 0x7f));
        buf.put_u16(self.sequence_number);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self, RtpError> {
        if buf.remaining() < FIXED_HEADER_LEN {
            return Err(RtpError::TooShort {
                need: FIXED_HEADER_LEN,
                got: buf.remaining(),
            });
        }
        let b0 = buf.get_u8();
        let version = b0 >> 6;
        if version != VERSION {
            return Err(RtpError::UnsupportedVersion(version));
        }
        let b1 = buf.get_u8();
        let marker = (b1 & 0x80) != 0;
        let payload_type = b1 & 0x7f;
        let sequence_number = buf.get_u16();
        let timestamp = buf.get_u32();
        let ssrc = buf.get_u32();

        Ok(RtpHeader {
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
        })
    }
}

/// An RTP header paired with its opaque payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    pub header: RtpHeader,
    pub payload: Bytes,
}

impl RtpPacket {
    pub fn new(header: RtpHeader, payload: Bytes) -> Self {
        RtpPacket { header, payload }
    }

    pub fn encoded_len(&self) -> usize {
        RtpHeader::ENCODED_LEN + self.payload.len()
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        self.header.encode(buf);
        buf.put_slice(&self.payload);
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self, RtpError> {
        let header = RtpHeader::decode(buf)?;
        let payload = buf.copy_to_bytes(buf.remaining());
        Ok(RtpPacket { header, payload })
    }

    pub fn sequence_number(&self) -> u16 {
        self.header.sequence_number
    }

    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    pub fn marker(&self) -> bool {
        self.header.marker
    }
}
