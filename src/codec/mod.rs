// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Wire codec: fixed header, inner TLV primitives, and the
//! Interest/ContentObject/Control message dispatch.

pub mod content_object;
pub mod control;
pub mod interest;
pub mod netbuf;
pub mod tlv;

use bytes::Bytes;
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, big_endian::U16 as BeU16,
};

use crate::{
    codec::netbuf::NetBuf,
    error::{DecodeError, ForwarderError},
    name::Name,
};

pub use content_object::ContentObject;
pub use control::ControlMessage;
pub use interest::Interest;

/// Every packet begins with this 8-byte, network-byte-order fixed header.
pub const FIXED_HEADER_LEN: usize = 8;

pub const WIRE_VERSION: u8 = 1;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Interest = 1,
    ContentObject = 2,
    Control = 3,
}

impl PacketType {
    pub fn from_u8(v: u8) -> Result<Self, ForwarderError> {
        match v {
            1 => Ok(Self::Interest),
            2 => Ok(Self::ContentObject),
            3 => Ok(Self::Control),
            other => Err(DecodeError::UnknownPacketType(other).into()),
        }
    }
}

/// The raw, zero-copy view of the 8-byte fixed header.
#[repr(C)]
#[derive(Debug, Clone, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct RawFixedHeader {
    pub version: u8,
    pub packet_type: u8,
    pub packet_length: BeU16,
    pub hop_limit: u8,
    pub reserved: u8,
    pub flags: u8,
    pub header_length: u8,
}

/// Decoded, owned form of the fixed header.
#[derive(Debug, Clone, Copy)]
pub struct FixedHeader {
    pub packet_type: PacketType,
    pub packet_length: u16,
    pub hop_limit: u8,
    pub flags: u8,
    pub header_length: u8,
}

impl FixedHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, ForwarderError> {
        if bytes.len() < FIXED_HEADER_LEN {
            return Err(DecodeError::Truncated.into());
        }
        let raw = RawFixedHeader::ref_from_bytes(&bytes[..FIXED_HEADER_LEN])
            .map_err(|_| DecodeError::Truncated)?;
        if raw.version != WIRE_VERSION {
            return Err(DecodeError::UnknownVersion(raw.version).into());
        }
        if (raw.header_length as usize) < FIXED_HEADER_LEN {
            return Err(DecodeError::Truncated.into());
        }
        Ok(Self {
            packet_type: PacketType::from_u8(raw.packet_type)?,
            packet_length: raw.packet_length.get(),
            hop_limit: raw.hop_limit,
            flags: raw.flags,
            header_length: raw.header_length,
        })
    }

    pub fn write(&self, out: &mut [u8]) {
        let raw = RawFixedHeader {
            version: WIRE_VERSION,
            packet_type: self.packet_type as u8,
            packet_length: BeU16::new(self.packet_length),
            hop_limit: self.hop_limit,
            reserved: 0,
            flags: self.flags,
            header_length: self.header_length,
        };
        out[..FIXED_HEADER_LEN].copy_from_slice(raw.as_bytes());
    }

    /// Re-frames `raw` for onward transmission with `hop_limit` decremented,
    /// per spec.md §9's reference-counting note: only the fixed header is
    /// copied, the body (per-hop options block + TLV payload) stays a shared
    /// [`Bytes`] slice of the original buffer rather than a fresh copy.
    pub fn decrement_hop_limit(raw: &Bytes) -> Result<NetBuf, ForwarderError> {
        let header = Self::parse(raw)?;
        if header.hop_limit == 0 {
            return Err(DecodeError::Truncated.into());
        }
        let decremented = Self { hop_limit: header.hop_limit - 1, ..header };
        let mut header_bytes = [0u8; FIXED_HEADER_LEN];
        decremented.write(&mut header_bytes);

        let mut nb = NetBuf::new();
        nb.push(Bytes::copy_from_slice(&header_bytes));
        let rest_start = FIXED_HEADER_LEN.min(raw.len());
        nb.push(raw.slice(rest_start..));
        Ok(nb)
    }
}

/// A fully decoded packet of any kind.
#[derive(Debug, Clone)]
pub enum Message {
    Interest(Interest),
    ContentObject(ContentObject),
    Control(ControlMessage),
}

impl Message {
    /// Decodes a complete packet, validating that `bytes.len()` covers the
    /// declared `packet_length` and truncating to exactly that before body
    /// parse (per the decode contract: unread trailing bytes are not an
    /// error, but bytes beyond `packet_length` are never consulted).
    pub fn decode(bytes: &[u8]) -> Result<Self, ForwarderError> {
        let header = FixedHeader::parse(bytes)?;
        let total = header.packet_length as usize;
        if bytes.len() < total {
            return Err(DecodeError::Truncated.into());
        }
        let framed = &bytes[..total];
        let body = &framed[header.header_length as usize..];

        match header.packet_type {
            PacketType::Interest => {
                Interest::decode(body, header.hop_limit).map(Message::Interest)
            },
            PacketType::ContentObject => {
                ContentObject::decode(body).map(Message::ContentObject)
            },
            PacketType::Control => ControlMessage::decode(body).map(Message::Control),
        }
    }

    pub fn name(&self) -> Option<&Name> {
        match self {
            Message::Interest(i) => Some(&i.name),
            Message::ContentObject(c) => Some(&c.name),
            Message::Control(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_header_round_trips() {
        let hdr = FixedHeader {
            packet_type: PacketType::Interest,
            packet_length: 42,
            hop_limit: 5,
            flags: 0,
            header_length: FIXED_HEADER_LEN as u8,
        };
        let mut buf = [0u8; FIXED_HEADER_LEN];
        hdr.write(&mut buf);
        let parsed = FixedHeader::parse(&buf).unwrap();
        assert_eq!(parsed.packet_length, 42);
        assert_eq!(parsed.hop_limit, 5);
        assert!(matches!(parsed.packet_type, PacketType::Interest));
    }

    #[test]
    fn rejects_truncated_header() {
        let buf = [0u8; 4];
        assert!(FixedHeader::parse(&buf).is_err());
    }

    #[test]
    fn decrement_hop_limit_rewrites_only_the_header() {
        let hdr = FixedHeader {
            packet_type: PacketType::Interest,
            packet_length: FIXED_HEADER_LEN as u16 + 3,
            hop_limit: 5,
            flags: 0,
            header_length: FIXED_HEADER_LEN as u8,
        };
        let mut buf = vec![0u8; FIXED_HEADER_LEN + 3];
        hdr.write(&mut buf[..FIXED_HEADER_LEN]);
        buf[FIXED_HEADER_LEN..].copy_from_slice(b"xyz");
        let raw = Bytes::from(buf);

        let nb = FixedHeader::decrement_hop_limit(&raw).unwrap();
        let out = nb.linearize();
        let parsed = FixedHeader::parse(&out).unwrap();
        assert_eq!(parsed.hop_limit, 4);
        assert_eq!(&out[FIXED_HEADER_LEN..], b"xyz");
    }

    #[test]
    fn decrement_hop_limit_zero_is_rejected() {
        let hdr = FixedHeader {
            packet_type: PacketType::Interest,
            packet_length: FIXED_HEADER_LEN as u16,
            hop_limit: 0,
            flags: 0,
            header_length: FIXED_HEADER_LEN as u8,
        };
        let mut buf = [0u8; FIXED_HEADER_LEN];
        hdr.write(&mut buf);
        assert!(FixedHeader::decrement_hop_limit(&Bytes::copy_from_slice(&buf)).is_err());
    }

    #[test]
    fn rejects_unknown_packet_type() {
        let mut buf = [0u8; FIXED_HEADER_LEN];
        buf[0] = WIRE_VERSION;
        buf[1] = 0xAB;
        buf[7] = FIXED_HEADER_LEN as u8;
        assert!(FixedHeader::parse(&buf).is_err());
    }
}
