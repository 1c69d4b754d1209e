// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Length-prefixed Type-Length-Value primitives shared by the Interest,
//! Content Object, and Control bodies, plus Name (de)serialization.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    error::{DecodeError, ForwarderError},
    name::{Component, Name},
};

/// TLV type used for the Name container; component TLVs nested inside it use
/// the component's own label as the inner TLV type.
pub const TLV_NAME: u16 = 0x0000;
pub const TLV_KEY_ID_RESTRICTION: u16 = 0x0001;
pub const TLV_CONTENT_OBJECT_HASH_RESTRICTION: u16 = 0x0002;
pub const TLV_PAYLOAD: u16 = 0x0003;
pub const TLV_KEY_ID: u16 = 0x0004;
pub const TLV_EXPIRY_MS: u16 = 0x0005;

/// One decoded TLV: its type, value slice, and the number of bytes consumed
/// from the input (header + value).
pub struct RawTlv<'a> {
    pub kind: u16,
    pub value: &'a [u8],
    pub consumed: usize,
}

/// Reads a single TLV (`type:2 | length:2 | value`) off the front of `buf`.
pub fn read_one(buf: &[u8]) -> Result<RawTlv<'_>, ForwarderError> {
    if buf.len() < 4 {
        return Err(DecodeError::Truncated.into());
    }
    let kind = u16::from_be_bytes([buf[0], buf[1]]);
    let len = u16::from_be_bytes([buf[2], buf[3]]) as usize;
    if buf.len() < 4 + len {
        return Err(DecodeError::Truncated.into());
    }
    Ok(RawTlv { kind, value: &buf[4..4 + len], consumed: 4 + len })
}

/// Iterates every top-level TLV in `buf`, left to right.
pub fn iter(buf: &[u8]) -> impl Iterator<Item = Result<RawTlv<'_>, ForwarderError>> {
    let mut rest = buf;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match read_one(rest) {
            Ok(tlv) => {
                rest = &rest[tlv.consumed..];
                Some(Ok(tlv))
            },
            Err(e) => {
                rest = &[];
                Some(Err(e))
            },
        }
    })
}

pub fn write(out: &mut BytesMut, kind: u16, value: &[u8]) {
    out.put_u16(kind);
    out.put_u16(value.len() as u16);
    out.put_slice(value);
}

/// Encodes a [`Name`] as the Name TLV: one nested TLV per component, the
/// component's label as the inner type.
pub fn encode_name(name: &Name) -> Bytes {
    let mut inner = BytesMut::new();
    for c in name.components() {
        write(&mut inner, c.label, &c.value);
    }
    let mut out = BytesMut::with_capacity(inner.len() + 4);
    write(&mut out, TLV_NAME, &inner);
    out.freeze()
}

/// Decodes a Name TLV's *value* (the caller has already stripped the outer
/// `TLV_NAME` type/length) into a [`Name`].
pub fn decode_name_value(value: &[u8]) -> Result<Name, ForwarderError> {
    let mut components = Vec::new();
    for tlv in iter(value) {
        let tlv = tlv?;
        components.push(Component::new(tlv.kind, Bytes::copy_from_slice(tlv.value)));
    }
    Name::from_components(components)
        .map_err(|_| DecodeError::NameTooDeep.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::LABEL_NAME;

    #[test]
    fn name_round_trips_through_tlv() {
        let name = Name::from_components(vec![
            Component::new(LABEL_NAME, Bytes::from_static(b"foo")),
            Component::new(LABEL_NAME, Bytes::from_static(b"bar")),
        ])
        .unwrap();
        let encoded = encode_name(&name);
        let tlv = read_one(&encoded).unwrap();
        assert_eq!(tlv.kind, TLV_NAME);
        let decoded = decode_name_value(tlv.value).unwrap();
        assert_eq!(decoded, name);
    }

    #[test]
    fn truncated_tlv_is_rejected() {
        let buf = [0x00, 0x00, 0x00, 0x10, 1, 2, 3];
        assert!(read_one(&buf).is_err());
    }
}
