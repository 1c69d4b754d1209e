// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use bytes::{Bytes, BytesMut};

use super::{
    FIXED_HEADER_LEN, FixedHeader, PacketType,
    netbuf::NetBuf,
    tlv::{
        self, TLV_CONTENT_OBJECT_HASH_RESTRICTION, TLV_KEY_ID_RESTRICTION, TLV_NAME,
        TLV_PAYLOAD,
    },
};
use crate::{
    error::{DecodeError, ForwarderError},
    name::{Name, PrefixHashes},
};

pub const CONTENT_OBJECT_HASH_LEN: usize = 32;

/// A request for named content.
#[derive(Debug, Clone)]
pub struct Interest {
    pub name: Name,
    pub key_id_restriction: Option<Bytes>,
    pub content_object_hash_restriction: Option<[u8; CONTENT_OBJECT_HASH_LEN]>,
    pub payload: Option<Bytes>,
    pub hop_limit: u8,
    /// Inner TLVs whose type the schema does not define, kept verbatim for
    /// forwarding transparency.
    pub unknown: Vec<(u16, Bytes)>,
}

impl Interest {
    pub fn new(name: Name, hop_limit: u8) -> Self {
        Self {
            name,
            key_id_restriction: None,
            content_object_hash_restriction: None,
            payload: None,
            hop_limit,
            unknown: Vec::new(),
        }
    }

    pub fn prefix_hashes(&self) -> PrefixHashes {
        self.name.prefix_hashes()
    }

    pub(crate) fn decode(body: &[u8], hop_limit: u8) -> Result<Self, ForwarderError> {
        let mut name = None;
        let mut key_id_restriction = None;
        let mut content_object_hash_restriction = None;
        let mut payload = None;
        let mut unknown = Vec::new();

        for tlv in tlv::iter(body) {
            let tlv = tlv?;
            match tlv.kind {
                TLV_NAME => {
                    if name.is_some() {
                        return Err(DecodeError::DuplicateField("Name").into());
                    }
                    name = Some(tlv::decode_name_value(tlv.value)?);
                },
                TLV_KEY_ID_RESTRICTION => {
                    if key_id_restriction.is_some() {
                        return Err(
                            DecodeError::DuplicateField("KeyIdRestriction").into()
                        );
                    }
                    key_id_restriction = Some(Bytes::copy_from_slice(tlv.value));
                },
                TLV_CONTENT_OBJECT_HASH_RESTRICTION => {
                    if content_object_hash_restriction.is_some() {
                        return Err(DecodeError::DuplicateField(
                            "ContentObjectHashRestriction",
                        )
                        .into());
                    }
                    let arr: [u8; CONTENT_OBJECT_HASH_LEN] = tlv
                        .value
                        .try_into()
                        .map_err(|_| DecodeError::BadLength("ContentObjectHashRestriction"))?;
                    content_object_hash_restriction = Some(arr);
                },
                TLV_PAYLOAD => {
                    if payload.is_some() {
                        return Err(DecodeError::DuplicateField("Payload").into());
                    }
                    payload = Some(Bytes::copy_from_slice(tlv.value));
                },
                other => unknown.push((other, Bytes::copy_from_slice(tlv.value))),
            }
        }

        let name = name.ok_or(DecodeError::MissingField("Name"))?;
        Ok(Self {
            name,
            key_id_restriction,
            content_object_hash_restriction,
            payload,
            hop_limit,
            unknown,
        })
    }

    /// Encodes into a netbuf, with `hop_limit` substituted for this instance's
    /// own field (used to decrement hop limit on re-serialization without
    /// mutating the shared body bytes).
    pub fn encode(&self, hop_limit: u8) -> NetBuf {
        let mut body = BytesMut::new();
        body.extend_from_slice(&tlv::encode_name(&self.name));
        if let Some(k) = &self.key_id_restriction {
            tlv::write(&mut body, TLV_KEY_ID_RESTRICTION, k);
        }
        if let Some(h) = &self.content_object_hash_restriction {
            tlv::write(&mut body, TLV_CONTENT_OBJECT_HASH_RESTRICTION, h);
        }
        if let Some(p) = &self.payload {
            tlv::write(&mut body, TLV_PAYLOAD, p);
        }
        for (kind, value) in &self.unknown {
            tlv::write(&mut body, *kind, value);
        }

        let header_length = FIXED_HEADER_LEN as u8;
        let packet_length = (FIXED_HEADER_LEN + body.len()) as u16;
        let header = FixedHeader {
            packet_type: PacketType::Interest,
            packet_length,
            hop_limit,
            flags: 0,
            header_length,
        };
        let mut header_bytes = [0u8; FIXED_HEADER_LEN];
        header.write(&mut header_bytes);

        let mut nb = NetBuf::new();
        nb.push(Bytes::copy_from_slice(&header_bytes));
        nb.push(body.freeze());
        nb
    }
}
