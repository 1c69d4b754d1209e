// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use bytes::{Bytes, BytesMut};
use sha2::{Digest, Sha256};

use super::{
    FIXED_HEADER_LEN, FixedHeader, PacketType,
    interest::CONTENT_OBJECT_HASH_LEN,
    netbuf::NetBuf,
    tlv::{self, TLV_EXPIRY_MS, TLV_KEY_ID, TLV_NAME, TLV_PAYLOAD},
};
use crate::{
    error::{DecodeError, ForwarderError},
    name::Name,
};

/// Invoked by the encoder over the protected byte range (name + payload) to
/// produce a detached signature blob. No concrete signing algorithm is
/// implemented here; this is the seam an external signer plugs into.
pub trait Signer {
    fn sign(&self, protected_region: &[u8]) -> Vec<u8>;
}

/// Named, optionally signed data.
#[derive(Debug, Clone)]
pub struct ContentObject {
    pub name: Name,
    pub payload: Bytes,
    pub key_id: Option<Bytes>,
    pub expiry_ms: Option<u64>,
    pub unknown: Vec<(u16, Bytes)>,
}

impl ContentObject {
    pub fn new(name: Name, payload: Bytes) -> Self {
        Self { name, payload, key_id: None, expiry_ms: None, unknown: Vec::new() }
    }

    /// SHA-256 over name + payload, used as the PIT's
    /// `ContentObjectHashRestriction` match key.
    pub fn content_hash(&self) -> [u8; CONTENT_OBJECT_HASH_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(&tlv::encode_name(&self.name));
        hasher.update(&self.payload);
        hasher.finalize().into()
    }

    pub(crate) fn decode(body: &[u8]) -> Result<Self, ForwarderError> {
        let mut name = None;
        let mut payload = None;
        let mut key_id = None;
        let mut expiry_ms = None;
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
                TLV_PAYLOAD => {
                    if payload.is_some() {
                        return Err(DecodeError::DuplicateField("Payload").into());
                    }
                    payload = Some(Bytes::copy_from_slice(tlv.value));
                },
                TLV_KEY_ID => key_id = Some(Bytes::copy_from_slice(tlv.value)),
                TLV_EXPIRY_MS => {
                    let arr: [u8; 8] = tlv
                        .value
                        .try_into()
                        .map_err(|_| DecodeError::BadLength("ExpiryMs"))?;
                    expiry_ms = Some(u64::from_be_bytes(arr));
                },
                other => unknown.push((other, Bytes::copy_from_slice(tlv.value))),
            }
        }

        let name = name.ok_or(DecodeError::MissingField("Name"))?;
        let payload = payload.unwrap_or_default();
        Ok(Self { name, payload, key_id, expiry_ms, unknown })
    }

    pub fn encode(&self, signer: Option<&dyn Signer>) -> NetBuf {
        let mut body = BytesMut::new();
        body.extend_from_slice(&tlv::encode_name(&self.name));
        tlv::write(&mut body, TLV_PAYLOAD, &self.payload);
        if let Some(k) = &self.key_id {
            tlv::write(&mut body, TLV_KEY_ID, k);
        }
        if let Some(e) = self.expiry_ms {
            tlv::write(&mut body, TLV_EXPIRY_MS, &e.to_be_bytes());
        }
        for (kind, value) in &self.unknown {
            tlv::write(&mut body, *kind, value);
        }
        if let Some(signer) = signer {
            let sig = signer.sign(&body);
            tlv::write(&mut body, super::tlv::TLV_KEY_ID + 100, &sig);
        }

        let header_length = FIXED_HEADER_LEN as u8;
        let packet_length = (FIXED_HEADER_LEN + body.len()) as u16;
        let header = FixedHeader {
            packet_type: PacketType::ContentObject,
            packet_length,
            hop_limit: 0,
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
