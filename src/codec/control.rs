// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The management control-message family (spec'd in §6): typed route and
//! connection mutations plus cache/flush operations, each carrying a
//! sequence number that the matching Ack/Nack echoes back.

use bytes::{Bytes, BytesMut};

use super::{
    FIXED_HEADER_LEN, FixedHeader, PacketType,
    netbuf::NetBuf,
    tlv::{self, TLV_NAME},
};
use crate::{
    error::{DecodeError, ForwarderError},
    name::Name,
};

const TLV_SEQ: u16 = 0x0010;
const TLV_OP: u16 = 0x0011;
const TLV_CONNECTION_ID: u16 = 0x0012;
const TLV_WEIGHT: u16 = 0x0013;
const TLV_REPLY: u16 = 0x0014;
const TLV_REASON: u16 = 0x0015;
const TLV_FLAG: u16 = 0x0016;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpCode {
    AddRoute = 1,
    RemoveRoute = 2,
    AddConnection = 3,
    RemoveConnection = 4,
    ListRoutes = 5,
    ListConnections = 6,
    CacheStore = 7,
    CacheServe = 8,
    CacheClear = 9,
    Flush = 10,
}

impl OpCode {
    fn from_u8(v: u8) -> Result<Self, ForwarderError> {
        Ok(match v {
            1 => Self::AddRoute,
            2 => Self::RemoveRoute,
            3 => Self::AddConnection,
            4 => Self::RemoveConnection,
            5 => Self::ListRoutes,
            6 => Self::ListConnections,
            7 => Self::CacheStore,
            8 => Self::CacheServe,
            9 => Self::CacheClear,
            10 => Self::Flush,
            other => return Err(DecodeError::UnknownControlOp(other).into()),
        })
    }
}

#[derive(Debug, Clone)]
pub enum ControlOp {
    AddRoute { prefix: Name, connection_id: u32, weight: u32 },
    /// `connection_id = None` removes every next-hop for `prefix`.
    RemoveRoute { prefix: Name, connection_id: Option<u32> },
    AddConnection { connection_id: u32 },
    RemoveConnection { connection_id: u32 },
    ListRoutes,
    ListConnections,
    CacheStore(bool),
    CacheServe(bool),
    CacheClear,
    Flush,
}

/// The reason a control request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum NackReason {
    NotFound = 1,
    Capacity = 2,
    AlreadyExists = 3,
    InvalidName = 4,
}

#[derive(Debug, Clone)]
pub enum ControlBody {
    Request(ControlOp),
    Ack,
    Nack(NackReason),
}

#[derive(Debug, Clone)]
pub struct ControlMessage {
    pub seq: u64,
    pub body: ControlBody,
}

impl ControlMessage {
    pub fn request(seq: u64, op: ControlOp) -> Self {
        Self { seq, body: ControlBody::Request(op) }
    }

    pub fn ack(seq: u64) -> Self {
        Self { seq, body: ControlBody::Ack }
    }

    pub fn nack(seq: u64, reason: NackReason) -> Self {
        Self { seq, body: ControlBody::Nack(reason) }
    }

    pub(crate) fn decode(body: &[u8]) -> Result<Self, ForwarderError> {
        let mut seq = None;
        let mut op = None;
        let mut prefix = None;
        let mut connection_id = None;
        let mut weight = None;
        let mut reply = None;
        let mut reason = None;
        let mut flag = None;

        for tlv in tlv::iter(body) {
            let tlv = tlv?;
            match tlv.kind {
                TLV_SEQ => {
                    let arr: [u8; 8] = tlv
                        .value
                        .try_into()
                        .map_err(|_| DecodeError::BadLength("Seq"))?;
                    seq = Some(u64::from_be_bytes(arr));
                },
                TLV_OP => {
                    let byte =
                        *tlv.value.first().ok_or(DecodeError::BadLength("Op"))?;
                    op = Some(OpCode::from_u8(byte)?);
                },
                TLV_NAME => prefix = Some(tlv::decode_name_value(tlv.value)?),
                TLV_CONNECTION_ID => {
                    let arr: [u8; 4] = tlv
                        .value
                        .try_into()
                        .map_err(|_| DecodeError::BadLength("ConnectionId"))?;
                    connection_id = Some(u32::from_be_bytes(arr));
                },
                TLV_WEIGHT => {
                    let arr: [u8; 4] = tlv
                        .value
                        .try_into()
                        .map_err(|_| DecodeError::BadLength("Weight"))?;
                    weight = Some(u32::from_be_bytes(arr));
                },
                TLV_REPLY => {
                    reply = Some(*tlv.value.first().ok_or(DecodeError::BadLength("Reply"))? != 0);
                },
                TLV_REASON => {
                    let arr: [u8; 2] = tlv
                        .value
                        .try_into()
                        .map_err(|_| DecodeError::BadLength("Reason"))?;
                    reason = Some(u16::from_be_bytes(arr));
                },
                TLV_FLAG => {
                    flag = Some(*tlv.value.first().ok_or(DecodeError::BadLength("Flag"))? != 0);
                },
                _ => {},
            }
        }

        let seq = seq.ok_or(DecodeError::MissingField("Seq"))?;

        if let Some(is_ack) = reply {
            let body = if is_ack {
                ControlBody::Ack
            } else {
                let code = reason.ok_or(DecodeError::MissingField("Reason"))?;
                let reason = match code {
                    1 => NackReason::NotFound,
                    2 => NackReason::Capacity,
                    3 => NackReason::AlreadyExists,
                    4 => NackReason::InvalidName,
                    other => return Err(DecodeError::UnknownControlOp(other as u8).into()),
                };
                ControlBody::Nack(reason)
            };
            return Ok(Self { seq, body });
        }

        let op = op.ok_or(DecodeError::MissingField("Op"))?;
        let op = match op {
            OpCode::AddRoute => ControlOp::AddRoute {
                prefix: prefix.ok_or(DecodeError::MissingField("Name"))?,
                connection_id: connection_id
                    .ok_or(DecodeError::MissingField("ConnectionId"))?,
                weight: weight.unwrap_or(1),
            },
            OpCode::RemoveRoute => ControlOp::RemoveRoute {
                prefix: prefix.ok_or(DecodeError::MissingField("Name"))?,
                connection_id,
            },
            OpCode::AddConnection => ControlOp::AddConnection {
                connection_id: connection_id
                    .ok_or(DecodeError::MissingField("ConnectionId"))?,
            },
            OpCode::RemoveConnection => ControlOp::RemoveConnection {
                connection_id: connection_id
                    .ok_or(DecodeError::MissingField("ConnectionId"))?,
            },
            OpCode::ListRoutes => ControlOp::ListRoutes,
            OpCode::ListConnections => ControlOp::ListConnections,
            OpCode::CacheStore => ControlOp::CacheStore(flag.unwrap_or(false)),
            OpCode::CacheServe => ControlOp::CacheServe(flag.unwrap_or(false)),
            OpCode::CacheClear => ControlOp::CacheClear,
            OpCode::Flush => ControlOp::Flush,
        };
        Ok(Self { seq, body: ControlBody::Request(op) })
    }

    pub fn encode(&self) -> NetBuf {
        let mut body = BytesMut::new();
        tlv::write(&mut body, TLV_SEQ, &self.seq.to_be_bytes());

        match &self.body {
            ControlBody::Ack => {
                tlv::write(&mut body, TLV_REPLY, &[1]);
            },
            ControlBody::Nack(reason) => {
                tlv::write(&mut body, TLV_REPLY, &[0]);
                tlv::write(&mut body, TLV_REASON, &(*reason as u16).to_be_bytes());
            },
            ControlBody::Request(op) => {
                let (code, prefix, connection_id, weight, flag) = match op {
                    ControlOp::AddRoute { prefix, connection_id, weight } => {
                        (OpCode::AddRoute, Some(prefix), Some(*connection_id), Some(*weight), None)
                    },
                    ControlOp::RemoveRoute { prefix, connection_id } => {
                        (OpCode::RemoveRoute, Some(prefix), *connection_id, None, None)
                    },
                    ControlOp::AddConnection { connection_id } => {
                        (OpCode::AddConnection, None, Some(*connection_id), None, None)
                    },
                    ControlOp::RemoveConnection { connection_id } => {
                        (OpCode::RemoveConnection, None, Some(*connection_id), None, None)
                    },
                    ControlOp::ListRoutes => (OpCode::ListRoutes, None, None, None, None),
                    ControlOp::ListConnections => {
                        (OpCode::ListConnections, None, None, None, None)
                    },
                    ControlOp::CacheStore(on) => {
                        (OpCode::CacheStore, None, None, None, Some(*on))
                    },
                    ControlOp::CacheServe(on) => {
                        (OpCode::CacheServe, None, None, None, Some(*on))
                    },
                    ControlOp::CacheClear => (OpCode::CacheClear, None, None, None, None),
                    ControlOp::Flush => (OpCode::Flush, None, None, None, None),
                };
                tlv::write(&mut body, TLV_OP, &[code as u8]);
                if let Some(prefix) = prefix {
                    body.extend_from_slice(&tlv::encode_name(prefix));
                }
                if let Some(cid) = connection_id {
                    tlv::write(&mut body, TLV_CONNECTION_ID, &cid.to_be_bytes());
                }
                if let Some(w) = weight {
                    tlv::write(&mut body, TLV_WEIGHT, &w.to_be_bytes());
                }
                if let Some(f) = flag {
                    tlv::write(&mut body, TLV_FLAG, &[f as u8]);
                }
            },
        }

        let header_length = FIXED_HEADER_LEN as u8;
        let packet_length = (FIXED_HEADER_LEN + body.len()) as u16;
        let header = FixedHeader {
            packet_type: PacketType::Control,
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
