// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The error taxonomy from spec.md §7: six broad kinds, each a thin
//! `thiserror` enum. Decode and Policy failures are always handled locally
//! (the packet is dropped, a [`crate::metrics::Metrics`] counter bumped, and
//! a debug trace emitted) — `ForwarderError` exists for that local match,
//! not as something meant to propagate to a caller across an `anyhow`
//! boundary the way the teacher's client-facing errors do.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer truncated before the declared length")]
    Truncated,
    #[error("unknown wire version {0}")]
    UnknownVersion(u8),
    #[error("unknown packet type {0}")]
    UnknownPacketType(u8),
    #[error("unknown control operation {0}")]
    UnknownControlOp(u8),
    #[error("missing mandatory field {0}")]
    MissingField(&'static str),
    #[error("duplicate field {0}")]
    DuplicateField(&'static str),
    #[error("field {0} has an invalid length")]
    BadLength(&'static str),
    #[error("name exceeds the maximum component depth")]
    NameTooDeep,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CapacityError {
    #[error("FIB next-hop capacity exceeded for this entry")]
    NhopLimit,
    #[error("name exceeds the maximum component depth")]
    PfxCompLimit,
    #[error("PIT is at capacity")]
    PitFull,
    #[error("content store is at capacity")]
    CsFull,
    #[error("ring buffer is full")]
    RingFull,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    #[error("hop limit reached zero")]
    HopLimitZero,
    #[error("content object is unsolicited")]
    Unsolicited,
    #[error("route points back to the ingress connection")]
    RouteToSelf,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("signature verification failed")]
    BadSignature,
    #[error("content object hash does not match the restriction")]
    HashMismatch,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection is not writable")]
    NotWritable,
    #[error("endpoint closed")]
    Closed,
}

/// The taxonomy kinds named in spec.md §7, not concrete error types: each
/// variant here wraps the kind-specific enum above.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForwarderError {
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
    #[error("capacity: {0}")]
    Capacity(#[from] CapacityError),
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("policy: {0}")]
    Policy(#[from] PolicyError),
    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

impl ForwarderError {
    /// Which [`crate::metrics::Metrics`] counter a dropped packet bumps.
    pub fn drop_kind(&self) -> Option<crate::metrics::DropKind> {
        match self {
            ForwarderError::Decode(_) => Some(crate::metrics::DropKind::Decode),
            ForwarderError::Policy(_) => Some(crate::metrics::DropKind::Policy),
            ForwarderError::Capacity(_) => Some(crate::metrics::DropKind::Capacity),
            _ => None,
        }
    }
}
