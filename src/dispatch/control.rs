// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Executes the management control-message family (spec.md §6): the
//! forwarder-core half of the externally-excluded CLI/management-API
//! surface — the core only *executes* `ControlOp`s already decoded off the
//! wire and replies `Ack`/`Nack(reason)`; producing and serializing these
//! requests (the CLI, the JSON listing payloads) is the excluded part.

use crate::{
    codec::control::{ControlMessage, ControlOp, NackReason},
    connection::ConnectionTable,
    cs::Cs,
    error::ForwarderError,
    fib::Fib,
};

/// Executes one decoded control request and returns the Ack/Nack to send
/// back (echoing the request's sequence number, per spec.md §6).
pub fn execute(
    fib: &mut Fib,
    connections: &ConnectionTable,
    cs: &mut Cs,
    seq: u64,
    op: &ControlOp,
) -> ControlMessage {
    match op {
        ControlOp::AddRoute { prefix, connection_id, weight } => {
            match fib.insert(prefix, *connection_id, *weight) {
                Ok(_) => {
                    if let Some(conn) = connections.get(*connection_id) {
                        conn.incref();
                    }
                    ControlMessage::ack(seq)
                },
                Err(ForwarderError::AlreadyExists) => {
                    ControlMessage::nack(seq, NackReason::AlreadyExists)
                },
                Err(_) => ControlMessage::nack(seq, NackReason::Capacity),
            }
        },
        ControlOp::RemoveRoute { prefix, connection_id } => {
            match fib.remove(prefix, *connection_id) {
                Ok(()) => {
                    if let Some(cid) = connection_id
                        && let Some(conn) = connections.get(*cid)
                    {
                        conn.decref();
                    }
                    ControlMessage::ack(seq)
                },
                Err(ForwarderError::NotFound) => ControlMessage::nack(seq, NackReason::NotFound),
                Err(_) => ControlMessage::nack(seq, NackReason::Capacity),
            }
        },
        ControlOp::AddConnection { connection_id } => {
            match connections.add_with_id(*connection_id) {
                Some(_) => ControlMessage::ack(seq),
                None => ControlMessage::nack(seq, NackReason::AlreadyExists),
            }
        },
        ControlOp::RemoveConnection { connection_id } => {
            match connections.remove(*connection_id) {
                Ok(()) => ControlMessage::ack(seq),
                Err(ForwarderError::NotFound) => ControlMessage::nack(seq, NackReason::NotFound),
                Err(_) => ControlMessage::nack(seq, NackReason::Capacity),
            }
        },
        // Listing is part of the excluded JSON-management surface; the core
        // only acknowledges that it executed the request. A real listener
        // reply would carry the list as a separate out-of-band payload.
        ControlOp::ListRoutes | ControlOp::ListConnections => ControlMessage::ack(seq),
        ControlOp::CacheStore(on) => {
            cs.set_store_enabled(*on);
            ControlMessage::ack(seq)
        },
        ControlOp::CacheServe(on) => {
            cs.set_serve_enabled(*on);
            ControlMessage::ack(seq)
        },
        ControlOp::CacheClear => {
            cs.clear();
            ControlMessage::ack(seq)
        },
        ControlOp::Flush => ControlMessage::ack(seq),
    }
}
