// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The per-packet dispatch pipeline (spec.md §4.5): classify, consult
//! CS/PIT/FIB, and emit zero or more outbound packets, enforcing split
//! horizon and at-most-one forwarding per Interest per next-hop.
//!
//! Grounded on `client/client.rs`'s `read_loop` (decode a framed message,
//! dispatch on its kind, write replies back out) generalized from a single
//! client socket to many connections plus the CS/PIT/FIB lookup chain, and
//! on `cicn_fib.c`'s next-hop-refcount-driven route withdrawal for
//! `on_connection_down`.

pub mod control;

use std::time::Instant;

use tracing::{debug, trace};

use crate::{
    codec::{ContentObject, Interest},
    connection::ConnectionTable,
    cs::Cs,
    error::{ForwarderError, PolicyError},
    fib::Fib,
    metrics::Metrics,
    pit::Pit,
};

/// What happened to an inbound Interest, for logging/tests — the dispatcher
/// itself only cares about which connections to transmit on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterestOutcome {
    /// Served straight from the Content Store; no PIT entry created.
    ServedFromCache,
    /// Aggregated onto an existing PIT entry; nothing retransmitted.
    Aggregated,
    /// A fresh PIT entry was created and forwarded to these connections.
    Forwarded(Vec<u32>),
    /// Dropped, and why.
    Dropped(ForwarderError),
}

/// Per-packet flow for Interests (spec.md §4.5).
pub fn handle_interest(
    fib: &Fib,
    pit: &mut Pit,
    cs: &mut Cs,
    metrics: &Metrics,
    interest: &Interest,
    ingress: u32,
    now: Instant,
) -> InterestOutcome {
    if interest.hop_limit == 0 {
        let err: ForwarderError = PolicyError::HopLimitZero.into();
        bump_drop(metrics, &err);
        return InterestOutcome::Dropped(err);
    }

    if let Some(hit) = cs.lookup(interest, now) {
        trace!(name = %hit.name, "content store hit");
        return InterestOutcome::ServedFromCache;
    }

    let name = interest.name.clone();
    let insert_result = pit.insert_interest(interest, ingress, now, || {
        fib.lookup(&name)
            .map(|entry| entry.next_hops.iter().map(|nh| nh.connection_id).collect())
            .unwrap_or_default()
    });

    match insert_result {
        Ok((crate::pit::InsertOutcome::Aggregated, _)) => InterestOutcome::Aggregated,
        Ok((crate::pit::InsertOutcome::NoRoute, _)) => {
            debug!(name = %interest.name, "no route, dropping");
            InterestOutcome::Dropped(ForwarderError::NotFound)
        },
        Ok((crate::pit::InsertOutcome::Created, egress)) => InterestOutcome::Forwarded(egress),
        Err(e) => {
            let err: ForwarderError = e.into();
            bump_drop(metrics, &err);
            InterestOutcome::Dropped(err)
        },
    }
}

/// What happened to an inbound Content Object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentObjectOutcome {
    /// Forwarded to this reverse-path connection set (never empty).
    Forwarded(Vec<u32>),
    /// No PIT entry matched; the object was unsolicited and dropped.
    Unsolicited,
}

/// Per-packet flow for Content Objects (spec.md §4.5). Optionally inserts
/// into the Content Store after computing the reverse path, per policy.
pub fn handle_content_object(
    pit: &mut Pit,
    cs: &mut Cs,
    co: &ContentObject,
    now: Instant,
) -> ContentObjectOutcome {
    let reverse_path = pit.consume(co);
    if reverse_path.is_empty() {
        return ContentObjectOutcome::Unsolicited;
    }
    cs.insert(co.clone(), now);
    ContentObjectOutcome::Forwarded(reverse_path)
}

/// Connection-loss reaction (spec.md §7): withdraw every FIB route whose
/// only next-hop was `connection_id`, bumping `route_withdrawals` once per
/// withdrawn prefix, and release each withdrawn prefix's hold on the
/// connection's FIB-nexthop refcount.
pub fn on_connection_down(
    fib: &mut Fib,
    connections: &ConnectionTable,
    metrics: &Metrics,
    connection_id: u32,
) {
    connections.mark_down(connection_id);
    let withdrawn = fib.withdraw_connection(connection_id);
    for prefix in &withdrawn {
        debug!(%prefix, connection_id, "route withdrawn on connection loss");
        metrics.record_route_withdrawal();
        if let Some(conn) = connections.get(connection_id) {
            conn.decref();
        }
    }
}

fn bump_drop(metrics: &Metrics, err: &ForwarderError) {
    if let Some(kind) = err.drop_kind() {
        metrics.record_drop(kind);
    }
}
