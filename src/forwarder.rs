// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The forwarder root value (spec.md §9 redesign note): an explicit,
//! ordinarily-owned struct aggregating the FIB, PIT, CS, connection table,
//! and metrics, instead of the teacher's `Pool`/`OnceCell<Weak<Pool>>`
//! self-attaching singleton — there is exactly one `Forwarder` per process
//! and it is never reached through a weak back-reference.
//!
//! Grounded on `client/client.rs`'s single-socket read loop, generalized to
//! the many-connections-via-one-ring model of spec.md §5: one dispatcher
//! thread owns every mutable subsystem and drains a lock-free SPSC ring fed
//! by listener threads it does not otherwise interact with.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::{
    cfg::config::ForwarderConfig,
    codec::{FixedHeader, Message, control::ControlBody},
    connection::ConnectionTable,
    cs::Cs,
    dispatch::{self, ContentObjectOutcome, InterestOutcome, control},
    fib::Fib,
    metrics::Metrics,
    pit::Pit,
    ring::SpscRing,
};

/// One item crossing the dispatcher's ring (spec.md §5): either a raw
/// packet that arrived on some connection, or notice that a connection was
/// lost. Management-plane requests travel as ordinary `Packet`s of
/// `PacketType::Control` — they need no distinguished ring variant of their
/// own, since [`Message::decode`] already tells them apart.
pub enum InboundEvent {
    Packet { connection_id: u32, bytes: Bytes },
    ConnectionClosed { connection_id: u32 },
}

/// Every mutable forwarding subsystem, owned by whichever thread calls
/// [`Forwarder::run`]/[`Forwarder::tick`]. Nothing reaches back into this
/// value through a weak pointer; callers hold `&mut Forwarder` for as long
/// as they need it, then return it — the opposite of the teacher's
/// `Arc<Pool>` with a self-referential `Weak` stashed in a `OnceCell`.
pub struct Forwarder {
    config: ForwarderConfig,
    fib: Fib,
    pit: Pit,
    cs: Cs,
    connections: ConnectionTable,
    metrics: Metrics,
    ring: Arc<SpscRing<InboundEvent>>,
}

impl Forwarder {
    pub fn new(config: ForwarderConfig, ring: Arc<SpscRing<InboundEvent>>) -> Self {
        info!(
            pit_capacity = config.pit_capacity,
            cs_capacity = config.cs_capacity,
            fib_capacity = config.fib_capacity,
            "forwarder subsystems sized from config"
        );
        let pit = Pit::new(
            config.pit_capacity as usize,
            Duration::from_millis(u64::from(config.pit_default_lifetime_ms)),
        );
        let cs = Cs::new(config.cs_capacity as usize, config.cs_enabled);
        Self {
            config,
            fib: Fib::new(),
            pit,
            cs,
            connections: ConnectionTable::new(),
            metrics: Metrics::default(),
            ring,
        }
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn connections(&self) -> &ConnectionTable {
        &self.connections
    }

    pub fn ring(&self) -> &Arc<SpscRing<InboundEvent>> {
        &self.ring
    }

    /// One dispatch-loop iteration (spec.md §5): read the monotonic clock
    /// once, sweep expired PIT entries, then drain and apply at most one
    /// ring item. Exposed separately from [`Forwarder::run`] so tests can
    /// drive deterministic sequences of ticks.
    pub fn tick(&mut self, now: Instant) {
        let expired = self.pit.expire(now);
        for _ in 0..expired {
            self.metrics.record_pit_expiration();
        }

        let Some(event) = self.ring.try_pop() else { return };
        match event {
            InboundEvent::Packet { connection_id, bytes } => {
                self.handle_packet(connection_id, bytes, now);
            },
            InboundEvent::ConnectionClosed { connection_id } => {
                dispatch::on_connection_down(
                    &mut self.fib,
                    &self.connections,
                    &self.metrics,
                    connection_id,
                );
            },
        }
    }

    /// Runs the dispatch loop forever. The only suspension point is a short
    /// sleep when the ring was found empty (spec.md §5: "The core thread may
    /// block only while dequeuing from the ring"); a real deployment would
    /// park on a condvar signaled by the producers instead, but the ring
    /// itself has no blocking wait, only `try_pop`.
    pub fn run(&mut self) -> ! {
        loop {
            self.tick(Instant::now());
            if self.ring.remaining() == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }

    fn handle_packet(&mut self, connection_id: u32, bytes: Bytes, now: Instant) {
        let message = match Message::decode(&bytes) {
            Ok(message) => message,
            Err(err) => {
                if let Some(kind) = err.drop_kind() {
                    self.metrics.record_drop(kind);
                }
                debug!(connection_id, %err, "dropped undecodable packet");
                return;
            },
        };

        match message {
            Message::Interest(interest) => {
                let outcome = dispatch::handle_interest(
                    &self.fib,
                    &mut self.pit,
                    &mut self.cs,
                    &self.metrics,
                    &interest,
                    connection_id,
                    now,
                );
                if let InterestOutcome::Forwarded(egress) = outcome {
                    self.forward_interest(&bytes, &egress);
                }
            },
            Message::ContentObject(co) => {
                let outcome = dispatch::handle_content_object(&mut self.pit, &mut self.cs, &co, now);
                if let ContentObjectOutcome::Forwarded(egress) = outcome {
                    self.transmit(&bytes, &egress);
                }
            },
            Message::Control(ctrl) => {
                let ControlBody::Request(op) = ctrl.body else {
                    debug!(connection_id, "ignoring non-request control message");
                    return;
                };
                let reply = control::execute(&mut self.fib, &self.connections, &mut self.cs, ctrl.seq, &op);
                if let Some(conn) = self.connections.get(connection_id)
                    && let Err(err) = conn.send(&reply.encode().linearize())
                {
                    warn!(connection_id, %err, "failed to send control reply");
                }
            },
        }
    }

    /// Re-frames `raw` with a decremented hop limit and transmits it on
    /// every connection in `egress`, per spec.md §4.5 step 8. Interests
    /// carry a live hop limit; Content Objects do not (their fixed header
    /// always encodes `hop_limit = 0`), so only this path rewrites it.
    fn forward_interest(&self, raw: &Bytes, egress: &[u32]) {
        let reframed = match FixedHeader::decrement_hop_limit(raw) {
            Ok(nb) => nb,
            Err(err) => {
                debug!(%err, "dropped at forward: hop limit exhausted mid-flight");
                return;
            },
        };
        self.transmit(&reframed.linearize(), egress);
    }

    /// Sends `bytes` verbatim to every connection in `egress` (spec.md
    /// §4.5 Content Object step 5 — no header rewrite).
    fn transmit(&self, bytes: &Bytes, egress: &[u32]) {
        for &connection_id in egress {
            if let Some(conn) = self.connections.get(connection_id)
                && let Err(err) = conn.send(bytes)
            {
                warn!(connection_id, %err, "forward failed");
            }
        }
    }
}
