// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The metrics counter family from spec.md §7:
//! `{drops_decode, drops_policy, drops_capacity, route_withdrawals,
//! pit_expirations}`. All counters are relaxed atomics — the dispatcher is
//! single-threaded, but a future admin-plane reader may sample them from
//! another thread without coordinating with it.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropKind {
    Decode,
    Policy,
    Capacity,
}

#[derive(Debug, Default)]
pub struct Metrics {
    drops_decode: AtomicU64,
    drops_policy: AtomicU64,
    drops_capacity: AtomicU64,
    route_withdrawals: AtomicU64,
    pit_expirations: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub drops_decode: u64,
    pub drops_policy: u64,
    pub drops_capacity: u64,
    pub route_withdrawals: u64,
    pub pit_expirations: u64,
}

impl Metrics {
    pub fn record_drop(&self, kind: DropKind) {
        let counter = match kind {
            DropKind::Decode => &self.drops_decode,
            DropKind::Policy => &self.drops_policy,
            DropKind::Capacity => &self.drops_capacity,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_route_withdrawal(&self) {
        self.route_withdrawals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pit_expiration(&self) {
        self.pit_expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            drops_decode: self.drops_decode.load(Ordering::Relaxed),
            drops_policy: self.drops_policy.load(Ordering::Relaxed),
            drops_capacity: self.drops_capacity.load(Ordering::Relaxed),
            route_withdrawals: self.route_withdrawals.load(Ordering::Relaxed),
            pit_expirations: self.pit_expirations.load(Ordering::Relaxed),
        }
    }
}
