// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::{Arc, Mutex}, time::Instant};

use bytes::Bytes;
use lci_forwarder_core::{
    cfg::{config::ForwarderConfig, logger::{LogConfig, Output}},
    connection::Transport,
    error::ForwarderError,
    forwarder::{Forwarder, InboundEvent},
    name::{Component, LABEL_NAME, Name},
    ring::SpscRing,
};

pub fn name(segments: &[&str]) -> Name {
    Name::from_components(
        segments
            .iter()
            .map(|s| Component::new(LABEL_NAME, Bytes::copy_from_slice(s.as_bytes())))
            .collect(),
    )
    .unwrap()
}

pub fn config() -> ForwarderConfig {
    ForwarderConfig {
        port: 9695,
        num_io_threads: 1,
        pit_capacity: 64,
        pit_default_lifetime_ms: 2000,
        fib_capacity: 256,
        cs_capacity: 16,
        cs_enabled: false,
        default_hop_limit: 32,
        logger: LogConfig {
            level: "error".to_string(),
            output: Output::Stdout,
            is_show_line: false,
            is_show_module_path: false,
            is_show_target: false,
            file: None,
        },
    }
}

pub fn new_forwarder() -> (Forwarder, Arc<SpscRing<InboundEvent>>) {
    let ring = Arc::new(SpscRing::new(64));
    (Forwarder::new(config(), ring.clone()), ring)
}

/// A transport double that records every frame it was asked to send.
#[derive(Default)]
pub struct CapturingTransport(pub Mutex<Vec<Bytes>>);

impl Transport for CapturingTransport {
    fn try_write(&self, bytes: &[u8]) -> Result<(), ForwarderError> {
        self.0.lock().unwrap().push(Bytes::copy_from_slice(bytes));
        Ok(())
    }
}

impl CapturingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.0.lock().unwrap().clone()
    }
}

/// Pushes one packet onto the ring as arriving on `connection_id`, then
/// drives exactly one dispatch tick.
pub fn deliver(forwarder: &mut Forwarder, ring: &SpscRing<InboundEvent>, connection_id: u32, bytes: Bytes) {
    ring.try_push(InboundEvent::Packet { connection_id, bytes }).unwrap();
    forwarder.tick(Instant::now());
}
