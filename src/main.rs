// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use lci_forwarder_core::{
    cfg::{cli::resolve_config_path, config::ForwarderConfig, logger::init_logger},
    forwarder::{Forwarder, InboundEvent},
    ring::SpscRing,
};
use tracing::info;

/// Default ring capacity (must be a power of two) between listener threads
/// and the dispatcher; not yet config-driven since no concrete listener
/// adapter is wired up (spec.md §1 excludes per-transport I/O).
const RING_CAPACITY: usize = 4096;

fn main() -> Result<()> {
    let cfg = resolve_config_path("config/forwarder.yaml")
        .and_then(ForwarderConfig::load_from_file)
        .context("failed to resolve or load config")?;

    let _logger_guard = init_logger(&cfg.logger)?;
    info!(port = cfg.port, "lci-forwarderd starting");

    let ring: Arc<SpscRing<InboundEvent>> = Arc::new(SpscRing::new(RING_CAPACITY));
    let mut forwarder = Forwarder::new(cfg, ring);

    // Listener adapters (TCP/UDP/Unix) are the excluded per-transport I/O
    // layer (spec.md §1); a real deployment spawns them here, each pushing
    // decoded-ready bytes onto `forwarder.ring()` from its own thread.
    // Without one attached, the dispatch loop still runs and answers
    // whatever the management plane pushes onto the ring in-process.
    info!("entering dispatch loop");
    forwarder.run();
}
