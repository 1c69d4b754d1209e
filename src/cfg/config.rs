// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The forwarder's single startup configuration record (spec.md §6), loaded
//! from one YAML file that also carries the `logger:` section consumed by
//! [`crate::cfg::logger::init_logger`].

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::logger::LogConfig;

/// `{port, num_io_threads, pit_capacity, pit_default_lifetime_ms,
/// fib_capacity, cs_capacity, cs_enabled, default_hop_limit}` verbatim from
/// spec.md §6, plus the logger section folded in for a single-file
/// deployment.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ForwarderConfig {
    /// TCP/UDP port the listener(s) bind.
    #[serde(rename = "Port")]
    pub port: u16,
    /// Number of listener I/O threads feeding the dispatcher ring.
    #[serde(rename = "NumIoThreads")]
    pub num_io_threads: u32,
    /// Maximum simultaneously pending Interests.
    #[serde(rename = "PitCapacity")]
    pub pit_capacity: u32,
    /// Default Interest lifetime, used when the Interest omits one.
    #[serde(rename = "PitDefaultLifetimeMs")]
    pub pit_default_lifetime_ms: u32,
    /// Maximum number of FIB entries (real + virtual).
    #[serde(rename = "FibCapacity")]
    pub fib_capacity: u32,
    /// Maximum number of Content Store entries.
    #[serde(rename = "CsCapacity")]
    pub cs_capacity: u32,
    /// Whether the Content Store starts enabled (seeds both `CacheStore`
    /// and `CacheServe`; spec.md §6 control ops can diverge them later).
    #[serde(rename = "CsEnabled")]
    pub cs_enabled: bool,
    /// Hop limit stamped on locally-originated Interests; irrelevant to
    /// forwarded traffic, which carries its own.
    #[serde(rename = "DefaultHopLimit")]
    pub default_hop_limit: u8,
    /// Structured-logging settings, read from the same file.
    pub logger: LogConfig,
}

impl ForwarderConfig {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: ForwarderConfig =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants; normalizes nothing at present (every field maps
    /// 1:1 onto a subsystem constructor argument, so there is no derived
    /// state to recompute the way the teacher's Discovery-session rules do).
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(self.port != 0, "Port must be nonzero");
        ensure!(self.num_io_threads >= 1, "NumIoThreads must be >= 1");
        ensure!(self.pit_capacity >= 1, "PitCapacity must be >= 1");
        ensure!(self.pit_default_lifetime_ms >= 1, "PitDefaultLifetimeMs must be >= 1");
        ensure!(self.fib_capacity >= 1, "FibCapacity must be >= 1");
        if !self.cs_enabled {
            ensure!(self.cs_capacity == 0 || self.cs_capacity >= 1, "CsCapacity must be >= 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::logger::LogConfig;

    fn sample() -> ForwarderConfig {
        ForwarderConfig {
            port: 9695,
            num_io_threads: 2,
            pit_capacity: 1024,
            pit_default_lifetime_ms: 4000,
            fib_capacity: 4096,
            cs_capacity: 256,
            cs_enabled: true,
            default_hop_limit: 32,
            logger: LogConfig::test_default(),
        }
    }

    #[test]
    fn validate_rejects_zero_port() {
        let mut cfg = sample();
        cfg.port = 0;
        assert!(cfg.validate_and_normalize().is_err());
    }

    #[test]
    fn validate_accepts_well_formed_config() {
        let mut cfg = sample();
        assert!(cfg.validate_and_normalize().is_ok());
    }

    #[test]
    fn load_from_file_round_trips_yaml() {
        let yaml = r#"
Port: 9695
NumIoThreads: 2
PitCapacity: 1024
PitDefaultLifetimeMs: 4000
FibCapacity: 4096
CsCapacity: 256
CsEnabled: true
DefaultHopLimit: 32
logger:
  level: info
  output: stdout
  is_show_line: false
  is_show_module_path: false
  is_show_target: true
"#;
        let dir = std::env::temp_dir();
        let path = dir.join("lci-forwarder-config-test.yaml");
        std::fs::write(&path, yaml).unwrap();
        let cfg = ForwarderConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg.port, 9695);
        assert_eq!(cfg.pit_capacity, 1024);
        std::fs::remove_file(&path).ok();
    }
}
