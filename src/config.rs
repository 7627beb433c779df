//! Bridge configuration.
//!
//! The bridge itself is configured once at startup: which node it simulates,
//! where its rendezvous socket lives and how large its reads are. Values come
//! from defaults, then environment overrides, then whatever the host sets
//! explicitly (e.g. command-line flags).

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::constants::{
    BASE_DIR_ENV, DEFAULT_LISTEN_BACKLOG, DEFAULT_RECEIVE_CAPACITY, RECEIVE_CAPACITY_ENV,
};
use crate::endpoint::RendezvousAddress;

/// Configuration for a single [`UartBridge`](crate::UartBridge).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Identifier of the simulated node; names the rendezvous socket.
    pub node_id: u16,
    /// Directory holding the rendezvous socket. `None` means the working
    /// directory.
    pub base_dir: Option<PathBuf>,
    /// Listen backlog of the acceptor.
    pub listen_backlog: i32,
    /// Capacity of the inbound scratch buffer.
    pub receive_capacity: usize,
}

impl BridgeConfig {
    /// Configuration with defaults for `node_id`, ignoring the environment.
    #[must_use]
    pub fn new(node_id: u16) -> Self {
        Self {
            node_id,
            base_dir: None,
            listen_backlog: DEFAULT_LISTEN_BACKLOG,
            receive_capacity: DEFAULT_RECEIVE_CAPACITY,
        }
    }

    /// Defaults for `node_id` with environment overrides applied.
    #[must_use]
    pub fn from_env(node_id: u16) -> Self {
        let mut config = Self::new(node_id);
        config.apply_env_overrides();
        config
    }

    /// Apply `UDSPATH` and `SIMUART_RECEIVE_CAPACITY` if set.
    ///
    /// Unparseable or zero capacities are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_dir) = std::env::var(BASE_DIR_ENV) {
            if !base_dir.is_empty() {
                self.base_dir = Some(PathBuf::from(base_dir));
            }
        }

        if let Ok(capacity) = std::env::var(RECEIVE_CAPACITY_ENV) {
            match capacity.parse::<usize>() {
                Ok(n) if n > 0 => self.receive_capacity = n,
                _ => log::warn!(
                    "[config] ignoring {RECEIVE_CAPACITY_ENV}={capacity:?} (expected a positive integer)"
                ),
            }
        }
    }

    /// Rendezvous address derived from `node_id` and `base_dir`.
    #[must_use]
    pub fn rendezvous_address(&self) -> RendezvousAddress {
        RendezvousAddress::new(self.node_id, self.base_dir.clone())
    }
}

/// Parse a hexadecimal node id, with or without a `0x` prefix.
pub fn parse_node_id(raw: &str) -> Result<u16> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u16::from_str_radix(digits, 16).with_context(|| format!("invalid hex node id: {raw:?}"))
}
