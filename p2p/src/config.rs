//! Configuration for a peer group.

use prometheus_client::registry::Registry;
use std::sync::{Arc, Mutex};

/// Largest encoded message a UDP-backed transport can carry.
pub const DEFAULT_MTU: usize = 65_535;

/// Configuration for a [crate::PeerGroup].
#[derive(Clone)]
pub struct Config {
    /// Registry for prometheus metrics.
    pub registry: Arc<Mutex<Registry>>,

    /// Maximum encoded message size the transport will carry.
    ///
    /// Sends whose encoded size strictly exceeds this limit fail before any
    /// transmission; a message of exactly this size is valid.
    pub mtu: usize,
}

impl Config {
    /// Generates a configuration with reasonable defaults for usage in
    /// production.
    pub fn recommended(registry: Arc<Mutex<Registry>>) -> Self {
        Self {
            registry,
            mtu: DEFAULT_MTU,
        }
    }
}
