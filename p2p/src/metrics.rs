use prometheus_client::{metrics::counter::Counter, registry::Registry};
use std::sync::{Arc, Mutex};

/// Counters for a peer group.
#[derive(Clone, Default)]
pub struct Metrics {
    pub messages_sent: Counter,
    pub messages_received: Counter,
    pub messages_dropped: Counter,
    pub channels_established: Counter,
}

impl Metrics {
    /// Create and register metrics with the given registry.
    pub fn init(registry: &Arc<Mutex<Registry>>) -> Self {
        let metrics = Self::default();
        {
            let mut registry = registry.lock().unwrap();
            registry.register(
                "messages_sent",
                "messages sent",
                metrics.messages_sent.clone(),
            );
            registry.register(
                "messages_received",
                "messages received",
                metrics.messages_received.clone(),
            );
            registry.register(
                "messages_dropped",
                "messages dropped",
                metrics.messages_dropped.clone(),
            );
            registry.register(
                "channels_established",
                "channels established",
                metrics.channels_established.clone(),
            );
        }
        metrics
    }
}
