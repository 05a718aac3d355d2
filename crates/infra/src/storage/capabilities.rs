//! Capability values plus their realtime event stream

use std::collections::HashMap;

use async_trait::async_trait;
use greenwindow_core::CapabilitySink;
use greenwindow_domain::{Capability, CapabilityEvent, CapabilityValue, Result};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::trace;

const EVENT_BUFFER: usize = 64;

/// In-process capability board.
///
/// Values are cached for synchronous queries; every realtime publish is
/// broadcast to subscribers. Slow subscribers lose the oldest events.
#[derive(Debug)]
pub struct CapabilityBoard {
    values: RwLock<HashMap<Capability, CapabilityValue>>,
    events: broadcast::Sender<CapabilityEvent>,
}

impl CapabilityBoard {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { values: RwLock::new(HashMap::new()), events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CapabilityEvent> {
        self.events.subscribe()
    }

    /// All current values.
    pub fn snapshot(&self) -> HashMap<Capability, CapabilityValue> {
        self.values.read().clone()
    }
}

impl Default for CapabilityBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CapabilitySink for CapabilityBoard {
    fn value(&self, capability: Capability) -> Option<CapabilityValue> {
        self.values.read().get(&capability).cloned()
    }

    async fn set_value(&self, capability: Capability, value: CapabilityValue) -> Result<()> {
        self.values.write().insert(capability, value);
        Ok(())
    }

    async fn publish_realtime(&self, capability: Capability, value: CapabilityValue) -> Result<()> {
        // No subscribers is not an error.
        if self.events.send(CapabilityEvent { capability, value }).is_err() {
            trace!(%capability, "No realtime subscribers");
        }
        Ok(())
    }
}
