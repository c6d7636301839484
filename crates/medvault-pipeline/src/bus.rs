//! Event bus collaborator
//!
//! Lifecycle events leave the pipeline through this trait. Consumers
//! subscribe via explicit channels rather than string-named callbacks, and
//! delivery is at-least-once: the publisher may hand the bus the same event
//! twice, so consumers deduplicate on `event_id`.

use async_trait::async_trait;
use medvault_core::{LifecycleEvent, Result, VaultError};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Topic carrying document lifecycle events.
pub const LIFECYCLE_TOPIC: &str = "documents.lifecycle";

/// External message-bus collaborator.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Hand one event to the bus. `Ok` means the bus accepted ownership.
    async fn publish(&self, topic: &str, event: &LifecycleEvent) -> Result<()>;
}

/// In-memory bus fanning events out over `mpsc` channels.
///
/// Keeps a log of everything accepted so tests can assert on the exact
/// event sequence.
#[derive(Default)]
pub struct MemoryEventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<LifecycleEvent>>>,
    log: Mutex<Vec<LifecycleEvent>>,
}

impl MemoryEventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a subscription channel. Events published after this call are
    /// delivered to the returned receiver.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<LifecycleEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    /// Every event accepted so far, in publish order.
    pub fn published(&self) -> Vec<LifecycleEvent> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, topic: &str, event: &LifecycleEvent) -> Result<()> {
        debug!(topic, event_id = %event.event_id, kind = %event.kind, "bus accepted event");
        {
            let mut log = self
                .log
                .lock()
                .map_err(|_| VaultError::internal("bus log lock poisoned"))?;
            log.push(event.clone());
        }
        if let Ok(mut subscribers) = self.subscribers.lock() {
            // Dead receivers drop out; delivery to the rest continues.
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
        Ok(())
    }
}
