//! Lifecycle event publisher with bounded backoff retry
//!
//! Events are published after their transition has committed, so a publish
//! failure must never fail the triggering request. Retryable bus errors are
//! retried with the configured backoff; exhausting the ceiling is logged as
//! a delivery failure and the document stays in its last good state.

use crate::bus::{EventBus, LIFECYCLE_TOPIC};
use crate::config::RetryPolicy;
use medvault_core::{LifecycleEvent, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Delivery counters for one publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublisherStats {
    /// Events the bus accepted.
    pub delivered: u64,
    /// Individual publish attempts, including failures.
    pub attempts: u64,
    /// Events abandoned after exhausting the retry ceiling.
    pub failures: u64,
}

/// Publishes lifecycle events to the bus, retrying retryable failures.
pub struct EventPublisher {
    bus: Arc<dyn EventBus>,
    policy: RetryPolicy,
    delivered: AtomicU64,
    attempts: AtomicU64,
    failures: AtomicU64,
}

impl EventPublisher {
    /// Create a publisher over the given bus.
    pub fn new(bus: Arc<dyn EventBus>, policy: RetryPolicy) -> Self {
        Self {
            bus,
            policy,
            delivered: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Publish one event, retrying per policy.
    ///
    /// Non-retryable errors fail immediately; retryable ones back off with
    /// jitter between attempts. The same event (same `event_id`) is handed
    /// to the bus on every attempt, so at-least-once delivery holds and
    /// consumers can deduplicate.
    pub async fn publish(&self, event: &LifecycleEvent) -> Result<()> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.attempts.fetch_add(1, Ordering::Relaxed);
            match self.bus.publish(LIFECYCLE_TOPIC, event).await {
                Ok(()) => {
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                    debug!(event_id = %event.event_id, kind = %event.kind, attempt, "event delivered");
                    return Ok(());
                }
                Err(err) if err.is_retryable() && self.policy.should_retry(attempt) => {
                    let delay = self.policy.delay_after(attempt);
                    debug!(
                        event_id = %event.event_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "publish failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        event_id = %event.event_id,
                        kind = %event.kind,
                        attempt,
                        error = %err,
                        "abandoning event delivery"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Snapshot of delivery counters.
    pub fn stats(&self) -> PublisherStats {
        PublisherStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medvault_core::{
        ContentDigest, DocumentId, EventId, LifecycleEventKind, OwnerId, VaultError,
    };
    use std::sync::atomic::AtomicU32;

    /// Bus that fails with a retryable error until `succeed_after` attempts.
    struct FlakyBus {
        calls: AtomicU32,
        succeed_after: u32,
        retryable: bool,
    }

    impl FlakyBus {
        fn new(succeed_after: u32, retryable: bool) -> Self {
            Self {
                calls: AtomicU32::new(0),
                succeed_after,
                retryable,
            }
        }
    }

    #[async_trait]
    impl EventBus for FlakyBus {
        async fn publish(&self, _topic: &str, _event: &LifecycleEvent) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.succeed_after {
                Ok(())
            } else if self.retryable {
                Err(VaultError::upstream("bus", "unreachable"))
            } else {
                Err(VaultError::internal("bus rejected event"))
            }
        }
    }

    fn event() -> LifecycleEvent {
        LifecycleEvent {
            event_id: EventId::new(),
            document_id: DocumentId::new(),
            kind: LifecycleEventKind::Uploaded,
            timestamp: 1_700_000_000,
            content_digest: ContentDigest::of(b"bytes"),
            owner_id: OwnerId::new("patient-1"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_the_bus_accepts() {
        let bus = Arc::new(FlakyBus::new(3, true));
        let publisher = EventPublisher::new(bus, RetryPolicy::default());
        publisher.publish(&event()).await.unwrap();
        let stats = publisher.stats();
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_the_ceiling_is_a_delivery_failure() {
        let bus = Arc::new(FlakyBus::new(u32::MAX, true));
        let publisher = EventPublisher::new(bus, RetryPolicy::default());
        let err = publisher.publish(&event()).await.unwrap_err();
        assert!(err.is_retryable());
        let stats = publisher.stats();
        assert_eq!(stats.attempts, 4);
        assert_eq!(stats.failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_errors_fail_fast() {
        let bus = Arc::new(FlakyBus::new(u32::MAX, false));
        let publisher = EventPublisher::new(bus, RetryPolicy::default());
        publisher.publish(&event()).await.unwrap_err();
        assert_eq!(publisher.stats().attempts, 1);
    }
}
