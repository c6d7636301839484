//! Anchoring ledger collaborator
//!
//! The ledger is opaque: submit a content digest, get back a receipt
//! reference, later ask whether a receipt still verifies. Consensus,
//! chains, and receipts' internals are entirely the collaborator's
//! business.

use async_trait::async_trait;
use medvault_core::{AnchorRef, ContentDigest, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// External immutable-ledger collaborator.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Submit a digest for anchoring and return the receipt reference.
    async fn anchor(&self, digest: &ContentDigest) -> Result<AnchorRef>;

    /// Whether a previously issued receipt still verifies.
    async fn verify(&self, anchor_ref: &AnchorRef) -> Result<bool>;
}

/// In-memory ledger for tests and local development.
///
/// Every `anchor` call issues a fresh receipt; idempotency on already
/// verified documents is the orchestrator's job, not the ledger's.
#[derive(Default)]
pub struct MemoryLedger {
    receipts: RwLock<HashMap<AnchorRef, ContentDigest>>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of receipts issued.
    pub async fn receipt_count(&self) -> usize {
        self.receipts.read().await.len()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn anchor(&self, digest: &ContentDigest) -> Result<AnchorRef> {
        let anchor_ref = AnchorRef::new(format!("anchor-{}", Uuid::new_v4().simple()));
        self.receipts
            .write()
            .await
            .insert(anchor_ref.clone(), *digest);
        info!(%anchor_ref, %digest, "anchored digest");
        Ok(anchor_ref)
    }

    async fn verify(&self, anchor_ref: &AnchorRef) -> Result<bool> {
        Ok(self.receipts.read().await.contains_key(anchor_ref))
    }
}
