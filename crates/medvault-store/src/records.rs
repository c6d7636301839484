//! Document record ledger
//!
//! One record per logical document. Two invariants live here and nowhere
//! else:
//!
//! - `content_digest` is unique across all records. `create` checks and
//!   inserts inside a single writer-lock section, so exactly one of two
//!   racing uploads of identical bytes wins; the loser gets
//!   `DuplicateContent` carrying the winner's id.
//! - State transitions are compare-and-swap: each transition method checks
//!   the current state and mutates under the same lock, so concurrent
//!   signers, or a signer racing a delete, cannot both succeed.
//!
//! Records are never hard-deleted; `mark_deleted` flips the state and the
//! row stays for audit.

use async_trait::async_trait;
use medvault_core::{
    AnchorRecord, Attestation, ContentDigest, DocumentId, DocumentRecord, EncryptionParams,
    Result, StorageRef, VaultError, VerificationState,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// The metadata/state-machine ledger for document records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record, enforcing digest uniqueness.
    ///
    /// # Errors
    ///
    /// `DuplicateContent` with the existing document id when the digest is
    /// already present. This is the dedup enforcement point; in-memory
    /// index checks are only a fast path in front of it.
    async fn create(&self, record: DocumentRecord) -> Result<()>;

    /// Load a record by id.
    async fn get(&self, document_id: &DocumentId) -> Result<DocumentRecord>;

    /// Look up a record by content digest.
    async fn find_by_digest(&self, digest: &ContentDigest) -> Result<Option<DocumentRecord>>;

    /// Apply the `Pending -> Signed` transition. CAS on the current state.
    async fn set_attestation(
        &self,
        document_id: &DocumentId,
        attestation: Attestation,
        now: u64,
    ) -> Result<DocumentRecord>;

    /// Apply the `Signed -> Verified` transition. CAS on the current state.
    async fn set_anchor(
        &self,
        document_id: &DocumentId,
        anchor: AnchorRecord,
        now: u64,
    ) -> Result<DocumentRecord>;

    /// Apply the `* -> Deleted` transition. CAS: fails on already-deleted.
    async fn mark_deleted(&self, document_id: &DocumentId, now: u64) -> Result<DocumentRecord>;

    /// Atomically swap storage reference and encryption parameters after a
    /// key rotation. Rejected on deleted records.
    async fn replace_encryption(
        &self,
        document_id: &DocumentId,
        storage_ref: StorageRef,
        params: EncryptionParams,
        now: u64,
    ) -> Result<DocumentRecord>;

    /// All records, in no particular order. Used by the reconciliation
    /// sweep and audit surfaces.
    async fn list(&self) -> Result<Vec<DocumentRecord>>;
}

#[derive(Default)]
struct Ledger {
    records: HashMap<DocumentId, DocumentRecord>,
    by_digest: HashMap<ContentDigest, DocumentId>,
}

/// In-memory record store.
///
/// A single `RwLock` over the ledger makes the uniqueness check and insert
/// one atomic section, standing in for the unique index a database-backed
/// implementation would rely on.
#[derive(Default)]
pub struct MemoryRecordStore {
    ledger: RwLock<Ledger>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, record: DocumentRecord) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        if let Some(existing) = ledger.by_digest.get(&record.content_digest) {
            return Err(VaultError::duplicate(*existing));
        }
        if ledger.records.contains_key(&record.document_id) {
            return Err(VaultError::internal(format!(
                "document id collision: {}",
                record.document_id
            )));
        }
        debug!(document_id = %record.document_id, digest = %record.content_digest, "created record");
        ledger
            .by_digest
            .insert(record.content_digest, record.document_id);
        ledger.records.insert(record.document_id, record);
        Ok(())
    }

    async fn get(&self, document_id: &DocumentId) -> Result<DocumentRecord> {
        self.ledger
            .read()
            .await
            .records
            .get(document_id)
            .cloned()
            .ok_or_else(|| VaultError::not_found(format!("document {document_id}")))
    }

    async fn find_by_digest(&self, digest: &ContentDigest) -> Result<Option<DocumentRecord>> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .by_digest
            .get(digest)
            .and_then(|id| ledger.records.get(id))
            .cloned())
    }

    async fn set_attestation(
        &self,
        document_id: &DocumentId,
        attestation: Attestation,
        now: u64,
    ) -> Result<DocumentRecord> {
        let mut ledger = self.ledger.write().await;
        let record = ledger
            .records
            .get_mut(document_id)
            .ok_or_else(|| VaultError::not_found(format!("document {document_id}")))?;
        if !record.state.can_sign() {
            return Err(VaultError::invalid_transition("sign", record.state));
        }
        record.state = VerificationState::Signed;
        record.attestation = Some(attestation);
        record.updated_at = now;
        Ok(record.clone())
    }

    async fn set_anchor(
        &self,
        document_id: &DocumentId,
        anchor: AnchorRecord,
        now: u64,
    ) -> Result<DocumentRecord> {
        let mut ledger = self.ledger.write().await;
        let record = ledger
            .records
            .get_mut(document_id)
            .ok_or_else(|| VaultError::not_found(format!("document {document_id}")))?;
        if !record.state.can_anchor() {
            return Err(VaultError::invalid_transition("anchor", record.state));
        }
        record.state = VerificationState::Verified;
        record.anchor = Some(anchor);
        record.updated_at = now;
        Ok(record.clone())
    }

    async fn mark_deleted(&self, document_id: &DocumentId, now: u64) -> Result<DocumentRecord> {
        let mut ledger = self.ledger.write().await;
        let record = ledger
            .records
            .get_mut(document_id)
            .ok_or_else(|| VaultError::not_found(format!("document {document_id}")))?;
        if record.state.is_terminal() {
            return Err(VaultError::invalid_transition("delete", record.state));
        }
        record.state = VerificationState::Deleted;
        record.updated_at = now;
        Ok(record.clone())
    }

    async fn replace_encryption(
        &self,
        document_id: &DocumentId,
        storage_ref: StorageRef,
        params: EncryptionParams,
        now: u64,
    ) -> Result<DocumentRecord> {
        let mut ledger = self.ledger.write().await;
        let record = ledger
            .records
            .get_mut(document_id)
            .ok_or_else(|| VaultError::not_found(format!("document {document_id}")))?;
        if record.state.is_terminal() {
            return Err(VaultError::invalid_transition("rotate", record.state));
        }
        record.storage_ref = storage_ref;
        record.encryption_params = params;
        record.updated_at = now;
        Ok(record.clone())
    }

    async fn list(&self) -> Result<Vec<DocumentRecord>> {
        Ok(self.ledger.read().await.records.values().cloned().collect())
    }
}
