//! Upload, download, delete, key rotation, and reconciliation
//!
//! The upload path is not globally locked. Two concurrent uploads of
//! byte-identical content race on the record store's uniqueness constraint;
//! exactly one create succeeds and the loser observes the conflict, cleans
//! up its own blob, and reports the winner's document id as a duplicate.
//!
//! Record creation is the commit point: a blob written for an upload whose
//! record never lands is an orphan, removed either by the losing uploader
//! itself or by the [`Pipeline::reconcile`] sweep.

use crate::bus::EventBus;
use crate::config::PipelineConfig;
use crate::ledger::Ledger;
use crate::publisher::EventPublisher;
use crate::validate;
use medvault_core::{
    ContentDigest, DocumentId, DocumentRecord, LifecycleEvent, LifecycleEventKind, OriginId,
    OwnerId, Result, StorageRef, TimeSource, VaultError, VerificationState,
};
use medvault_crypto::KeyService;
use medvault_store::{BlobStore, ContentIndex, RecordStore};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// An upload as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Subject the document belongs to.
    pub owner_id: OwnerId,
    /// Party submitting the document.
    pub origin_id: OriginId,
    /// Declared media type.
    pub media_type: String,
    /// File name as submitted.
    pub original_name: String,
    /// Raw plaintext bytes.
    pub bytes: Vec<u8>,
}

/// What a successful upload tells the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Identifier of the freshly created record.
    pub document_id: DocumentId,
    /// Digest of the uploaded bytes.
    pub content_digest: ContentDigest,
    /// State after creation (always `Pending`).
    pub state: VerificationState,
    /// Locator of the stored blob.
    pub storage_ref: StorageRef,
}

/// Outcome of an upload: a new record, or a redirect to an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The content was new; a record was created.
    Created(UploadReceipt),
    /// Byte-identical content is already stored.
    Duplicate {
        /// The record that owns this content.
        existing: DocumentId,
    },
}

/// Summary of one reconciliation sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    /// Blobs removed because no live record references them.
    pub orphans_removed: u64,
}

/// The document integrity pipeline.
///
/// Owns explicit handles to its collaborators; construct one per deployment
/// and share it behind an `Arc`.
pub struct Pipeline {
    pub(crate) records: Arc<dyn RecordStore>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) keys: Arc<dyn KeyService>,
    pub(crate) ledger: Arc<dyn Ledger>,
    pub(crate) publisher: EventPublisher,
    pub(crate) index: ContentIndex,
    pub(crate) clock: Arc<dyn TimeSource>,
    pub(crate) config: PipelineConfig,
    rotation_locks: Mutex<HashMap<DocumentId, Arc<Mutex<()>>>>,
}

impl Pipeline {
    /// Wire a pipeline to its collaborators.
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        keys: Arc<dyn KeyService>,
        ledger: Arc<dyn Ledger>,
        bus: Arc<dyn EventBus>,
        clock: Arc<dyn TimeSource>,
        config: PipelineConfig,
    ) -> Self {
        let publisher = EventPublisher::new(bus, config.publish_retry.clone());
        Self {
            records,
            blobs,
            keys,
            ledger,
            publisher,
            index: ContentIndex::new(),
            clock,
            config,
            rotation_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Bound an upstream call by the configured timeout.
    ///
    /// Timeout is a retryable failure, never a silent success.
    pub(crate) async fn bounded<T>(
        &self,
        service: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.upstream_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(VaultError::upstream(service, "call timed out")),
        }
    }

    /// Publish a lifecycle event for an already-committed transition.
    ///
    /// Delivery failure is logged, never propagated: the transition has
    /// committed and must not appear to fail.
    pub(crate) async fn emit(&self, record: &DocumentRecord, kind: LifecycleEventKind) {
        let event = LifecycleEvent::for_record(record, kind, self.clock.now_unix());
        if let Err(err) = self.publisher.publish(&event).await {
            warn!(
                document_id = %record.document_id,
                kind = %kind,
                error = %err,
                "lifecycle event delivery failed"
            );
        }
    }

    /// Accept an upload: validate, deduplicate, encrypt, store, record.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome> {
        validate::validate(
            &request.bytes,
            &request.media_type,
            self.config.max_upload_bytes,
        )?;
        let digest = ContentDigest::of(&request.bytes);

        // Fast path, then the record store's own read. Neither is
        // authoritative under a race; the create below is.
        if let Some(existing) = self.index.lookup(&digest) {
            debug!(%digest, %existing, "duplicate upload (index hit)");
            return Ok(UploadOutcome::Duplicate { existing });
        }
        if let Some(existing) = self.records.find_by_digest(&digest).await? {
            self.index.insert(digest, existing.document_id);
            debug!(%digest, existing = %existing.document_id, "duplicate upload");
            return Ok(UploadOutcome::Duplicate {
                existing: existing.document_id,
            });
        }

        let (ciphertext, params) = self
            .bounded("key-service", self.keys.encrypt(None, &request.bytes))
            .await?;
        let storage_ref = self.bounded("blob-store", self.blobs.put(ciphertext)).await?;

        let record = DocumentRecord::new(
            DocumentId::new(),
            digest,
            storage_ref.clone(),
            params,
            request.owner_id,
            request.origin_id,
            request.media_type,
            request.bytes.len() as u64,
            request.original_name,
            self.clock.now_unix(),
        );

        match self.records.create(record.clone()).await {
            Ok(()) => {}
            Err(VaultError::DuplicateContent { existing }) => {
                // Lost the race to an identical concurrent upload. Our blob
                // is an orphan now; remove it and report the winner.
                self.remove_blob_best_effort(&storage_ref).await;
                self.index.insert(digest, existing);
                debug!(%digest, %existing, "duplicate upload (lost create race)");
                return Ok(UploadOutcome::Duplicate { existing });
            }
            Err(other) => {
                self.remove_blob_best_effort(&storage_ref).await;
                return Err(other);
            }
        }

        self.index.insert(digest, record.document_id);
        info!(
            document_id = %record.document_id,
            %digest,
            bytes = record.byte_size,
            media_type = %record.media_type,
            "document stored"
        );
        self.emit(&record, LifecycleEventKind::Uploaded).await;

        Ok(UploadOutcome::Created(UploadReceipt {
            document_id: record.document_id,
            content_digest: digest,
            state: record.state,
            storage_ref,
        }))
    }

    /// Fetch and decrypt a document's plaintext.
    ///
    /// Re-verifies the digest of the decrypted bytes against the record, so
    /// a blob swapped underneath us cannot be returned as the document.
    pub async fn download(&self, document_id: &DocumentId) -> Result<Vec<u8>> {
        let record = self.records.get(document_id).await?;
        if record.is_deleted() {
            return Err(VaultError::not_found(format!(
                "document {document_id} is deleted"
            )));
        }
        let ciphertext = self
            .bounded("blob-store", self.blobs.get(&record.storage_ref))
            .await?;
        let plaintext = self
            .bounded(
                "key-service",
                self.keys.decrypt(&record.encryption_params, &ciphertext),
            )
            .await?;
        if ContentDigest::of(&plaintext) != record.content_digest {
            warn!(
                target: "medvault::security",
                %document_id,
                "decrypted bytes do not match stored digest"
            );
            return Err(VaultError::integrity_violation(
                "decrypted bytes do not match stored digest",
            ));
        }
        Ok(plaintext)
    }

    /// Soft-delete a document: mark the record, drop the blob.
    ///
    /// The record row stays for audit. A read racing this delete may see
    /// the blob vanish and fail with not-found; that is the documented
    /// outcome, not a crash.
    pub async fn delete(&self, document_id: &DocumentId) -> Result<DocumentRecord> {
        let record = self
            .records
            .mark_deleted(document_id, self.clock.now_unix())
            .await?;
        if let Err(err) = self
            .bounded("blob-store", self.blobs.delete(&record.storage_ref))
            .await
        {
            // The sweep reclaims it later.
            warn!(%document_id, error = %err, "blob removal failed after soft delete");
        }
        info!(%document_id, "document deleted");
        self.emit(&record, LifecycleEventKind::Deleted).await;
        Ok(record)
    }

    /// Re-encrypt a document under a freshly minted key.
    ///
    /// Serialized per document. The new blob is written and round-trip
    /// verified before the record swaps to it, so a crash mid-rotation
    /// leaves the record pointing at the old, still-decryptable blob.
    pub async fn rotate_key(&self, document_id: &DocumentId) -> Result<DocumentRecord> {
        let lock = self.rotation_lock(document_id).await;
        let _guard = lock.lock().await;

        let record = self.records.get(document_id).await?;
        if record.state.is_terminal() {
            return Err(VaultError::invalid_transition("rotate", record.state));
        }

        let ciphertext = self
            .bounded("blob-store", self.blobs.get(&record.storage_ref))
            .await?;
        let plaintext = self
            .bounded(
                "key-service",
                self.keys.decrypt(&record.encryption_params, &ciphertext),
            )
            .await?;

        let new_key = self.bounded("key-service", self.keys.mint_key()).await?;
        let (new_ciphertext, new_params) = self
            .bounded(
                "key-service",
                self.keys.encrypt(Some(&new_key), &plaintext),
            )
            .await?;
        let new_ref = self
            .bounded("blob-store", self.blobs.put(new_ciphertext))
            .await?;

        // Round-trip through the store before committing to the new blob.
        let round_trip = async {
            let stored = self.bounded("blob-store", self.blobs.get(&new_ref)).await?;
            self.bounded("key-service", self.keys.decrypt(&new_params, &stored))
                .await
        };
        match round_trip.await {
            Ok(reopened) if ContentDigest::of(&reopened) == record.content_digest => {}
            Ok(_) => {
                self.remove_blob_best_effort(&new_ref).await;
                return Err(VaultError::integrity_violation(
                    "rotated blob failed round-trip verification",
                ));
            }
            Err(err) => {
                self.remove_blob_best_effort(&new_ref).await;
                return Err(err);
            }
        }

        let updated = match self
            .records
            .replace_encryption(
                document_id,
                new_ref.clone(),
                new_params,
                self.clock.now_unix(),
            )
            .await
        {
            Ok(updated) => updated,
            Err(err) => {
                // The record refused the swap (deleted meanwhile); the new
                // blob is an orphan.
                self.remove_blob_best_effort(&new_ref).await;
                return Err(err);
            }
        };

        self.remove_blob_best_effort(&record.storage_ref).await;
        info!(
            %document_id,
            old_key = %record.encryption_params.key_id,
            new_key = %updated.encryption_params.key_id,
            "key rotation complete"
        );
        Ok(updated)
    }

    /// Remove blobs no live record references.
    ///
    /// Covers uploads cancelled between blob write and record creation, and
    /// blob deletions that failed after a soft delete committed.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let records = self.records.list().await?;
        let live: HashSet<StorageRef> = records
            .iter()
            .filter(|record| !record.is_deleted())
            .map(|record| record.storage_ref.clone())
            .collect();

        let mut report = ReconcileReport::default();
        for storage_ref in self.bounded("blob-store", self.blobs.list_refs()).await? {
            if !live.contains(&storage_ref) {
                self.bounded("blob-store", self.blobs.delete(&storage_ref))
                    .await?;
                report.orphans_removed += 1;
            }
        }
        if report.orphans_removed > 0 {
            info!(removed = report.orphans_removed, "reconciliation removed orphaned blobs");
        }
        Ok(report)
    }

    async fn rotation_lock(&self, document_id: &DocumentId) -> Arc<Mutex<()>> {
        let mut locks = self.rotation_locks.lock().await;
        locks
            .entry(*document_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn remove_blob_best_effort(&self, storage_ref: &StorageRef) {
        if let Err(err) = self
            .bounded("blob-store", self.blobs.delete(storage_ref))
            .await
        {
            warn!(%storage_ref, error = %err, "orphan blob removal failed");
        }
    }
}
