//! Lifecycle events published on every document state transition
//!
//! Events are immutable append-only facts. Exactly one is emitted per
//! transition, after the state mutation has committed, never before.
//! Delivery is at-least-once; consumers deduplicate on `event_id`.

use crate::digest::ContentDigest;
use crate::identifiers::{DocumentId, EventId, OwnerId};
use crate::record::DocumentRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The transition an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    /// Document validated, encrypted, stored, record created.
    Uploaded,
    /// Attestor signature recorded.
    Signed,
    /// Ledger anchor receipt recorded.
    Verified,
    /// Document soft-deleted.
    Deleted,
}

impl LifecycleEventKind {
    /// Stable lowercase name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Signed => "signed",
            Self::Verified => "verified",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for LifecycleEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable fact describing a document state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Unique per published event; consumer deduplication key.
    pub event_id: EventId,
    /// Document the transition applies to.
    pub document_id: DocumentId,
    /// Which transition happened.
    pub kind: LifecycleEventKind,
    /// Unix seconds at which the transition committed.
    pub timestamp: u64,
    /// Content digest of the document.
    pub content_digest: ContentDigest,
    /// Subject the document belongs to.
    pub owner_id: OwnerId,
}

impl LifecycleEvent {
    /// Build an event for a committed transition on `record`.
    pub fn for_record(record: &DocumentRecord, kind: LifecycleEventKind, timestamp: u64) -> Self {
        Self {
            event_id: EventId::new(),
            document_id: record.document_id,
            kind,
            timestamp,
            content_digest: record.content_digest,
            owner_id: record.owner_id.clone(),
        }
    }
}
