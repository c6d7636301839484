//! Advisory digest-to-document index
//!
//! A read-side cache in front of the record store so the upload path can
//! answer "have we seen these bytes" without a ledger round-trip. It may be
//! stale or incomplete at any moment; the record store's uniqueness
//! constraint is the authority, and a miss here proves nothing.

use medvault_core::{ContentDigest, DocumentId};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory digest index. Cheap to clone the handle, shared across tasks.
#[derive(Default)]
pub struct ContentIndex {
    entries: RwLock<HashMap<ContentDigest, DocumentId>>,
}

impl ContentIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast-path lookup. `None` means "unknown here", not "not stored".
    pub fn lookup(&self, digest: &ContentDigest) -> Option<DocumentId> {
        self.entries.read().ok()?.get(digest).copied()
    }

    /// Remember a digest-to-document mapping.
    pub fn insert(&self, digest: ContentDigest, document_id: DocumentId) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(digest, document_id);
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
