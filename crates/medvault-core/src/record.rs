//! Document records and the verification state machine
//!
//! A `DocumentRecord` is the unit of truth for one logical document: its
//! content digest, where the encrypted blob lives, the parameters needed to
//! decrypt it, and how far through verification it has progressed.

use crate::digest::ContentDigest;
use crate::identifiers::{
    AnchorRef, AttestorId, DocumentId, KeyId, OriginId, OwnerId, StorageRef, VerifierId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Verification progress of a document.
///
/// Transitions are monotonic and one-directional, except `Deleted`, which is
/// reachable from every state and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    /// Uploaded and stored, awaiting an attestor signature.
    Pending,
    /// Signed by an attestor over the content digest.
    Signed,
    /// Anchored on the external ledger with a receipt.
    Verified,
    /// Soft-deleted. The record remains for audit; the blob is gone.
    Deleted,
}

impl VerificationState {
    /// Whether a sign transition may be applied from this state.
    pub fn can_sign(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether an anchor transition may be applied from this state.
    pub fn can_anchor(self) -> bool {
        matches!(self, Self::Signed)
    }

    /// Whether this state accepts no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Deleted)
    }

    /// Stable lowercase name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Signed => "signed",
            Self::Verified => "verified",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters required to decrypt a stored blob.
///
/// Sufficient and necessary to reverse the encryption together with the key
/// service; never stored alongside plaintext. The auth tag is kept separate
/// from the ciphertext so tampering with either is detectable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionParams {
    /// Reference into the external key service.
    pub key_id: KeyId,
    /// GCM nonce, random per encryption (96-bit).
    pub nonce: [u8; 12],
    /// GCM authentication tag (128-bit).
    pub auth_tag: [u8; 16],
}

/// Signature block recorded when a document becomes `Signed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// Signature over the content digest (not the ciphertext).
    pub signature: Vec<u8>,
    /// Party that produced the signature.
    pub signed_by: AttestorId,
    /// Unix seconds at signing time.
    pub signed_at: u64,
}

/// Ledger receipt block recorded when a document becomes `Verified`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    /// Opaque receipt reference from the ledger.
    pub anchor_ref: AnchorRef,
    /// Party that submitted the anchor.
    pub verified_by: VerifierId,
    /// Unix seconds at anchoring time.
    pub verified_at: u64,
}

/// Metadata ledger entry for one logical document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Unique identifier, assigned at creation, immutable.
    pub document_id: DocumentId,
    /// Deduplication key: digest of the original plaintext bytes.
    pub content_digest: ContentDigest,
    /// Locator of the encrypted blob. Replaced only by key rotation.
    pub storage_ref: StorageRef,
    /// Decryption parameters. Replaced only by key rotation.
    pub encryption_params: EncryptionParams,
    /// Subject the document belongs to.
    pub owner_id: OwnerId,
    /// Party that submitted the document.
    pub origin_id: OriginId,
    /// Declared media type. Descriptive, not trust-bearing.
    pub media_type: String,
    /// Plaintext size in bytes.
    pub byte_size: u64,
    /// File name as submitted. Descriptive, not trust-bearing.
    pub original_name: String,
    /// Verification progress.
    pub state: VerificationState,
    /// Present once state has reached `Signed`.
    pub attestation: Option<Attestation>,
    /// Present once state has reached `Verified`.
    pub anchor: Option<AnchorRecord>,
    /// Unix seconds at creation.
    pub created_at: u64,
    /// Unix seconds of the last mutation.
    pub updated_at: u64,
}

impl DocumentRecord {
    /// Build a fresh record in `Pending` state.
    ///
    /// Called only after the blob has been encrypted and stored, so a record
    /// never exists without a retrievable, decryptable blob.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        document_id: DocumentId,
        content_digest: ContentDigest,
        storage_ref: StorageRef,
        encryption_params: EncryptionParams,
        owner_id: OwnerId,
        origin_id: OriginId,
        media_type: impl Into<String>,
        byte_size: u64,
        original_name: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            document_id,
            content_digest,
            storage_ref,
            encryption_params,
            owner_id,
            origin_id,
            media_type: media_type.into(),
            byte_size,
            original_name: original_name.into(),
            state: VerificationState::Pending,
            attestation: None,
            anchor: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// Whether the blob behind this record is still expected to exist.
    pub fn is_deleted(&self) -> bool {
        self.state == VerificationState::Deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DocumentRecord {
        DocumentRecord::new(
            DocumentId::new(),
            ContentDigest::of(b"scan bytes"),
            StorageRef::new("blob-1"),
            EncryptionParams {
                key_id: KeyId::new("key-1"),
                nonce: [0u8; 12],
                auth_tag: [0u8; 16],
            },
            OwnerId::new("patient-1"),
            OriginId::new("hospital-9"),
            "application/pdf",
            1024,
            "scan.pdf",
            1_700_000_000,
        )
    }

    #[test]
    fn new_records_start_pending() {
        let rec = record();
        assert_eq!(rec.state, VerificationState::Pending);
        assert!(rec.attestation.is_none());
        assert!(rec.anchor.is_none());
        assert_eq!(rec.created_at, rec.updated_at);
    }

    #[test]
    fn transition_predicates() {
        assert!(VerificationState::Pending.can_sign());
        assert!(!VerificationState::Signed.can_sign());
        assert!(VerificationState::Signed.can_anchor());
        assert!(!VerificationState::Pending.can_anchor());
        assert!(!VerificationState::Verified.can_anchor());
        assert!(VerificationState::Deleted.is_terminal());
        assert!(!VerificationState::Verified.is_terminal());
    }

    #[test]
    fn state_serializes_lowercase() {
        let json = serde_json::to_string(&VerificationState::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
