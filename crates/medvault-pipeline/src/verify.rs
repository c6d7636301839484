//! Verification orchestration: sign and anchor transitions
//!
//! Drives a record through `Pending -> Signed -> Verified`. The record
//! store applies each transition with a compare-and-swap on the current
//! state, so concurrent signers, or a signer racing a delete, cannot both
//! succeed; the pre-checks here only spare the losing caller the work.

use crate::pipeline::Pipeline;
use medvault_core::{
    AnchorRecord, DocumentId, DocumentRecord, LifecycleEventKind, Result, VaultError,
    VerificationState, VerifierId,
};
use medvault_crypto::Attestor;
use tracing::info;

impl Pipeline {
    /// Apply the attestor's signature: `Pending -> Signed`.
    ///
    /// The signature covers the content digest, so later re-encryption
    /// under a rotated key leaves it valid.
    pub async fn sign(
        &self,
        document_id: &DocumentId,
        attestor: &Attestor,
    ) -> Result<DocumentRecord> {
        let record = self.records.get(document_id).await?;
        if !record.state.can_sign() {
            return Err(VaultError::invalid_transition("sign", record.state));
        }

        let now = self.clock.now_unix();
        let attestation = attestor.attest(&record.content_digest, now)?;
        let signed = self
            .records
            .set_attestation(document_id, attestation, now)
            .await?;

        info!(%document_id, attestor = %attestor.id(), "document signed");
        self.emit(&signed, LifecycleEventKind::Signed).await;
        Ok(signed)
    }

    /// Anchor the digest on the ledger: `Signed -> Verified`.
    ///
    /// Idempotent on already-verified records: the existing receipt is
    /// returned and nothing is re-anchored. `Pending` records are rejected
    /// with `InvalidTransition`.
    pub async fn anchor(
        &self,
        document_id: &DocumentId,
        verifier: VerifierId,
    ) -> Result<AnchorRecord> {
        let record = self.records.get(document_id).await?;
        if record.state == VerificationState::Verified {
            return record
                .anchor
                .ok_or_else(|| VaultError::internal("verified record has no anchor"));
        }
        if !record.state.can_anchor() {
            return Err(VaultError::invalid_transition("anchor", record.state));
        }

        let receipt = self
            .bounded("ledger", self.ledger.anchor(&record.content_digest))
            .await?;
        let now = self.clock.now_unix();
        let anchor = AnchorRecord {
            anchor_ref: receipt,
            verified_by: verifier,
            verified_at: now,
        };

        match self.records.set_anchor(document_id, anchor, now).await {
            Ok(verified) => {
                info!(%document_id, "document verified");
                self.emit(&verified, LifecycleEventKind::Verified).await;
                verified
                    .anchor
                    .ok_or_else(|| VaultError::internal("verified record has no anchor"))
            }
            Err(err @ VaultError::InvalidTransition { .. }) => {
                // Lost a race. If a concurrent anchor won, honor idempotency
                // and hand back its receipt.
                let current = self.records.get(document_id).await?;
                match (current.state, current.anchor) {
                    (VerificationState::Verified, Some(anchor)) => Ok(anchor),
                    _ => Err(err),
                }
            }
            Err(other) => Err(other),
        }
    }

    /// Check a verified document's receipt against the ledger.
    pub async fn verify_anchor(&self, document_id: &DocumentId) -> Result<bool> {
        let record = self.records.get(document_id).await?;
        let anchor = record
            .anchor
            .ok_or_else(|| VaultError::invalid_transition("verify-anchor", record.state))?;
        self.bounded("ledger", self.ledger.verify(&anchor.anchor_ref))
            .await
    }
}
