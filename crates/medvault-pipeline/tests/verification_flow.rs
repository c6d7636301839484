//! Verification state machine: sign, anchor, delete, and their events

mod common;

use common::{fixture, pdf_bytes, upload_request};
use medvault_core::{
    AttestorId, LifecycleEventKind, VaultError, VerificationState, VerifierId,
};
use medvault_crypto::{verify_attestation, Attestor};
use medvault_pipeline::{UploadOutcome, UploadReceipt};
use medvault_store::{BlobStore, RecordStore};

async fn uploaded(fx: &common::Fixture) -> UploadReceipt {
    match fx
        .pipeline
        .upload(upload_request(pdf_bytes(8 * 1024)))
        .await
        .unwrap()
    {
        UploadOutcome::Created(receipt) => receipt,
        other => panic!("expected created, got {other:?}"),
    }
}

#[tokio::test]
async fn sign_then_anchor_reaches_verified_with_receipt() {
    let fx = fixture();
    let receipt = uploaded(&fx).await;
    let attestor = Attestor::generate(AttestorId::new("dr-mensah"));

    let signed = fx.pipeline.sign(&receipt.document_id, &attestor).await.unwrap();
    assert_eq!(signed.state, VerificationState::Signed);
    let attestation = signed.attestation.clone().expect("attestation recorded");
    assert_eq!(attestation.signed_by, AttestorId::new("dr-mensah"));

    let anchor = fx
        .pipeline
        .anchor(&receipt.document_id, VerifierId::new("ledger-gw"))
        .await
        .unwrap();
    assert!(!anchor.anchor_ref.as_str().is_empty());

    let record = fx.records.get(&receipt.document_id).await.unwrap();
    assert_eq!(record.state, VerificationState::Verified);

    // Anchoring again is idempotent: same receipt, no new ledger entry.
    let again = fx
        .pipeline
        .anchor(&receipt.document_id, VerifierId::new("ledger-gw"))
        .await
        .unwrap();
    assert_eq!(again.anchor_ref, anchor.anchor_ref);
    assert_eq!(fx.ledger.receipt_count().await, 1);

    // The receipt verifies against the ledger.
    assert!(fx.pipeline.verify_anchor(&receipt.document_id).await.unwrap());

    let kinds: Vec<_> = fx.bus.published().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            LifecycleEventKind::Uploaded,
            LifecycleEventKind::Signed,
            LifecycleEventKind::Verified,
        ]
    );
}

#[tokio::test]
async fn anchor_without_signature_is_an_invalid_transition() {
    let fx = fixture();
    let receipt = uploaded(&fx).await;

    let err = fx
        .pipeline
        .anchor(&receipt.document_id, VerifierId::new("ledger-gw"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        VaultError::invalid_transition("anchor", VerificationState::Pending)
    );

    // State unchanged, nothing anchored, no event emitted.
    let record = fx.records.get(&receipt.document_id).await.unwrap();
    assert_eq!(record.state, VerificationState::Pending);
    assert_eq!(fx.ledger.receipt_count().await, 0);
    assert_eq!(fx.bus.published().len(), 1);
}

#[tokio::test]
async fn signing_twice_is_an_invalid_transition() {
    let fx = fixture();
    let receipt = uploaded(&fx).await;
    let attestor = Attestor::generate(AttestorId::new("dr-a"));

    fx.pipeline.sign(&receipt.document_id, &attestor).await.unwrap();
    let err = fx
        .pipeline
        .sign(&receipt.document_id, &attestor)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        VaultError::invalid_transition("sign", VerificationState::Signed)
    );
}

#[tokio::test]
async fn signature_covers_the_content_digest() {
    let fx = fixture();
    let receipt = uploaded(&fx).await;
    let attestor = Attestor::generate(AttestorId::new("dr-a"));

    let signed = fx.pipeline.sign(&receipt.document_id, &attestor).await.unwrap();
    let attestation = signed.attestation.expect("attestation recorded");
    verify_attestation(
        &attestor.verifying_key(),
        &receipt.content_digest,
        &attestation.signature,
    )
    .unwrap();
}

#[tokio::test]
async fn delete_keeps_the_record_and_drops_the_blob() {
    let fx = fixture();
    let receipt = uploaded(&fx).await;

    fx.pipeline.delete(&receipt.document_id).await.unwrap();

    // Record retained for audit, blob gone.
    let record = fx.records.get(&receipt.document_id).await.unwrap();
    assert_eq!(record.state, VerificationState::Deleted);
    assert_eq!(fx.blobs.stats().await.unwrap().blob_count, 0);

    // Reads now miss, and further transitions are rejected.
    assert!(matches!(
        fx.pipeline.download(&receipt.document_id).await.unwrap_err(),
        VaultError::NotFound { .. }
    ));
    let attestor = Attestor::generate(AttestorId::new("dr-late"));
    assert_eq!(
        fx.pipeline
            .sign(&receipt.document_id, &attestor)
            .await
            .unwrap_err(),
        VaultError::invalid_transition("sign", VerificationState::Deleted)
    );

    let kinds: Vec<_> = fx.bus.published().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![LifecycleEventKind::Uploaded, LifecycleEventKind::Deleted]
    );
}

#[tokio::test]
async fn delete_is_reachable_from_verified() {
    let fx = fixture();
    let receipt = uploaded(&fx).await;
    let attestor = Attestor::generate(AttestorId::new("dr-a"));

    fx.pipeline.sign(&receipt.document_id, &attestor).await.unwrap();
    fx.pipeline
        .anchor(&receipt.document_id, VerifierId::new("ledger-gw"))
        .await
        .unwrap();
    fx.pipeline.delete(&receipt.document_id).await.unwrap();

    let record = fx.records.get(&receipt.document_id).await.unwrap();
    assert_eq!(record.state, VerificationState::Deleted);
    // The attestation and anchor history survive the delete.
    assert!(record.attestation.is_some());
    assert!(record.anchor.is_some());
}

#[tokio::test]
async fn verify_anchor_requires_an_anchor() {
    let fx = fixture();
    let receipt = uploaded(&fx).await;
    let err = fx
        .pipeline
        .verify_anchor(&receipt.document_id)
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::InvalidTransition { .. }));
}

#[tokio::test]
async fn every_event_is_unique_per_transition() {
    let fx = fixture();
    let receipt = uploaded(&fx).await;
    let attestor = Attestor::generate(AttestorId::new("dr-a"));
    fx.pipeline.sign(&receipt.document_id, &attestor).await.unwrap();
    fx.pipeline
        .anchor(&receipt.document_id, VerifierId::new("ledger-gw"))
        .await
        .unwrap();

    let events = fx.bus.published();
    assert_eq!(events.len(), 3);
    let mut ids: Vec<_> = events.iter().map(|e| e.event_id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3, "event ids must be unique for deduplication");
    assert!(events.iter().all(|e| e.document_id == receipt.document_id));
}
