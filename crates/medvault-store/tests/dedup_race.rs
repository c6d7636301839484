//! Concurrency: racing creates of byte-identical content elect one winner
//!
//! The uniqueness constraint in the record store is the dedup authority.
//! N concurrent creates with the same digest must produce exactly one
//! record, and every loser must learn the winner's document id.

use futures::future::join_all;
use medvault_core::{
    ContentDigest, DocumentId, DocumentRecord, EncryptionParams, KeyId, OriginId, OwnerId,
    StorageRef, VaultError,
};
use medvault_store::{MemoryRecordStore, RecordStore};
use std::sync::Arc;

fn record_with_digest(digest: ContentDigest, n: usize) -> DocumentRecord {
    DocumentRecord::new(
        DocumentId::new(),
        digest,
        StorageRef::new(format!("blob-{n}")),
        EncryptionParams {
            key_id: KeyId::new(format!("key-{n}")),
            nonce: [0u8; 12],
            auth_tag: [0u8; 16],
        },
        OwnerId::new("patient-race"),
        OriginId::new("hospital-race"),
        "application/pdf",
        2048,
        "contended.pdf",
        1_700_000_000,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_creates_elect_exactly_one_winner() {
    let store = Arc::new(MemoryRecordStore::new());
    let digest = ContentDigest::of(b"contended upload bytes");

    let attempts: Vec<_> = (0..16)
        .map(|n| {
            let store = Arc::clone(&store);
            let record = record_with_digest(digest, n);
            let id = record.document_id;
            tokio::spawn(async move { (id, store.create(record).await) })
        })
        .collect();

    let mut winner: Option<DocumentId> = None;
    let mut redirects = Vec::new();
    for joined in join_all(attempts).await {
        let (id, outcome) = joined.expect("create task panicked");
        match outcome {
            Ok(()) => {
                assert!(winner.is_none(), "two creates claimed the same digest");
                winner = Some(id);
            }
            Err(VaultError::DuplicateContent { existing }) => redirects.push(existing),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let winner = winner.expect("no create succeeded");
    assert_eq!(redirects.len(), 15);
    assert!(redirects.iter().all(|existing| *existing == winner));

    let stored = store.find_by_digest(&digest).await.unwrap().unwrap();
    assert_eq!(stored.document_id, winner);
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_content_does_not_contend() {
    let store = Arc::new(MemoryRecordStore::new());

    let attempts: Vec<_> = (0..8)
        .map(|n| {
            let store = Arc::clone(&store);
            let digest = ContentDigest::of(format!("unique bytes {n}").as_bytes());
            tokio::spawn(async move { store.create(record_with_digest(digest, n)).await })
        })
        .collect();

    for joined in join_all(attempts).await {
        joined.expect("create task panicked").unwrap();
    }
    assert_eq!(store.list().await.unwrap().len(), 8);
}
