//! Shared wiring for pipeline integration tests
#![allow(dead_code)]

use medvault_core::{OriginId, OwnerId, SimulatedTimeSource, TimeSource};
use medvault_crypto::{KeyService, LocalKeyring};
use medvault_pipeline::{
    EventBus, Ledger, MemoryEventBus, MemoryLedger, Pipeline, PipelineConfig, UploadRequest,
};
use medvault_store::{BlobStore, MemoryBlobStore, MemoryRecordStore, RecordStore};
use std::sync::Arc;

/// A pipeline over in-memory collaborators, with handles kept for
/// assertions.
pub struct Fixture {
    pub pipeline: Arc<Pipeline>,
    pub records: Arc<MemoryRecordStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub keys: Arc<LocalKeyring>,
    pub ledger: Arc<MemoryLedger>,
    pub bus: Arc<MemoryEventBus>,
    pub clock: SimulatedTimeSource,
}

pub fn fixture() -> Fixture {
    fixture_with(PipelineConfig::default())
}

pub fn fixture_with(config: PipelineConfig) -> Fixture {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let records = Arc::new(MemoryRecordStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let keys = Arc::new(LocalKeyring::new());
    let ledger = Arc::new(MemoryLedger::new());
    let bus = Arc::new(MemoryEventBus::new());
    let clock = SimulatedTimeSource::from_recent();

    let pipeline = Arc::new(Pipeline::new(
        Arc::clone(&records) as Arc<dyn RecordStore>,
        Arc::clone(&blobs) as Arc<dyn BlobStore>,
        Arc::clone(&keys) as Arc<dyn KeyService>,
        Arc::clone(&ledger) as Arc<dyn Ledger>,
        Arc::clone(&bus) as Arc<dyn EventBus>,
        Arc::new(clock.clone()) as Arc<dyn TimeSource>,
        config,
    ));

    Fixture {
        pipeline,
        records,
        blobs,
        keys,
        ledger,
        bus,
        clock,
    }
}

/// A well-formed PDF payload of the given total length.
pub fn pdf_bytes(len: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.7\n% medvault test document\n".to_vec();
    bytes.resize(len, b'x');
    bytes
}

pub fn upload_request(bytes: Vec<u8>) -> UploadRequest {
    UploadRequest {
        owner_id: OwnerId::new("patient-17"),
        origin_id: OriginId::new("hospital-3"),
        media_type: "application/pdf".to_string(),
        original_name: "scan.pdf".to_string(),
        bytes,
    }
}
