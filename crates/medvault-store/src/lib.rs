//! # MedVault Store - Blobs and the Record Ledger
//!
//! Two layers of persistence for the document pipeline:
//!
//! - [`BlobStore`]: opaque ciphertext under opaque references. Assumed
//!   durable once `put` acknowledges. In-memory and local-filesystem
//!   implementations are provided; production object storage goes behind
//!   the same trait.
//! - [`RecordStore`]: the metadata/state-machine ledger, one record per
//!   logical document. This is where the content-digest uniqueness
//!   constraint lives - the actual dedup enforcement point under
//!   concurrency - and where state transitions are applied with
//!   compare-and-swap semantics.
//!
//! The [`ContentIndex`] is a read-side optimization over the record store,
//! never an invariant enforcer.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Blob store trait and backends
pub mod blob;

/// Advisory digest-to-document index
pub mod index;

/// Document record ledger with uniqueness and CAS transitions
pub mod records;

pub use blob::{BlobStore, BlobStoreStats, FsBlobStore, MemoryBlobStore};
pub use index::ContentIndex;
pub use records::{MemoryRecordStore, RecordStore};
