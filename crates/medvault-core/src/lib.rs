//! # MedVault Core - Foundation Types
//!
//! Foundational types for the document integrity pipeline: identifiers,
//! content digests, the document record and its verification state machine,
//! lifecycle events, and the unified error type.
//!
//! This crate is pure data and pure functions. It holds no I/O, no async
//! execution, and no collaborator handles:
//! - YES identifier newtypes and the content digest
//! - YES the `DocumentRecord` data model and state-machine rules
//! - YES lifecycle event types
//! - YES the unified `VaultError` enum
//! - NO blob or record storage (that's `medvault-store`)
//! - NO encryption or signing (that's `medvault-crypto`)
//! - NO orchestration (that's `medvault-pipeline`)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Identifier newtypes for documents, parties, and opaque references
pub mod identifiers;

/// Content digest computation and rendering
pub mod digest;

/// Document record, encryption parameters, and verification states
pub mod record;

/// Lifecycle events published on every state transition
pub mod event;

/// Unified error handling
pub mod error;

/// Injectable time sources for deterministic testing
pub mod time;

pub use digest::ContentDigest;
pub use error::{Result, VaultError};
pub use event::{LifecycleEvent, LifecycleEventKind};
pub use identifiers::{
    AnchorRef, AttestorId, DocumentId, EventId, KeyId, OriginId, OwnerId, StorageRef, VerifierId,
};
pub use record::{AnchorRecord, Attestation, DocumentRecord, EncryptionParams, VerificationState};
pub use time::{SimulatedTimeSource, SystemTimeSource, TimeSource};
