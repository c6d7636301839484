//! # MedVault Pipeline - Document Integrity Orchestration
//!
//! Drives an uploaded artifact through the integrity pipeline:
//!
//! ```text
//! validate -> digest -> dedup check -> encrypt -> store blob
//!          -> create record -> [async] sign -> anchor
//! ```
//!
//! with a lifecycle event published after every committed transition.
//!
//! The [`Pipeline`] struct owns explicit handles to its collaborators
//! (blob store, key service, ledger, event bus, record store, clock); there
//! is no ambient global state. Every collaborator call is bounded by a
//! configured timeout, and a timeout is a retryable failure, never a silent
//! success.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Pipeline configuration and retry policy
pub mod config;

/// Content validation: size ceiling, magic-number checks
pub mod validate;

/// Anchoring ledger collaborator
pub mod ledger;

/// Event bus collaborator and in-memory implementation
pub mod bus;

/// Lifecycle event publisher with bounded backoff retry
pub mod publisher;

/// Upload, download, delete, rotation, reconciliation
pub mod pipeline;

/// Verification orchestration: sign and anchor transitions
pub mod verify;

pub use bus::{EventBus, MemoryEventBus, LIFECYCLE_TOPIC};
pub use config::{PipelineConfig, RetryPolicy};
pub use ledger::{Ledger, MemoryLedger};
pub use pipeline::{Pipeline, ReconcileReport, UploadOutcome, UploadReceipt, UploadRequest};
pub use publisher::{EventPublisher, PublisherStats};
pub use validate::validate;
