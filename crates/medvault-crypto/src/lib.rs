//! # MedVault Crypto - Encryption Gateway and Attestation
//!
//! Wraps document bytes in AES-256-GCM envelopes before they reach durable
//! storage, and produces attestor signatures over content digests.
//!
//! Key material lives behind the [`KeyService`] trait and never leaves it.
//! The reference [`LocalKeyring`] holds zeroized keys in memory; production
//! deployments put an external key-management service behind the same trait.
//!
//! Signatures cover the content digest, not the ciphertext, so re-encrypting
//! a document under a rotated key never invalidates an existing signature.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// AEAD envelope primitives (seal/open with explicit nonce and tag)
pub mod envelope;

/// Key service trait and the in-memory keyring reference implementation
pub mod keyring;

/// Ed25519 attestor signing over content digests
pub mod attest;

pub use attest::{verify_attestation, Attestor};
pub use envelope::SealedEnvelope;
pub use keyring::{KeyService, LocalKeyring};
