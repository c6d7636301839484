//! Attestor signing over content digests
//!
//! The signature covers the content digest, never the ciphertext, so key
//! rotation cannot invalidate it. The signed payload is a bincode-encoded
//! structure with a versioned context string for domain separation.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use medvault_core::{Attestation, AttestorId, ContentDigest, Result, VaultError};
use rand::rngs::OsRng;
use serde::Serialize;
use tracing::warn;

const SIGNING_CONTEXT: &str = "medvault-attest-v1";

#[derive(Serialize)]
struct SigningPayload<'a> {
    context: &'a str,
    digest: &'a [u8; 32],
}

fn signing_payload(digest: &ContentDigest) -> Result<Vec<u8>> {
    bincode::serialize(&SigningPayload {
        context: SIGNING_CONTEXT,
        digest: digest.as_bytes(),
    })
    .map_err(|e| VaultError::internal(format!("failed to encode signing payload: {e}")))
}

/// A signing party holding an Ed25519 key.
pub struct Attestor {
    id: AttestorId,
    signing_key: SigningKey,
}

impl Attestor {
    /// Generate an attestor with a fresh random key.
    pub fn generate(id: AttestorId) -> Self {
        Self {
            id,
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Build an attestor from a fixed 32-byte seed. Test use.
    pub fn from_seed(id: AttestorId, seed: [u8; 32]) -> Self {
        Self {
            id,
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// This attestor's identifier.
    pub fn id(&self) -> &AttestorId {
        &self.id
    }

    /// Public key for signature verification.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign a content digest, producing the attestation block for a record.
    pub fn attest(&self, digest: &ContentDigest, signed_at: u64) -> Result<Attestation> {
        let payload = signing_payload(digest)?;
        let signature = self.signing_key.sign(&payload);
        Ok(Attestation {
            signature: signature.to_bytes().to_vec(),
            signed_by: self.id.clone(),
            signed_at,
        })
    }
}

/// Verify an attestor signature over a content digest.
///
/// # Errors
///
/// Returns `IntegrityViolation` when the signature is malformed or does not
/// verify against the digest under the given key.
pub fn verify_attestation(
    verifying_key: &VerifyingKey,
    digest: &ContentDigest,
    signature: &[u8],
) -> Result<()> {
    let signature = Signature::from_slice(signature).map_err(|_| {
        warn!(target: "medvault::security", "malformed attestor signature");
        VaultError::integrity_violation("malformed attestor signature")
    })?;
    let payload = signing_payload(digest)?;
    verifying_key.verify(&payload, &signature).map_err(|_| {
        warn!(target: "medvault::security", digest = %digest, "attestor signature rejected");
        VaultError::integrity_violation("attestor signature does not match digest")
    })
}
