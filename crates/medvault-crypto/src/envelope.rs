//! AEAD envelope primitives for document bytes
//!
//! AES-256-GCM with a random 96-bit nonce per encryption. The authentication
//! tag is carried separately from the ciphertext in `EncryptionParams`, so a
//! stored blob is opaque bytes and the parameters needed to reverse it live
//! only in the document record.
//!
//! # Security
//!
//! - Nonces are random and never reused under the same key
//! - Decryption fails closed: a tag mismatch yields `IntegrityViolation`
//!   and never partial plaintext

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use medvault_core::{Result, VaultError};
use tracing::warn;

/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Ciphertext plus the per-encryption parameters produced by sealing.
///
/// The key id is attached by the key service; this type carries only what
/// the cipher itself produced.
#[derive(Debug, Clone)]
pub struct SealedEnvelope {
    /// Encrypted bytes, without the trailing tag.
    pub ciphertext: Vec<u8>,
    /// Nonce used for this encryption.
    pub nonce: [u8; NONCE_LEN],
    /// Detached authentication tag.
    pub auth_tag: [u8; TAG_LEN],
}

/// Seal plaintext under a raw 256-bit key.
///
/// The tag is split off the cipher output and returned detached.
pub fn seal(key: &[u8; 32], nonce: [u8; NONCE_LEN], plaintext: &[u8]) -> Result<SealedEnvelope> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut output = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: &[],
            },
        )
        .map_err(|_| VaultError::internal("AES-GCM encryption failed"))?;

    if output.len() < TAG_LEN {
        return Err(VaultError::internal("cipher output shorter than tag"));
    }
    let tag_start = output.len() - TAG_LEN;
    let mut auth_tag = [0u8; TAG_LEN];
    auth_tag.copy_from_slice(&output[tag_start..]);
    output.truncate(tag_start);

    Ok(SealedEnvelope {
        ciphertext: output,
        nonce,
        auth_tag,
    })
}

/// Open a sealed envelope under a raw 256-bit key.
///
/// # Errors
///
/// Returns `IntegrityViolation` if the tag does not authenticate the
/// ciphertext - wrong key, corrupted bytes, or tampering. No partial
/// plaintext is ever returned.
pub fn open(
    key: &[u8; 32],
    nonce: &[u8; NONCE_LEN],
    auth_tag: &[u8; TAG_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    // Reassemble ciphertext || tag, the layout aes-gcm authenticates.
    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(auth_tag);

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: &sealed,
                aad: &[],
            },
        )
        .map_err(|_| {
            warn!(target: "medvault::security", "envelope authentication failed");
            VaultError::integrity_violation("authentication tag mismatch")
        })
}
