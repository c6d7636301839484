//! Key service collaborator and the in-memory keyring
//!
//! The pipeline never touches key material. It hands plaintext to a
//! [`KeyService`] and gets back ciphertext plus the `EncryptionParams`
//! needed to reverse it; the key itself stays behind the trait.

use crate::envelope::{self, NONCE_LEN};
use async_trait::async_trait;
use medvault_core::{EncryptionParams, KeyId, Result, VaultError};
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;
use zeroize::Zeroizing;

/// External key-management collaborator.
///
/// Production deployments back this with a KMS; tests and single-node
/// deployments use [`LocalKeyring`].
#[async_trait]
pub trait KeyService: Send + Sync {
    /// Encrypt plaintext under `key_id`, or under a freshly minted key when
    /// `None`. Returns the ciphertext and the parameters needed to decrypt.
    async fn encrypt(
        &self,
        key_id: Option<&KeyId>,
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, EncryptionParams)>;

    /// Decrypt ciphertext under the given parameters.
    ///
    /// Fails closed with `IntegrityViolation` on tag mismatch.
    async fn decrypt(&self, params: &EncryptionParams, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Mint a new key for rotation and return its id.
    async fn mint_key(&self) -> Result<KeyId>;
}

/// In-memory keyring holding AES-256 keys, zeroized on drop.
#[derive(Default)]
pub struct LocalKeyring {
    keys: RwLock<HashMap<KeyId, Zeroizing<[u8; 32]>>>,
}

impl LocalKeyring {
    /// Create an empty keyring.
    pub fn new() -> Self {
        Self::default()
    }

    fn generate_key() -> (KeyId, Zeroizing<[u8; 32]>) {
        let mut material = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut material[..]);

        // Key ids are fingerprints, not key material: a domain-separated
        // BLAKE3 hash truncated to 16 hex chars.
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"medvault-key-fingerprint-v1:");
        hasher.update(material.as_ref());
        let fingerprint = hex::encode(&hasher.finalize().as_bytes()[..8]);

        (KeyId::new(format!("local-{fingerprint}")), material)
    }

    fn lookup(&self, key_id: &KeyId) -> Result<Zeroizing<[u8; 32]>> {
        let keys = self
            .keys
            .read()
            .map_err(|_| VaultError::internal("keyring lock poisoned"))?;
        keys.get(key_id)
            .cloned()
            .ok_or_else(|| VaultError::not_found(format!("key {key_id}")))
    }

    fn insert(&self, key_id: KeyId, material: Zeroizing<[u8; 32]>) -> Result<()> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| VaultError::internal("keyring lock poisoned"))?;
        keys.insert(key_id, material);
        Ok(())
    }
}

#[async_trait]
impl KeyService for LocalKeyring {
    async fn encrypt(
        &self,
        key_id: Option<&KeyId>,
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, EncryptionParams)> {
        let (key_id, material) = match key_id {
            Some(id) => (id.clone(), self.lookup(id)?),
            None => {
                let (id, material) = Self::generate_key();
                self.insert(id.clone(), material.clone())?;
                debug!(key_id = %id, "minted encryption key");
                (id, material)
            }
        };

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let sealed = envelope::seal(&material, nonce, plaintext)?;
        let params = EncryptionParams {
            key_id,
            nonce: sealed.nonce,
            auth_tag: sealed.auth_tag,
        };
        Ok((sealed.ciphertext, params))
    }

    async fn decrypt(&self, params: &EncryptionParams, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let material = self.lookup(&params.key_id)?;
        envelope::open(&material, &params.nonce, &params.auth_tag, ciphertext)
    }

    async fn mint_key(&self) -> Result<KeyId> {
        let (id, material) = Self::generate_key();
        self.insert(id.clone(), material)?;
        debug!(key_id = %id, "minted rotation key");
        Ok(id)
    }
}
