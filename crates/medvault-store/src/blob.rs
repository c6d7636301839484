//! Blob store collaborator and backends
//!
//! Blobs are always ciphertext by the time they reach a store; nothing in
//! this module interprets the bytes. References are minted by the store and
//! opaque to every caller.

use async_trait::async_trait;
use medvault_core::{Result, StorageRef, VaultError};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Occupancy counters for a blob store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlobStoreStats {
    /// Number of stored blobs.
    pub blob_count: u64,
    /// Total stored bytes.
    pub total_bytes: u64,
}

/// External blob storage collaborator.
///
/// Durable once `put` acknowledges. `get`/`delete` on an unknown reference
/// return `NotFound`; a read racing a delete may observe that, which callers
/// treat as the document being gone, not as a crash.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist ciphertext and return its locator.
    async fn put(&self, ciphertext: Vec<u8>) -> Result<StorageRef>;

    /// Retrieve ciphertext by locator.
    async fn get(&self, storage_ref: &StorageRef) -> Result<Vec<u8>>;

    /// Remove a blob. Removing an already-absent blob is not an error.
    async fn delete(&self, storage_ref: &StorageRef) -> Result<()>;

    /// List every stored reference. Used by the reconciliation sweep.
    async fn list_refs(&self) -> Result<Vec<StorageRef>>;

    /// Occupancy counters.
    async fn stats(&self) -> Result<BlobStoreStats>;
}

/// In-memory blob store for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<StorageRef, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, ciphertext: Vec<u8>) -> Result<StorageRef> {
        let storage_ref = StorageRef::new(format!("mem-{}", Uuid::new_v4().simple()));
        self.blobs
            .write()
            .await
            .insert(storage_ref.clone(), ciphertext);
        Ok(storage_ref)
    }

    async fn get(&self, storage_ref: &StorageRef) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(storage_ref)
            .cloned()
            .ok_or_else(|| VaultError::not_found(format!("blob {storage_ref}")))
    }

    async fn delete(&self, storage_ref: &StorageRef) -> Result<()> {
        self.blobs.write().await.remove(storage_ref);
        Ok(())
    }

    async fn list_refs(&self) -> Result<Vec<StorageRef>> {
        Ok(self.blobs.read().await.keys().cloned().collect())
    }

    async fn stats(&self) -> Result<BlobStoreStats> {
        let blobs = self.blobs.read().await;
        Ok(BlobStoreStats {
            blob_count: blobs.len() as u64,
            total_bytes: blobs.values().map(|v| v.len() as u64).sum(),
        })
    }
}

/// Local-filesystem blob store.
///
/// Lays blobs out as `objects/<first two chars>/<ref>` under the base
/// directory. Writes go through a temp file and rename so a crashed `put`
/// never leaves a half-written blob behind.
pub struct FsBlobStore {
    objects_dir: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at `base_dir`, creating `objects/` if missing.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let objects_dir = base_dir.into().join("objects");
        fs::create_dir_all(&objects_dir)
            .map_err(|e| VaultError::upstream("blob-store", format!("create objects dir: {e}")))?;
        Ok(Self { objects_dir })
    }

    fn object_path(&self, storage_ref: &StorageRef) -> Result<PathBuf> {
        let name = storage_ref.as_str();
        // Refs are minted by this store; anything else is a caller bug.
        if name.len() < 2 || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(VaultError::internal(format!(
                "malformed storage ref {storage_ref}"
            )));
        }
        Ok(self.objects_dir.join(&name[..2]).join(name))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, ciphertext: Vec<u8>) -> Result<StorageRef> {
        let storage_ref = StorageRef::new(Uuid::new_v4().simple().to_string());
        let path = self.object_path(&storage_ref)?;
        let dir = path
            .parent()
            .ok_or_else(|| VaultError::internal("object path has no parent"))?;
        fs::create_dir_all(dir)
            .map_err(|e| VaultError::upstream("blob-store", format!("create shard dir: {e}")))?;

        let tmp = path.with_extension("tmp");
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&ciphertext)?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        };
        write().map_err(|e| VaultError::upstream("blob-store", format!("write blob: {e}")))?;

        debug!(%storage_ref, bytes = ciphertext.len(), "stored blob");
        Ok(storage_ref)
    }

    async fn get(&self, storage_ref: &StorageRef) -> Result<Vec<u8>> {
        let path = self.object_path(storage_ref)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VaultError::not_found(format!("blob {storage_ref}")))
            }
            Err(e) => Err(VaultError::upstream(
                "blob-store",
                format!("read blob: {e}"),
            )),
        }
    }

    async fn delete(&self, storage_ref: &StorageRef) -> Result<()> {
        let path = self.object_path(storage_ref)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::upstream(
                "blob-store",
                format!("delete blob: {e}"),
            )),
        }
    }

    async fn list_refs(&self) -> Result<Vec<StorageRef>> {
        let mut refs = Vec::new();
        let shards = fs::read_dir(&self.objects_dir)
            .map_err(|e| VaultError::upstream("blob-store", format!("list objects dir: {e}")))?;
        for shard in shards {
            let shard =
                shard.map_err(|e| VaultError::upstream("blob-store", format!("list shard: {e}")))?;
            if !shard.path().is_dir() {
                continue;
            }
            let entries = fs::read_dir(shard.path())
                .map_err(|e| VaultError::upstream("blob-store", format!("list shard: {e}")))?;
            for entry in entries {
                let entry = entry
                    .map_err(|e| VaultError::upstream("blob-store", format!("list entry: {e}")))?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.ends_with(".tmp") {
                    continue;
                }
                refs.push(StorageRef::new(name));
            }
        }
        Ok(refs)
    }

    async fn stats(&self) -> Result<BlobStoreStats> {
        let refs = self.list_refs().await?;
        let mut total_bytes = 0u64;
        for storage_ref in &refs {
            let path = self.object_path(storage_ref)?;
            if let Ok(meta) = fs::metadata(&path) {
                total_bytes += meta.len();
            }
        }
        Ok(BlobStoreStats {
            blob_count: refs.len() as u64,
            total_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exercise_store(store: &dyn BlobStore) {
        let storage_ref = store.put(vec![1, 2, 3, 4]).await.unwrap();
        assert_eq!(store.get(&storage_ref).await.unwrap(), vec![1, 2, 3, 4]);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.blob_count, 1);
        assert_eq!(stats.total_bytes, 4);

        store.delete(&storage_ref).await.unwrap();
        assert!(matches!(
            store.get(&storage_ref).await.unwrap_err(),
            VaultError::NotFound { .. }
        ));
        // Deleting again stays quiet.
        store.delete(&storage_ref).await.unwrap();
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        exercise_store(&MemoryBlobStore::new()).await;
    }

    #[tokio::test]
    async fn fs_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn fs_store_lists_stored_refs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();
        let a = store.put(vec![1]).await.unwrap();
        let b = store.put(vec![2]).await.unwrap();
        let mut refs = store.list_refs().await.unwrap();
        refs.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(refs, expected);
    }

    #[tokio::test]
    async fn fs_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let storage_ref = {
            let store = FsBlobStore::new(dir.path()).unwrap();
            store.put(vec![9, 9, 9]).await.unwrap()
        };
        let reopened = FsBlobStore::new(dir.path()).unwrap();
        assert_eq!(reopened.get(&storage_ref).await.unwrap(), vec![9, 9, 9]);
    }

    #[tokio::test]
    async fn malformed_ref_is_rejected_not_traversed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();
        let err = store
            .get(&StorageRef::new("../../etc/passwd"))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Internal { .. }));
    }
}
