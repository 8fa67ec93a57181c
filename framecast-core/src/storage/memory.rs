//! In-memory object store for tests and development mode.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{ObjectEntry, ObjectStore, StorageError};

/// Object store backed by a shared in-memory map.
///
/// Upserts, listing, and public URLs behave like the filesystem store so
/// pipeline tests can assert idempotence without touching disk. Clones
/// share the same underlying map.
#[derive(Clone)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
    public_base_url: String,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            public_base_url: "memory://artifacts".to_string(),
        }
    }

    /// Raw object bytes, for test assertions.
    pub async fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.read().await.get(key).cloned()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StorageError> {
        let objects = self.objects.read().await;
        let mut entries: Vec<ObjectEntry> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, bytes)| ObjectEntry {
                key: key.clone(),
                size: bytes.len() as u64,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_replaces_object() {
        let store = MemoryObjectStore::new();

        store
            .put("sprint-1/day-1.mp4", Bytes::from_static(b"v1"))
            .await
            .unwrap();
        store
            .put("sprint-1/day-1.mp4", Bytes::from_static(b"v2-bigger"))
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.object("sprint-1/day-1.mp4").await.unwrap(),
            Bytes::from_static(b"v2-bigger")
        );
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let store = MemoryObjectStore::new();
        store
            .put("sprint-1/day-1.mp4", Bytes::from_static(b"a"))
            .await
            .unwrap();
        store
            .put("sprint-1/day-2.mp4", Bytes::from_static(b"b"))
            .await
            .unwrap();
        store
            .put("sprint-2/day-1.mp4", Bytes::from_static(b"c"))
            .await
            .unwrap();

        let entries = store.list("sprint-1/").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "sprint-1/day-1.mp4");
        assert_eq!(entries[1].key, "sprint-1/day-2.mp4");
    }

    #[test]
    fn test_default_matches_new() {
        assert_eq!(
            MemoryObjectStore::default().public_url("sprint-1/day-1.mp4"),
            MemoryObjectStore::new().public_url("sprint-1/day-1.mp4")
        );
    }

    #[tokio::test]
    async fn test_clones_share_objects() {
        let store = MemoryObjectStore::new();
        let clone = store.clone();

        store
            .put("sprint-1/day-1.mp4", Bytes::from_static(b"shared"))
            .await
            .unwrap();

        assert!(clone.exists("sprint-1/day-1.mp4").await.unwrap());
    }
}
