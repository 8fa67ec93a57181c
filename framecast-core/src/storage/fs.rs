//! Filesystem-backed object store.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use super::{ObjectEntry, ObjectStore, StorageError};

/// Object store rooted at a local directory, serving public URLs from a
/// configured base.
///
/// Keys map directly to relative paths under the root, so the directory
/// can be fronted by any static file server.
pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resolves a key to its path under the root.
    ///
    /// Every key component must be a normal path segment; absolute keys
    /// and `.`/`..` components are rejected so no key can address a
    /// location outside the root.
    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let rel = Path::new(key);
        let escapes = rel.is_absolute()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(StorageError::Backend {
                reason: format!("key {key} escapes the storage root"),
            });
        }
        Ok(self.root.join(rel))
    }

    fn collect_entries<'a>(
        &'a self,
        dir: PathBuf,
        prefix: &'a str,
        entries: &'a mut Vec<ObjectEntry>,
    ) -> futures::future::BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            let mut read_dir = match fs::read_dir(&dir).await {
                Ok(read_dir) => read_dir,
                // A missing prefix directory just means no matches
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = read_dir.next_entry().await? {
                let path = entry.path();
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    self.collect_entries(path, prefix, entries).await?;
                } else if let Some(key) = relative_key(&self.root, &path) {
                    if key.starts_with(prefix) {
                        entries.push(ObjectEntry {
                            key,
                            size: metadata.len(),
                        });
                    }
                }
            }
            Ok(())
        })
    }
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        // fs::write truncates an existing file, giving upsert semantics
        fs::write(&path, &bytes).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.object_path(key)?.exists())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StorageError> {
        let mut entries = Vec::new();
        self.collect_entries(self.root.clone(), prefix, &mut entries)
            .await?;
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.object_path(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_put_and_list_round_trip() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "https://cdn.example.com/videos");

        store
            .put("sprint-1/day-1.mp4", Bytes::from_static(b"video-bytes"))
            .await
            .unwrap();

        assert!(store.exists("sprint-1/day-1.mp4").await.unwrap());
        assert!(!store.exists("sprint-1/day-2.mp4").await.unwrap());

        let entries = store.list("sprint-1/").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "sprint-1/day-1.mp4");
        assert_eq!(entries[0].size, 11);
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_object() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "https://cdn.example.com/videos");

        store
            .put("sprint-1/day-1.mp4", Bytes::from_static(b"first"))
            .await
            .unwrap();
        store
            .put("sprint-1/day-1.mp4", Bytes::from_static(b"second-longer"))
            .await
            .unwrap();

        let entries = store.list("sprint-1/").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].size, 13);
    }

    #[tokio::test]
    async fn test_escaping_keys_rejected() {
        let parent = tempdir().unwrap();
        let root = parent.path().join("store");
        std::fs::create_dir(&root).unwrap();
        let store = FsObjectStore::new(&root, "https://cdn.example.com/videos");

        for key in [
            "../outside/day-1.mp4",
            "sprint-1/../../day-1.mp4",
            "/etc/day-1.mp4",
            "./day-1.mp4",
        ] {
            let result = store.put(key, Bytes::from_static(b"escape")).await;
            assert!(
                matches!(result, Err(StorageError::Backend { .. })),
                "key {key:?} was accepted"
            );
            assert!(matches!(
                store.exists(key).await,
                Err(StorageError::Backend { .. })
            ));
        }

        // Nothing landed outside the store root
        assert!(!parent.path().join("outside").exists());
        assert!(!parent.path().join("day-1.mp4").exists());
        assert!(store.list("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "https://cdn.example.com/videos");

        let entries = store.list("nothing/").await.unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_public_url_joins_base() {
        let store = FsObjectStore::new("/tmp/store", "https://cdn.example.com/videos/");
        assert_eq!(
            store.public_url("sprint-1/day-1.mp4"),
            "https://cdn.example.com/videos/sprint-1/day-1.mp4"
        );
    }
}
