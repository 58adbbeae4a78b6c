/// Durable key-value storage for small JSON documents.
///
/// Keys are `/`-separated relative paths (e.g. `guides/zoom-join-android`). The file backend maps
/// each key to `<root>/<key>.json` and writes through a temporary sibling plus rename, so a
/// concurrent reader sees either the previous document or the new one, never a partial write.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CommonError;

const FILE_SUFFIX: &str = ".json";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CommonError>;

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), CommonError>;

    /// Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CommonError>;

    /// Lists keys directly under `prefix`, sorted.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, CommonError>;
}

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{FILE_SUFFIX}"))
    }
}

fn storage_err(key: &str, source: std::io::Error) -> CommonError {
    CommonError::Storage {
        key: key.to_string(),
        source,
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CommonError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err(key, e)),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), CommonError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_err(key, e))?;
        }

        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("json.tmp-{}-{n}", std::process::id()));
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| storage_err(key, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(storage_err(key, e));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CommonError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err(key, e)),
        }
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, CommonError> {
        let dir = self.root.join(prefix);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_err(prefix, e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_err(prefix, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(stem) = name.strip_suffix(FILE_SUFFIX) {
                keys.push(format!("{prefix}{stem}"));
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Process-local store, for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CommonError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), CommonError> {
        self.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CommonError> {
        self.lock().remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, CommonError> {
        Ok(self
            .lock()
            .keys()
            .filter(|k| {
                k.strip_prefix(prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_round_trips_and_lists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());

        store.put("guides/b", b"{\"v\":2}").await.expect("put b");
        store.put("guides/a", b"{\"v\":1}").await.expect("put a");
        store.put("meta", b"{}").await.expect("put meta");

        assert_eq!(
            store.get("guides/a").await.expect("get"),
            Some(b"{\"v\":1}".to_vec())
        );
        assert_eq!(
            store.list_keys("guides/").await.expect("list"),
            vec!["guides/a".to_string(), "guides/b".to_string()]
        );
    }

    #[tokio::test]
    async fn file_store_overwrite_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());

        store.put("guides/a", b"one").await.expect("put");
        store.put("guides/a", b"two").await.expect("overwrite");

        assert_eq!(store.get("guides/a").await.expect("get"), Some(b"two".to_vec()));
        let names: Vec<_> = std::fs::read_dir(dir.path().join("guides"))
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn file_store_missing_key_and_idempotent_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());

        assert!(store.get("guides/nope").await.expect("get").is_none());
        store.delete("guides/nope").await.expect("delete absent");
        assert!(store.list_keys("guides/").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn memory_store_lists_only_direct_children() {
        let store = MemoryStore::new();
        store.put("guides/a", b"1").await.expect("put");
        store.put("guides/nested/b", b"2").await.expect("put");
        store.put("meta", b"3").await.expect("put");

        assert_eq!(
            store.list_keys("guides/").await.expect("list"),
            vec!["guides/a".to_string()]
        );
    }
}
