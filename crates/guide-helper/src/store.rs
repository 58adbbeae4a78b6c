/// Local guide store: durable JSON documents keyed by guide id, fronted by a bounded read cache.
///
/// Key schema:
/// - `guides/{id}`: JSON Guide
/// - `meta`: JSON StorageMeta
///
/// The read cache evicts by capacity (LRU) and by absolute age, whichever comes first. Eviction
/// never touches the durable copy. Writes hold `write_lock` across the durable write and the cache
/// publish, so the cache always reflects the order in which durable writes completed.
///
/// Ids become file names under `guides/`. Ids that are empty, contain a path separator or `..`,
/// or contain control characters are refused on save and delete and read as missing.
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use guide_common::model::Guide;
use guide_common::storage::KeyValueStore;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::AppError;

const GUIDE_PREFIX: &str = "guides/";
const META_KEY: &str = "meta";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageMeta {
    #[serde(default)]
    pub seed_imported: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,
}

struct CachedGuide {
    guide: Arc<Guide>,
    inserted: Instant,
}

pub struct GuideStore {
    kv: Arc<dyn KeyValueStore>,
    memory: Mutex<LruCache<String, CachedGuide>>,
    ttl: Duration,
    write_lock: tokio::sync::Mutex<()>,
    meta_lock: tokio::sync::Mutex<()>,
}

impl GuideStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            kv,
            memory: Mutex::new(LruCache::new(capacity)),
            ttl,
            write_lock: tokio::sync::Mutex::new(()),
            meta_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Persist `guide`, replacing any stored copy with the same id.
    pub async fn save(&self, guide: &Guide) -> Result<(), AppError> {
        let key = guide_key(&guide.id)?;
        let json = serde_json::to_vec(guide)?;
        let _guard = self.write_lock.lock().await;
        self.kv.put(&key, &json).await?;
        self.publish(&guide.id, Arc::new(guide.clone()));
        Ok(())
    }

    /// Missing, unreadable and corrupt records all come back as `None`.
    pub async fn load(&self, id: &str) -> Option<Guide> {
        let key = guide_key(id)
            .inspect_err(|e| warn!(error = %e, "refusing to read guide"))
            .ok()?;
        if let Some(hit) = self.cached(id) {
            return Some(hit);
        }

        let _guard = self.write_lock.lock().await;
        // A save may have published while we waited for the lock.
        if let Some(hit) = self.cached(id) {
            return Some(hit);
        }

        let bytes = match self.kv.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, key, "guide read failed, treating as missing");
                return None;
            }
        };
        let guide: Guide = serde_json::from_slice(&bytes)
            .inspect_err(|e| warn!(error = %e, key, "stored guide is corrupt, treating as missing"))
            .ok()?;
        self.publish(id, Arc::new(guide.clone()));
        Some(guide)
    }

    /// Every stored guide, ordered by id. A full scan; the catalog is small.
    pub async fn load_all(&self) -> Vec<Guide> {
        let keys = match self.kv.list_keys(GUIDE_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "listing stored guides failed");
                return Vec::new();
            }
        };

        let mut guides = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(id) = key.strip_prefix(GUIDE_PREFIX) else {
                continue;
            };
            if let Some(guide) = self.load(id).await {
                guides.push(guide);
            }
        }
        guides
    }

    /// Remove from the cache and durable storage. Deleting an unknown id succeeds.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let key = guide_key(id)?;
        let _guard = self.write_lock.lock().await;
        self.lock_memory().pop(id);
        self.kv.delete(&key).await?;
        Ok(())
    }

    pub async fn meta(&self) -> StorageMeta {
        match self.kv.get(META_KEY).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes)
                .inspect_err(|e| warn!(error = %e, "storage meta is corrupt, using defaults"))
                .unwrap_or_default(),
            Ok(None) => StorageMeta::default(),
            Err(e) => {
                warn!(error = %e, "storage meta read failed, using defaults");
                StorageMeta::default()
            }
        }
    }

    pub async fn mark_seed_imported(&self) -> Result<(), AppError> {
        self.update_meta(|meta| meta.seed_imported = true).await
    }

    pub async fn mark_synced(&self, at: &str) -> Result<(), AppError> {
        self.update_meta(|meta| meta.last_sync = Some(at.to_string())).await
    }

    /// Read-modify-write of the meta record under `meta_lock`.
    async fn update_meta(&self, change: impl FnOnce(&mut StorageMeta)) -> Result<(), AppError> {
        let _guard = self.meta_lock.lock().await;
        let mut meta = self.meta().await;
        change(&mut meta);
        let json = serde_json::to_vec(&meta)?;
        self.kv.put(META_KEY, &json).await?;
        Ok(())
    }

    fn cached(&self, id: &str) -> Option<Guide> {
        let mut memory = self.lock_memory();
        let expired = match memory.get(id) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => {
                return Some(entry.guide.as_ref().clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!(id, "cached guide expired");
            memory.pop(id);
        }
        None
    }

    fn publish(&self, id: &str, guide: Arc<Guide>) {
        self.lock_memory().put(
            id.to_string(),
            CachedGuide {
                guide,
                inserted: Instant::now(),
            },
        );
    }

    fn lock_memory(&self) -> MutexGuard<'_, LruCache<String, CachedGuide>> {
        match self.memory.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Refuses ids that could address a file outside `guides/`.
pub fn validate_id(id: &str) -> Result<(), AppError> {
    let unsafe_id = id.is_empty()
        || id.contains("..")
        || id.contains(['/', '\\'])
        || id.chars().any(char::is_control);
    if unsafe_id {
        return Err(AppError::Invalid(format!("unusable guide id: {id:?}")));
    }
    Ok(())
}

fn guide_key(id: &str) -> Result<String, AppError> {
    validate_id(id)?;
    Ok(format!("{GUIDE_PREFIX}{id}"))
}
