//! Fakes for the storage, catalog and profile seams.
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use guide_common::api::{GuideCatalog, ProfileService};
use guide_common::error::{ApiError, CommonError, StatusCode};
use guide_common::model::{
    Guide, GuideQuery, GuideStep, Library, SettingsPatch, UserProfile, UserSettings,
};
use guide_common::storage::{KeyValueStore, MemoryStore};

pub fn guide(id: &str, base_id: Option<&str>, version: u64, title: &str) -> Guide {
    Guide {
        id: id.to_string(),
        base_id: base_id.map(str::to_string),
        title: title.to_string(),
        version,
        last_updated: String::new(),
        device_families: vec!["android-generic".to_string()],
        language: "en".to_string(),
        steps: vec![GuideStep {
            id: None,
            step_number: 1,
            text: format!("{title}: first step"),
            image: String::new(),
            tts: String::new(),
        }],
        category: "Video Calls".to_string(),
        creator_uid: None,
        is_private: None,
        status: None,
    }
}

fn server_error() -> ApiError {
    ApiError::Status {
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: "catalog offline".to_string(),
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Memory store that counts reads and writes and can be told to fail writes.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Guide writes only; metadata writes are not counted.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CommonError> {
        if key.starts_with("guides/") {
            self.reads.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), CommonError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CommonError::Storage {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        if key.starts_with("guides/") {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), CommonError> {
        self.inner.delete(key).await
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, CommonError> {
        self.inner.list_keys(prefix).await
    }
}

/// In-memory catalog. `list_guides` returns `listed` unless `offline`.
#[derive(Default)]
pub struct FakeCatalog {
    pub listed: Mutex<Vec<Guide>>,
    pub by_id: Mutex<Vec<Guide>>,
    pub offline: AtomicBool,
    pub queries: Mutex<Vec<GuideQuery>>,
    pub batch_requests: Mutex<Vec<Vec<String>>>,
    pub created: Mutex<Vec<Guide>>,
    pub updated: Mutex<Vec<(String, Guide)>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn with_listed(guides: Vec<Guide>) -> Self {
        let catalog = Self::default();
        *lock(&catalog.listed) = guides;
        catalog
    }

    pub fn offline() -> Self {
        let catalog = Self::default();
        catalog.offline.store(true, Ordering::SeqCst);
        catalog
    }

    pub fn serve(&self, guide: Guide) {
        lock(&self.by_id).push(guide);
    }

    pub fn queries(&self) -> Vec<GuideQuery> {
        lock(&self.queries).clone()
    }

    pub fn batch_requests(&self) -> Vec<Vec<String>> {
        lock(&self.batch_requests).clone()
    }

    pub fn created(&self) -> Vec<Guide> {
        lock(&self.created).clone()
    }

    pub fn updated(&self) -> Vec<(String, Guide)> {
        lock(&self.updated).clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        lock(&self.deleted).clone()
    }

    fn check_online(&self) -> Result<(), ApiError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(server_error())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GuideCatalog for FakeCatalog {
    async fn list_guides(&self, query: &GuideQuery) -> Result<Vec<Guide>, ApiError> {
        lock(&self.queries).push(query.clone());
        self.check_online()?;
        let mut guides = lock(&self.listed).clone();
        if let Some(limit) = query.limit {
            guides.truncate(limit as usize);
        }
        Ok(guides)
    }

    async fn get_guide(
        &self,
        base_id: &str,
        _lang: Option<&str>,
        _device: Option<&str>,
    ) -> Result<Guide, ApiError> {
        self.check_online()?;
        lock(&self.by_id)
            .iter()
            .find(|g| g.id == base_id || g.base_id.as_deref() == Some(base_id))
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: StatusCode::NOT_FOUND,
                message: format!("no guide {base_id}"),
            })
    }

    async fn get_guides_batch(&self, ids: &[String]) -> Result<Vec<Guide>, ApiError> {
        lock(&self.batch_requests).push(ids.to_vec());
        self.check_online()?;
        Ok(lock(&self.by_id)
            .iter()
            .filter(|g| ids.contains(&g.id))
            .cloned()
            .collect())
    }

    async fn create_guide(&self, guide: &Guide) -> Result<Guide, ApiError> {
        self.check_online()?;
        let mut confirmed = guide.clone();
        if confirmed.id.is_empty() {
            confirmed.id = confirmed.base_id.clone().unwrap_or_default();
        }
        confirmed.version = confirmed.version.max(1);
        lock(&self.created).push(confirmed.clone());
        Ok(confirmed)
    }

    async fn update_guide(&self, id: &str, guide: &Guide) -> Result<Guide, ApiError> {
        self.check_online()?;
        let mut confirmed = guide.clone();
        confirmed.version += 1;
        lock(&self.updated).push((id.to_string(), confirmed.clone()));
        Ok(confirmed)
    }

    async fn delete_guide(&self, id: &str) -> Result<(), ApiError> {
        self.check_online()?;
        lock(&self.deleted).push(id.to_string());
        Ok(())
    }
}

/// In-memory profile service recording every favorites push.
#[derive(Default)]
pub struct FakeProfile {
    pub pushes: Mutex<Vec<Vec<String>>>,
    pub patches: Mutex<Vec<SettingsPatch>>,
    pub settings: Mutex<Option<UserSettings>>,
    pub library: Mutex<Library>,
    pub failing: AtomicBool,
}

impl FakeProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushes(&self) -> Vec<Vec<String>> {
        lock(&self.pushes).clone()
    }

    pub fn patches(&self) -> Vec<SettingsPatch> {
        lock(&self.patches).clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ApiError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(server_error())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProfileService for FakeProfile {
    async fn get_me(&self) -> Result<UserProfile, ApiError> {
        self.check()?;
        Ok(UserProfile {
            email: "ana@example.com".to_string(),
            settings: lock(&self.settings).clone(),
        })
    }

    async fn patch_settings(&self, patch: &SettingsPatch) -> Result<UserProfile, ApiError> {
        self.check()?;
        lock(&self.patches).push(patch.clone());
        Ok(UserProfile {
            email: "ana@example.com".to_string(),
            settings: None,
        })
    }

    async fn sync_favorites(&self, ids: &[String]) -> Result<(), ApiError> {
        self.check()?;
        lock(&self.pushes).push(ids.to_vec());
        Ok(())
    }

    async fn get_library(&self, limit: u32, offset: u32) -> Result<Library, ApiError> {
        self.check()?;
        let library = lock(&self.library).clone();
        let page = |guides: Vec<Guide>| -> Vec<Guide> {
            guides
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect()
        };
        Ok(Library {
            favorites: page(library.favorites),
            created: page(library.created),
        })
    }
}
