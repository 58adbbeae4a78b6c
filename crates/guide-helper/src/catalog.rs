/// Catalog access for the app: local guides first, the remote catalog when it answers.
///
/// Every read here degrades to local data. Remote failures are logged and never surface to
/// the caller, so a search with the catalog offline returns exactly what the device holds.
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use guide_common::api::GuideCatalog;
use guide_common::model::{Guide, GuideQuery};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::state::AppState;
use crate::store::GuideStore;

/// Guides shown when the catalog cannot supply suggestions.
pub const FALLBACK_SUGGESTIONS: &[&str] = &[
    "zoom-join-android",
    "zoom-join-ios",
    "phone-basics-calls-android",
];

const SUGGESTION_LIMIT: u32 = 10;

/// Merge local and remote guides into one entry per logical guide.
///
/// Entries are keyed by `base_id`, falling back to `id`. Local entries go in first; a remote
/// entry replaces one with the same key when its version is greater or equal, and keys only
/// the remote side knows are appended. Output order is first appearance of each key.
pub fn merge_catalog(local: Vec<Guide>, remote: Vec<Guide>) -> Vec<Guide> {
    let mut merged: IndexMap<String, Guide> = IndexMap::with_capacity(local.len() + remote.len());

    for guide in local {
        merged.insert(guide.logical_key().to_string(), guide);
    }

    for guide in remote {
        match merged.get_mut(guide.logical_key()) {
            Some(existing) if guide.version >= existing.version => *existing = guide,
            Some(_) => {}
            None => {
                merged.insert(guide.logical_key().to_string(), guide);
            }
        }
    }

    merged.into_values().collect()
}

pub struct CatalogService {
    store: Arc<GuideStore>,
    remote: Arc<dyn GuideCatalog>,
    state: Arc<AppState>,
}

impl CatalogService {
    pub fn new(store: Arc<GuideStore>, remote: Arc<dyn GuideCatalog>, state: Arc<AppState>) -> Self {
        Self { store, remote, state }
    }

    /// Local matches merged with the remote catalog's. An empty query yields nothing.
    pub async fn search(&self, query: &str) -> Vec<Guide> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let local: Vec<Guide> = self
            .store
            .load_all()
            .await
            .into_iter()
            .filter(|g| g.matches_query(query))
            .collect();

        let remote = self
            .remote
            .list_guides(&GuideQuery {
                search: Some(query.to_string()),
                lang: Some(self.state.language()),
                device: Some(self.state.device_family().to_string()),
                ..Default::default()
            })
            .await
            .inspect_err(|e| warn!(error = %e, query, "remote search failed, showing local results"))
            .unwrap_or_default();

        debug!(local = local.len(), remote = remote.len(), query, "merging search results");
        merge_catalog(local, remote)
    }

    /// Search through `debouncer`. `None` means a newer search superseded this one.
    pub async fn search_as_you_type(&self, debouncer: &SearchDebouncer, query: &str) -> Option<Vec<Guide>> {
        debouncer.run(|| self.search(query)).await
    }

    /// Opens a guide for reading: local copy, else the remote catalog, caching what it returns.
    /// A successful open counts as a view.
    pub async fn open_guide(&self, id: &str) -> Option<Guide> {
        let guide = match self.store.load(id).await {
            Some(guide) => guide,
            None => self.fetch_and_cache(id).await?,
        };
        self.state.record_view(id);
        Some(guide)
    }

    async fn fetch_and_cache(&self, id: &str) -> Option<Guide> {
        let guide = self
            .remote
            .get_guide(id, None, None)
            .await
            .inspect_err(|e| warn!(id, error = %e, "guide not available locally or remotely"))
            .ok()?;

        if let Err(e) = self.store.save(&guide).await {
            warn!(id = %guide.id, error = %e, "failed to cache fetched guide");
        } else {
            self.touch_last_sync().await;
        }
        Some(guide)
    }

    /// Catalog picks for the current language and device, or a fixed local set when offline.
    pub async fn suggestions(&self) -> Vec<Guide> {
        let remote = self
            .remote
            .list_guides(&GuideQuery {
                lang: Some(self.state.language()),
                device: Some(self.state.device_family().to_string()),
                limit: Some(SUGGESTION_LIMIT),
                ..Default::default()
            })
            .await;

        match remote {
            Ok(guides) if !guides.is_empty() => guides,
            Ok(_) => self.load_local(FALLBACK_SUGGESTIONS.iter().copied()).await,
            Err(e) => {
                warn!(error = %e, "suggestions unavailable, using bundled picks");
                self.load_local(FALLBACK_SUGGESTIONS.iter().copied()).await
            }
        }
    }

    /// Local guides whose category equals `category`, ignoring case.
    pub async fn browse_category(&self, category: &str) -> Vec<Guide> {
        self.store
            .load_all()
            .await
            .into_iter()
            .filter(|g| g.category.eq_ignore_ascii_case(category))
            .collect()
    }

    /// The favorite guides in favorite order. Ids missing locally are fetched in one batch
    /// and cached; ids nobody knows are dropped.
    pub async fn favorite_guides(&self) -> Vec<Guide> {
        let ids = self.state.favorites();
        let mut found: Vec<(String, Option<Guide>)> = Vec::with_capacity(ids.len());
        for id in ids {
            let guide = self.store.load(&id).await;
            found.push((id, guide));
        }

        let missing: Vec<String> = found
            .iter()
            .filter(|(_, g)| g.is_none())
            .map(|(id, _)| id.clone())
            .collect();

        if !missing.is_empty() {
            let fetched = self
                .remote
                .get_guides_batch(&missing)
                .await
                .inspect_err(|e| warn!(count = missing.len(), error = %e, "batch fetch of favorites failed"))
                .unwrap_or_default();

            for guide in &fetched {
                if let Err(e) = self.store.save(guide).await {
                    warn!(id = %guide.id, error = %e, "failed to cache favorite guide");
                }
            }
            if !fetched.is_empty() {
                self.touch_last_sync().await;
            }

            for (id, slot) in found.iter_mut().filter(|(_, g)| g.is_none()) {
                *slot = fetched.iter().find(|g| g.id == *id).cloned();
            }
        }

        found.into_iter().filter_map(|(_, g)| g).collect()
    }

    /// Recently viewed guides that are still stored, most recent first.
    pub async fn recently_viewed(&self) -> Vec<Guide> {
        let viewed = self.state.viewed_guides();
        self.load_local(viewed.iter().map(String::as_str)).await
    }

    async fn load_local<'a>(&self, ids: impl Iterator<Item = &'a str>) -> Vec<Guide> {
        let mut guides = Vec::new();
        for id in ids {
            if let Some(guide) = self.store.load(id).await {
                guides.push(guide);
            }
        }
        guides
    }

    async fn touch_last_sync(&self) {
        let now = chrono::Utc::now().to_rfc3339();
        if let Err(e) = self.store.mark_synced(&now).await {
            warn!(error = %e, "failed to record last sync time");
        }
    }
}

/// Trailing-edge debounce for search-as-you-type.
///
/// Each call waits out the settle delay and runs only if no newer call arrived meanwhile.
/// A result that completes after a newer call started is discarded as stale.
pub struct SearchDebouncer {
    settle: Duration,
    latest: AtomicU64,
}

impl SearchDebouncer {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            latest: AtomicU64::new(0),
        }
    }

    pub async fn run<F, Fut, T>(&self, search: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(self.settle).await;
        if self.latest.load(Ordering::SeqCst) != ticket {
            debug!(ticket, "search superseded before it ran");
            return None;
        }

        let result = search().await;
        if self.latest.load(Ordering::SeqCst) != ticket {
            debug!(ticket, "search result is stale, dropping");
            return None;
        }
        Some(result)
    }
}
