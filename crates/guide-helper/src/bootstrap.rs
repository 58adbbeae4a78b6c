/// Startup phase: open the guide store and reconcile bundled seeds before anything reads it.
///
/// Consumers only ever receive the store returned from here, so no read can observe the
/// store before the seed pass has finished.
use std::num::NonZeroUsize;
use std::sync::Arc;

use guide_common::storage::KeyValueStore;
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::seed::{ImportReport, SeedGuide, SeedImporter};
use crate::store::GuideStore;

pub struct Ready {
    pub store: Arc<GuideStore>,
    pub seeds: ImportReport,
}

pub async fn initialize(
    kv: Arc<dyn KeyValueStore>,
    config: &Config,
    seeds: &'static [SeedGuide],
) -> Result<Ready, AppError> {
    let capacity = NonZeroUsize::new(config.cache_capacity)
        .ok_or_else(|| AppError::Config("cache capacity must be greater than zero".to_string()))?;
    let store = Arc::new(GuideStore::new(kv, capacity, config.cache_ttl));

    let meta = store.meta().await;
    info!(
        seed_imported = meta.seed_imported,
        last_sync = meta.last_sync.as_deref().unwrap_or("never"),
        "guide store opened"
    );

    let seeds = SeedImporter::new(Arc::clone(&store), seeds).run().await;
    Ok(Ready { store, seeds })
}
