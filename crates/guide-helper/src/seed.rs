/// Seed importer: reconciles the guides compiled into the binary with the local guide store.
///
/// Runs on every launch so bundle updates are picked up, but at most once per process. A bundled
/// guide is written only when nothing is stored under its id or the bundled version is newer.
/// Failures are isolated per guide: the pass logs them and moves on.
use std::sync::Arc;

use guide_common::model::Guide;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::store::GuideStore;

/// A bundled guide document, resolved at compile time.
#[derive(Debug, Clone, Copy)]
pub struct SeedGuide {
    pub id: &'static str,
    pub json: &'static str,
}

macro_rules! seed {
    ($id:literal) => {
        SeedGuide {
            id: $id,
            json: include_str!(concat!("../seed-guides/", $id, ".json")),
        }
    };
}

pub const BUNDLED_SEEDS: &[SeedGuide] = &[
    seed!("zoom-join-android"),
    seed!("zoom-join-ios"),
    seed!("email-setup-android"),
    seed!("phone-basics-calls-android"),
    seed!("photos-save-android"),
    seed!("security-wifi-android"),
    seed!("zoom-join-android-es"),
];

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Ids written because they were missing or older locally.
    pub updated: Vec<String>,
    /// Ids left alone because the stored copy was the same or newer.
    pub unchanged: Vec<String>,
    /// Ids whose import failed (bad bundled JSON, id mismatch, or write error).
    pub failed: Vec<String>,
}

impl ImportReport {
    pub fn imported_any(&self) -> bool {
        !self.updated.is_empty()
    }
}

pub struct SeedImporter {
    store: Arc<GuideStore>,
    seeds: &'static [SeedGuide],
    ran: OnceCell<ImportReport>,
}

impl SeedImporter {
    pub fn new(store: Arc<GuideStore>, seeds: &'static [SeedGuide]) -> Self {
        Self {
            store,
            seeds,
            ran: OnceCell::new(),
        }
    }

    /// Reconcile once. Later calls in the same process do nothing and return an empty report.
    pub async fn run(&self) -> ImportReport {
        let mut first = false;
        let report = self
            .ran
            .get_or_init(|| {
                first = true;
                self.reconcile()
            })
            .await;

        if first {
            report.clone()
        } else {
            debug!("seed reconciliation already ran in this process");
            ImportReport::default()
        }
    }

    async fn reconcile(&self) -> ImportReport {
        let mut report = ImportReport::default();

        for seed in self.seeds {
            match self.import_one(seed).await {
                Ok(true) => report.updated.push(seed.id.to_string()),
                Ok(false) => report.unchanged.push(seed.id.to_string()),
                Err(e) => {
                    warn!(id = seed.id, error = %e, "seed import failed");
                    report.failed.push(seed.id.to_string());
                }
            }
        }

        if let Err(e) = self.store.mark_seed_imported().await {
            warn!(error = %e, "failed to record seed import in storage meta");
        }

        info!(
            updated = report.updated.len(),
            unchanged = report.unchanged.len(),
            failed = report.failed.len(),
            "seed reconciliation complete"
        );
        report
    }

    async fn import_one(&self, seed: &SeedGuide) -> Result<bool, AppError> {
        let bundled: Guide = serde_json::from_str(seed.json)?;
        if bundled.id != seed.id {
            return Err(AppError::Invalid(format!(
                "bundled guide declares id {} but is registered as {}",
                bundled.id, seed.id
            )));
        }

        let existing = self.store.load(seed.id).await;
        let should_write = match &existing {
            None => true,
            Some(stored) => bundled.version > stored.version,
        };
        if !should_write {
            return Ok(false);
        }

        info!(
            id = seed.id,
            from = existing.as_ref().map(|g| g.version).unwrap_or(0),
            to = bundled.version,
            "updating seed guide"
        );
        self.store.save(&bundled).await?;
        Ok(true)
    }
}
