/// Guide authoring: create, edit and delete guides on the remote catalog.
///
/// All operations need a session. The local store is updated only after the catalog confirms,
/// and errors go back to the caller instead of being swallowed. That includes a local write
/// that fails after the catalog accepted the change.
use std::sync::{Arc, LazyLock};

use guide_common::api::GuideCatalog;
use guide_common::model::{Guide, GuideStep, MoveDirection, UNSPECIFIED_DEVICE_FAMILY};
use regex::Regex;
use tracing::{info, warn};

use crate::error::AppError;
use crate::state::AppState;
use crate::steps;
use crate::store::{self, GuideStore};

static NON_SLUG_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Editor form contents for a new or edited guide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuideDraft {
    pub title: String,
    pub category: String,
    pub device_families: Vec<String>,
    pub steps: Vec<GuideStep>,
    pub is_private: Option<bool>,
}

impl GuideDraft {
    pub fn from_guide(guide: &Guide) -> Self {
        Self {
            title: guide.title.clone(),
            category: guide.category.clone(),
            device_families: guide.device_families.clone(),
            steps: guide.steps.clone(),
            is_private: guide.is_private,
        }
    }

    /// A title, at least one step, and no blank step text.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Invalid("title is required".to_string()));
        }
        if self.steps.is_empty() {
            return Err(AppError::Invalid("a guide needs at least one step".to_string()));
        }
        if let Some(i) = self.steps.iter().position(|s| s.text.trim().is_empty()) {
            return Err(AppError::Invalid(format!("step {} has no text", i + 1)));
        }
        Ok(())
    }

    fn device_families(&self) -> Vec<String> {
        if self.device_families.is_empty() {
            vec![UNSPECIFIED_DEVICE_FAMILY.to_string()]
        } else {
            self.device_families.clone()
        }
    }
}

/// `base_id` for a new guide: the slugged title plus a millisecond timestamp.
pub fn derive_base_id(title: &str, now_millis: i64) -> String {
    let lowered = title.trim().to_lowercase();
    let slug = NON_SLUG_RUN.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "untitled" } else { slug };
    format!("{slug}-{now_millis}")
}

pub struct Authoring {
    store: Arc<GuideStore>,
    catalog: Arc<dyn GuideCatalog>,
    state: Arc<AppState>,
}

impl Authoring {
    pub fn new(store: Arc<GuideStore>, catalog: Arc<dyn GuideCatalog>, state: Arc<AppState>) -> Self {
        Self { store, catalog, state }
    }

    pub async fn create(&self, draft: GuideDraft) -> Result<Guide, AppError> {
        self.require_session()?;
        draft.validate()?;

        let now = chrono::Utc::now();
        let base_id = derive_base_id(&draft.title, now.timestamp_millis());
        let mut steps = draft.steps.clone();
        steps::renumber(&mut steps);

        let guide = Guide {
            id: base_id.clone(),
            base_id: Some(base_id),
            title: draft.title.trim().to_string(),
            version: 1,
            last_updated: now.to_rfc3339(),
            device_families: draft.device_families(),
            language: self.state.language(),
            steps,
            category: draft.category,
            creator_uid: None,
            is_private: draft.is_private,
            status: None,
        };

        let created = self.catalog.create_guide(&guide).await?;
        info!(id = %created.id, "guide created");
        self.cache_confirmed(&created).await?;
        Ok(created)
    }

    pub async fn update(&self, id: &str, draft: GuideDraft) -> Result<Guide, AppError> {
        self.require_session()?;
        draft.validate()?;
        let existing = self.load_for_edit(id).await?;
        self.submit(id, existing, draft).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.require_session()?;
        store::validate_id(id)?;
        self.catalog.delete_guide(id).await?;
        info!(id, "guide deleted");
        self.store.delete(id).await
    }

    pub async fn add_step(&self, id: &str, step: GuideStep) -> Result<Guide, AppError> {
        self.require_session()?;
        let existing = self.load_for_edit(id).await?;
        let mut draft = GuideDraft::from_guide(&existing);
        steps::add_step(&mut draft.steps, step);
        draft.validate()?;
        self.submit(id, existing, draft).await
    }

    pub async fn update_step(&self, id: &str, step_number: u32, step: GuideStep) -> Result<Guide, AppError> {
        self.require_session()?;
        let existing = self.load_for_edit(id).await?;
        let mut draft = GuideDraft::from_guide(&existing);
        steps::update_step(&mut draft.steps, steps::index_of(step_number)?, step)?;
        draft.validate()?;
        self.submit(id, existing, draft).await
    }

    /// Moves one step and saves the guide. A move past either end changes nothing.
    pub async fn move_step(&self, id: &str, step_number: u32, direction: MoveDirection) -> Result<Guide, AppError> {
        self.require_session()?;
        let existing = self.load_for_edit(id).await?;
        let mut draft = GuideDraft::from_guide(&existing);
        if !steps::move_step(&mut draft.steps, steps::index_of(step_number)?, direction)? {
            return Ok(existing);
        }
        self.submit(id, existing, draft).await
    }

    pub async fn delete_step(&self, id: &str, step_number: u32) -> Result<Guide, AppError> {
        self.require_session()?;
        let existing = self.load_for_edit(id).await?;
        let mut draft = GuideDraft::from_guide(&existing);
        steps::delete_step(&mut draft.steps, steps::index_of(step_number)?)?;
        draft.validate()?;
        self.submit(id, existing, draft).await
    }

    async fn submit(&self, id: &str, existing: Guide, draft: GuideDraft) -> Result<Guide, AppError> {
        let mut steps = draft.steps.clone();
        steps::renumber(&mut steps);
        let guide = Guide {
            title: draft.title.trim().to_string(),
            category: draft.category.clone(),
            device_families: draft.device_families(),
            steps,
            is_private: draft.is_private,
            last_updated: chrono::Utc::now().to_rfc3339(),
            ..existing
        };

        let updated = self.catalog.update_guide(id, &guide).await?;
        info!(id, version = updated.version, "guide updated");
        self.cache_confirmed(&updated).await?;
        Ok(updated)
    }

    async fn load_for_edit(&self, id: &str) -> Result<Guide, AppError> {
        store::validate_id(id)?;
        if let Some(guide) = self.store.load(id).await {
            return Ok(guide);
        }
        self.catalog.get_guide(id, None, None).await.map_err(|e| match e.status() {
            Some(status) if status.as_u16() == 404 => AppError::NotFound(id.to_string()),
            _ => e.into(),
        })
    }

    async fn cache_confirmed(&self, guide: &Guide) -> Result<(), AppError> {
        self.store.save(guide).await.map_err(|e| {
            warn!(id = %guide.id, error = %e, "failed to store authored guide locally");
            AppError::NotStoredLocally {
                id: guide.id.clone(),
                source: Box::new(e),
            }
        })
    }

    fn require_session(&self) -> Result<(), AppError> {
        if self.state.has_session() {
            Ok(())
        } else {
            Err(AppError::SignInRequired)
        }
    }
}
