use std::sync::Arc;

use guide_common::api::ProfileService;
use guide_common::model::{Library, SettingsPatch, UserSettings};
use guide_common::session::Session;
use tracing::{info, warn};

use crate::state::AppState;

pub const DEFAULT_LIBRARY_PAGE: u32 = 20;

/// Session lifecycle plus the profile-backed parts of the app state.
pub struct Account {
    state: Arc<AppState>,
    profile: Arc<dyn ProfileService>,
}

impl Account {
    pub fn new(state: Arc<AppState>, profile: Arc<dyn ProfileService>) -> Self {
        Self { state, profile }
    }

    /// Stores the session, then pulls the profile's settings into the app state.
    /// A failed profile fetch keeps the session and the local settings.
    pub async fn sign_in(&self, session: Session) -> UserSettings {
        let email = session.email.clone();
        self.state.sessions().set(Some(session));
        info!(%email, "signed in");

        match self.profile.get_me().await {
            Ok(profile) => {
                if let Some(remote) = profile.settings {
                    self.state.apply_settings(&SettingsPatch {
                        language: Some(remote.language),
                        tts_auto_play: Some(remote.tts_auto_play),
                        high_contrast: Some(remote.high_contrast),
                    });
                }
            }
            Err(e) => warn!(error = %e, "profile fetch failed, keeping local settings"),
        }
        self.state.settings()
    }

    pub fn sign_out(&self) {
        self.state.sessions().set(None);
        info!("signed out");
    }

    /// Applies `patch` locally, then mirrors it to the profile when signed in.
    /// Returns the resulting settings and whether the profile accepted them.
    pub async fn update_settings(&self, patch: &SettingsPatch) -> (UserSettings, bool) {
        self.state.apply_settings(patch);
        let settings = self.state.settings();
        if patch.is_empty() || !self.state.has_session() {
            return (settings, false);
        }

        match self.profile.patch_settings(patch).await {
            Ok(_) => (settings, true),
            Err(e) => {
                warn!(error = %e, "settings saved locally only");
                (settings, false)
            }
        }
    }

    /// One page of the user's library. Empty when signed out or unreachable.
    pub async fn library(&self, limit: Option<u32>, offset: Option<u32>) -> Library {
        if !self.state.has_session() {
            return Library::default();
        }
        self.profile
            .get_library(limit.unwrap_or(DEFAULT_LIBRARY_PAGE), offset.unwrap_or(0))
            .await
            .inspect_err(|e| warn!(error = %e, "library unavailable"))
            .unwrap_or_default()
    }
}
