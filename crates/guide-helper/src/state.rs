/// Process-wide app state: language, favorites, viewing history, accessibility toggles, session.
///
/// One instance is built in `main` and handed to every component; tests build their own.
/// Favorites are published on a watch channel so the favorites sync can observe mutations.
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use guide_common::model::{SettingsPatch, UserSettings};
use guide_common::session::{Session, SessionStore};
use tokio::sync::watch;

const MAX_VIEWED_GUIDES: usize = 20;

#[derive(Debug)]
struct StateData {
    language: String,
    guides_viewed_today: u32,
    last_viewed_date: Option<NaiveDate>,
    viewed_guides: Vec<String>,
    tts_auto_play: bool,
    high_contrast: bool,
}

pub struct AppState {
    data: Mutex<StateData>,
    favorites: watch::Sender<Vec<String>>,
    sessions: Arc<SessionStore>,
    device_family: String,
}

impl AppState {
    pub fn new(language: &str, device_family: &str, sessions: Arc<SessionStore>) -> Self {
        let (favorites, _) = watch::channel(Vec::new());
        Self {
            data: Mutex::new(StateData {
                language: language.to_string(),
                guides_viewed_today: 0,
                last_viewed_date: None,
                viewed_guides: Vec::new(),
                tts_auto_play: false,
                high_contrast: false,
            }),
            favorites,
            sessions,
            device_family: device_family.to_string(),
        }
    }

    pub fn language(&self) -> String {
        self.lock().language.clone()
    }

    pub fn device_family(&self) -> &str {
        &self.device_family
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn session(&self) -> Option<Session> {
        self.sessions.get()
    }

    pub fn has_session(&self) -> bool {
        self.sessions.is_signed_in()
    }

    // --- Favorites ---

    pub fn favorites(&self) -> Vec<String> {
        self.favorites.borrow().clone()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.borrow().iter().any(|f| f == id)
    }

    /// Returns `false` when `id` was already a favorite.
    pub fn add_favorite(&self, id: &str) -> bool {
        self.favorites.send_if_modified(|favorites| {
            if favorites.iter().any(|f| f == id) {
                return false;
            }
            favorites.push(id.to_string());
            true
        })
    }

    /// Returns `false` when `id` was not a favorite.
    pub fn remove_favorite(&self, id: &str) -> bool {
        self.favorites.send_if_modified(|favorites| {
            let before = favorites.len();
            favorites.retain(|f| f != id);
            favorites.len() != before
        })
    }

    pub fn subscribe_favorites(&self) -> watch::Receiver<Vec<String>> {
        self.favorites.subscribe()
    }

    // --- Viewing history ---

    pub fn record_view(&self, id: &str) {
        self.record_view_on(id, chrono::Local::now().date_naive());
    }

    /// Moves `id` to the front of the recent list and bumps the per-day counter,
    /// which restarts at 1 on a new day.
    pub fn record_view_on(&self, id: &str, today: NaiveDate) {
        let mut data = self.lock();
        if data.last_viewed_date == Some(today) {
            data.guides_viewed_today += 1;
        } else {
            data.guides_viewed_today = 1;
            data.last_viewed_date = Some(today);
        }
        data.viewed_guides.retain(|v| v != id);
        data.viewed_guides.insert(0, id.to_string());
        data.viewed_guides.truncate(MAX_VIEWED_GUIDES);
    }

    pub fn guides_viewed_today(&self) -> u32 {
        self.lock().guides_viewed_today
    }

    pub fn viewed_guides(&self) -> Vec<String> {
        self.lock().viewed_guides.clone()
    }

    // --- Settings ---

    pub fn settings(&self) -> UserSettings {
        let data = self.lock();
        UserSettings {
            language: data.language.clone(),
            tts_auto_play: data.tts_auto_play,
            high_contrast: data.high_contrast,
        }
    }

    /// Applies the fields present in `patch`. Empty strings leave the language unchanged.
    pub fn apply_settings(&self, patch: &SettingsPatch) {
        let mut data = self.lock();
        if let Some(language) = patch.language.as_deref().filter(|l| !l.is_empty()) {
            data.language = language.to_string();
        }
        if let Some(tts) = patch.tts_auto_play {
            data.tts_auto_play = tts;
        }
        if let Some(contrast) = patch.high_contrast {
            data.high_contrast = contrast;
        }
    }

    fn lock(&self) -> MutexGuard<'_, StateData> {
        match self.data.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
