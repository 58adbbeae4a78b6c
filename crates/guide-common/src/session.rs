/// Remote session handle shared by the API client and the app state.
///
/// A session is the presence of a bearer credential. Without one, favorites, library and
/// authoring calls are skipped rather than attempted anonymously.
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub email: String,
    pub id_token: String,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn new(initial: Option<Session>) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    pub fn set(&self, session: Option<Session>) {
        match self.current.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }

    pub fn get(&self) -> Option<Session> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.get().map(|s| s.id_token)
    }

    pub fn is_signed_in(&self) -> bool {
        self.get().is_some()
    }
}
