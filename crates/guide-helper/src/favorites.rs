/// Favorites sync: pushes the favorite-id list to the profile service without one call per toggle.
///
/// Two states. `Idle` arms a timer on the first change (with a session present) and moves to
/// `PendingPush`; further changes leave the timer alone, so the push happens a fixed delay after
/// the first change of a burst. The timer firing, or the app leaving the foreground, pushes the
/// full current list and returns to `Idle`. A failed push is logged and not retried: the next
/// change arms a new timer.
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use guide_common::api::ProfileService;
use guide_common::model::AppLifecycle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::AppState;

enum SyncState {
    Idle,
    PendingPush(JoinHandle<()>),
}

struct Inner {
    state: Arc<AppState>,
    profile: Arc<dyn ProfileService>,
    delay: Duration,
    sync_state: Mutex<SyncState>,
}

#[derive(Clone)]
pub struct FavoritesSync {
    inner: Arc<Inner>,
}

impl FavoritesSync {
    pub fn new(state: Arc<AppState>, profile: Arc<dyn ProfileService>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state,
                profile,
                delay,
                sync_state: Mutex::new(SyncState::Idle),
            }),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.inner.lock(), SyncState::PendingPush(_))
    }

    /// Arms the push timer unless one is already armed or there is no session.
    pub fn favorites_changed(&self) {
        if !self.inner.state.has_session() {
            debug!("favorites changed without a session, keeping them local");
            return;
        }

        let mut sync_state = self.inner.lock();
        if let SyncState::PendingPush(_) = *sync_state {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            inner.flush(false).await;
        });
        *sync_state = SyncState::PendingPush(timer);
        debug!(delay_secs = self.inner.delay.as_secs(), "favorites push scheduled");
    }

    /// Leaving the foreground pushes a pending change immediately.
    pub async fn app_state_changed(&self, next: AppLifecycle) -> bool {
        match next {
            AppLifecycle::Inactive | AppLifecycle::Background => self.inner.flush(true).await,
            AppLifecycle::Active => false,
        }
    }

    /// Follows favorite mutations published by the app state until it is dropped.
    pub fn observe(&self) -> JoinHandle<()> {
        let mut changes = self.inner.state.subscribe_favorites();
        let sync = self.clone();
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                sync.favorites_changed();
            }
        })
    }
}

impl Inner {
    /// Pushes if a push is pending. Returns whether a push was attempted.
    async fn flush(&self, cancel_timer: bool) -> bool {
        let taken = std::mem::replace(&mut *self.lock(), SyncState::Idle);
        let SyncState::PendingPush(timer) = taken else {
            return false;
        };
        // The timer task runs this itself; aborting it there would cancel the push.
        if cancel_timer {
            timer.abort();
        }
        self.push().await;
        true
    }

    async fn push(&self) {
        if !self.state.has_session() {
            debug!("session ended before favorites push, skipping");
            return;
        }
        let favorites = self.state.favorites();
        match self.profile.sync_favorites(&favorites).await {
            Ok(()) => info!(count = favorites.len(), "favorites pushed"),
            Err(e) => warn!(error = %e, "favorites push failed, will retry on next change"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        match self.sync_state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeProfile;
    use guide_common::session::{Session, SessionStore};
    use tokio::time::sleep;

    const DELAY: Duration = Duration::from_secs(30);

    fn fixture(signed_in: bool) -> (Arc<AppState>, Arc<FakeProfile>, FavoritesSync) {
        let session = signed_in.then(|| Session {
            email: "ana@example.com".to_string(),
            id_token: "tok".to_string(),
        });
        let state = Arc::new(AppState::new(
            "en",
            "android-generic",
            Arc::new(SessionStore::new(session)),
        ));
        let profile = Arc::new(FakeProfile::new());
        let sync = FavoritesSync::new(state.clone(), profile.clone(), DELAY);
        (state, profile, sync)
    }

    fn toggle(state: &AppState, sync: &FavoritesSync, id: &str) {
        state.add_favorite(id);
        sync.favorites_changed();
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn burst_pushes_once_from_first_change() {
        let (state, profile, sync) = fixture(true);

        toggle(&state, &sync, "a");
        sleep(Duration::from_secs(5)).await;
        toggle(&state, &sync, "b");
        sleep(Duration::from_secs(5)).await;
        toggle(&state, &sync, "c");

        sleep(Duration::from_millis(19_900)).await;
        assert!(profile.pushes().is_empty(), "not before 30s after the first change");
        assert!(sync.is_pending());

        sleep(Duration::from_millis(200)).await;
        assert_eq!(profile.pushes(), vec![ids(&["a", "b", "c"])]);
        assert!(!sync.is_pending());

        sleep(Duration::from_secs(120)).await;
        assert_eq!(profile.pushes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn background_flushes_pending_push() {
        let (state, profile, sync) = fixture(true);
        toggle(&state, &sync, "a");
        sleep(Duration::from_secs(1)).await;

        assert!(sync.app_state_changed(AppLifecycle::Background).await);
        assert_eq!(profile.pushes(), vec![ids(&["a"])]);
        assert!(!sync.is_pending());

        sleep(Duration::from_secs(60)).await;
        assert_eq!(profile.pushes().len(), 1, "cancelled timer does not push again");
    }

    #[tokio::test(start_paused = true)]
    async fn background_without_pending_push_does_nothing() {
        let (_state, profile, sync) = fixture(true);
        assert!(!sync.app_state_changed(AppLifecycle::Inactive).await);
        assert!(!sync.app_state_changed(AppLifecycle::Active).await);
        assert!(profile.pushes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn no_session_keeps_changes_local() {
        let (state, profile, sync) = fixture(false);
        toggle(&state, &sync, "a");
        assert!(!sync.is_pending());

        sleep(Duration::from_secs(60)).await;
        assert!(!sync.app_state_changed(AppLifecycle::Background).await);
        assert!(profile.pushes().is_empty());
        assert_eq!(state.favorites(), ids(&["a"]));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_push_rearms_on_next_change() {
        let (state, profile, sync) = fixture(true);
        profile.set_failing(true);
        toggle(&state, &sync, "a");
        sleep(DELAY + Duration::from_secs(1)).await;
        assert!(profile.pushes().is_empty());
        assert!(!sync.is_pending(), "failure returns to idle without retry");

        profile.set_failing(false);
        toggle(&state, &sync, "b");
        sleep(DELAY + Duration::from_secs(1)).await;
        assert_eq!(profile.pushes(), vec![ids(&["a", "b"])]);
    }

    #[tokio::test(start_paused = true)]
    async fn removing_last_favorite_pushes_empty_list() {
        let (state, profile, sync) = fixture(true);
        state.add_favorite("a");
        state.remove_favorite("a");
        sync.favorites_changed();

        sleep(DELAY + Duration::from_secs(1)).await;
        assert_eq!(profile.pushes(), vec![Vec::<String>::new()]);
    }

    #[tokio::test(start_paused = true)]
    async fn observer_follows_state_mutations() {
        let (state, profile, sync) = fixture(true);
        let observer = sync.observe();
        tokio::task::yield_now().await;

        state.add_favorite("a");
        sleep(Duration::from_secs(1)).await;
        state.add_favorite("b");
        sleep(DELAY).await;

        assert_eq!(profile.pushes(), vec![ids(&["a", "b"])]);
        observer.abort();
    }
}
