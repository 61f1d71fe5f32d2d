//! # Social Module
//!
//! Friend discovery and the signed-in user's friend list.
//!
//! ## Action Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SOCIAL STORE ACTIONS                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  search_users(q) ─► GET  /api/users/search?q=  ─► search_results       │
//! │  get_friends()   ─► GET  /api/users/friends    ─► friends              │
//! │  add_friend(id)  ─► POST /api/users/friends    ─► get_friends()        │
//! │  clear_search()  ─► search_results = []          (no network)          │
//! │                                                                         │
//! │  Every network action holds a loading guard: `loading` stays true      │
//! │  while at least one is in flight and drops back on every exit path.    │
//! │                                                                         │
//! │  Failures                                                              │
//! │  ─────────                                                              │
//! │  search_users / get_friends ─► state.error (previous data kept)        │
//! │  add_friend                 ─► returned to the caller                  │
//! │  401/403 (ForceLogout)      ─► session.logout() + redirect /login      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Search and friend-list responses are tagged with a request sequence number;
//! a response that arrives after a newer request was issued is discarded, so a
//! slow early search can never overwrite a fast later one. A stale 401/403 is
//! still acted on.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::api::{endpoints, is_auth_failure, ApiClient};
use crate::config::AuthFailurePolicy;
use crate::error::{Error, Result};
use crate::models::{AddFriendRequest, FriendRecord, UserId};
use crate::router::{Route, Router};
use crate::session::SessionStore;

/// Shown when a search fails.
pub const SEARCH_FAILED: &str = "Search failed";

/// Shown when the friend list cannot be loaded.
pub const LOAD_FRIENDS_FAILED: &str = "Failed to load friends";

/// Snapshot of the social store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocialState {
    /// Friend list, in server order
    pub friends: Vec<FriendRecord>,
    /// Results of the latest search, in server order
    pub search_results: Vec<FriendRecord>,
    /// True while any action is in flight
    pub loading: bool,
    /// Last passive error message
    pub error: Option<String>,
}

struct Inner {
    api: ApiClient,
    session: SessionStore,
    router: Router,
    policy: AuthFailurePolicy,
    state: watch::Sender<SocialState>,
    in_flight: Mutex<usize>,
    search_seq: AtomicU64,
    friends_seq: AtomicU64,
}

impl Inner {
    fn begin_loading(self: &Arc<Self>) -> LoadingGuard {
        let mut in_flight = self.in_flight.lock();
        *in_flight += 1;
        self.state.send_if_modified(|s| !std::mem::replace(&mut s.loading, true));
        LoadingGuard {
            inner: Arc::clone(self),
        }
    }

    fn end_loading(&self) {
        let mut in_flight = self.in_flight.lock();
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            self.state.send_if_modified(|s| std::mem::replace(&mut s.loading, false));
        }
    }

    fn set_error(&self, message: Option<&str>) {
        self.state.send_if_modified(|s| {
            let next = message.map(String::from);
            if s.error == next {
                return false;
            }
            s.error = next;
            true
        });
    }

    /// Apply the configured policy to a 401/403. Returns `true` when the
    /// session was force-cleared and the caller should stop.
    fn handle_auth_failure(&self, err: &Error) -> bool {
        if self.policy != AuthFailurePolicy::ForceLogout || !is_auth_failure(err) {
            return false;
        }

        tracing::warn!(error = %err, "Authorization rejected, ending session");
        self.session.logout();
        self.router.redirect(Route::Login);
        true
    }
}

/// Decrements the in-flight count when dropped.
struct LoadingGuard {
    inner: Arc<Inner>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.inner.end_loading();
    }
}

/// Friend search and friend list. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SocialStore {
    inner: Arc<Inner>,
}

impl SocialStore {
    /// Create an empty store.
    pub fn new(
        api: ApiClient,
        session: SessionStore,
        router: Router,
        policy: AuthFailurePolicy,
    ) -> Self {
        let (state, _) = watch::channel(SocialState::default());
        Self {
            inner: Arc::new(Inner {
                api,
                session,
                router,
                policy,
                state,
                in_flight: Mutex::new(0),
                search_seq: AtomicU64::new(0),
                friends_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Search users by `query`. Results land in `search_results`; failures in
    /// `error`.
    pub async fn search_users(&self, query: &str) {
        let _loading = self.inner.begin_loading();
        self.inner.set_error(None);

        let seq = self.inner.search_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let token = self.inner.session.token();

        let result = self
            .inner
            .api
            .get_json::<Vec<FriendRecord>>(endpoints::USERS_SEARCH, &[("q", query)], token.as_deref())
            .await;

        // A rejected token ends the session even when the response is stale
        if let Err(ref err) = result {
            if self.inner.handle_auth_failure(err) {
                return;
            }
        }

        if self.inner.search_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!(query = query, "Discarding stale search response");
            return;
        }

        match result {
            Ok(results) => {
                tracing::debug!(query = query, count = results.len(), "Search complete");
                self.inner
                    .state
                    .send_modify(|s| s.search_results = results);
            }
            Err(Error::ShutdownInProgress) => {}
            Err(err) => {
                tracing::warn!(query = query, error = %err, "Search failed");
                self.inner.set_error(Some(SEARCH_FAILED));
            }
        }
    }

    /// Reload the friend list. Failures land in `error`.
    pub async fn get_friends(&self) {
        let _loading = self.inner.begin_loading();
        self.inner.set_error(None);

        let seq = self.inner.friends_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let token = self.inner.session.token();

        let result = self
            .inner
            .api
            .get_json::<Vec<FriendRecord>>(endpoints::USERS_FRIENDS, &[], token.as_deref())
            .await;

        if let Err(ref err) = result {
            if self.inner.handle_auth_failure(err) {
                return;
            }
        }

        if self.inner.friends_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!("Discarding stale friend list response");
            return;
        }

        match result {
            Ok(friends) => {
                tracing::debug!(count = friends.len(), "Friend list loaded");
                self.inner.state.send_modify(|s| s.friends = friends);
            }
            Err(Error::ShutdownInProgress) => {}
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load friends");
                self.inner.set_error(Some(LOAD_FRIENDS_FAILED));
            }
        }
    }

    /// Add a friend, then reload the friend list from the server.
    ///
    /// Errors are returned rather than stored in `error`. Under
    /// [`AuthFailurePolicy::ForceLogout`] a 401/403 ends the session and
    /// yields [`Error::SessionExpired`].
    pub async fn add_friend(&self, friend_id: impl Into<UserId>) -> Result<()> {
        let friend_id = friend_id.into();
        let _loading = self.inner.begin_loading();
        let token = self.inner.session.token();

        let body = AddFriendRequest {
            friend_id: &friend_id,
        };
        if let Err(err) = self
            .inner
            .api
            .post_unit(endpoints::USERS_FRIENDS, &body, token.as_deref())
            .await
        {
            if self.inner.handle_auth_failure(&err) {
                return Err(Error::SessionExpired);
            }
            tracing::warn!(friend_id = %friend_id, error = %err, "Failed to add friend");
            return Err(err);
        }

        tracing::info!(friend_id = %friend_id, "Friend added");
        self.get_friends().await;
        Ok(())
    }

    /// Drop the current search results. In-flight searches are discarded too.
    pub fn clear_search(&self) {
        self.inner.search_seq.fetch_add(1, Ordering::SeqCst);
        self.inner
            .state
            .send_if_modified(|s| {
                if s.search_results.is_empty() {
                    return false;
                }
                s.search_results.clear();
                true
            });
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SocialState {
        self.inner.state.borrow().clone()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<SocialState> {
        self.inner.state.subscribe()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::storage::{MemoryStorage, SessionStorage};
    use crate::testing::{omega_api, MockApi, SharedBackend, VALID_TOKEN};
    use axum::http::StatusCode;
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        _mock: MockApi,
        backend: SharedBackend,
        session: SessionStore,
        router: Router,
        social: SocialStore,
    }

    async fn fixture(policy: AuthFailurePolicy) -> Fixture {
        let backend = SharedBackend::default();
        let mock = omega_api(backend.clone()).await;
        let config = Arc::new(ClientConfig::default().with_api_base_url(mock.base_url()));
        let api = ApiClient::new(config.clone()).unwrap();
        let storage: Arc<dyn SessionStorage> = Arc::new(MemoryStorage::new());
        let session = SessionStore::new(api.clone(), storage.clone());
        let router = Router::new(config, storage);
        let social = SocialStore::new(api, session.clone(), router.clone(), policy);

        session.login("ann", "secret").await.unwrap();

        Fixture {
            _mock: mock,
            backend,
            session,
            router,
            social,
        }
    }

    #[tokio::test]
    async fn test_search_replaces_results() {
        let f = fixture(AuthFailurePolicy::ForceLogout).await;
        f.backend
            .lock()
            .search
            .insert("ann".into(), json!([{ "id": 1, "username": "ann" }]));

        f.social.search_users("ann").await;

        let state = f.social.snapshot();
        assert_eq!(state.search_results.len(), 1);
        assert_eq!(state.search_results[0].username, "ann");
        assert_eq!(state.search_results[0].id, Some(UserId::Numeric(1)));
        assert!(!state.loading);
        assert!(state.error.is_none());

        let expected = format!("Bearer {VALID_TOKEN}");
        assert_eq!(
            f.backend.lock().auth_headers.last().cloned().flatten().as_deref(),
            Some(expected.as_str())
        );
    }

    #[tokio::test]
    async fn test_search_failure_keeps_previous_results() {
        let f = fixture(AuthFailurePolicy::ForceLogout).await;
        f.backend
            .lock()
            .search
            .insert("ann".into(), json!([{ "id": 1, "username": "ann" }]));
        f.social.search_users("ann").await;

        f.backend.lock().search_status = Some(StatusCode::INTERNAL_SERVER_ERROR);
        f.social.search_users("bob").await;

        let state = f.social.snapshot();
        assert_eq!(state.error.as_deref(), Some(SEARCH_FAILED));
        assert_eq!(state.search_results.len(), 1);
        assert!(!state.loading);

        // The next attempt clears the error on entry
        f.backend.lock().search_status = None;
        f.social.search_users("bob").await;
        assert!(f.social.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_add_friend_refreshes_list() {
        let f = fixture(AuthFailurePolicy::ForceLogout).await;
        f.backend.lock().friends = vec![
            json!({ "id": 2, "username": "bo" }),
            json!({ "id": 3, "username": "cy" }),
        ];

        f.social.add_friend(42i64).await.unwrap();

        let state = f.social.snapshot();
        assert_eq!(state.friends.len(), 3);
        assert_eq!(state.friends[2].id, Some(UserId::Numeric(42)));
        assert!(!state.loading);
        assert_eq!(f.backend.lock().added, vec![json!(42)]);
    }

    #[tokio::test]
    async fn test_add_friend_failure_is_returned_not_stored() {
        let f = fixture(AuthFailurePolicy::ForceLogout).await;
        f.backend.lock().add_friend_status = Some(StatusCode::BAD_REQUEST);

        let err = f.social.add_friend(7i64).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 400, .. }));

        let state = f.social.snapshot();
        assert!(state.error.is_none());
        assert!(!state.loading);
        assert!(f.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_get_friends_failure_sets_error() {
        let f = fixture(AuthFailurePolicy::ForceLogout).await;
        f.backend.lock().friends = vec![json!({ "username": "bo" })];
        f.social.get_friends().await;

        f.backend.lock().friends_status = Some(StatusCode::BAD_GATEWAY);
        f.social.get_friends().await;

        let state = f.social.snapshot();
        assert_eq!(state.error.as_deref(), Some(LOAD_FRIENDS_FAILED));
        assert_eq!(state.friends.len(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_forces_logout_and_redirect() {
        let f = fixture(AuthFailurePolicy::ForceLogout).await;
        f.router.navigate("/friends").unwrap();
        f.backend.lock().friends_status = Some(StatusCode::UNAUTHORIZED);

        f.social.get_friends().await;

        assert!(!f.session.is_authenticated());
        assert_eq!(f.router.current(), Route::Login);
        let state = f.social.snapshot();
        assert!(state.error.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_forbidden_on_add_friend_expires_session() {
        let f = fixture(AuthFailurePolicy::ForceLogout).await;
        f.backend.lock().add_friend_status = Some(StatusCode::FORBIDDEN);

        let err = f.social.add_friend(9i64).await.unwrap_err();

        assert!(matches!(err, Error::SessionExpired));
        assert!(!f.session.is_authenticated());
        assert_eq!(f.router.current(), Route::Login);
    }

    #[tokio::test]
    async fn test_forbidden_on_get_friends_forces_logout() {
        let f = fixture(AuthFailurePolicy::ForceLogout).await;
        f.router.navigate("/friends").unwrap();
        f.backend.lock().friends_status = Some(StatusCode::FORBIDDEN);

        f.social.get_friends().await;

        assert!(!f.session.is_authenticated());
        assert_eq!(f.router.current(), Route::Login);
        assert!(f.social.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_on_superseded_search_still_forces_logout() {
        let f = fixture(AuthFailurePolicy::ForceLogout).await;
        f.router.navigate("/friends").unwrap();
        {
            let mut b = f.backend.lock();
            b.search_status = Some(StatusCode::UNAUTHORIZED);
            b.search_delay
                .insert("slow".into(), Duration::from_millis(300));
        }

        let search = {
            let social = f.social.clone();
            tokio::spawn(async move { social.search_users("slow").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        f.social.clear_search();
        search.await.unwrap();

        assert!(!f.session.is_authenticated());
        assert_eq!(f.router.current(), Route::Login);
        let state = f.social.snapshot();
        assert!(state.error.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_report_policy_treats_401_as_plain_failure() {
        let f = fixture(AuthFailurePolicy::Report).await;
        f.router.navigate("/friends").unwrap();
        f.backend.lock().search_status = Some(StatusCode::UNAUTHORIZED);

        f.social.search_users("ann").await;

        assert!(f.session.is_authenticated());
        assert_eq!(f.router.current(), Route::Friends);
        assert_eq!(f.social.snapshot().error.as_deref(), Some(SEARCH_FAILED));
    }

    #[tokio::test]
    async fn test_stale_search_response_is_discarded() {
        let f = fixture(AuthFailurePolicy::ForceLogout).await;
        {
            let mut b = f.backend.lock();
            b.search
                .insert("slow".into(), json!([{ "username": "slowpoke" }]));
            b.search.insert("fast".into(), json!([{ "username": "speedy" }]));
            b.search_delay
                .insert("slow".into(), Duration::from_millis(300));
        }

        let slow = {
            let social = f.social.clone();
            tokio::spawn(async move { social.search_users("slow").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(f.social.snapshot().loading);

        f.social.search_users("fast").await;
        // The slow search is still running
        assert!(f.social.snapshot().loading);

        slow.await.unwrap();

        let state = f.social.snapshot();
        assert_eq!(state.search_results.len(), 1);
        assert_eq!(state.search_results[0].username, "speedy");
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_clear_search() {
        let f = fixture(AuthFailurePolicy::ForceLogout).await;
        f.backend
            .lock()
            .search
            .insert("ann".into(), json!([{ "username": "ann" }]));
        f.social.search_users("ann").await;
        assert_eq!(f.social.snapshot().search_results.len(), 1);

        f.social.clear_search();
        assert!(f.social.snapshot().search_results.is_empty());
    }

    #[tokio::test]
    async fn test_query_is_url_encoded() {
        let f = fixture(AuthFailurePolicy::ForceLogout).await;
        f.backend
            .lock()
            .search
            .insert("a&b c".into(), json!([{ "username": "amp" }]));

        f.social.search_users("a&b c").await;
        assert_eq!(f.social.snapshot().search_results[0].username, "amp");
    }
}
