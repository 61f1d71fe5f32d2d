//! # Session Module
//!
//! Who is signed in, and the bearer token their API calls carry.
//!
//! ## Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SESSION LIFECYCLE                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SessionStore::new()  ──► seed from storage ("token", "user")          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  login()  ──► POST /api/auth/login ──► persist both keys ──► memory    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  authenticated: token is Some                                          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  logout() / 401 from an authorized call                                │
//! │         └──► clear memory ──► delete both keys                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `register()` never touches the session; callers log in separately.

use std::sync::Arc;
use tokio::sync::watch;

use crate::api::{endpoints, ApiClient};
use crate::error::Result;
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, UserProfile};
use crate::storage::{self, SessionStorage};

/// Snapshot of the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// Signed-in user
    pub user: Option<UserProfile>,
    /// Bearer token
    pub token: Option<String>,
}

impl Session {
    /// True iff a token is held.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Owner of the session state. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionStore {
    api: ApiClient,
    storage: Arc<dyn SessionStorage>,
    state: Arc<watch::Sender<Session>>,
}

impl SessionStore {
    /// Create the store, restoring any session persisted in `storage`.
    pub fn new(api: ApiClient, storage: Arc<dyn SessionStorage>) -> Self {
        let session = Session {
            user: storage::load_user(storage.as_ref()),
            token: storage::load_token(storage.as_ref()),
        };

        if let Some(ref user) = session.user {
            tracing::info!(
                username = %user.username,
                authenticated = session.is_authenticated(),
                "Restored persisted session"
            );
        }

        let (state, _) = watch::channel(session);
        Self {
            api,
            storage,
            state: Arc::new(state),
        }
    }

    /// Create an account. Returns the server's payload as-is.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<serde_json::Value> {
        let body = RegisterRequest {
            username,
            password,
            name: display_name,
        };

        let payload = self
            .api
            .post_json(endpoints::AUTH_REGISTER, &body, None)
            .await
            .inspect_err(|e| tracing::info!(username = username, error = %e, "Registration failed"))?;

        tracing::info!(username = username, "Registered account");
        Ok(payload)
    }

    /// Sign in, persist the session and return the user.
    ///
    /// On failure the current session is left as it was.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile> {
        let body = LoginRequest { username, password };

        let LoginResponse { token, user } = self
            .api
            .post_json(endpoints::AUTH_LOGIN, &body, None)
            .await
            .inspect_err(|e| tracing::info!(username = username, error = %e, "Login failed"))?;

        storage::store_session(self.storage.as_ref(), &token, &user)?;

        self.state.send_replace(Session {
            user: Some(user.clone()),
            token: Some(token),
        });

        tracing::info!(username = %user.username, "Logged in");
        Ok(user)
    }

    /// Forget the session in memory and in storage. No network traffic.
    pub fn logout(&self) {
        let previous = self.state.send_replace(Session::default());

        if let Err(e) = storage::clear_session(self.storage.as_ref()) {
            tracing::warn!(error = %e, "Failed to remove persisted session");
        }

        match previous.user {
            Some(user) => tracing::info!(username = %user.username, "Logged out"),
            None => tracing::debug!("Logout with no active user"),
        }
    }

    /// True iff a token is held.
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Current bearer token.
    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    /// Current user.
    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    /// Copy of the whole session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Observe session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }
}

// ============================================================================
// TESTS
// ============================================================================
