//! # Omega Core
//!
//! Client-side state for the Omega dashboard: who is signed in, their friends,
//! transient notifications and the navigation table, all talking to the Omega
//! REST API.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         OMEGA CORE MODULES                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │   Session   │  │   Social    │  │   Notify    │  │    Router    │   │
//! │  │             │  │             │  │             │  │              │   │
//! │  │ - Register  │  │ - Search    │  │ - Toasts    │  │ - Route table│   │
//! │  │ - Login     │  │ - Friends   │  │ - Confirm   │  │ - Admin guard│   │
//! │  │ - Logout    │  │ - Add friend│  │   dialogs   │  │ - Redirects  │   │
//! │  └──────┬──────┘  └──────┬──────┘  └─────────────┘  └──────┬───────┘   │
//! │         │                │                                 │           │
//! │         └───────┬────────┘                                 │           │
//! │                 ▼                                          ▼           │
//! │  ┌─────────────────────────────┐          ┌──────────────────────────┐ │
//! │  │            Api              │          │         Storage          │ │
//! │  │ - reqwest, bearer auth      │          │ - "token" / "user" keys  │ │
//! │  │ - server payload on errors  │          │ - memory or JSON file    │ │
//! │  └─────────────────────────────┘          └──────────────────────────┘ │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`config`] - Endpoint, timeouts, admin allow-list
//! - [`models`] - User profiles and request bodies
//! - [`storage`] - Durable session key/value storage
//! - [`api`] - REST transport
//! - [`session`] - Authentication state
//! - [`social`] - Friend search and friend list
//! - [`notify`] - Toasts and confirmation dialogs
//! - [`router`] - Route table and guards
//!
//! ## Usage
//!
//! ```ignore
//! use omega_core::{ClientConfig, OmegaClient};
//!
//! let client = OmegaClient::from_config(ClientConfig::from_env())?;
//! client.session().login("ann", "secret").await?;
//! client.social().get_friends().await;
//! println!("{} friends", client.social().snapshot().friends.len());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod router;
pub mod session;
pub mod social;
pub mod storage;
/// Wall-clock helpers.
pub mod time;

#[cfg(test)]
mod testing;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::{AuthFailurePolicy, ClientConfig};
pub use error::{Error, Result};
pub use models::{FriendRecord, UserId, UserProfile};
pub use notify::{NotificationQueue, Toast, ToastId, ToastKind};
pub use router::{Route, Router};
pub use session::{Session, SessionStore};
pub use social::{SocialState, SocialStore};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};

// ============================================================================
// CLIENT CONTEXT
// ============================================================================

use std::sync::Arc;

use api::ApiClient;

/// One client instance: every store, wired to the same configuration, storage
/// and HTTP client.
///
/// ## Lifecycle
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                        OMEGA CLIENT LIFECYCLE                           │
/// ├─────────────────────────────────────────────────────────────────────────┤
/// │                                                                         │
/// │  1. Construct                                                          │
/// │     OmegaClient::new(config, storage)                                  │
/// │       ──► build HTTP client                                            │
/// │       ──► restore session from storage                                │
/// │       ──► router at "/", empty social state, empty toast queue         │
/// │            │                                                           │
/// │            ▼                                                           │
/// │  2. Use                                                                │
/// │     session() / social() / notifications() / router()                  │
/// │            │                                                           │
/// │            ▼                                                           │
/// │  3. Shutdown                                                           │
/// │     shutdown()                                                         │
/// │       ──► in-flight requests resolve with ShutdownInProgress           │
/// │       ──► toast timers aborted, pending confirmations cancelled        │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Clone)]
pub struct OmegaClient {
    config: Arc<ClientConfig>,
    api: ApiClient,
    session: SessionStore,
    social: SocialStore,
    notifications: NotificationQueue,
    router: Router,
}

impl OmegaClient {
    /// Build a client over an explicit storage backend.
    pub fn new(config: ClientConfig, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        tracing::info!(
            api = %config.api_base_url,
            "Initializing Omega client v{}",
            env!("CARGO_PKG_VERSION")
        );

        let config = Arc::new(config);
        let api = ApiClient::new(Arc::clone(&config))?;
        let session = SessionStore::new(api.clone(), Arc::clone(&storage));
        let router = Router::new(Arc::clone(&config), storage);
        let social = SocialStore::new(
            api.clone(),
            session.clone(),
            router.clone(),
            config.auth_failure_policy,
        );
        let notifications = NotificationQueue::new(config.default_toast_duration);

        Ok(Self {
            config,
            api,
            session,
            social,
            notifications,
            router,
        })
    }

    /// Build a client, persisting the session under `config.data_dir` when set
    /// and keeping it in memory otherwise.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let storage: Arc<dyn SessionStorage> = match config.data_dir {
            Some(ref dir) => Arc::new(FileStorage::in_dir(dir)),
            None => Arc::new(MemoryStorage::new()),
        };
        Self::new(config, storage)
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Authentication state.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Friends and search.
    pub fn social(&self) -> &SocialStore {
        &self.social
    }

    /// Toasts and confirmations.
    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    /// Navigation.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Cancel in-flight requests, stop toast timers and cancel pending
    /// confirmations. Stores stay readable afterwards.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down Omega client");
        self.api.shutdown();
        self.notifications.shutdown();
    }
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Omega Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================
