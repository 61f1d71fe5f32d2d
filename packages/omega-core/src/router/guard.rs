//! Admin guard for privileged routes.
//!
//! The guard reads the *persisted* user rather than the session store's
//! in-memory copy, so it reflects whatever durable storage holds at the
//! moment of navigation. A user must be present and their username must be on
//! [`ClientConfig::admin_usernames`].

use super::Route;
use crate::config::ClientConfig;
use crate::storage::{self, SessionStorage};

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Enter the requested route.
    Allow,
    /// Go here instead.
    Redirect(Route),
}

/// Allow only allow-listed admins; everyone else goes to `/`.
pub fn admin_guard(storage: &dyn SessionStorage, config: &ClientConfig) -> GuardDecision {
    match storage::load_user(storage) {
        Some(user) if config.is_admin(&user.username) => GuardDecision::Allow,
        _ => GuardDecision::Redirect(Route::Home),
    }
}

// ============================================================================
// TESTS
// ============================================================================
