//! # Storage Module
//!
//! Durable key-value storage for the session.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SESSION STORAGE                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SessionStorage trait                                                  │
//! │  • retrieve(key)          - Read one value                             │
//! │  • store_all(entries)     - Write several values as one unit           │
//! │  • delete_all(keys)       - Remove several values as one unit          │
//! │                                                                         │
//! │  Keys                                                                  │
//! │  • "token"  - raw bearer token                                         │
//! │  • "user"   - JSON-serialized UserProfile                              │
//! │                                                                         │
//! │  ┌───────────────┐  ┌───────────────────────────────┐                  │
//! │  │ MemoryStorage │  │ FileStorage                   │                  │
//! │  │ process-local │  │ JSON document, temp + rename  │                  │
//! │  └───────────────┘  └───────────────────────────────┘                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Readers that need the persisted session (the session store at startup,
//! the route guard on every navigation) go through [`load_user`] and
//! [`load_token`], which treat malformed data the same as missing data.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;
use crate::models::UserProfile;

/// Key names for persisted session data
pub mod keys {
    /// The bearer token, stored raw
    pub const TOKEN: &str = "token";

    /// The signed-in user's profile, stored as JSON
    pub const USER: &str = "user";
}

/// Durable key-value storage backing the session.
pub trait SessionStorage: Send + Sync {
    /// Read a value.
    fn retrieve(&self, key: &str) -> Result<Option<String>>;

    /// Write all entries as one unit.
    fn store_all(&self, entries: &[(&str, &str)]) -> Result<()>;

    /// Remove all keys as one unit. Missing keys are ignored.
    fn delete_all(&self, keys: &[&str]) -> Result<()>;

    /// Write a single value.
    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.store_all(&[(key, value)])
    }

    /// Remove a single value.
    fn delete(&self, key: &str) -> Result<()> {
        self.delete_all(&[key])
    }

    /// Check if a key exists.
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.retrieve(key)?.is_some())
    }
}

/// Persist a signed-in session (token and user written together).
pub fn store_session(storage: &dyn SessionStorage, token: &str, user: &UserProfile) -> Result<()> {
    let user_json = serde_json::to_string(user)?;
    storage.store_all(&[(keys::TOKEN, token), (keys::USER, &user_json)])
}

/// Remove both session keys.
pub fn clear_session(storage: &dyn SessionStorage) -> Result<()> {
    storage.delete_all(&[keys::TOKEN, keys::USER])
}

/// Read the persisted token. Unreadable storage yields `None`.
pub fn load_token(storage: &dyn SessionStorage) -> Option<String> {
    match storage.retrieve(keys::TOKEN) {
        Ok(token) => token.filter(|t| !t.is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read persisted token");
            None
        }
    }
}

/// Read the persisted user. Missing, unreadable or malformed data yields `None`.
pub fn load_user(storage: &dyn SessionStorage) -> Option<UserProfile> {
    let raw = match storage.retrieve(keys::USER) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read persisted user");
            return None;
        }
    };

    match serde_json::from_str::<Option<UserProfile>>(&raw) {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Persisted user is malformed, ignoring it");
            None
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
