//! # Error Handling
//!
//! Error types shared by every store in Omega Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Lifecycle Errors                                                  │
//! │  │   └── ShutdownInProgress    - Client context is tearing down        │
//! │  │                                                                      │
//! │  ├── API Errors                                                        │
//! │  │   ├── Api                   - Server answered non-2xx + payload     │
//! │  │   ├── Transport             - No response (DNS, refused, timeout)   │
//! │  │   ├── SessionExpired        - 401/403, session was force-cleared    │
//! │  │   └── InvalidResponse       - 2xx body did not match the contract   │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                    │
//! │  │   ├── StorageReadError      - Failed to read persisted session      │
//! │  │   └── StorageWriteError     - Failed to write persisted session     │
//! │  │                                                                      │
//! │  ├── Routing Errors                                                    │
//! │  │   └── RouteNotFound         - Path is not in the route table        │
//! │  │                                                                      │
//! │  └── Notification Errors                                               │
//! │      └── ConfirmationCancelled - Dialog dropped before an answer       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      ERROR HANDLING FLOW                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Store action                 Caller                    UI             │
//! │  ──────────────────────────────────────────────────────────────────     │
//! │                                                                         │
//! │  register/login/add_friend ──► Result<T, Error> ──► render payload     │
//! │  search_users/get_friends  ──► state.error      ──► passive banner     │
//! │  any 401/403 (ForceLogout) ──► logout + /login  ──► login screen       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for Omega Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Omega Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Lifecycle Errors (100-199)
    // ========================================================================
    /// The client context is shutting down
    #[error("Omega client is shutting down.")]
    ShutdownInProgress,

    // ========================================================================
    // API Errors (500-599)
    // ========================================================================
    /// The server answered with a non-2xx status.
    ///
    /// `payload` is the server's error body when it was JSON, otherwise the
    /// raw body text wrapped in a JSON string (or `null` when empty).
    #[error("Server returned {status}: {payload}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error payload as sent by the server
        payload: serde_json::Value,
    },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// 401/403 received; the session was cleared and the user sent to login
    #[error("Session expired. Please log in again.")]
    SessionExpired,

    /// A 2xx response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    // ========================================================================
    // Storage Errors (400-499)
    // ========================================================================
    /// Failed to read from durable storage
    #[error("Failed to read from storage: {0}")]
    StorageReadError(String),

    /// Failed to write to durable storage
    #[error("Failed to write to storage: {0}")]
    StorageWriteError(String),

    // ========================================================================
    // Routing Errors (600-699)
    // ========================================================================
    /// No route matches the path
    #[error("No route for path: {0}")]
    RouteNotFound(String),

    // ========================================================================
    // Notification Errors (700-799)
    // ========================================================================
    /// A confirmation dialog was torn down before the user answered
    #[error("Confirmation was cancelled before an answer was given.")]
    ConfirmationCancelled,

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================
    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Numeric error code, grouped by category:
    /// - 100-199: Lifecycle
    /// - 400-499: Storage
    /// - 500-599: API
    /// - 600-699: Routing
    /// - 700-799: Notifications
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            Error::ShutdownInProgress => 100,

            Error::StorageReadError(_) => 400,
            Error::StorageWriteError(_) => 401,

            Error::Api { .. } => 500,
            Error::Transport(_) => 501,
            Error::SessionExpired => 502,
            Error::InvalidResponse(_) => 503,

            Error::RouteNotFound(_) => 600,

            Error::ConfirmationCancelled => 700,

            Error::SerializationError(_) => 900,
        }
    }

    /// Check if this error is recoverable by trying again later
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Check if the user has to sign in again
    pub fn requires_login(&self) -> bool {
        match self {
            Error::SessionExpired => true,
            Error::Api { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    /// The server's error payload, if the server produced one
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Error::Api { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::InvalidResponse(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
