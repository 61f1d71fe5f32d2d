//! Client configuration.
//!
//! A single [`ClientConfig`] is handed to [`crate::OmegaClient`] at startup.
//! Every store reads its endpoints and tunables from it; nothing in the crate
//! hardcodes a host.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default REST API root.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";

/// Default toast lifetime (3 seconds).
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(3000);

/// Default per-request timeout.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Usernames allowed onto the terminal view when nothing else is configured.
pub const DEFAULT_ADMIN_USERNAMES: [&str; 2] = ["OmegaAdmin", "SupremeAdmin"];

/// What the social store does when the API answers 401 or 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthFailurePolicy {
    /// Clear the session and redirect to `/login`.
    #[default]
    ForceLogout,
    /// Treat the status like any other failure.
    Report,
}

impl std::str::FromStr for AuthFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "force-logout" | "force_logout" | "logout" => Ok(Self::ForceLogout),
            "report" => Ok(Self::Report),
            other => Err(format!("unknown auth failure policy: {other}")),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root of the REST API, without a trailing slash.
    pub api_base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Lifetime of toasts created through the convenience helpers.
    pub default_toast_duration: Duration,
    /// Usernames allowed onto guarded routes.
    pub admin_usernames: Vec<String>,
    /// Reaction to 401/403 from authorized calls.
    pub auth_failure_policy: AuthFailurePolicy,
    /// Directory holding the persisted session, if any.
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            default_toast_duration: DEFAULT_TOAST_DURATION,
            admin_usernames: DEFAULT_ADMIN_USERNAMES
                .iter()
                .map(|name| name.to_string())
                .collect(),
            auth_failure_policy: AuthFailurePolicy::default(),
            data_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("OMEGA_API_URL") {
            config = config.with_api_base_url(url);
        }
        if let Some(secs) = parse_var::<u64>("OMEGA_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>("OMEGA_TOAST_MS") {
            config.default_toast_duration = Duration::from_millis(ms);
        }
        if let Ok(admins) = env::var("OMEGA_ADMINS") {
            let admins: Vec<String> = admins
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
            if !admins.is_empty() {
                config.admin_usernames = admins;
            }
        }
        if let Some(policy) = parse_var::<AuthFailurePolicy>("OMEGA_AUTH_POLICY") {
            config.auth_failure_policy = policy;
        }
        config.data_dir = env::var("OMEGA_DATA_DIR").ok().map(PathBuf::from);

        config
    }

    /// Set the API root, trimming any trailing slashes.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Absolute URL for an API path such as `/api/auth/login`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    /// Whether `username` is on the admin allow-list.
    pub fn is_admin(&self, username: &str) -> bool {
        self.admin_usernames.iter().any(|admin| admin == username)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key = key, error = %e, "Invalid value, using default");
            None
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
