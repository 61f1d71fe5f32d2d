//! Wire-level records shared by the stores.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned user identifier. The API uses numbers today but the client
/// does not depend on that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    /// Numeric identifier
    Numeric(i64),
    /// Opaque string identifier
    Text(String),
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId::Numeric(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId::Text(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        UserId::Text(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Numeric(id) => write!(f, "{id}"),
            UserId::Text(id) => f.write_str(id),
        }
    }
}

impl std::str::FromStr for UserId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>()
            .map(UserId::Numeric)
            .unwrap_or_else(|_| UserId::Text(s.to_string())))
    }
}

/// A user profile as returned by the API.
///
/// Only `username` is required. Fields the client does not know about are kept
/// in `extra` so a profile written back to storage is unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Server-assigned identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    /// Login name
    pub username: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Any other fields the server sent
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    /// Build a profile with no id and no extra fields.
    pub fn new(username: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: None,
            username: username.into(),
            name: name.map(String::from),
            extra: serde_json::Map::new(),
        }
    }

    /// Display name, falling back to the username.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.username)
    }
}

/// Friend and search-result entries share the profile shape.
pub type FriendRecord = UserProfile;

/// Body of a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer token
    pub token: String,
    /// Signed-in user
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct AddFriendRequest<'a> {
    #[serde(rename = "friendId")]
    pub friend_id: &'a UserId,
}

// ============================================================================
// TESTS
// ============================================================================
