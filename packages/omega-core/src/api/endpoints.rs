//! REST paths, relative to the configured API root.

/// `POST {username, password, name}` → server-defined payload
pub const AUTH_REGISTER: &str = "/api/auth/register";

/// `POST {username, password}` → `{token, user}`
pub const AUTH_LOGIN: &str = "/api/auth/login";

/// `GET ?q=<query>` (bearer) → `[user]`
pub const USERS_SEARCH: &str = "/api/users/search";

/// `GET` (bearer) → `[user]`; `POST {friendId}` (bearer) → status only
pub const USERS_FRIENDS: &str = "/api/users/friends";
