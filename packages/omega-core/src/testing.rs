//! In-process stand-in for the Omega REST API, used by the unit tests.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A router served on an ephemeral localhost port for the lifetime of the value.
pub struct MockApi {
    base_url: String,
    server: tokio::task::JoinHandle<()>,
}

impl MockApi {
    pub async fn serve(router: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock api");
        let addr = listener.local_addr().expect("mock api address");
        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("mock api server");
        });

        Self {
            base_url: format!("http://{addr}"),
            server,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Token handed out by the mock login.
pub const VALID_TOKEN: &str = "tok-valid";

/// Knobs and recordings for the mock backend.
#[derive(Default)]
pub struct Backend {
    pub friends: Vec<Value>,
    /// Search results keyed by query; unknown queries answer `[]`.
    pub search: HashMap<String, Value>,
    /// Artificial latency per search query.
    pub search_delay: HashMap<String, Duration>,
    /// Forced status for the search endpoint.
    pub search_status: Option<StatusCode>,
    /// Forced status for `GET /api/users/friends`.
    pub friends_status: Option<StatusCode>,
    /// Forced status for `POST /api/users/friends`.
    pub add_friend_status: Option<StatusCode>,
    /// Friend ids received by `POST /api/users/friends`.
    pub added: Vec<Value>,
    /// Authorization headers seen, in order.
    pub auth_headers: Vec<Option<String>>,
    /// Bodies received by the register endpoint.
    pub registrations: Vec<Value>,
}

pub type SharedBackend = Arc<Mutex<Backend>>;

/// Serve the Omega REST surface backed by `backend`.
pub async fn omega_api(backend: SharedBackend) -> MockApi {
    let router = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/users/search", get(search))
        .route("/api/users/friends", get(list_friends).post(add_friend))
        .with_state(backend);
    MockApi::serve(router).await
}

fn record_auth(backend: &SharedBackend, headers: &HeaderMap) -> bool {
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let valid = header.as_deref() == Some(&format!("Bearer {VALID_TOKEN}"));
    backend.lock().auth_headers.push(header);
    valid
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Invalid token" })),
    )
        .into_response()
}

async fn register(State(backend): State<SharedBackend>, Json(body): Json<Value>) -> Response {
    backend.lock().registrations.push(body.clone());
    if body["username"] == "taken" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Username already exists" })),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({ "message": "User registered", "userId": 11 })),
    )
        .into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != "secret" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        )
            .into_response();
    }
    let username = body["username"].as_str().unwrap_or_default();
    Json(json!({
        "token": VALID_TOKEN,
        "user": { "id": 1, "username": username, "name": "Test User", "theme": "dark" }
    }))
    .into_response()
}

async fn search(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let valid = record_auth(&backend, &headers);
    let query = params.get("q").cloned().unwrap_or_default();
    let (status, delay, results) = {
        let b = backend.lock();
        (
            b.search_status,
            b.search_delay.get(&query).copied(),
            b.search.get(&query).cloned().unwrap_or_else(|| json!([])),
        )
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(status) = status {
        return (status, Json(json!({ "message": "forced" }))).into_response();
    }
    if !valid {
        return unauthorized();
    }
    Json(results).into_response()
}

async fn list_friends(State(backend): State<SharedBackend>, headers: HeaderMap) -> Response {
    let valid = record_auth(&backend, &headers);
    let (status, friends) = {
        let b = backend.lock();
        (b.friends_status, b.friends.clone())
    };
    if let Some(status) = status {
        return (status, Json(json!({ "message": "forced" }))).into_response();
    }
    if !valid {
        return unauthorized();
    }
    Json(Value::Array(friends)).into_response()
}

async fn add_friend(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let valid = record_auth(&backend, &headers);
    let status = backend.lock().add_friend_status;
    if let Some(status) = status {
        return (status, Json(json!({ "message": "forced" }))).into_response();
    }
    if !valid {
        return unauthorized();
    }

    let mut b = backend.lock();
    let friend_id = body["friendId"].clone();
    b.added.push(friend_id.clone());
    let username = format!("user{}", b.added.len());
    b.friends.push(json!({ "id": friend_id, "username": username }));
    StatusCode::CREATED.into_response()
}
