//! # REST Transport
//!
//! Thin wrapper over `reqwest` shared by the session and social stores.
//!
//! - Every URL is built from [`ClientConfig::api_base_url`].
//! - Non-2xx responses become [`Error::Api`] carrying the server's payload.
//! - Requests that never get a response become [`Error::Transport`].
//! - [`ApiClient::shutdown`] makes every in-flight and future request resolve
//!   with [`Error::ShutdownInProgress`].
//!
//! No retries are performed.

pub mod endpoints;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Whether `err` is a 401/403 answer from the server.
pub fn is_auth_failure(err: &Error) -> bool {
    matches!(
        err,
        Error::Api { status, .. }
            if *status == StatusCode::UNAUTHORIZED.as_u16()
                || *status == StatusCode::FORBIDDEN.as_u16()
    )
}

/// HTTP client bound to one API root.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl ApiClient {
    /// Build a client from the configuration.
    pub fn new(config: Arc<ClientConfig>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            http,
            config,
            shutdown_tx: Arc::new(shutdown_tx),
        })
    }

    /// Configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Cancel in-flight requests and refuse new ones.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Whether [`ApiClient::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// `GET` a JSON document.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        token: Option<&str>,
    ) -> Result<T> {
        let request = self.request(Method::GET, path, token).query(query);
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }

    /// `POST` a JSON body and decode a JSON answer.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T> {
        let request = self.request(Method::POST, path, token).json(body);
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }

    /// `POST` a JSON body where only the status matters.
    pub async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<()> {
        let request = self.request(Method::POST, path, token).json(body);
        self.send(request).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let request = self.http.request(method, self.config.endpoint(path));
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow() {
            return Err(Error::ShutdownInProgress);
        }

        let response = tokio::select! {
            result = request.send() => result?,
            _ = shutdown_rx.wait_for(|down| *down) => {
                tracing::debug!("Request cancelled by shutdown");
                return Err(Error::ShutdownInProgress);
            }
        };

        let status = response.status();
        tracing::debug!(url = %response.url().path(), status = status.as_u16(), "API response");

        if status.is_success() {
            return Ok(response);
        }

        let payload = error_payload(response).await;
        Err(Error::Api {
            status: status.as_u16(),
            payload,
        })
    }
}

/// The server's error body: parsed JSON, else the text as a JSON string,
/// else `null`.
async fn error_payload(response: Response) -> serde_json::Value {
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to read error body");
            return serde_json::Value::Null;
        }
    };

    if bytes.is_empty() {
        return serde_json::Value::Null;
    }

    serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
    })
}

// ============================================================================
// TESTS
// ============================================================================
