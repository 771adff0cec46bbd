//! HTTP binding to the Appwrite REST API.
//!
//! Everything that talks to the network goes through [`AppwriteClient`]: it
//! builds requests against the configured endpoint, attaches the project
//! headers, replays the session credential, and turns error bodies into
//! [`RemoteError`]s.
//!
//! # Session credential
//!
//! Appwrite hands non-browser clients their session in an
//! `X-Fallback-Cookies` response header and expects it back on every request.
//! The client keeps the latest value in memory and, when built
//! [`with_cookie_storage`](AppwriteClient::with_cookie_storage), mirrors it to
//! local storage so a restarted process resumes the same session.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Query, RemoteError, RepositoryError, RepositoryResult};
use crate::config::BackendConfig;
use crate::storage::KeyValueStorage;

/// Storage key holding the session credential.
pub const SESSION_STORAGE_KEY: &str = "appwrite-session";

const FALLBACK_COOKIES_HEADER: &str = "x-fallback-cookies";
const PROJECT_HEADER: &str = "x-appwrite-project";
const RESPONSE_FORMAT_HEADER: &str = "x-appwrite-response-format";
const RESPONSE_FORMAT: &str = "1.5.0";

/// Shared HTTP client for the account and document repositories.
///
/// Cloning is cheap and clones share the session credential.
#[derive(Clone)]
pub struct AppwriteClient {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    timeout: Duration,
    fallback_cookies: Arc<Mutex<Option<String>>>,
    cookie_storage: Option<Arc<dyn KeyValueStorage>>,
}

impl AppwriteClient {
    pub fn new(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            timeout: config.timeout,
            fallback_cookies: Arc::new(Mutex::new(None)),
            cookie_storage: None,
        }
    }

    /// Restores a previously stored session credential and keeps storage in
    /// sync with every credential the server hands out from now on.
    pub fn with_cookie_storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        match storage.get(SESSION_STORAGE_KEY) {
            Ok(Some(cookies)) => {
                debug!("Restored stored session credential");
                self.set_cookies(Some(cookies));
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to read stored session credential: {}", e),
        }
        self.cookie_storage = Some(storage);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn fallback_cookies(&self) -> Option<String> {
        self.fallback_cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_cookies(&self, cookies: Option<String>) {
        *self
            .fallback_cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = cookies;
    }

    fn remember_cookies(&self, cookies: String) {
        if self.fallback_cookies().as_deref() == Some(cookies.as_str()) {
            return;
        }
        self.set_cookies(Some(cookies.clone()));

        if let Some(storage) = &self.cookie_storage {
            if let Err(e) = storage.set(SESSION_STORAGE_KEY, &cookies) {
                warn!("Failed to persist session credential: {}", e);
            }
        }
    }

    /// Sends a request and decodes the JSON body of a successful response.
    pub(crate) async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        queries: &[Query],
        body: Option<Value>,
    ) -> RepositoryResult<T> {
        let response = self.execute(method, path, queries, body).await?;
        let text = response
            .text()
            .await
            .map_err(|e| RepositoryError::InvalidResponse(e.to_string()))?;

        Ok(serde_json::from_str(&text)?)
    }

    /// Sends a request whose successful response carries no useful body.
    pub(crate) async fn request_empty(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> RepositoryResult<()> {
        self.execute(method, path, &[], body).await?;
        Ok(())
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        queries: &[Query],
        body: Option<Value>,
    ) -> RepositoryResult<reqwest::Response> {
        let url = format!("{}{}", self.endpoint, path);
        debug!(%method, %url, queries = queries.len(), "Sending request");

        let mut request_builder = self
            .client
            .request(method, &url)
            .header(PROJECT_HEADER, &self.project_id)
            .header(RESPONSE_FORMAT_HEADER, RESPONSE_FORMAT);

        if let Some(cookies) = self.fallback_cookies() {
            request_builder = request_builder.header(FALLBACK_COOKIES_HEADER, cookies);
        }

        if !queries.is_empty() {
            let params: Vec<(&str, String)> = queries
                .iter()
                .map(|q| ("queries[]", q.to_param()))
                .collect();
            request_builder = request_builder.query(&params);
        }

        if let Some(body) = &body {
            request_builder = request_builder.json(body);
        }

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RepositoryError::Timeout(self.timeout.as_millis() as u64)
            } else {
                RepositoryError::RequestFailed(e)
            }
        })?;

        if let Some(cookies) = response
            .headers()
            .get(FALLBACK_COOKIES_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
        {
            self.remember_cookies(cookies.to_string());
        }

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(remote_error(status, &text).into())
    }
}

fn remote_error(status: StatusCode, body: &str) -> RemoteError {
    match serde_json::from_str::<RemoteError>(body) {
        Ok(mut err) => {
            if err.code == 0 {
                err.code = status.as_u16();
            }
            err
        }
        Err(_) => RemoteError {
            message: if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            } else {
                body.trim().to_string()
            },
            code: status.as_u16(),
            kind: None,
        },
    }
}
