// Authenticated backend client: bearer injection, one refresh-and-retry on 401,
// failure diagnostics. One instance per project; credentials are shared.

mod actuator;
mod auth;
pub mod diagnostics;
mod monitoring;

pub use auth::Session;

use crate::credential_store::{ACCESS_TOKEN_KEY, CredentialStore, is_jwt_shaped};
use crate::error::{ApiError, Result};
use crate::models::Project;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A 401 is retried at most this many times, each after one refresh.
const MAX_AUTH_RETRIES: u8 = 1;

/// Everything needed to (re)issue a request. Kept as data so a retry rebuilds it exactly.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    accept: Option<&'static str>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            accept: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        let mut req = Self::new(Method::POST, path);
        req.body = Some(body);
        req
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn accept(mut self, mime: &'static str) -> Self {
        self.accept = Some(mime);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<CredentialStore>,
}

impl ApiClient {
    /// Client for `project`, or for `default_api_url` when no project (or an empty URL) is given.
    pub fn new(
        project: Option<&Project>,
        default_api_url: &str,
        timeout: Duration,
        credentials: Arc<CredentialStore>,
    ) -> anyhow::Result<Self> {
        let base_url = project
            .map(|p| p.api_url.as_str())
            .filter(|u| !u.is_empty())
            .unwrap_or(default_api_url)
            .trim_end_matches('/')
            .to_string();
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue `req`. On a 401 the stored refresh token is exchanged once and the
    /// request re-sent; the caller only sees the final outcome.
    pub async fn send(&self, req: &ApiRequest) -> Result<Response> {
        let mut attempt: u8 = 0;
        let mut bearer = self.bearer().await;
        loop {
            match self.dispatch(req, bearer.as_deref()).await {
                Err(e) if e.is_unauthorized() && attempt < MAX_AUTH_RETRIES => {
                    attempt += 1;
                    debug!(path = %req.path, attempt, "401 received; refreshing access token");
                    bearer = Some(self.refresh_after_unauthorized().await?);
                }
                other => return other,
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, req: &ApiRequest) -> Result<T> {
        let response = self.send(req).await?;
        response.json::<T>().await.map_err(|e| ApiError::Decode {
            url: self.url(&req.path),
            message: e.to_string(),
        })
    }

    pub async fn get_text(&self, req: &ApiRequest) -> Result<String> {
        let response = self.send(req).await?;
        response.text().await.map_err(|e| ApiError::Decode {
            url: self.url(&req.path),
            message: e.to_string(),
        })
    }

    /// Stored access token if JWT-shaped. Anything else goes out unauthenticated.
    async fn bearer(&self) -> Option<String> {
        let token = self.credentials.read_raw(ACCESS_TOKEN_KEY).await?;
        if is_jwt_shaped(&token) {
            Some(token)
        } else {
            warn!("stored access token is not JWT-shaped; sending request without it");
            None
        }
    }

    async fn dispatch(&self, req: &ApiRequest, bearer: Option<&str>) -> Result<Response> {
        let url = self.url(&req.path);
        let mut builder = self
            .http
            .request(req.method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(accept) = req.accept {
            builder = builder.header(ACCEPT, accept);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| diagnostics::transport_error(&url, e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        diagnostics::log_status(status, &url);
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status { url, status, body })
    }

    /// Exchange the stored refresh token and persist the new access token next to
    /// the unchanged refresh token and user. Any failure here logs the user out.
    async fn refresh_after_unauthorized(&self) -> Result<String> {
        let result: Result<String> = async {
            let refresh = self
                .credentials
                .refresh_token()
                .await
                .ok_or(ApiError::NoRefreshToken)?;
            let access = self.refresh_token(&refresh).await?;
            let user = self.credentials.user().await;
            if !self
                .credentials
                .set(&access, Some(&refresh), user.as_ref())
                .await?
            {
                warn!("refreshed access token was not stored; retrying with it anyway");
            }
            Ok(access)
        }
        .await;

        if let Err(e) = &result {
            warn!(error = %e, "token refresh failed; clearing credentials");
            if let Err(clear_err) = self.credentials.clear().await {
                warn!(error = %clear_err, "failed to clear credentials");
            }
        }
        result
    }
}

/// One `ApiClient` per project id, created on first use. All share one credential store.
pub struct ClientPool {
    clients: RwLock<HashMap<String, Arc<ApiClient>>>,
    default_api_url: String,
    timeout: Duration,
    credentials: Arc<CredentialStore>,
}

impl ClientPool {
    pub fn new(default_api_url: &str, timeout: Duration, credentials: Arc<CredentialStore>) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            default_api_url: default_api_url.to_string(),
            timeout,
            credentials,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Drop every cached client so the next `get` picks up changed project URLs.
    pub async fn clear(&self) {
        self.clients.write().await.clear();
    }

    /// Client for `project`, or for the default backend when `None`.
    pub async fn get(&self, project: Option<&Project>) -> anyhow::Result<Arc<ApiClient>> {
        let key = project.map(|p| p.id.as_str()).unwrap_or_default();
        if let Some(client) = self.clients.read().await.get(key) {
            return Ok(client.clone());
        }
        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(key) {
            return Ok(client.clone());
        }
        let client = Arc::new(ApiClient::new(
            project,
            &self.default_api_url,
            self.timeout,
            self.credentials.clone(),
        )?);
        clients.insert(key.to_string(), client.clone());
        Ok(client)
    }
}
