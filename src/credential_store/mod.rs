// Access/refresh token pair + user record, persisted behind a key-value trait.
// Reads validate shape and treat anything malformed as absent.

mod memory;
mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

use crate::error::Result;
use crate::models::User;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, warn};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";
pub const SELECTED_PROJECT_KEY: &str = "selectedProjectId";

/// Durable string storage. Implementations must be safe to share across tasks.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Structural JWT check: exactly two '.' separators. No signature verification.
pub fn is_jwt_shaped(token: &str) -> bool {
    token.matches('.').count() == 2
}

/// Empty values and the literal strings left behind by stringified null/undefined.
fn is_sentinel(value: &str) -> bool {
    value.is_empty() || value == "undefined" || value == "null"
}

/// Shared credential context. Every `ApiClient` holds the same `Arc<CredentialStore>`,
/// so a refresh by one client is visible to all of them.
pub struct CredentialStore {
    kv: Arc<dyn KvStore>,
}

impl CredentialStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// The key-value backend, shared with other persisted client state.
    pub fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    pub async fn access_token(&self) -> Option<String> {
        self.read_token(ACCESS_TOKEN_KEY).await
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.read_token(REFRESH_TOKEN_KEY).await
    }

    async fn read_token(&self, key: &str) -> Option<String> {
        let token = self.read_raw(key).await?;
        if is_sentinel(&token) || !is_jwt_shaped(&token) {
            return None;
        }
        Some(token)
    }

    /// Stored user record. A value that does not parse is removed from the store.
    pub async fn user(&self) -> Option<User> {
        let raw = self.read_raw(USER_KEY).await?;
        if is_sentinel(&raw) {
            return None;
        }
        match serde_json::from_str::<User>(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                error!(error = %e, operation = "read_user", "stored user record is not valid JSON; discarding");
                if let Err(e) = self.kv.remove(USER_KEY).await {
                    warn!(error = %e, operation = "read_user", "failed to discard user record");
                }
                None
            }
        }
    }

    pub(crate) async fn read_raw(&self, key: &str) -> Option<String> {
        match self.kv.get(key).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, key, "credential read failed; treating as absent");
                None
            }
        }
    }

    /// Persist a credential pair. Returns `Ok(false)` without touching stored state
    /// when the access token is a sentinel or not JWT-shaped.
    pub async fn set(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        user: Option<&User>,
    ) -> Result<bool> {
        if is_sentinel(access_token) {
            error!(operation = "set_tokens", "invalid access token; not stored");
            return Ok(false);
        }
        if !is_jwt_shaped(access_token) {
            error!(
                operation = "set_tokens",
                dots = access_token.matches('.').count(),
                "access token is not JWT-shaped (expected 2 dots); not stored"
            );
            return Ok(false);
        }

        self.kv.set(ACCESS_TOKEN_KEY, access_token).await?;
        if let Some(refresh) = refresh_token.filter(|r| !is_sentinel(r)) {
            if !is_jwt_shaped(refresh) {
                warn!(operation = "set_tokens", "refresh token is not JWT-shaped");
            }
            self.kv.set(REFRESH_TOKEN_KEY, refresh).await?;
        }
        if let Some(user) = user {
            let json = serde_json::to_string(user)
                .map_err(|e| crate::error::ApiError::InvalidRequest(e.to_string()))?;
            self.kv.set(USER_KEY, &json).await?;
        }
        Ok(true)
    }

    pub async fn clear(&self) -> Result<()> {
        self.kv.remove(ACCESS_TOKEN_KEY).await?;
        self.kv.remove(REFRESH_TOKEN_KEY).await?;
        self.kv.remove(USER_KEY).await?;
        Ok(())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.access_token().await.is_some() && self.user().await.is_some()
    }
}
