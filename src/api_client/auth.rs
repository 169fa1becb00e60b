// Login / refresh against /api/v1/auth/*. These calls bypass the bearer/retry
// pipeline. Backend payloads come in a few shapes; all are normalized here.
//
// Accepted variants:
//   {data: {...}} or the bare object
//   access_token | accessToken, refresh_token | refreshToken
//   userId | user.id, role | user.role (default USER), isTwoFactorEnabled

use super::{ApiClient, diagnostics};
use crate::error::{ApiError, Result};
use crate::models::User;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

const LOGIN_PATH: &str = "/api/v1/auth/login";
const REFRESH_PATH: &str = "/api/v1/auth/refresh-token";

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(t) => t,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PayloadUser {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthPayload {
    #[serde(default, rename = "access_token")]
    access_token_snake: Option<String>,
    #[serde(default, rename = "accessToken")]
    access_token_camel: Option<String>,
    #[serde(default, rename = "refresh_token")]
    refresh_token_snake: Option<String>,
    #[serde(default, rename = "refreshToken")]
    refresh_token_camel: Option<String>,
    #[serde(default, rename = "userId")]
    user_id: Option<serde_json::Value>,
    #[serde(default)]
    user: Option<PayloadUser>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default, rename = "isTwoFactorEnabled")]
    is_two_factor_enabled: Option<bool>,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

/// String or number ids both appear in the wild.
fn id_string(v: Option<&serde_json::Value>) -> Option<String> {
    match v? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl AuthPayload {
    fn access_token(&mut self) -> Option<String> {
        non_empty(self.access_token_snake.take()).or_else(|| non_empty(self.access_token_camel.take()))
    }

    fn refresh_token(&mut self) -> Option<String> {
        non_empty(self.refresh_token_snake.take())
            .or_else(|| non_empty(self.refresh_token_camel.take()))
    }

    fn user(&self, email: &str) -> User {
        let nested = self.user.as_ref();
        User {
            id: id_string(self.user_id.as_ref())
                .or_else(|| id_string(nested.and_then(|u| u.id.as_ref())))
                .unwrap_or_default(),
            email: email.to_string(),
            role: self
                .role
                .clone()
                .or_else(|| nested.and_then(|u| u.role.clone()))
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "USER".into()),
            is_two_factor_enabled: self.is_two_factor_enabled.unwrap_or(false),
        }
    }
}

/// Normalized login result.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: User,
}

/// Parse a login body. Exposed for unit tests of the accepted shapes.
pub(crate) fn parse_login(body: &str, email: &str) -> Result<Session> {
    let mut payload = decode_payload(body, LOGIN_PATH)?;
    let access_token = payload
        .access_token()
        .ok_or_else(|| ApiError::Auth("access token not found in response".into()))?;
    Ok(Session {
        access_token,
        refresh_token: payload.refresh_token(),
        user: payload.user(email),
    })
}

pub(crate) fn parse_refresh(body: &str) -> Result<String> {
    decode_payload(body, REFRESH_PATH)?
        .access_token()
        .ok_or_else(|| ApiError::Auth("access token not found in refresh response".into()))
}

fn decode_payload(body: &str, path: &str) -> Result<AuthPayload> {
    decode::<Envelope<AuthPayload>>(body, path).map(Envelope::into_inner)
}

fn decode<T: DeserializeOwned>(body: &str, path: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode {
        url: path.to_string(),
        message: e.to_string(),
    })
}

impl ApiClient {
    async fn post_unauthenticated(&self, path: &str, body: serde_json::Value) -> Result<String> {
        let url = self.url(path);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| diagnostics::transport_error(&url, e))?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), body = %text, "auth request rejected");
            return Err(ApiError::Status {
                url,
                status,
                body: text,
            });
        }
        Ok(text)
    }

    /// POST /api/v1/auth/login and store the resulting credential pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let body = self
            .post_unauthenticated(
                LOGIN_PATH,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        let session = parse_login(&body, email)?;
        let stored = self
            .credentials
            .set(
                &session.access_token,
                session.refresh_token.as_deref(),
                Some(&session.user),
            )
            .await?;
        if !stored {
            return Err(ApiError::Auth("backend returned a malformed access token".into()));
        }
        info!(user = %session.user.email, "logged in");
        Ok(session)
    }

    /// POST /api/v1/auth/refresh-token, returning the new access token. Does not store it.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<String> {
        let body = self
            .post_unauthenticated(
                REFRESH_PATH,
                serde_json::json!({ "refreshToken": refresh_token }),
            )
            .await?;
        parse_refresh(&body)
    }

    pub async fn logout(&self) -> Result<()> {
        self.credentials.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_accepts_wrapped_snake_case() {
        let body = r#"{"data":{"access_token":"a.b.c","refresh_token":"r.s.t","userId":7,"isTwoFactorEnabled":true},"success":true}"#;
        let s = parse_login(body, "ops@example.com").unwrap();
        assert_eq!(s.access_token, "a.b.c");
        assert_eq!(s.refresh_token.as_deref(), Some("r.s.t"));
        assert_eq!(s.user.id, "7");
        assert_eq!(s.user.email, "ops@example.com");
        assert_eq!(s.user.role, "USER");
        assert!(s.user.is_two_factor_enabled);
    }

    #[test]
    fn login_accepts_bare_camel_case_with_nested_user() {
        let body = r#"{"accessToken":"a.b.c","refreshToken":"r.s.t","user":{"id":"u1","role":"ADMIN"}}"#;
        let s = parse_login(body, "x@y.z").unwrap();
        assert_eq!(s.access_token, "a.b.c");
        assert_eq!(s.user.id, "u1");
        assert_eq!(s.user.role, "ADMIN");
    }

    #[test]
    fn snake_case_wins_when_both_present() {
        let body = r#"{"data":{"access_token":"s.s.s","accessToken":"c.c.c"}}"#;
        assert_eq!(parse_login(body, "e").unwrap().access_token, "s.s.s");
    }

    #[test]
    fn missing_access_token_is_an_auth_error() {
        let err = parse_login(r#"{"data":{"refresh_token":"r.s.t"}}"#, "e").unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
        let err = parse_refresh(r#"{"data":{"accessToken":""}}"#).unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[test]
    fn refresh_accepts_both_shapes() {
        assert_eq!(parse_refresh(r#"{"data":{"access_token":"n.e.w"}}"#).unwrap(), "n.e.w");
        assert_eq!(parse_refresh(r#"{"accessToken":"n.e.w"}"#).unwrap(), "n.e.w");
    }
}
