// Bearer injection, refresh-and-retry and login against a fake backend

mod common;

use actuator_monitor::api_client::ApiRequest;
use actuator_monitor::credential_store::{ACCESS_TOKEN_KEY, CredentialStore};
use actuator_monitor::error::ApiError;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use common::{ACCESS, REFRESH, client, memory_credentials, serve, user};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const NEW_ACCESS: &str = "new.access.token";

#[derive(Clone)]
struct Backend {
    seen_auth: Arc<Mutex<Vec<Option<String>>>>,
    refresh_calls: Arc<AtomicUsize>,
    broken_calls: Arc<AtomicUsize>,
    /// Token handed out by the refresh endpoint; `None` makes it fail.
    issued: Option<&'static str>,
}

impl Backend {
    fn new(issued: Option<&'static str>) -> Self {
        Self {
            seen_auth: Arc::default(),
            refresh_calls: Arc::default(),
            broken_calls: Arc::default(),
            issued,
        }
    }

    fn seen(&self) -> Vec<Option<String>> {
        self.seen_auth.lock().unwrap().clone()
    }
}

async fn protected(State(b): State<Backend>, headers: HeaderMap) -> Response {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    b.seen_auth.lock().unwrap().push(auth.clone());
    if auth.as_deref() == Some("Bearer new.access.token") {
        Json(json!({
            "name": "jvm.memory.used",
            "measurements": [{"statistic": "VALUE", "value": 128.0}],
            "availableTags": []
        }))
        .into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn refresh(State(b): State<Backend>, Json(body): Json<Value>) -> Response {
    b.refresh_calls.fetch_add(1, Ordering::SeqCst);
    match b.issued {
        Some(token) if body["refreshToken"] == REFRESH => {
            Json(json!({ "data": { "access_token": token } })).into_response()
        }
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn broken(State(b): State<Backend>) -> StatusCode {
    b.broken_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "secret" {
        Json(json!({
            "data": {
                "accessToken": "a.b.c",
                "refreshToken": "r.s.t",
                "user": { "id": 5, "role": "ADMIN" }
            }
        }))
        .into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "bad credentials" }))).into_response()
    }
}

async fn start(backend: Backend) -> String {
    let router = Router::new()
        .route("/actuator/metrics/{name}", get(protected))
        .route("/api/v1/auth/refresh-token", post(refresh))
        .route("/api/v1/auth/login", post(login))
        .route("/broken", get(broken))
        .with_state(backend);
    serve(router).await
}

async fn signed_in() -> Arc<CredentialStore> {
    let credentials = memory_credentials();
    assert!(credentials.set(ACCESS, Some(REFRESH), Some(&user())).await.unwrap());
    credentials
}

#[tokio::test]
async fn test_401_refreshes_and_retries_once() {
    let backend = Backend::new(Some(NEW_ACCESS));
    let url = start(backend.clone()).await;
    let credentials = signed_in().await;
    let api = client(&url, credentials.clone());

    let used = api.jvm_memory_used().await.expect("retried request succeeds");
    assert_eq!(used.measurement("VALUE"), Some(128.0));

    assert_eq!(
        backend.seen(),
        vec![
            Some(format!("Bearer {}", ACCESS)),
            Some(format!("Bearer {}", NEW_ACCESS)),
        ]
    );
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(credentials.access_token().await.as_deref(), Some(NEW_ACCESS));
    assert_eq!(credentials.refresh_token().await.as_deref(), Some(REFRESH));
    assert_eq!(credentials.user().await, Some(user()));
}

#[tokio::test]
async fn test_refresh_failure_clears_credentials_and_returns_refresh_error() {
    let backend = Backend::new(None);
    let url = start(backend.clone()).await;
    let credentials = signed_in().await;
    let api = client(&url, credentials.clone());

    let err = api.jvm_memory_used().await.unwrap_err();
    match &err {
        ApiError::Status { url, status, .. } => {
            assert!(url.ends_with("/api/v1/auth/refresh-token"), "got {}", url);
            assert_eq!(*status, StatusCode::UNAUTHORIZED);
        }
        other => panic!("expected refresh status error, got {:?}", other),
    }
    assert_eq!(backend.seen().len(), 1, "original request is not re-sent");
    assert!(credentials.access_token().await.is_none());
    assert!(credentials.refresh_token().await.is_none());
    assert!(credentials.user().await.is_none());
}

#[tokio::test]
async fn test_missing_refresh_token_fails_without_refresh_call() {
    let backend = Backend::new(Some(NEW_ACCESS));
    let url = start(backend.clone()).await;
    let credentials = memory_credentials();
    credentials.set(ACCESS, None, Some(&user())).await.unwrap();
    let api = client(&url, credentials.clone());

    let err = api.jvm_memory_used().await.unwrap_err();
    assert!(matches!(err, ApiError::NoRefreshToken));
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 0);
    assert!(!credentials.is_authenticated().await);
}

#[tokio::test]
async fn test_second_401_is_returned_without_another_refresh() {
    let backend = Backend::new(Some("still.not.accepted"));
    let url = start(backend.clone()).await;
    let api = client(&url, signed_in().await);

    let err = api.jvm_memory_used().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.seen().len(), 2);
}

#[tokio::test]
async fn test_non_401_error_is_not_retried() {
    let backend = Backend::new(Some(NEW_ACCESS));
    let url = start(backend.clone()).await;
    let credentials = signed_in().await;
    let api = client(&url, credentials.clone());

    let err = api.send(&ApiRequest::get("/broken")).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(backend.broken_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 0);
    assert!(credentials.is_authenticated().await);
}

#[tokio::test]
async fn test_malformed_stored_token_is_not_sent() {
    let backend = Backend::new(None);
    let url = start(backend.clone()).await;
    let credentials = memory_credentials();
    credentials
        .kv()
        .set(ACCESS_TOKEN_KEY, "opaque-session-id")
        .await
        .unwrap();
    let api = client(&url, credentials);

    let _ = api.jvm_memory_used().await;
    assert_eq!(backend.seen().first(), Some(&None));
}

#[tokio::test]
async fn test_connection_refused_is_a_network_transport_error() {
    let credentials = memory_credentials();
    let api = client("http://127.0.0.1:1", credentials);
    let err = api.health().await.unwrap_err();
    match err {
        ApiError::Transport { class, .. } => {
            assert_eq!(class, actuator_monitor::error::TransportClass::Network)
        }
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_login_stores_normalized_session() {
    let url = start(Backend::new(None)).await;
    let credentials = memory_credentials();
    let api = client(&url, credentials.clone());

    let session = api.login("ops@example.com", "secret").await.unwrap();
    assert_eq!(session.access_token, "a.b.c");
    assert_eq!(session.user.id, "5");
    assert_eq!(session.user.email, "ops@example.com");
    assert_eq!(session.user.role, "ADMIN");
    assert!(credentials.is_authenticated().await);
    assert_eq!(credentials.refresh_token().await.as_deref(), Some("r.s.t"));

    api.logout().await.unwrap();
    assert!(!credentials.is_authenticated().await);
}

#[tokio::test]
async fn test_rejected_login_leaves_store_empty() {
    let url = start(Backend::new(None)).await;
    let credentials = memory_credentials();
    let api = client(&url, credentials.clone());

    let err = api.login("ops@example.com", "wrong").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!credentials.is_authenticated().await);
}
