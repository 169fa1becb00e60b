// Observational logging for failed requests. Nothing here changes control flow.

use crate::error::{ApiError, TransportClass};
use reqwest::StatusCode;
use std::error::Error as _;
use tracing::{info, warn};

/// Classify a request that produced no response.
pub fn classify_transport(message: &str, is_connect: bool, is_timeout: bool) -> TransportClass {
    if message.contains("CORS") || message.contains("Access-Control") {
        TransportClass::Cors
    } else if is_connect
        || is_timeout
        || message.contains("ECONNABORTED")
        || message.contains("ERR_NETWORK")
        || message.contains("connection closed")
    {
        TransportClass::Network
    } else {
        TransportClass::Other
    }
}

/// Full source chain, so hints buried in an inner error are seen by the classifier.
fn error_chain_text(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        text.push_str(": ");
        text.push_str(&s.to_string());
        source = s.source();
    }
    text
}

/// Wrap a transport failure, logging which kind it looks like. The error itself is kept as-is.
pub(super) fn transport_error(url: &str, err: reqwest::Error) -> ApiError {
    let text = error_chain_text(&err);
    let class = classify_transport(&text, err.is_connect(), err.is_timeout());
    match class {
        TransportClass::Cors | TransportClass::Network => warn!(
            url,
            class = %class,
            error = %text,
            "no response from backend; check CORS settings and that the backend is reachable"
        ),
        TransportClass::Other => warn!(url, error = %text, "request failed before a response arrived"),
    }
    ApiError::Transport {
        url: url.to_string(),
        class,
        source: err,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    NotFound,
    Unavailable,
    Server,
    Client,
}

pub fn status_category(status: StatusCode) -> StatusCategory {
    match status {
        StatusCode::NOT_FOUND => StatusCategory::NotFound,
        StatusCode::SERVICE_UNAVAILABLE => StatusCategory::Unavailable,
        s if s.is_server_error() => StatusCategory::Server,
        _ => StatusCategory::Client,
    }
}

pub(super) fn log_status(status: StatusCode, url: &str) {
    match status_category(status) {
        StatusCategory::NotFound => {
            warn!(url, status = status.as_u16(), "endpoint not found on backend")
        }
        StatusCategory::Unavailable => {
            warn!(url, status = status.as_u16(), "backend unavailable")
        }
        StatusCategory::Server => warn!(url, status = status.as_u16(), "backend server error"),
        StatusCategory::Client => info!(url, status = status.as_u16(), "request rejected"),
    }
}
