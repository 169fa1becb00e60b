// Errors surfaced by the backend client and credential store

use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// Why a request never produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportClass {
    /// Error text points at a cross-origin rejection.
    Cors,
    /// Connect failure, abort, or timeout.
    Network,
    Other,
}

impl fmt::Display for TransportClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportClass::Cors => "cors",
            TransportClass::Network => "network",
            TransportClass::Other => "other",
        })
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no response from {url} ({class}): {source}")]
    Transport {
        url: String,
        class: TransportClass,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("no refresh token stored")]
    NoRefreshToken,

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("invalid response body from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("credential store: {0}")]
    Store(#[from] sqlx::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status of the failed response, if one arrived.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
