//! Error types for client operations

use reqwest::StatusCode;
use serde_json::Value;
use transport::TransportError;

/// Errors surfaced by `Client` calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(String),

    #[error("request aborted")]
    Aborted,

    /// Non-2xx response. `message` comes from the body's `errorMessage`
    /// field when present, otherwise `HTTP <status>`.
    #[error("{message}")]
    Http {
        status: StatusCode,
        message: String,
        body: Option<Value>,
    },

    #[error("failed to serialize request body: {0}")]
    Serialize(String),

    #[error("failed to decode response body: {0}")]
    Decode(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("upload failed: {0}")]
    UploadFailed(u16),

    #[error("interceptor failed: {0}")]
    Interceptor(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// HTTP status for `Http` and `UploadFailed` errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::UploadFailed(code) => StatusCode::from_u16(*code).ok(),
            _ => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Network(msg) => Error::Network(msg),
            TransportError::Timeout(msg) => Error::Network(format!("timed out: {msg}")),
            TransportError::Aborted => Error::Aborted,
            TransportError::UnsupportedMethod(method) => {
                Error::InvalidRequest(format!("unsupported method {method}"))
            }
            TransportError::InvalidRequest(msg) => Error::InvalidRequest(msg),
        }
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
