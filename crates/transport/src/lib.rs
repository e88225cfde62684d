//! Outbound HTTP transport abstraction
//!
//! Defines the request/response shapes the client pipeline works with and the
//! `Transport` / `UploadTransport` traits that actually move bytes. The
//! pipeline never talks to reqwest directly; `ReqwestTransport` is the
//! production implementation and tests substitute scripted transports.
//!
//! Both traits return `Pin<Box<dyn Future>>` so they stay dyn-compatible
//! (`Arc<dyn Transport>`).

pub mod error;
pub mod reqwest_transport;
pub mod upload;

pub use error::{Result, TransportError};
pub use reqwest_transport::ReqwestTransport;
pub use upload::{ProgressEvent, ProgressSink, ProgressTracker, UploadFile, UploadRequest};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;

/// Boxed future returned by transport implementations.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// HTTP verbs supported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(TransportError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A fully resolved outbound request.
///
/// Request interceptors receive and return this value, so every field
/// (including the URL) is rewritable before the call is issued.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HeaderMap,
    /// Serialized body text; `None` sends no body.
    pub body: Option<String>,
    /// Per-request timeout override.
    pub timeout: Option<Duration>,
    /// Firing this token aborts the in-flight call with `TransportError::Aborted`.
    pub signal: Option<CancellationToken>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            signal: None,
        }
    }
}

/// Raw response as produced by the transport. The body is kept as text;
/// parsing is the caller's concern.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }
}

/// Issues a single outbound HTTP call.
pub trait Transport: Send + Sync {
    /// Send `request` and return the response, whatever its status.
    ///
    /// Only transport-level problems (connect failures, timeouts, aborts)
    /// are errors; a 4xx/5xx is a successful exchange.
    fn send<'a>(&'a self, request: &'a HttpRequest) -> TransportFuture<'a, HttpResponse>;
}

/// Posts multipart file uploads while reporting progress.
pub trait UploadTransport: Send + Sync {
    /// Upload `request.files` as one multipart form. `progress` is invoked
    /// as body bytes are handed to the connection.
    fn upload<'a>(
        &'a self,
        request: UploadRequest,
        progress: Option<ProgressSink>,
    ) -> TransportFuture<'a, HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_strings_are_uppercase() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("delete".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
        assert_eq!("Put".parse::<HttpMethod>().unwrap(), HttpMethod::Put);
        assert!("OPTIONS".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn method_converts_to_reqwest() {
        assert_eq!(reqwest::Method::from(HttpMethod::Post), reqwest::Method::POST);
        assert_eq!(
            reqwest::Method::from(HttpMethod::Delete),
            reqwest::Method::DELETE
        );
    }

    #[test]
    fn response_ok_tracks_2xx() {
        assert!(HttpResponse::new(StatusCode::CREATED, "").ok());
        assert!(!HttpResponse::new(StatusCode::UNAUTHORIZED, "").ok());
        assert!(!HttpResponse::new(StatusCode::MULTIPLE_CHOICES, "").ok());
    }

    #[test]
    fn new_request_has_no_body_or_headers() {
        let request = HttpRequest::new(HttpMethod::Get, "/users");
        assert_eq!(request.url, "/users");
        assert!(request.body.is_none());
        assert!(request.headers.is_empty());
        assert!(request.signal.is_none());
    }
}
