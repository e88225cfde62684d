//! Request pipeline
//!
//! One call runs: build descriptor → request interceptors → execute step
//! (optionally wrapped in `retry`) → decode. The execute step sends, resolves
//! a 401 through the refresh coordinator once, then hands the response to the
//! error or response interceptors.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use token_refresh::RefreshError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use transport::{HttpMethod, HttpRequest};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::response::ResponseEnvelope;
use crate::retry::retry;

/// Per-call overrides. Unset fields fall back to the client's `ClientConfig`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub base_url: Option<String>,
    pub retries: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub signal: Option<CancellationToken>,
    /// Applied after the defaults, so these win on conflict.
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Like `header`, for names and values that still need validating.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidHeader(format!("{name}: {e}")))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader(format!("{name}: {e}")))?;
        Ok(self.header(name, value))
    }
}

impl Client {
    /// Issue one request through the full pipeline and decode the final
    /// JSON value into `T`.
    ///
    /// `body` is serialized as JSON when present. Transport failures and
    /// non-2xx responses are retried alike when `retries` is non-zero; the
    /// single 401 refresh-and-resend does not consume a retry.
    #[instrument(
        skip_all,
        fields(request_id = %uuid::Uuid::new_v4(), method = %method, url = %url)
    )]
    pub async fn send_request<T, B>(
        &self,
        method: HttpMethod,
        url: &str,
        options: RequestOptions,
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let retries = options.retries.unwrap_or(self.config.retries);
        let delay = options
            .retry_delay
            .unwrap_or_else(|| self.config.retry_delay());

        let request = self.build_request(method, url, options, body)?;
        let request = self.interceptors.apply_request(request).await?;
        debug!(url = %request.url, retries, "dispatching request");

        // Shared across attempts so a refreshed Authorization header sticks.
        let request = Mutex::new(request);
        let value = if retries > 0 {
            retry(|| self.execute(&request), retries, delay).await?
        } else {
            self.execute(&request).await?
        };

        serde_json::from_value(value).map_err(|e| Error::Decode(e.to_string()))
    }

    fn build_request<B>(
        &self,
        method: HttpMethod,
        url: &str,
        options: RequestOptions,
        body: Option<&B>,
    ) -> Result<HttpRequest>
    where
        B: Serialize + ?Sized,
    {
        let base_url = options.base_url.as_deref().unwrap_or(&self.config.base_url);
        let mut request = HttpRequest::new(method, format!("{base_url}{url}"));

        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        request.headers.extend(self.config.default_headers());
        request.headers.extend(options.headers);

        request.body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::Serialize(e.to_string()))?;
        request.timeout = options.timeout.or_else(|| self.default_timeout());
        request.signal = options.signal;
        Ok(request)
    }

    async fn execute(&self, request: &Mutex<HttpRequest>) -> Result<Value> {
        let mut refreshed = false;

        loop {
            let outbound = lock(request).clone();
            let method = outbound.method.as_str();

            let response = match self.transport.send(&outbound).await {
                Ok(response) => response,
                Err(e) => {
                    crate::metrics::record_request(method, None);
                    return Err(e.into());
                }
            };
            crate::metrics::record_request(method, Some(response.status.as_u16()));

            let envelope = ResponseEnvelope::from_response(response);

            if envelope.status() == StatusCode::UNAUTHORIZED && !refreshed {
                refreshed = true;
                if let Some(authorization) = self.refreshed_authorization().await {
                    lock(request).headers.insert(AUTHORIZATION, authorization);
                    debug!("resending with refreshed token");
                    continue;
                }
            }

            if !envelope.ok() {
                debug!(status = envelope.status().as_u16(), "request failed");
                self.interceptors.notify_error(&envelope).await;
                return Err(envelope.into_error());
            }

            return self.interceptors.apply_response(&envelope).await;
        }
    }

    /// Refresh the token and build its `Authorization` value. `None` means
    /// the original 401 should stand.
    async fn refreshed_authorization(&self) -> Option<HeaderValue> {
        let token = match self.refresh.refresh_token().await {
            Ok(token) => token,
            Err(RefreshError::NotConfigured) => {
                debug!("401 with no refresh handler registered");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, keeping 401");
                return None;
            }
        };

        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                Some(value)
            }
            Err(e) => {
                warn!(error = %e, "refreshed token is not a valid header value");
                None
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
