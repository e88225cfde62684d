//! Client configuration
//!
//! Every field has a default, so an empty TOML document (or
//! `ClientConfig::default()`) yields a client with no base URL, no retries,
//! a 300 ms initial backoff and no timeout. Per-call `RequestOptions`
//! override these values.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use tracing::warn;

/// Defaults applied to every request made through a `Client`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Prefix prepended to every request URL.
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub retries: u32,
    /// Initial backoff; doubles after each failed attempt.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Multipart field name used for uploaded files.
    #[serde(default = "default_upload_field")]
    pub upload_field: String,
    /// Headers sent with every pipeline request (not uploads).
    #[serde(default)]
    pub headers: Vec<HeaderInjection>,
}

/// Static header added to outgoing requests.
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderInjection {
    pub name: String,
    pub value: String,
}

fn default_retry_delay_ms() -> u64 {
    300
}

fn default_upload_field() -> String {
    String::from("file")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
            timeout_secs: None,
            upload_field: default_upload_field(),
            headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> common::Result<Self> {
        let config: ClientConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> common::Result<()> {
        if !self.base_url.is_empty()
            && !self.base_url.starts_with("http://")
            && !self.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }

        if self.timeout_secs == Some(0) {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.upload_field.trim().is_empty() {
            return Err(common::Error::Config(
                "upload_field must not be empty".into(),
            ));
        }

        Ok(())
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    /// `timeout_secs` holds whole seconds, so any fraction rounds up.
    /// Use `RequestOptions::timeout` for sub-second deadlines.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self.timeout_secs = Some(secs.max(1));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HeaderInjection {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Configured headers as a `HeaderMap`. Invalid names or values are
    /// skipped with a warning rather than failing every request.
    pub fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for injection in &self.headers {
            let name = match HeaderName::from_str(&injection.name) {
                Ok(n) => n,
                Err(e) => {
                    warn!(header = %injection.name, error = %e, "skipping invalid header name");
                    continue;
                }
            };
            let value = match HeaderValue::from_str(&injection.value) {
                Ok(v) => v,
                Err(e) => {
                    warn!(header = %injection.name, error = %e, "skipping invalid header value");
                    continue;
                }
            };
            headers.insert(name, value);
        }
        headers
    }
}
