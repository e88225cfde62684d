//! Multipart upload path
//!
//! Sibling to the request pipeline. Uploads go straight to the
//! `UploadTransport`: no interceptors, no refresh, no retry, and the URL is
//! used as given.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use transport::{ProgressEvent, ProgressSink, UploadFile, UploadRequest};

use crate::client::Client;
use crate::error::{Error, Result};

/// Receives whole-number completion percentages.
pub type ProgressCallback = Arc<dyn Fn(u32) + Send + Sync>;

#[derive(Clone, Default)]
pub struct UploadOptions {
    pub headers: HeaderMap,
    pub signal: Option<CancellationToken>,
    pub on_progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOptions")
            .field("headers", &self.headers)
            .field("signal", &self.signal)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }
}

/// Completion percentage for an event, or `None` when the total is unknown.
pub fn percent(event: ProgressEvent) -> Option<u32> {
    let total = event.total.filter(|&t| t > 0)?;
    Some(((event.loaded as f64 / total as f64) * 100.0).round() as u32)
}

impl Client {
    /// POST `files` as a multipart form to `url` and decode the JSON reply.
    #[instrument(skip_all, fields(url = %url, files = files.len()))]
    pub async fn upload<T: DeserializeOwned>(
        &self,
        url: &str,
        files: Vec<UploadFile>,
        options: UploadOptions,
    ) -> Result<T> {
        let UploadOptions {
            headers,
            signal,
            on_progress,
        } = options;

        let request = UploadRequest {
            url: url.to_string(),
            headers,
            field_name: self.config.upload_field.clone(),
            files,
            signal,
        };
        let sink = on_progress.map(|callback| -> ProgressSink {
            Arc::new(move |event: ProgressEvent| {
                if let Some(pct) = percent(event) {
                    callback(pct);
                }
            })
        });

        let response = match self.uploader.upload(request, sink).await {
            Ok(response) => response,
            Err(e) => {
                crate::metrics::record_upload(None);
                return Err(e.into());
            }
        };
        crate::metrics::record_upload(Some(response.status.as_u16()));
        debug!(status = response.status.as_u16(), "upload finished");

        if !response.ok() {
            return Err(Error::UploadFailed(response.status.as_u16()));
        }

        serde_json::from_str(&response.body).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}
