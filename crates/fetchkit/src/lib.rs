//! HTTP client convenience layer
//!
//! Wraps a single outbound call with interceptor hooks, 401-triggered token
//! refresh, exponential-backoff retry, and a progress-tracked multipart
//! upload path.
//!
//! ```text
//! send_request ─▶ request interceptors ─▶ [retry ─▶ execute] ─▶ decode
//!                                               │
//!                            send ─▶ 401? refresh once, resend
//!                                 ─▶ !ok: error interceptors, Err
//!                                 ─▶ ok:  response interceptors, Ok
//! ```
//!
//! All state lives on a [`Client`]; clones share it.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod interceptors;
pub mod metrics;
pub mod pipeline;
pub mod response;
pub mod retry;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use client::Client;
pub use config::{ClientConfig, HeaderInjection};
pub use error::{Error, Result};
pub use interceptors::Interceptors;
pub use pipeline::RequestOptions;
pub use reqwest::header;
pub use response::ResponseEnvelope;
pub use retry::retry;
pub use token_refresh::RefreshError;
pub use tokio_util::sync::CancellationToken;
pub use transport::{HttpMethod, HttpRequest, HttpResponse, ProgressEvent, UploadFile};
pub use upload::{ProgressCallback, UploadOptions, percent};
