//! reqwest-backed transport
//!
//! Issues the call, collects status, headers and body text, and races the
//! whole exchange against the request's cancellation token so an abort
//! returns promptly instead of waiting for the connection.

use std::future::Future;

use reqwest::multipart::{Form, Part};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span};

use crate::error::{Result, TransportError};
use crate::upload::{ProgressTracker, progress_stream};
use crate::{
    HttpRequest, HttpResponse, ProgressSink, Transport, TransportFuture, UploadRequest,
    UploadTransport,
};

/// Production transport over a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(&'a self, request: &'a HttpRequest) -> TransportFuture<'a, HttpResponse> {
        let span = debug_span!("transport_send", method = %request.method, url = %request.url);
        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        Box::pin(with_signal(request.signal.as_ref(), async move {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.text().await?;
            debug!(status = status.as_u16(), bytes = body.len(), "response received");
            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        })
        .instrument(span))
    }
}

impl UploadTransport for ReqwestTransport {
    fn upload<'a>(
        &'a self,
        request: UploadRequest,
        progress: Option<ProgressSink>,
    ) -> TransportFuture<'a, HttpResponse> {
        let span = debug_span!("transport_upload", url = %request.url, files = request.files.len());
        let UploadRequest {
            url,
            headers,
            field_name,
            files,
            signal,
        } = request;

        let exchange = async move {
            let tracker = ProgressTracker::for_files(&files, progress);
            let mut form = Form::new();
            for file in files {
                let length = file.len();
                let stream = progress_stream(file.bytes, tracker.clone());
                let mut part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), length)
                    .file_name(file.file_name);
                if let Some(content_type) = &file.content_type {
                    part = part.mime_str(content_type).map_err(|e| {
                        TransportError::InvalidRequest(format!(
                            "invalid content type {content_type}: {e}"
                        ))
                    })?;
                }
                form = form.part(field_name.clone(), part);
            }

            let upload = self.client.post(&url).headers(headers).multipart(form).send();
            with_signal(signal.as_ref(), async move {
                let response = upload.await?;
                let status = response.status();
                let headers = response.headers().clone();
                let body = response.text().await?;
                debug!(status = status.as_u16(), sent = tracker.loaded(), "upload finished");
                Ok(HttpResponse {
                    status,
                    headers,
                    body,
                })
            })
            .await
        };

        Box::pin(exchange.instrument(span))
    }
}

/// Race `exchange` against `signal`. Cancellation wins ties, so an
/// already-fired token never issues the request.
async fn with_signal<T>(
    signal: Option<&CancellationToken>,
    exchange: impl Future<Output = Result<T>>,
) -> Result<T> {
    match signal {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("request aborted by caller");
                    Err(TransportError::Aborted)
                }
                result = exchange => result,
            }
        }
        None => exchange.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn with_signal_passes_through_without_token() {
        let result = with_signal(None, async { Ok::<_, TransportError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn with_signal_aborts_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let result = with_signal(Some(&token), async { Ok::<_, TransportError>(7) }).await;
        assert!(matches!(result, Err(TransportError::Aborted)));
    }

    #[tokio::test(start_paused = true)]
    async fn with_signal_aborts_pending_exchange() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = with_signal(Some(&token), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, TransportError>(())
        })
        .await;
        assert!(matches!(result, Err(TransportError::Aborted)));
    }

    #[tokio::test]
    async fn upload_with_bad_content_type_is_invalid_request() {
        let transport = ReqwestTransport::default();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let request = UploadRequest {
            url: format!("http://{addr}/upload"),
            headers: reqwest::header::HeaderMap::new(),
            field_name: "file".into(),
            files: vec![crate::UploadFile::new("a.txt", "a").with_content_type("not-a-mime")],
            signal: None,
        };
        let result = transport.upload(request, None).await;
        assert!(
            matches!(result, Err(TransportError::InvalidRequest(ref msg)) if msg.contains("not-a-mime")),
            "got: {result:?}"
        );
    }

    #[tokio::test]
    async fn send_to_closed_port_is_network_error() {
        let transport = ReqwestTransport::default();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let request = HttpRequest::new(crate::HttpMethod::Get, format!("http://{addr}/"));
        let result = transport.send(&request).await;
        assert!(
            matches!(result, Err(TransportError::Network(_))),
            "got: {result:?}"
        );
    }
}
