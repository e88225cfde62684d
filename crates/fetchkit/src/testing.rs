//! Scripted transports for unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use transport::{
    HttpRequest, HttpResponse, ProgressEvent, ProgressSink, Transport, TransportError,
    TransportFuture, UploadRequest, UploadTransport,
};

use crate::client::Client;
use crate::config::ClientConfig;

/// Replays queued results in order and records every request it sees.
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<transport::Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub(crate) fn new(
        responses: impl IntoIterator<Item = transport::Result<HttpResponse>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    fn send<'a>(&'a self, request: &'a HttpRequest) -> TransportFuture<'a, HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted response".into())));
        Box::pin(async move { next })
    }
}

/// Emits the scripted progress events, then returns the scripted result.
pub(crate) struct MockUploader {
    events: Vec<ProgressEvent>,
    result: Mutex<Option<transport::Result<HttpResponse>>>,
    requests: Mutex<Vec<UploadRequest>>,
}

impl MockUploader {
    pub(crate) fn new(
        events: Vec<ProgressEvent>,
        result: transport::Result<HttpResponse>,
    ) -> Arc<Self> {
        Arc::new(Self {
            events,
            result: Mutex::new(Some(result)),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<UploadRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl UploadTransport for MockUploader {
    fn upload<'a>(
        &'a self,
        request: UploadRequest,
        progress: Option<ProgressSink>,
    ) -> TransportFuture<'a, HttpResponse> {
        self.requests.lock().unwrap().push(request);
        if let Some(sink) = progress {
            for event in &self.events {
                sink(*event);
            }
        }
        let result = self
            .result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted upload".into())));
        Box::pin(async move { result })
    }
}

pub(crate) fn client_with(config: ClientConfig, transport: Arc<MockTransport>) -> Client {
    let uploader = MockUploader::new(Vec::new(), Err(TransportError::Aborted));
    Client::with_transports(config, transport, uploader)
}

pub(crate) fn uploader_client(config: ClientConfig, uploader: Arc<MockUploader>) -> Client {
    Client::with_transports(config, MockTransport::new(Vec::new()), uploader)
}
