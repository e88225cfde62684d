//! The `Client` context object
//!
//! Owns the transports, interceptor registries, refresh coordinator and
//! configuration. Cloning is cheap and every clone shares registries and
//! refresh state, so a single client can be handed to many tasks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use token_refresh::RefreshCoordinator;
use transport::{HttpRequest, ReqwestTransport, Transport, UploadTransport};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::interceptors::Interceptors;
use crate::response::ResponseEnvelope;

#[derive(Clone)]
pub struct Client {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) uploader: Arc<dyn UploadTransport>,
    pub(crate) interceptors: Interceptors,
    pub(crate) refresh: RefreshCoordinator,
    pub(crate) config: Arc<ClientConfig>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("interceptors", &self.interceptors)
            .field("refresh", &self.refresh)
            .finish_non_exhaustive()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Client {
    /// Client backed by a fresh `reqwest::Client`.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Client sharing an existing `reqwest::Client` (and its connection pool).
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Self {
        let transport = Arc::new(ReqwestTransport::new(http));
        Self::with_transports(config, transport.clone(), transport)
    }

    pub fn with_transports(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        uploader: Arc<dyn UploadTransport>,
    ) -> Self {
        Self {
            transport,
            uploader,
            interceptors: Interceptors::new(),
            refresh: RefreshCoordinator::new(),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    pub fn add_request_interceptor<F, Fut>(&self, interceptor: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpRequest>> + Send + 'static,
    {
        self.interceptors.add_request(interceptor);
    }

    pub fn add_response_interceptor<F, Fut>(&self, interceptor: F)
    where
        F: Fn(&ResponseEnvelope, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.interceptors.add_response(interceptor);
    }

    pub fn add_error_interceptor<F, Fut>(&self, interceptor: F)
    where
        F: Fn(&ResponseEnvelope, Option<&Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.interceptors.add_error(interceptor);
    }

    /// Register the function called when a request comes back 401.
    pub fn set_refresh_token_handler<F, Fut, E>(&self, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<String, E>> + Send + 'static,
        E: std::fmt::Display + 'static,
    {
        self.refresh.set_handler(handler);
    }

    pub fn clear_refresh_token_handler(&self) {
        self.refresh.clear_handler();
    }

    /// Obtain a new token, sharing any refresh already in flight.
    pub async fn refresh_token(&self) -> token_refresh::Result<String> {
        self.refresh.refresh_token().await
    }

    pub(crate) fn default_timeout(&self) -> Option<Duration> {
        self.config.timeout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use token_refresh::RefreshError;

    #[test]
    fn clones_share_interceptors() {
        let client = Client::default();
        let clone = client.clone();
        clone.add_request_interceptor(|request| async move { Ok(request) });
        clone.add_error_interceptor(|_response, _data| async {});
        assert_eq!(client.interceptors().request_count(), 1);
        assert_eq!(client.interceptors().error_count(), 1);
    }

    #[test]
    fn default_client_uses_default_config() {
        let client = Client::default();
        assert_eq!(client.config().base_url, "");
        assert_eq!(client.config().retries, 0);
        assert!(client.default_timeout().is_none());
    }

    #[tokio::test]
    async fn refresh_without_handler_fails() {
        let client = Client::default();
        assert_eq!(
            client.refresh_token().await.unwrap_err(),
            RefreshError::NotConfigured
        );
    }

    #[tokio::test]
    async fn refresh_handler_lifecycle() {
        let client = Client::default();
        client.set_refresh_token_handler(|| async { Ok::<_, String>("token-1".to_string()) });
        assert_eq!(client.refresh_token().await.unwrap(), "token-1");

        client.set_refresh_token_handler(|| async { Ok::<_, String>("token-2".to_string()) });
        assert_eq!(client.clone().refresh_token().await.unwrap(), "token-2");

        client.clear_refresh_token_handler();
        assert!(!client.refresh_coordinator().has_handler());
    }

    #[test]
    fn debug_output_omits_transports() {
        let debug = format!("{:?}", Client::default());
        assert!(debug.contains("Client"), "got: {debug}");
        assert!(debug.contains("config"), "got: {debug}");
    }
}
