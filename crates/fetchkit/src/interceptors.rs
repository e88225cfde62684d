//! Request, response and error interceptor registries
//!
//! Three append-only lists owned by a `Client`. Each pipeline call takes a
//! snapshot of the lists, then runs the interceptors in registration order,
//! awaiting each before starting the next. Interceptors registered while a
//! call is in flight apply from the next call onward.

use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;
use transport::HttpRequest;

use crate::error::Result;
use crate::response::ResponseEnvelope;

type RequestInterceptor = Arc<dyn Fn(HttpRequest) -> BoxFuture<'static, Result<HttpRequest>> + Send + Sync>;
type ResponseInterceptor =
    Arc<dyn Fn(&ResponseEnvelope, Value) -> BoxFuture<'static, Result<Value>> + Send + Sync>;
type ErrorInterceptor =
    Arc<dyn Fn(&ResponseEnvelope, Option<&Value>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Interceptor registries. Clones share the same lists.
#[derive(Clone, Default)]
pub struct Interceptors {
    request: Arc<RwLock<Vec<RequestInterceptor>>>,
    response: Arc<RwLock<Vec<ResponseInterceptor>>>,
    error: Arc<RwLock<Vec<ErrorInterceptor>>>,
}

impl std::fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptors")
            .field("request", &self.request_count())
            .field("response", &self.response_count())
            .field("error", &self.error_count())
            .finish()
    }
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request interceptor. It receives the descriptor produced by
    /// the previous interceptor and returns the one the next will see.
    pub fn add_request<F, Fut>(&self, interceptor: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpRequest>> + Send + 'static,
    {
        write(&self.request).push(Arc::new(move |request| interceptor(request).boxed()));
    }

    /// Append a response interceptor, run on 2xx responses only.
    pub fn add_response<F, Fut>(&self, interceptor: F)
    where
        F: Fn(&ResponseEnvelope, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        write(&self.response).push(Arc::new(
            move |response: &ResponseEnvelope, data: Value| -> BoxFuture<'static, Result<Value>> {
                interceptor(response, data).boxed()
            },
        ));
    }

    /// Append an error interceptor, run on non-2xx responses only.
    pub fn add_error<F, Fut>(&self, interceptor: F)
    where
        F: Fn(&ResponseEnvelope, Option<&Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        write(&self.error).push(Arc::new(
            move |response: &ResponseEnvelope, data: Option<&Value>| -> BoxFuture<'static, ()> {
                interceptor(response, data).boxed()
            },
        ));
    }

    pub fn request_count(&self) -> usize {
        read(&self.request).len()
    }

    pub fn response_count(&self) -> usize {
        read(&self.response).len()
    }

    pub fn error_count(&self) -> usize {
        read(&self.error).len()
    }

    /// Fold `request` through every request interceptor.
    pub async fn apply_request(&self, mut request: HttpRequest) -> Result<HttpRequest> {
        let chain = read(&self.request).clone();
        for interceptor in chain {
            request = interceptor(request).await?;
        }
        Ok(request)
    }

    /// Fold the parsed body through every response interceptor. An absent
    /// body enters the chain as `Value::Null`.
    pub async fn apply_response(&self, response: &ResponseEnvelope) -> Result<Value> {
        let chain = read(&self.response).clone();
        let mut data = response.body().cloned().unwrap_or(Value::Null);
        for interceptor in chain {
            data = interceptor(response, data).await?;
        }
        Ok(data)
    }

    /// Notify every error interceptor of a failed response.
    pub async fn notify_error(&self, response: &ResponseEnvelope) {
        let observers = read(&self.error).clone();
        for observer in observers {
            observer(response, response.body()).await;
        }
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
