//! Refresh state machine
//!
//! `Idle` → `Refreshing { flight, pending }` on the first request, back to
//! `Idle` when that flight settles. The pending result is a `Shared` future
//! so any number of callers can await one handler invocation.
//!
//! The lock is only held to inspect or swap the state, never across an
//! `.await`. The handler itself runs on first poll of the shared future,
//! outside the lock.

use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::{debug, info, warn};

use crate::error::{RefreshError, Result};

type RefreshHandler = Arc<dyn Fn() -> BoxFuture<'static, Result<String>> + Send + Sync>;
type PendingRefresh = Shared<BoxFuture<'static, Result<String>>>;

enum RefreshState {
    Idle,
    Refreshing { flight: u64, pending: PendingRefresh },
}

struct Inner {
    handler: Option<RefreshHandler>,
    state: RefreshState,
    flights: u64,
}

/// Shared handle to the refresh handler and in-flight state.
///
/// Clones share state, so a coordinator can be handed to every component
/// that needs to trigger a refresh.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Mutex<Inner>>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("has_handler", &self.has_handler())
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                handler: None,
                state: RefreshState::Idle,
                flights: 0,
            })),
        }
    }

    /// Register the function that obtains a new token, replacing any previous one.
    ///
    /// A flight already underway keeps running with the handler it started with.
    pub fn set_handler<F, Fut, E>(&self, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<String, E>> + Send + 'static,
        E: Display + 'static,
    {
        let handler: RefreshHandler = Arc::new(move || {
            let call = handler();
            async move { call.await.map_err(|e| RefreshError::Failed(e.to_string())) }.boxed()
        });
        lock(&self.inner).handler = Some(handler);
        debug!("refresh handler registered");
    }

    /// Remove the handler. Subsequent refreshes fail with `NotConfigured`.
    pub fn clear_handler(&self) {
        lock(&self.inner).handler = None;
        debug!("refresh handler cleared");
    }

    pub fn has_handler(&self) -> bool {
        lock(&self.inner).handler.is_some()
    }

    /// Whether a handler invocation is currently pending.
    pub fn is_refreshing(&self) -> bool {
        matches!(lock(&self.inner).state, RefreshState::Refreshing { .. })
    }

    /// Obtain a fresh token, joining the in-flight refresh if there is one.
    pub async fn refresh_token(&self) -> Result<String> {
        let pending = self.join_or_start()?;
        pending.await
    }

    fn join_or_start(&self) -> Result<PendingRefresh> {
        let mut inner = lock(&self.inner);
        let Some(handler) = inner.handler.clone() else {
            return Err(RefreshError::NotConfigured);
        };

        if let RefreshState::Refreshing { flight, pending } = &inner.state {
            debug!(flight, "joining in-flight token refresh");
            return Ok(pending.clone());
        }

        inner.flights += 1;
        let flight = inner.flights;
        let state = Arc::clone(&self.inner);
        let pending = async move {
            debug!(flight, "invoking refresh handler");
            let outcome = handler().await;

            let mut inner = lock(&state);
            if matches!(inner.state, RefreshState::Refreshing { flight: current, .. } if current == flight)
            {
                inner.state = RefreshState::Idle;
            }
            drop(inner);

            match &outcome {
                Ok(_) => {
                    info!(flight, "token refresh succeeded");
                    metrics::counter!("fetchkit_token_refresh_total", "outcome" => "success")
                        .increment(1);
                }
                Err(e) => {
                    warn!(flight, error = %e, "token refresh failed");
                    metrics::counter!("fetchkit_token_refresh_total", "outcome" => "failure")
                        .increment(1);
                }
            }
            outcome
        }
        .boxed()
        .shared();

        inner.state = RefreshState::Refreshing {
            flight,
            pending: pending.clone(),
        };
        Ok(pending)
    }
}

/// Lock, recovering from poisoning. The state is a plain enum swap, so a
/// panic elsewhere cannot leave it half-written.
fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
