//! Exponential backoff retry

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Run `operation` up to `max_retries + 1` times.
///
/// The first call happens immediately. After the k-th failure (k starting at
/// 0) the loop sleeps `delay * 2^k` before calling again. Every error is
/// retryable; the last one is returned when attempts run out.
pub async fn retry<T, E, F, Fut>(mut operation: F, max_retries: u32, delay: Duration) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = delay;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries => {
                attempt += 1;
                warn!(
                    attempt,
                    max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "attempt failed, retrying"
                );
                crate::metrics::record_retry();
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
            Err(err) => return Err(err),
        }
    }
}
