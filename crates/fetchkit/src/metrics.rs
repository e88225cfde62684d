//! Client-side metrics
//!
//! Emitted through the `metrics` facade; the application decides whether a
//! recorder (Prometheus or otherwise) is installed. Without one these calls
//! are no-ops.
//!
//! - `fetchkit_requests_total` (counter): labels `method`, `status`
//! - `fetchkit_retries_total` (counter)
//! - `fetchkit_uploads_total` (counter): label `status`
//!
//! `fetchkit_token_refresh_total` is recorded by the refresh coordinator.

/// Record a completed exchange. Transport failures use the status label `error`.
pub fn record_request(method: &str, status: Option<u16>) {
    let status = status.map_or_else(|| String::from("error"), |s| s.to_string());
    metrics::counter!("fetchkit_requests_total", "method" => method.to_string(), "status" => status)
        .increment(1);
}

pub fn record_retry() {
    metrics::counter!("fetchkit_retries_total").increment(1);
}

pub fn record_upload(status: Option<u16>) {
    let status = status.map_or_else(|| String::from("error"), |s| s.to_string());
    metrics::counter!("fetchkit_uploads_total", "status" => status).increment(1);
}
