//! Error types for token refresh

/// Errors from a refresh attempt.
///
/// `Clone` because a single failed flight is delivered to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh handler not set")]
    NotConfigured,

    #[error("token refresh failed: {0}")]
    Failed(String),
}

/// Result alias for refresh operations.
pub type Result<T> = std::result::Result<T, RefreshError>;
