//! Redacted wrapper for credentials such as bearer tokens

use std::fmt;
use zeroize::Zeroize;

/// Sensitive string value. Debug and Display print `[REDACTED]`; the
/// backing memory is wiped on drop.
pub struct Secret(String);

impl Secret {
    /// Wrap a value, trimming surrounding whitespace (token files usually
    /// end with a newline).
    pub fn new(value: impl Into<String>) -> Self {
        let mut raw: String = value.into();
        let trimmed = raw.trim().to_owned();
        raw.zeroize();
        Self(trimmed)
    }

    /// Expose the inner value (use sparingly)
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Authorization` header value for this token.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl Clone for Secret {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_are_redacted() {
        let secret = Secret::new("tok_live_123");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn new_trims_whitespace() {
        let secret = Secret::new("  tok_file_456\n");
        assert_eq!(secret.expose(), "tok_file_456");
    }

    #[test]
    fn bearer_formats_header_value() {
        let secret = Secret::new("abc");
        assert_eq!(secret.bearer(), "Bearer abc");
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert!(Secret::new(" \n ").is_empty());
    }
}
