//! Error types for SMTP operations.

use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
///
/// Any of these aborts the transaction and closes the transport.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// DNS resolution, TCP connect or TLS handshake failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O error on an established transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Server returned an unexpected reply code.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Malformed or out-of-sequence reply.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// AUTH LOGIN exchange did not go as expected or credentials were rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The send did not finish within the allowed window.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The email cannot be sent as built.
    #[error("Invalid email: {0}")]
    Validation(String),

    /// Serializing the message payload failed.
    #[error("Message error: {0}")]
    Message(#[from] mailpost_mime::Error),

    /// Internal logic fault: an operation was invoked in the wrong state.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 400 && *code < 500)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_smtp_error_classes() {
        assert!(Error::smtp_error(550, "no such user").is_permanent());
        assert!(Error::smtp_error(451, "try later").is_transient());
        assert!(!Error::Timeout(Duration::from_secs(60)).is_permanent());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::smtp_error(554, "rejected").to_string(),
            "SMTP error 554: rejected"
        );
        assert_eq!(
            Error::Timeout(Duration::from_secs(60)).to_string(),
            "Timed out after 60s"
        );
    }
}
