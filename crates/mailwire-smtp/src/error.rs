//! Error types for SMTP operations.

use std::io;

use crate::types::ReplyCode;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error, including the server closing the connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Server returned error response.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Protocol error (unexpected or malformed response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid envelope address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Message larger than the limit the server advertised.
    #[error("Message of {size} bytes exceeds server limit of {limit} bytes")]
    MessageTooLarge {
        /// Size of the message.
        size: usize,
        /// Limit from the SIZE extension.
        limit: usize,
    },

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// Invalid state for operation.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),

    /// A protocol step did not complete in time.
    #[error("Timed out during {step}")]
    Timeout {
        /// Step that timed out, e.g. `EHLO` or `DATA`.
        step: &'static str,
    },
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

    /// Returns true for a 5xx refusal; retrying will not help.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if ReplyCode::new(*code).is_permanent())
    }

    /// Returns true for a 4xx refusal.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if ReplyCode::new(*code).is_transient())
    }

    /// Returns true if a step timed out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::smtp_error(550, "no").is_permanent());
        assert!(Error::smtp_error(451, "later").is_transient());
        assert!(!Error::smtp_error(451, "later").is_permanent());
        assert!(Error::Timeout { step: "DATA" }.is_timeout());
        assert!(!Error::Protocol("x".into()).is_timeout());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::Timeout { step: "EHLO" }.to_string(),
            "Timed out during EHLO"
        );
        assert_eq!(
            Error::smtp_error(535, "bad credentials").to_string(),
            "SMTP error 535: bad credentials"
        );
    }
}
