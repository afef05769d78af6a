//! Error kinds surfaced to callers of the mailer.

use thiserror::Error;

/// Why a message could not be built or delivered.
///
/// Validation kinds are raised when the [`Email`](crate::Email) is built,
/// before any network activity. The rest come out of a send and are also
/// recorded as the message's delivery outcome, which is why the type is
/// `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// One or more addresses failed validation.
    #[error("{}", describe_invalid(invalid))]
    InvalidEmail {
        /// Every offending raw input, in discovery order. Empty when the
        /// message has no `to` recipient at all.
        invalid: Vec<String>,
    },

    /// Neither a text nor an HTML body was supplied, or an attachment is
    /// malformed.
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// The server rejected the credentials.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Connecting, greeting, EHLO or the TLS upgrade failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The server refused a recipient.
    #[error("Recipient {recipient} rejected ({code}): {message}")]
    RecipientRejected {
        /// The refused address.
        recipient: String,
        /// Reply code.
        code: u16,
        /// Reply text.
        message: String,
    },

    /// A protocol step did not finish in time.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The server refused the sender or the message content.
    #[error("Message rejected ({code}): {message}")]
    MessageRejected {
        /// Reply code, 0 when the message was refused before sending.
        code: u16,
        /// Reply text.
        message: String,
    },
}

impl Error {
    /// Stable machine-readable code for the error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidEmail { .. } => "INVALID_EMAIL",
            Self::InvalidContent(_) => "INVALID_CONTENT",
            Self::AuthFailed(_) => "AUTH_FAILED",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::RecipientRejected { .. } => "RECIPIENT_REJECTED",
            Self::Timeout(_) => "TIMEOUT",
            Self::MessageRejected { .. } => "MESSAGE_REJECTED",
        }
    }

    /// Returns true for errors raised while building the message.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidEmail { .. } | Self::InvalidContent(_))
    }
}

fn describe_invalid(invalid: &[String]) -> String {
    if invalid.is_empty() {
        "At least one recipient is required".to_string()
    } else {
        format!("Invalid email address(es): {}", invalid.join(", "))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
