//! Errors raised while building or parsing messages.

use std::string::FromUtf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Composition and parsing failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The raw input is not a usable mailbox.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// A `Content-Type` value (or a MIME type given for an attachment)
    /// that is not `type/subtype`.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Malformed quoted-printable or encoded-word input.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Attachment or part body that is not valid base64.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Decoded text that is not UTF-8.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),

    /// A `multipart/*` part without a `boundary` parameter.
    #[error("Missing boundary in multipart message")]
    MissingBoundary,

    /// A multipart body whose delimiters do not line up.
    #[error("Invalid multipart structure: {0}")]
    InvalidMultipart(String),
}
