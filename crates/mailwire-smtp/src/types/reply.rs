//! Server replies.

use std::fmt;

use crate::error::Error;

/// First digit of a reply code (RFC 5321 §4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    /// 2xx: the command was carried out.
    Completion,
    /// 3xx: the server wants more input.
    Intermediate,
    /// 4xx: failed, may work later.
    Transient,
    /// 5xx: failed for good.
    Permanent,
    /// Anything else a broken server might send.
    Unknown,
}

/// Three-digit reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 greeting, also the answer to STARTTLS.
    pub const SERVICE_READY: Self = Self(220);
    /// 221 answer to QUIT.
    pub const CLOSING: Self = Self(221);
    /// 235 credentials accepted.
    pub const AUTH_SUCCESS: Self = Self(235);
    /// 250 generic success.
    pub const OK: Self = Self(250);
    /// 334 SASL challenge.
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 go ahead with the message.
    pub const START_DATA: Self = Self(354);

    /// Wraps a numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Classifies the code by its first digit.
    #[must_use]
    pub const fn class(self) -> ReplyClass {
        match self.0 / 100 {
            2 => ReplyClass::Completion,
            3 => ReplyClass::Intermediate,
            4 => ReplyClass::Transient,
            5 => ReplyClass::Permanent,
            _ => ReplyClass::Unknown,
        }
    }

    /// 2xx.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self.class(), ReplyClass::Completion)
    }

    /// 3xx.
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        matches!(self.class(), ReplyClass::Intermediate)
    }

    /// 4xx.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self.class(), ReplyClass::Transient)
    }

    /// 5xx.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self.class(), ReplyClass::Permanent)
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// A complete reply: one code and the text of every line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code shared by all lines.
    pub code: ReplyCode,
    /// Text after the code on each line, separator stripped.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Shorthand for `self.code.is_success()`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Shorthand for `self.code.is_transient()`.
    #[must_use]
    pub const fn is_transient_error(&self) -> bool {
        self.code.is_transient()
    }

    /// Shorthand for `self.code.is_permanent()`.
    #[must_use]
    pub const fn is_permanent_error(&self) -> bool {
        self.code.is_permanent()
    }

    /// Joins the lines with `\n`.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }

    /// Turns a refusal into [`Error::SmtpError`].
    #[must_use]
    pub fn to_error(&self) -> Error {
        Error::smtp_error(self.code.as_u16(), self.message_text())
    }
}
