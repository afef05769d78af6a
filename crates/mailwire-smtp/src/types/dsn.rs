//! Delivery status notification parameters (RFC 3461).

use std::fmt::Write as _;

/// How much of the message a bounce should return (`RET=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DsnRet {
    /// Return the full message.
    Full,
    /// Return headers only.
    #[cfg_attr(feature = "serde", serde(alias = "hdrs"))]
    Headers,
}

impl DsnRet {
    /// Returns the parameter value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "FULL",
            Self::Headers => "HDRS",
        }
    }
}

/// Events that trigger a notification (`NOTIFY=`).
///
/// With every flag off the server is asked never to notify.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DsnNotify {
    /// Notify on successful delivery.
    pub success: bool,
    /// Notify on failure.
    pub failure: bool,
    /// Notify on delay.
    pub delay: bool,
}

impl DsnNotify {
    /// Returns the parameter value, e.g. `SUCCESS,FAILURE` or `NEVER`.
    #[must_use]
    pub fn value(self) -> String {
        let events: Vec<&str> = [
            (self.success, "SUCCESS"),
            (self.failure, "FAILURE"),
            (self.delay, "DELAY"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect();

        if events.is_empty() {
            "NEVER".to_string()
        } else {
            events.join(",")
        }
    }
}

/// DSN settings for one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Dsn {
    /// `RET=` on `MAIL FROM`.
    pub ret: Option<DsnRet>,
    /// `ENVID=` on `MAIL FROM`.
    pub envelope_id: Option<String>,
    /// `NOTIFY=` on every `RCPT TO`.
    pub notify: Option<DsnNotify>,
}

/// Encodes a value as xtext (RFC 3461 §4): `+`, `=`, and bytes outside
/// printable ASCII become `+XX`.
#[must_use]
pub fn xtext(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if (0x21..=0x7E).contains(&byte) && byte != b'+' && byte != b'=' {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "+{byte:02X}");
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_value() {
        assert_eq!(DsnNotify::default().value(), "NEVER");
        let notify = DsnNotify {
            success: true,
            failure: true,
            delay: false,
        };
        assert_eq!(notify.value(), "SUCCESS,FAILURE");
    }

    #[test]
    fn test_ret_value() {
        assert_eq!(DsnRet::Full.as_str(), "FULL");
        assert_eq!(DsnRet::Headers.as_str(), "HDRS");
    }

    #[test]
    fn test_xtext() {
        assert_eq!(xtext("abc-123"), "abc-123");
        assert_eq!(xtext("a+b=c d"), "a+2Bb+3Dc+20d");
    }
}
