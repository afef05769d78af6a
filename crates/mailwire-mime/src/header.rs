//! MIME header handling.

use crate::encoding::decode_header_value;
use std::fmt;

/// Preferred maximum header line length before folding (RFC 5322 §2.1.1).
pub const FOLD_WIDTH: usize = 78;

/// Hard limit on a header line, CRLF excluded (RFC 5322 §2.1.1).
pub const MAX_HEADER_LINE: usize = 998;

/// Ordered collection of email headers.
///
/// Names keep the case they were added with; lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Returns true if a header with this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets the first value for a header with encoded words decoded.
    #[must_use]
    pub fn get_decoded(&self, name: &str) -> Option<String> {
        self.get(name).map(decode_header_value)
    }

    /// Returns the number of header fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if there are no header fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parses a header block, unfolding continuation lines.
    ///
    /// Parsing stops at the first empty line. Lines without a colon are
    /// ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            // Continuation line (starts with space or tab)
            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(line);
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value.trim().to_string());
            }
            if let Some((name, value)) = line.split_once(':') {
                current = Some((name.trim().to_string(), value.to_string()));
            }
        }

        if let Some((name, value)) = current {
            headers.add(name, value.trim().to_string());
        }

        headers
    }
}

/// Writes one header field, folding at whitespace so lines stay within
/// [`FOLD_WIDTH`] where possible.
///
/// Tokens longer than the width are kept whole on their own line unless
/// they would pass [`MAX_HEADER_LINE`]; such a run is cut at the limit and
/// continued on the next line, so unfolding it yields an extra space.
#[must_use]
pub fn fold(name: &str, value: &str) -> String {
    let mut result = format!("{name}:");
    let mut line_length = result.len();

    for (i, word) in value.split(' ').enumerate() {
        // Leading, trailing or repeated spaces produce empty words; keep them
        // literally so unfolding restores the exact value.
        if i > 0 && line_length + 1 + word.len() > FOLD_WIDTH && !word.is_empty() {
            result.push_str("\r\n");
            line_length = 0;
        }

        let mut rest = word;
        while line_length + 1 + rest.len() > MAX_HEADER_LINE {
            let at = char_floor(rest, MAX_HEADER_LINE.saturating_sub(line_length + 1));
            if at > 0 {
                result.push(' ');
                result.push_str(&rest[..at]);
                rest = &rest[at..];
            }
            result.push_str("\r\n");
            line_length = 0;
        }
        result.push(' ');
        result.push_str(rest);
        line_length += 1 + rest.len();
    }

    result
}

/// Largest char boundary in `text` at or below `limit`.
fn char_floor(text: &str, limit: usize) -> usize {
    let mut at = limit.min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }
    at
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            write!(f, "{}\r\n", fold(name, value))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_contains_ignores_case() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        assert!(headers.contains("SUBJECT"));
        assert!(!headers.contains("Reply-To"));
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "Body: not a header\r\n"
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("To"), Some("recipient@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn test_headers_display_keeps_order_and_case() {
        let mut headers = Headers::new();
        headers.add("X-Second", "2");
        headers.add("From", "sender@example.com");

        assert_eq!(
            headers.to_string(),
            "X-Second: 2\r\nFrom: sender@example.com\r\n"
        );
    }

    #[test]
    fn test_get_decoded() {
        let mut headers = Headers::new();
        headers.add("Subject", "=?UTF-8?Q?M=C3=BCller?=");
        assert_eq!(headers.get_decoded("subject").as_deref(), Some("Müller"));
    }

    #[test]
    fn test_fold_short_value() {
        assert_eq!(fold("Subject", "Hello World"), "Subject: Hello World");
    }

    #[test]
    fn test_fold_long_value() {
        let value = vec!["recipient@example.com,"; 12].join(" ");
        let folded = fold("To", &value);
        for line in folded.split("\r\n") {
            assert!(line.len() <= FOLD_WIDTH, "{line}");
        }
        let unfolded = Headers::parse(&folded);
        assert_eq!(unfolded.get("To"), Some(value.as_str()));
    }

    #[test]
    fn test_fold_keeps_long_token_whole() {
        let token = "x".repeat(120);
        let folded = fold("Subject", &format!("a {token}"));
        assert_eq!(folded, format!("Subject: a\r\n {token}"));
    }

    #[test]
    fn test_fold_cuts_runs_past_hard_limit() {
        let token = "y".repeat(1500);
        let folded = fold("X-Trace", &token);
        let lines: Vec<&str> = folded.split("\r\n").collect();
        assert!(lines.iter().all(|l| l.len() <= MAX_HEADER_LINE));
        assert_eq!(lines[0].len(), MAX_HEADER_LINE);
        assert!(lines[1].starts_with(' '));
        assert_eq!(folded.matches('y').count(), 1500);
    }

    #[test]
    fn test_fold_hard_limit_keeps_chars_whole() {
        let value = format!("a {}", "é".repeat(700));
        let folded = fold("Subject", &value);
        for line in folded.split("\r\n") {
            assert!(line.len() <= MAX_HEADER_LINE, "{}", line.len());
        }
        assert_eq!(folded.matches('é').count(), 700);
    }
}
