//! MIME message parsing.

use crate::content_type::{ContentType, split_parameters, unquote};
use crate::encoding::{decode_base64, decode_header_value, decode_quoted_printable_bytes};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Maximum multipart nesting accepted by the parser.
const MAX_DEPTH: usize = 16;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Content of a part: raw bytes or nested parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    /// Encoded body of a leaf part.
    Single(Vec<u8>),
    /// Children of a multipart part.
    Multipart(Vec<Part>),
}

/// MIME message part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body.
    pub body: PartBody,
}

impl Part {
    /// Parses a part (header block, blank line, body).
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart section has no boundary or a
    /// content type is malformed.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        Self::parse_at(raw, 0)
    }

    fn parse_at(raw: &[u8], depth: usize) -> Result<Self> {
        let (head, body) = split_head(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(head));

        let content_type = content_type_of(&headers)?;
        if !content_type.is_multipart() {
            return Ok(Self {
                headers,
                body: PartBody::Single(body.to_vec()),
            });
        }

        if depth >= MAX_DEPTH {
            return Err(Error::InvalidMultipart("nesting too deep".to_string()));
        }
        let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
        let parts = split_multipart(body, boundary)?
            .into_iter()
            .map(|section| Self::parse_at(section, depth + 1))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            headers,
            body: PartBody::Multipart(parts),
        })
    }

    /// Gets the content type, `text/plain` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        content_type_of(&self.headers)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Returns the child parts of a multipart part.
    #[must_use]
    pub fn parts(&self) -> &[Self] {
        match &self.body {
            PartBody::Multipart(parts) => parts,
            PartBody::Single(_) => &[],
        }
    }

    /// Returns the disposition type (`inline`, `attachment`) if present.
    #[must_use]
    pub fn disposition(&self) -> Option<String> {
        let value = self.headers.get("content-disposition")?;
        let kind = split_parameters(value).first()?.trim().to_lowercase();
        Some(kind)
    }

    /// Returns the file name from Content-Disposition, falling back to the
    /// Content-Type `name` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        let from_disposition = self.headers.get("content-disposition").and_then(|value| {
            split_parameters(value)
                .into_iter()
                .skip(1)
                .filter_map(|param| param.split_once('='))
                .find(|(key, _)| key.trim().eq_ignore_ascii_case("filename"))
                .map(|(_, value)| unquote(value.trim()))
        });

        from_disposition
            .or_else(|| {
                self.content_type()
                    .ok()
                    .and_then(|ct| ct.parameter("name").map(str::to_string))
            })
            .map(|name| decode_header_value(&name))
    }

    /// Returns the Content-ID without angle brackets.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.headers
            .get("content-id")
            .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>'))
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if this is a multipart part or decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        let PartBody::Single(body) = &self.body else {
            return Err(Error::InvalidMultipart(
                "Use parts for multipart messages".to_string(),
            ));
        };

        match self.transfer_encoding() {
            TransferEncoding::Base64 => {
                let body_str = String::from_utf8_lossy(body);
                // Remove whitespace for lenient parsing
                let cleaned: String = body_str.chars().filter(|c| !c.is_whitespace()).collect();
                decode_base64(&cleaned)
            }
            TransferEncoding::QuotedPrintable => decode_quoted_printable_bytes(body),
            _ => Ok(body.clone()),
        }
    }

    /// Gets the decoded body as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or UTF-8 conversion fails.
    pub fn body_text(&self) -> Result<String> {
        let decoded = self.decode_body()?;
        String::from_utf8(decoded).map_err(Into::into)
    }

    /// This part and all descendants, depth first.
    fn walk(&self) -> Vec<&Self> {
        let mut out = vec![self];
        for part in self.parts() {
            out.extend(part.walk());
        }
        out
    }

    fn is_body_of_type(&self, sub_type: &str) -> bool {
        self.disposition().is_none()
            && matches!(&self.body, PartBody::Single(_))
            && self
                .content_type()
                .is_ok_and(|ct| ct.is("text", sub_type))
    }
}

/// A parsed MIME message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    root: Part,
}

impl Message {
    /// Parses a message in wire format (CRLF or bare LF line endings).
    ///
    /// # Errors
    ///
    /// Returns an error if the multipart structure is malformed.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        Ok(Self {
            root: Part::parse(raw)?,
        })
    }

    /// Returns the top-level part.
    #[must_use]
    pub const fn root(&self) -> &Part {
        &self.root
    }

    /// Returns the top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.root.headers
    }

    /// Gets a top-level header with encoded words decoded.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.root.headers.get_decoded(name)
    }

    /// Gets the decoded Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.header("subject")
    }

    /// Gets the first plain text body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be decoded.
    pub fn text(&self) -> Result<Option<String>> {
        self.first_body("plain")
    }

    /// Gets the first HTML body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be decoded.
    pub fn html(&self) -> Result<Option<String>> {
        self.first_body("html")
    }

    /// Returns every part carrying a Content-Disposition, in document order.
    #[must_use]
    pub fn attachments(&self) -> Vec<&Part> {
        self.root
            .walk()
            .into_iter()
            .filter(|part| part.disposition().is_some())
            .collect()
    }

    fn first_body(&self, sub_type: &str) -> Result<Option<String>> {
        self.root
            .walk()
            .into_iter()
            .find(|part| part.is_body_of_type(sub_type))
            .map(Part::body_text)
            .transpose()
    }
}

fn content_type_of(headers: &Headers) -> Result<ContentType> {
    headers
        .get("content-type")
        .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
}

/// Splits a part at the first blank line.
fn split_head(raw: &[u8]) -> (&[u8], &[u8]) {
    if raw.starts_with(b"\r\n") {
        return (&[], &raw[2..]);
    }
    if raw.starts_with(b"\n") {
        return (&[], &raw[1..]);
    }
    if let Some(pos) = find(raw, b"\r\n\r\n", 0) {
        return (&raw[..pos + 2], &raw[pos + 4..]);
    }
    if let Some(pos) = find(raw, b"\n\n", 0) {
        return (&raw[..pos + 1], &raw[pos + 2..]);
    }
    (raw, &[])
}

/// Splits a multipart body into its sections. The line break before each
/// delimiter belongs to the delimiter.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<&'a [u8]>> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let mut pos = find_delimiter(body, delimiter, 0)
        .ok_or_else(|| Error::InvalidMultipart(format!("no delimiter for {boundary}")))?;
    let mut sections = Vec::new();

    loop {
        let after = pos + delimiter.len();
        if body[after..].starts_with(b"--") {
            break;
        }
        let Some(line_end) = find(body, b"\n", after) else {
            break;
        };
        let start = line_end + 1;

        let Some(next) = find_delimiter(body, delimiter, start) else {
            // Unterminated: take the rest
            sections.push(&body[start..]);
            break;
        };

        let mut end = next;
        if end > start && body[end - 1] == b'\n' {
            end -= 1;
            if end > start && body[end - 1] == b'\r' {
                end -= 1;
            }
        }
        sections.push(&body[start..end]);
        pos = next;
    }

    Ok(sections)
}

/// Finds a delimiter that starts a line.
fn find_delimiter(body: &[u8], delimiter: &[u8], from: usize) -> Option<usize> {
    let mut from = from;
    while let Some(pos) = find(body, delimiter, from) {
        if pos == 0 || body[pos - 1] == b'\n' {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
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
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("base64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_single_part() {
        let raw = concat!(
            "From: sender@example.com\r\n",
            "Subject: =?UTF-8?Q?M=C3=BCller?=\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "Hello=20World=\r\n!"
        );

        let message = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(message.subject().as_deref(), Some("Müller"));
        assert_eq!(message.header("from").as_deref(), Some("sender@example.com"));
        assert_eq!(message.text().unwrap().as_deref(), Some("Hello World!"));
        assert!(message.html().unwrap().is_none());
    }

    #[test]
    fn test_no_content_type_defaults_to_text() {
        let message = Message::parse(b"Subject: x\n\nbody").unwrap();
        assert_eq!(message.text().unwrap().as_deref(), Some("body"));
    }

    #[test]
    fn test_nested_multipart() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=outer\r\n",
            "\r\n",
            "preamble\r\n",
            "--outer\r\n",
            "Content-Type: multipart/alternative; boundary=inner\r\n",
            "\r\n",
            "--inner\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "plain\r\n",
            "--inner\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<b>html</b>\r\n",
            "--inner--\r\n",
            "--outer\r\n",
            "Content-Type: application/pdf; name=\"doc.pdf\"\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "Content-Disposition: attachment; filename=\"doc.pdf\"\r\n",
            "\r\n",
            "JVBE\r\nRg==\r\n",
            "--outer--\r\n"
        );

        let message = Message::parse(raw.as_bytes()).unwrap();
        assert_eq!(message.root().parts().len(), 2);
        assert_eq!(message.text().unwrap().as_deref(), Some("plain"));
        assert_eq!(message.html().unwrap().as_deref(), Some("<b>html</b>"));

        let attachments = message.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename().as_deref(), Some("doc.pdf"));
        assert_eq!(attachments[0].disposition().as_deref(), Some("attachment"));
        assert_eq!(attachments[0].decode_body().unwrap(), b"%PDF");
    }

    #[test]
    fn test_content_id_and_name_fallback() {
        let raw = concat!(
            "Content-Type: multipart/related; boundary=b\r\n",
            "\r\n",
            "--b\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<img src=\"cid:logo\">\r\n",
            "--b\r\n",
            "Content-Type: image/png; name=logo.png\r\n",
            "Content-Disposition: inline\r\n",
            "Content-ID: <logo@company>\r\n",
            "\r\n",
            "iVBO\r\n",
            "--b--"
        );

        let message = Message::parse(raw.as_bytes()).unwrap();
        let attachments = message.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].content_id(), Some("logo@company"));
        assert_eq!(attachments[0].filename().as_deref(), Some("logo.png"));
        assert_eq!(attachments[0].disposition().as_deref(), Some("inline"));
    }

    #[test]
    fn test_missing_boundary() {
        let raw = b"Content-Type: multipart/mixed\r\n\r\nbody";
        assert!(matches!(Message::parse(raw), Err(Error::MissingBoundary)));
    }

    #[test]
    fn test_missing_delimiter() {
        let raw = b"Content-Type: multipart/mixed; boundary=x\r\n\r\nbody";
        assert!(matches!(
            Message::parse(raw),
            Err(Error::InvalidMultipart(_))
        ));
    }

    #[test]
    fn test_empty_section() {
        let sections = split_multipart(b"--b\r\n\r\n--b--", "b").unwrap();
        assert_eq!(sections, vec![b"".as_slice()]);
    }

    #[test]
    fn test_decode_body_of_multipart_fails() {
        let part = Part {
            headers: Headers::new(),
            body: PartBody::Multipart(Vec::new()),
        };
        assert!(part.decode_body().is_err());
    }
}
