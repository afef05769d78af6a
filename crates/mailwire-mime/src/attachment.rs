//! File attachments.

use crate::content_type::ContentType;
use crate::encoding::{decode_base64, encode_header};
use crate::error::Result;

/// A file attached to an outgoing message.
///
/// Content is held decoded; it is re-encoded as wrapped base64 when the
/// message is composed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: String,
    content: Vec<u8>,
    content_type: ContentType,
    content_id: Option<String>,
    inline: Option<bool>,
}

impl Attachment {
    /// Creates an attachment from raw bytes with a `text/plain` type.
    #[must_use]
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            content_type: ContentType::new("text", "plain"),
            content_id: None,
            inline: None,
        }
    }

    /// Creates an attachment from base64-encoded content.
    ///
    /// Line breaks and other whitespace in the encoded text are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid base64.
    pub fn from_base64(filename: impl Into<String>, encoded: &str) -> Result<Self> {
        let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        Ok(Self::new(filename, decode_base64(&cleaned)?))
    }

    /// Sets the MIME type, e.g. `application/pdf`.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is not of the form `type/subtype`.
    pub fn with_mime_type(mut self, mime_type: &str) -> Result<Self> {
        self.content_type = ContentType::parse(mime_type)?;
        Ok(self)
    }

    /// Sets the Content-ID used to reference this attachment via `cid:`.
    #[must_use]
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        let content_id = content_id.into();
        let trimmed = content_id.trim().trim_start_matches('<').trim_end_matches('>');
        self.content_id = Some(trimmed.to_string());
        self
    }

    /// Overrides the inline flag. Without an override an attachment is
    /// inline exactly when it has a Content-ID.
    #[must_use]
    pub const fn with_inline(mut self, inline: bool) -> Self {
        self.inline = Some(inline);
        self
    }

    /// Returns the file name.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the decoded content.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Returns the MIME type without the `name` parameter.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Returns the Content-ID without angle brackets.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    /// Returns true if the attachment is rendered with an inline disposition.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.inline.unwrap_or(self.content_id.is_some())
    }

    /// Returns true if the attachment belongs in a `multipart/related`
    /// container next to the body that references it.
    #[must_use]
    pub fn is_related(&self) -> bool {
        self.content_id.is_some() && self.is_inline()
    }

    /// Content-Type header value, carrying the file name.
    pub(crate) fn content_type_header(&self) -> String {
        self.content_type
            .clone()
            .with_parameter("name", encode_header(&self.filename))
            .to_string()
    }

    /// Content-Disposition header value.
    pub(crate) fn disposition_header(&self) -> String {
        if self.is_inline() {
            "inline".to_string()
        } else {
            let name = encode_header(&self.filename)
                .replace('\\', "\\\\")
                .replace('"', "\\\"");
            format!("attachment; filename=\"{name}\"")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_from_base64() {
        let attachment = Attachment::from_base64("hello.txt", "SGVs\r\nbG8=").unwrap();
        assert_eq!(attachment.content(), b"Hello");
        assert_eq!(attachment.content_type().to_string(), "text/plain");
    }

    #[test]
    fn test_from_invalid_base64() {
        assert!(Attachment::from_base64("bad.bin", "not base64!").is_err());
    }

    #[test]
    fn test_inline_defaults_to_content_id() {
        let plain = Attachment::new("a.txt", "x");
        assert!(!plain.is_inline());
        assert!(!plain.is_related());

        let logo = Attachment::new("logo.png", "x").with_content_id("<logo@company>");
        assert_eq!(logo.content_id(), Some("logo@company"));
        assert!(logo.is_inline());
        assert!(logo.is_related());

        let forced = logo.with_inline(false);
        assert!(!forced.is_inline());
        assert!(!forced.is_related());
    }

    #[test]
    fn test_disposition() {
        let attachment = Attachment::new("document.pdf", "x");
        assert_eq!(
            attachment.disposition_header(),
            "attachment; filename=\"document.pdf\""
        );
        let inline = attachment.with_inline(true);
        assert_eq!(inline.disposition_header(), "inline");
    }

    #[test]
    fn test_content_type_header_carries_name() {
        let attachment = Attachment::new("document.pdf", "x")
            .with_mime_type("application/pdf")
            .unwrap();
        assert_eq!(
            attachment.content_type_header(),
            "application/pdf; name=document.pdf"
        );
    }

    #[test]
    fn test_invalid_mime_type() {
        assert!(Attachment::new("a", "x").with_mime_type("pdf").is_err());
    }
}
