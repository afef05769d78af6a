//! The email entity and its caller-facing input shape.

use std::fmt;

use mailwire_mime::{Attachment, Body, Composer, Draft, Mailbox};
use rand::RngCore;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::delivery::Delivery;
use crate::error::{Error, Result};

/// A mailbox as supplied by the caller: `"Name <addr>"`/`"addr"` or a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MailboxInput {
    /// Mailbox expression such as `Jane <jane@example.com>`.
    Text(String),
    /// Explicit display name and address.
    Pair {
        /// Display name.
        #[serde(default)]
        name: Option<String>,
        /// Address.
        email: String,
    },
}

impl MailboxInput {
    /// The raw text reported when validation fails.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Pair { email, .. } => email,
        }
    }

    fn to_mailbox(&self) -> Option<Mailbox> {
        match self {
            Self::Text(text) => Mailbox::parse(text).ok(),
            Self::Pair {
                name: Some(name), email,
            } => Mailbox::with_name(name.clone(), email.clone()).ok(),
            Self::Pair { name: None, email } => Mailbox::new(email.clone()).ok(),
        }
    }
}

impl From<&str> for MailboxInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MailboxInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One recipient or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    /// A single mailbox.
    One(MailboxInput),
    /// An ordered list of mailboxes.
    Many(Vec<MailboxInput>),
}

impl Default for Recipients {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl Recipients {
    /// Returns the recipients in order.
    #[must_use]
    pub fn as_slice(&self) -> &[MailboxInput] {
        match self {
            Self::One(one) => std::slice::from_ref(one),
            Self::Many(many) => many,
        }
    }
}

impl From<&str> for Recipients {
    fn from(value: &str) -> Self {
        Self::One(value.into())
    }
}

impl<T: Into<MailboxInput>> From<Vec<T>> for Recipients {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values.into_iter().map(Into::into).collect())
    }
}

/// An attachment as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInput {
    /// File name shown to the recipient.
    pub filename: String,
    /// Base64-encoded content.
    pub content: String,
    /// MIME type, `text/plain` when absent.
    #[serde(default, alias = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Content-ID for `cid:` references from the HTML body.
    #[serde(default, alias = "cid", alias = "contentId", skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    /// Inline flag; defaults to true when a Content-ID is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
}

impl AttachmentInput {
    /// Creates an attachment input from already-encoded content.
    #[must_use]
    pub fn new(filename: impl Into<String>, content_base64: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content_base64.into(),
            mime_type: None,
            content_id: None,
            inline: None,
        }
    }

    fn to_attachment(&self) -> Result<Attachment> {
        let invalid =
            |e: mailwire_mime::Error| Error::InvalidContent(format!("attachment {:?}: {e}", self.filename));

        let mut attachment = Attachment::from_base64(&self.filename, &self.content).map_err(invalid)?;
        if let Some(mime_type) = &self.mime_type {
            attachment = attachment.with_mime_type(mime_type).map_err(invalid)?;
        }
        if let Some(content_id) = &self.content_id {
            attachment = attachment.with_content_id(content_id);
        }
        if let Some(inline) = self.inline {
            attachment = attachment.with_inline(inline);
        }
        Ok(attachment)
    }
}

/// Everything needed to build an [`Email`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailOptions {
    /// Sender.
    pub from: MailboxInput,
    /// Primary recipients (at least one).
    #[serde(default)]
    pub to: Recipients,
    /// Carbon-copy recipients.
    #[serde(default)]
    pub cc: Recipients,
    /// Blind carbon-copy recipients; envelope only.
    #[serde(default)]
    pub bcc: Recipients,
    /// Reply-To address.
    #[serde(default, alias = "reply", alias = "replyTo", skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MailboxInput>,
    /// Subject line.
    #[serde(default)]
    pub subject: String,
    /// Plain text body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// HTML body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Custom headers in the order supplied.
    #[serde(default, with = "ordered_headers")]
    pub headers: Vec<(String, String)>,
    /// Attachments in the order supplied.
    #[serde(default)]
    pub attachments: Vec<AttachmentInput>,
}

impl EmailOptions {
    /// Starts options with a sender, recipients and subject.
    #[must_use]
    pub fn new(
        from: impl Into<MailboxInput>,
        to: impl Into<Recipients>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            cc: Recipients::default(),
            bcc: Recipients::default(),
            reply_to: None,
            subject: subject.into(),
            text: None,
            html: None,
            headers: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Sets the carbon-copy recipients.
    #[must_use]
    pub fn cc(mut self, cc: impl Into<Recipients>) -> Self {
        self.cc = cc.into();
        self
    }

    /// Sets the blind carbon-copy recipients.
    #[must_use]
    pub fn bcc(mut self, bcc: impl Into<Recipients>) -> Self {
        self.bcc = bcc.into();
        self
    }

    /// Sets the Reply-To address.
    #[must_use]
    pub fn reply_to(mut self, reply_to: impl Into<MailboxInput>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Appends a custom header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends an attachment.
    #[must_use]
    pub fn attachment(mut self, attachment: AttachmentInput) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// A validated message plus its delivery outcome.
///
/// Clones share the outcome slot.
#[derive(Debug, Clone)]
pub struct Email {
    draft: Draft,
    delivery: Delivery,
}

impl Email {
    /// Validates the options and builds the message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEmail`] listing every malformed address
    /// (from, to, cc, bcc, reply-to, each in list order), or
    /// [`Error::InvalidContent`] when there is no body or an attachment is
    /// malformed.
    pub fn new(options: EmailOptions) -> Result<Self> {
        let mut invalid = Vec::new();
        let mut check = |input: &MailboxInput| {
            let mailbox = input.to_mailbox();
            if mailbox.is_none() {
                invalid.push(input.raw().to_string());
            }
            mailbox
        };

        let from = check(&options.from);
        let to: Vec<_> = options.to.as_slice().iter().filter_map(&mut check).collect();
        let cc: Vec<_> = options.cc.as_slice().iter().filter_map(&mut check).collect();
        let bcc: Vec<_> = options.bcc.as_slice().iter().filter_map(&mut check).collect();
        let reply_to = options.reply_to.as_ref().and_then(&mut check);

        let Some(from) = from.filter(|_| invalid.is_empty()) else {
            return Err(Error::InvalidEmail { invalid });
        };
        if options.to.as_slice().is_empty() {
            return Err(Error::InvalidEmail {
                invalid: Vec::new(),
            });
        }

        let body = Body::from_parts(options.text, options.html).ok_or_else(|| {
            Error::InvalidContent("either text or html content is required".into())
        })?;

        let attachments = options
            .attachments
            .iter()
            .map(AttachmentInput::to_attachment)
            .collect::<Result<Vec<_>>>()?;

        let mut draft = Draft::new(from, to, options.subject, body);
        draft.cc = cc;
        draft.bcc = bcc;
        draft.reply_to = reply_to;
        draft.headers = options.headers;
        draft.attachments = attachments;

        Ok(Self {
            draft,
            delivery: Delivery::new(),
        })
    }

    /// Returns the validated message content.
    #[must_use]
    pub const fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Returns the delivery outcome slot.
    #[must_use]
    pub const fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    /// Renders the DATA payload with the given composer.
    #[must_use]
    pub fn render<R: RngCore>(&self, composer: &mut Composer<R>) -> Vec<u8> {
        composer.render(&self.draft)
    }
}

impl TryFrom<EmailOptions> for Email {
    type Error = Error;

    fn try_from(options: EmailOptions) -> Result<Self> {
        Self::new(options)
    }
}

mod ordered_headers {
    use super::{
        Deserializer, MapAccess, SerializeMap, Serializer, Visitor, fmt,
    };

    pub fn serialize<S: Serializer>(
        headers: &[(String, String)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(headers.len()))?;
        for (name, value) in headers {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, String)>, D::Error> {
        struct HeaderVisitor;

        impl<'de> Visitor<'de> for HeaderVisitor {
            type Value = Vec<(String, String)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut headers = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, String>()? {
                    headers.push(entry);
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeaderVisitor)
    }
}
