//! Structured input to the composer.

use crate::address::Mailbox;
use crate::attachment::Attachment;

/// Message content. At least one of plain text and HTML is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Plain text only.
    Text(String),
    /// HTML only.
    Html(String),
    /// Both versions, rendered as `multipart/alternative`.
    Alternative {
        /// Plain text version.
        text: String,
        /// HTML version.
        html: String,
    },
}

impl Body {
    /// Builds a body from optional parts; `None` when both are absent.
    #[must_use]
    pub fn from_parts(text: Option<String>, html: Option<String>) -> Option<Self> {
        match (text, html) {
            (Some(text), Some(html)) => Some(Self::Alternative { text, html }),
            (Some(text), None) => Some(Self::Text(text)),
            (None, Some(html)) => Some(Self::Html(html)),
            (None, None) => None,
        }
    }

    /// Returns the plain text version, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::Alternative { text, .. } => Some(text),
            Self::Html(_) => None,
        }
    }

    /// Returns the HTML version, if any.
    #[must_use]
    pub fn html(&self) -> Option<&str> {
        match self {
            Self::Html(html) | Self::Alternative { html, .. } => Some(html),
            Self::Text(_) => None,
        }
    }
}

/// A validated message ready to be composed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    /// Sender.
    pub from: Mailbox,
    /// Primary recipients.
    pub to: Vec<Mailbox>,
    /// Carbon-copy recipients.
    pub cc: Vec<Mailbox>,
    /// Blind carbon-copy recipients.
    pub bcc: Vec<Mailbox>,
    /// Reply-To address.
    pub reply_to: Option<Mailbox>,
    /// Subject line.
    pub subject: String,
    /// Text and/or HTML content.
    pub body: Body,
    /// Custom headers in the order supplied.
    pub headers: Vec<(String, String)>,
    /// Attachments in the order supplied.
    pub attachments: Vec<Attachment>,
}

impl Draft {
    /// Creates a draft with a single recipient list and no extras.
    #[must_use]
    pub fn new(from: Mailbox, to: Vec<Mailbox>, subject: impl Into<String>, body: Body) -> Self {
        Self {
            from,
            to,
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: None,
            subject: subject.into(),
            body,
            headers: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Envelope recipients: to, then cc, then bcc.
    pub fn recipients(&self) -> impl Iterator<Item = &Mailbox> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_body_from_parts() {
        assert_eq!(
            Body::from_parts(Some("t".into()), None),
            Some(Body::Text("t".into()))
        );
        assert!(Body::from_parts(None, None).is_none());

        let both = Body::from_parts(Some("t".into()), Some("h".into())).unwrap();
        assert_eq!(both.text(), Some("t"));
        assert_eq!(both.html(), Some("h"));
    }

    #[test]
    fn test_recipients_order() {
        let mut draft = Draft::new(
            Mailbox::new("from@example.com").unwrap(),
            vec![Mailbox::new("to@example.com").unwrap()],
            "Hi",
            Body::Text("x".into()),
        );
        draft.cc.push(Mailbox::new("cc@example.com").unwrap());
        draft.bcc.push(Mailbox::new("bcc@example.com").unwrap());

        let emails: Vec<&str> = draft.recipients().map(Mailbox::email).collect();
        assert_eq!(emails, ["to@example.com", "cc@example.com", "bcc@example.com"]);
    }
}
