//! Message composition.
//!
//! Turns a [`Draft`] into RFC 5322 text. Multipart layers nest in a fixed
//! order: `alternative` (text + HTML) innermost, then `related` (inline
//! attachments referenced by `cid:`), then `mixed` (everything else).

use crate::attachment::Attachment;
use crate::content_type::ContentType;
use crate::draft::{Body, Draft};
use crate::encoding::{encode_base64_wrapped, encode_header, encode_quoted_printable};
use crate::header::Headers;
use crate::transparency::dot_stuff;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::fmt::Write as _;

/// Number of random characters in a boundary token.
const BOUNDARY_LENGTH: usize = 24;

/// Headers the composer always writes itself. Custom headers with these
/// names are dropped.
const STANDARD_HEADERS: &[&str] = &[
    "from",
    "to",
    "cc",
    "bcc",
    "subject",
    "reply-to",
    "date",
    "message-id",
    "mime-version",
    "content-type",
    "content-transfer-encoding",
];

/// Renders drafts into wire-format messages.
///
/// Boundaries and the Message-ID come from the owned random source, so a
/// seeded source gives reproducible output.
#[derive(Debug)]
pub struct Composer<R> {
    rng: R,
    date: Option<DateTime<Utc>>,
    bcc_header: bool,
}

impl Composer<StdRng> {
    /// Creates a composer seeded from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: RngCore> Composer<R> {
    /// Creates a composer that draws randomness from `rng`.
    pub const fn new(rng: R) -> Self {
        Self {
            rng,
            date: None,
            bcc_header: false,
        }
    }

    /// Uses a fixed `Date` instead of the current time.
    #[must_use]
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Writes a `Bcc` header. Off by default: blind copies only reach the
    /// envelope.
    #[must_use]
    pub const fn with_bcc_header(mut self, enabled: bool) -> Self {
        self.bcc_header = enabled;
        self
    }

    /// Renders the message (headers and body) with CRLF line endings.
    pub fn render_message(&mut self, draft: &Draft) -> String {
        let root = self.build_tree(draft);

        let mut headers = Headers::new();
        headers.add("From", draft.from.to_string());
        headers.add("To", join_mailboxes(&draft.to));
        if !draft.cc.is_empty() {
            headers.add("Cc", join_mailboxes(&draft.cc));
        }
        if self.bcc_header && !draft.bcc.is_empty() {
            headers.add("Bcc", join_mailboxes(&draft.bcc));
        }
        headers.add("Subject", encode_header(&single_line(&draft.subject)));
        if let Some(reply_to) = &draft.reply_to {
            headers.add("Reply-To", reply_to.to_string());
        }
        let date = self.date.unwrap_or_else(Utc::now);
        headers.add("Date", date.to_rfc2822());
        headers.add("Message-ID", self.message_id(draft.from.domain()));
        headers.add("MIME-Version", "1.0");
        for (name, value) in root.content_headers() {
            headers.add(name, value);
        }

        for (name, value) in &draft.headers {
            let name = name.trim();
            if !is_field_name(name)
                || STANDARD_HEADERS
                    .iter()
                    .any(|standard| standard.eq_ignore_ascii_case(name))
            {
                continue;
            }
            headers.add(name, encode_header(&single_line(value)));
        }

        let mut out = headers.to_string();
        out.push_str("\r\n");
        root.write_body(&mut out);
        out
    }

    /// Renders the message as a DATA payload: dot-stuffed and followed by
    /// the `.` terminator line.
    pub fn render(&mut self, draft: &Draft) -> Vec<u8> {
        dot_stuff(self.render_message(draft).as_bytes())
    }

    fn build_tree(&mut self, draft: &Draft) -> Node {
        let mut root = match &draft.body {
            Body::Text(text) => Node::text(ContentType::text_plain(), text),
            Body::Html(html) => Node::text(ContentType::text_html(), html),
            Body::Alternative { text, html } => Node::Multipart {
                content_type: ContentType::multipart("alternative", self.boundary("alt")),
                parts: vec![
                    Node::text(ContentType::text_plain(), text),
                    Node::text(ContentType::text_html(), html),
                ],
            },
        };

        let (related, mixed): (Vec<&Attachment>, Vec<&Attachment>) =
            draft.attachments.iter().partition(|a| a.is_related());

        if !related.is_empty() {
            let mut parts = vec![root];
            parts.extend(related.into_iter().map(Node::attachment));
            root = Node::Multipart {
                content_type: ContentType::multipart("related", self.boundary("rel")),
                parts,
            };
        }

        if !mixed.is_empty() {
            let mut parts = vec![root];
            parts.extend(mixed.into_iter().map(Node::attachment));
            root = Node::Multipart {
                content_type: ContentType::multipart("mixed", self.boundary("mix")),
                parts,
            };
        }

        root
    }

    fn boundary(&mut self, kind: &str) -> String {
        let token: String = (0..BOUNDARY_LENGTH)
            .map(|_| char::from(self.rng.sample(Alphanumeric)))
            .collect();
        format!("=_mw_{kind}_{token}")
    }

    fn message_id(&mut self, domain: &str) -> String {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        let mut id = String::with_capacity(bytes.len() * 2 + domain.len() + 3);
        id.push('<');
        for byte in bytes {
            let _ = write!(id, "{byte:02x}");
        }
        let _ = write!(id, "@{domain}>");
        id
    }
}

/// One node of the MIME tree being rendered.
enum Node {
    Leaf {
        headers: Vec<(&'static str, String)>,
        body: String,
    },
    Multipart {
        content_type: ContentType,
        parts: Vec<Node>,
    },
}

impl Node {
    fn text(content_type: ContentType, text: &str) -> Self {
        Self::Leaf {
            headers: vec![
                ("Content-Type", content_type.to_string()),
                ("Content-Transfer-Encoding", "quoted-printable".to_string()),
            ],
            body: encode_quoted_printable(text),
        }
    }

    fn attachment(attachment: &Attachment) -> Self {
        let mut headers = vec![
            ("Content-Type", attachment.content_type_header()),
            ("Content-Transfer-Encoding", "base64".to_string()),
            ("Content-Disposition", attachment.disposition_header()),
        ];
        if let Some(cid) = attachment.content_id() {
            headers.push(("Content-ID", format!("<{cid}>")));
        }
        Self::Leaf {
            headers,
            body: encode_base64_wrapped(attachment.content()),
        }
    }

    fn content_headers(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Leaf { headers, .. } => headers.clone(),
            Self::Multipart { content_type, .. } => {
                vec![("Content-Type", content_type.to_string())]
            }
        }
    }

    /// Writes the body without a trailing line break; the enclosing
    /// delimiter or the DATA terminator supplies it.
    fn write_body(&self, out: &mut String) {
        match self {
            Self::Leaf { body, .. } => out.push_str(body),
            Self::Multipart {
                content_type,
                parts,
            } => {
                let boundary = content_type.boundary().unwrap_or_default();
                for part in parts {
                    let _ = write!(out, "--{boundary}\r\n");
                    let mut headers = Headers::new();
                    for (name, value) in part.content_headers() {
                        headers.add(name, value);
                    }
                    let _ = write!(out, "{headers}\r\n");
                    part.write_body(out);
                    out.push_str("\r\n");
                }
                let _ = write!(out, "--{boundary}--");
            }
        }
    }
}

fn join_mailboxes(mailboxes: &[crate::address::Mailbox]) -> String {
    mailboxes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Replaces line breaks so a value cannot inject extra header lines.
fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// RFC 5322 field name: printable ASCII except `:`.
fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| (0x21..=0x7E).contains(&b) && b != b':')
}
