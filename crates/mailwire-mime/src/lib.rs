//! # mailwire-mime
//!
//! MIME composition and parsing for outbound email.
//!
//! ## Features
//!
//! - **Mailboxes**: Parse and validate `Name <user@host>` expressions
//! - **Header encoding**: RFC 2047 encoded words for non-ASCII values
//! - **Composition**: Text, HTML, inline and file attachments with nested
//!   multipart layers, header folding and SMTP dot-stuffing
//! - **Parsing**: Read composed messages back into a part tree
//!
//! ## Quick Start
//!
//! ### Composing a Message
//!
//! ```ignore
//! use mailwire_mime::{Body, Composer, Draft, Mailbox};
//!
//! let draft = Draft::new(
//!     Mailbox::parse("Sender <sender@example.com>")?,
//!     vec![Mailbox::new("recipient@example.com")?],
//!     "Test Message",
//!     Body::Text("Hello, World!".to_string()),
//! );
//!
//! let mut composer = Composer::from_entropy();
//! let message = composer.render_message(&draft);
//! let data = composer.render(&draft); // dot-stuffed, ends with ".\r\n"
//! ```
//!
//! ### Inline Images
//!
//! ```ignore
//! use mailwire_mime::Attachment;
//!
//! let logo = Attachment::from_base64("logo.png", encoded)?
//!     .with_mime_type("image/png")?
//!     .with_content_id("logo@company"); // inline, multipart/related
//! draft.attachments.push(logo);
//! ```
//!
//! ### Parsing
//!
//! ```ignore
//! use mailwire_mime::Message;
//!
//! let parsed = Message::parse(message.as_bytes())?;
//! println!("Subject: {}", parsed.subject().unwrap_or_default());
//! println!("Body: {:?}", parsed.text()?);
//! ```
//!
//! ### Header Encoding
//!
//! ```ignore
//! use mailwire_mime::encoding::encode_header;
//!
//! assert_eq!(encode_header("Müller"), "=?UTF-8?Q?M=C3=BCller?=");
//! assert_eq!(encode_header("Hello World"), "Hello World");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod attachment;
mod compose;
mod content_type;
mod draft;
mod error;
mod header;
mod message;

pub mod encoding;
pub mod transparency;

pub use address::{Mailbox, is_valid_email, validate};
pub use attachment::Attachment;
pub use compose::Composer;
pub use content_type::ContentType;
pub use draft::{Body, Draft};
pub use error::{Error, Result};
pub use header::{FOLD_WIDTH, Headers, MAX_HEADER_LINE, fold};
pub use message::{Message, Part, PartBody, TransferEncoding};
