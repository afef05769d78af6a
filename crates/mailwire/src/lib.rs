//! # mailwire
//!
//! Compose an email and deliver it over SMTP.
//!
//! This crate provides:
//! - The [`Email`] entity, validated on construction, with a shared
//!   [`Delivery`] outcome
//! - [`ConnectionConfig`] for host, security mode, credentials and timeouts
//! - The [`Mailer`] send engine (one connection per message, per-recipient
//!   results)
//! - A [`queue`] adapter for external message queues
//!
//! ## Example
//!
//! ```ignore
//! use mailwire::{ConnectionConfig, Email, EmailOptions, Mailer};
//!
//! let config = ConnectionConfig::builder("smtp.example.com")
//!     .credentials("user", "password")
//!     .build();
//!
//! let email = Email::new(
//!     EmailOptions::new("Ops <ops@example.com>", "dev@example.com", "Build finished")
//!         .text("All green.")
//!         .html("<p>All green.</p>"),
//! )?;
//!
//! let report = Mailer::new(config).send(&email).await?;
//! println!("accepted: {:?}", report.accepted);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod delivery;
pub mod email;
mod error;
pub mod mailer;
pub mod queue;

pub use config::{ConnectionConfig, ConnectionConfigBuilder, Credentials, Security};
pub use delivery::{AlreadyResolved, Delivery, DeliveryStatus};
pub use email::{AttachmentInput, Email, EmailOptions, MailboxInput, Recipients};
pub use error::{Error, Result};
pub use mailer::{Mailer, SendReport};
pub use queue::{BatchObserver, Deliver, ProcessResult, QueueItem, QueueJob, SmtpDeliverer, process_batch};

pub use mailwire_smtp::{AuthMechanism, Dsn, DsnNotify, DsnRet};
