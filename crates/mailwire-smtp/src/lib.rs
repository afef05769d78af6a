//! # mailwire-smtp
//!
//! An async SMTP submission client implementing RFC 5321.
//!
//! ## Features
//!
//! - **Sequential protocol engine**: one command, one reply, no pipelining,
//!   with a per-step timeout on every round trip
//! - **TLS support**: implicit TLS (port 465) and STARTTLS, via rustls
//! - **Authentication**: PLAIN, LOGIN, CRAM-MD5, XOAUTH2
//! - **Extensions**: SIZE, DSN, STARTTLS, AUTH discovery
//! - **Pluggable transport**: anything implementing [`Transport`], so the
//!   client can be driven against an in-memory server
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use mailwire_smtp::{Address, AuthMechanism, Client, connection::connect};
//!
//! #[tokio::main]
//! async fn main() -> mailwire_smtp::Result<()> {
//!     let stream = connect("smtp.example.com", 587).await?;
//!     let mut client = Client::new(stream, Duration::from_secs(30));
//!
//!     client.greet("client.example.com").await?;
//!     client.starttls("smtp.example.com", "client.example.com").await?;
//!     client
//!         .authenticate(AuthMechanism::Plain, "user@example.com", "password")
//!         .await?;
//!
//!     client.mail_from(&Address::new("sender@example.com")?, None, None).await?;
//!     let reply = client
//!         .rcpt_to(&Address::new("recipient@example.com")?, None)
//!         .await?;
//!     assert!(reply.is_success());
//!
//!     client.data().await?;
//!     client
//!         .send_message(b"Subject: Test\r\n\r\nHello, World!\r\n.\r\n")
//!         .await?;
//!     client.quit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! Connected ─ greet() → Greeted ─ starttls() → TlsReady ─ authenticate() → Authenticated
//!
//! ─ mail_from() → MailFrom ─ rcpt_to() → Recipients ─ data() → Data
//!   ─ send_message() → Delivered ─ quit() → Closed
//! ```
//!
//! ## Modules
//!
//! - [`auth`]: SASL response builders
//! - [`command`]: SMTP command builders
//! - [`connection`]: Transport, stream and client
//! - [`parser`]: Reply parser
//! - [`types`]: Core SMTP types (addresses, extensions, replies, DSN)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{Client, ServerInfo, SessionState, SmtpStream, Transport};
pub use error::{Error, Result};
pub use types::{
    Address, AuthMechanism, Dsn, DsnNotify, DsnRet, Extension, Reply, ReplyClass, ReplyCode,
};
