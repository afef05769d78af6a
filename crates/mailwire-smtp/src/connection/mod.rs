//! SMTP connection management.
//!
//! This module provides:
//! - The [`Transport`] seam and its TCP/TLS implementation [`SmtpStream`]
//! - The timed protocol [`Client`] and its [`SessionState`]
//! - [`ServerInfo`], the capabilities discovered with EHLO

mod client;
mod state;
mod stream;
mod transport;

pub use client::Client;
pub use state::SessionState;
pub use stream::{SmtpStream, connect, connect_tls, create_tls_connector};
pub use transport::Transport;

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// Server capabilities from the greeting and EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Checks if the SIZE extension is advertised, with or without a limit.
    #[must_use]
    pub fn supports_size(&self) -> bool {
        self.extensions
            .iter()
            .any(|ext| matches!(ext, Extension::Size(_)))
    }

    /// Returns the maximum message size, if advertised and non-zero.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(Some(limit)) if *limit > 0 => Some(*limit),
            _ => None,
        })
    }

    /// Returns supported authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Picks a mechanism when none is configured: the first of
    /// [`AuthMechanism::PREFERENCE`] the server offers, else PLAIN.
    #[must_use]
    pub fn preferred_auth(&self) -> AuthMechanism {
        let offered = self.auth_mechanisms();
        AuthMechanism::PREFERENCE
            .into_iter()
            .find(|m| offered.contains(m))
            .unwrap_or(AuthMechanism::Plain)
    }
}
