//! SMTP command builder.

use crate::types::{Address, AuthMechanism, DsnNotify, DsnRet, xtext};

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO - Simple greeting
    Helo {
        /// Client hostname
        hostname: String,
    },
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH - Begin authentication
    Auth {
        /// Authentication mechanism
        mechanism: AuthMechanism,
        /// Initial response (optional, for SASL-IR)
        initial_response: Option<String>,
    },
    /// Continuation line of a SASL exchange (base64, possibly empty)
    AuthResponse(String),
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
        /// SIZE parameter
        size: Option<usize>,
        /// DSN RET parameter
        ret: Option<DsnRet>,
        /// DSN ENVID parameter (raw, xtext-encoded on the wire)
        envelope_id: Option<String>,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
        /// DSN NOTIFY parameter
        notify: Option<DsnNotify>,
    },
    /// DATA - Begin message data
    Data,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Serializes the command to bytes, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut line = match self {
            Self::Helo { hostname } => format!("HELO {hostname}"),
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::Auth {
                mechanism,
                initial_response,
            } => match initial_response {
                Some(resp) => format!("AUTH {mechanism} {resp}"),
                None => format!("AUTH {mechanism}"),
            },
            Self::AuthResponse(resp) => resp.clone(),
            Self::MailFrom {
                from,
                size,
                ret,
                envelope_id,
            } => {
                let mut line = format!("MAIL FROM:<{from}>");
                if let Some(size) = size {
                    line.push_str(&format!(" SIZE={size}"));
                }
                if let Some(ret) = ret {
                    line.push_str(" RET=");
                    line.push_str(ret.as_str());
                }
                if let Some(id) = envelope_id {
                    line.push_str(" ENVID=");
                    line.push_str(&xtext(id));
                }
                line
            }
            Self::RcptTo { to, notify } => match notify {
                Some(notify) => format!("RCPT TO:<{to}> NOTIFY={}", notify.value()),
                None => format!("RCPT TO:<{to}>"),
            },
            Self::Data => "DATA".to_string(),
            Self::Quit => "QUIT".to_string(),
        };

        line.push_str("\r\n");
        line.into_bytes()
    }

    /// Returns the command verb, safe to log.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Helo { .. } => "HELO",
            Self::Ehlo { .. } => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::Auth { .. } | Self::AuthResponse(_) => "AUTH",
            Self::MailFrom { .. } => "MAIL FROM",
            Self::RcptTo { .. } => "RCPT TO",
            Self::Data => "DATA",
            Self::Quit => "QUIT",
        }
    }
}
