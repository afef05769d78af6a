//! Mailbox parsing and validation.

use crate::encoding::encode_header;
use crate::error::{Error, Result};
use std::fmt;

/// Characters never allowed in an unquoted address.
const FORBIDDEN: &[char] = &['<', '>', '(', ')', '[', ']', ',', ';', ':', '\\', '"'];

/// A named or bare email address used in From/To/Cc/Bcc/Reply-To roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox {
    name: Option<String>,
    email: String,
}

impl Mailbox {
    /// Creates a mailbox from a bare address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is malformed.
    pub fn new(email: impl Into<String>) -> Result<Self> {
        let email = email.into();
        validate(&email)?;
        Ok(Self { name: None, email })
    }

    /// Creates a mailbox with a display name.
    ///
    /// An empty or whitespace-only name is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is malformed.
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let mut mailbox = Self::new(email)?;
        let name = name.into();
        let name = name.trim();
        if !name.is_empty() {
            mailbox.name = Some(name.to_string());
        }
        Ok(mailbox)
    }

    /// Parses a mailbox expression.
    ///
    /// Accepts `user@host`, `<user@host>`, `Name <user@host>` and
    /// `"Quoted, Name" <user@host>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] carrying the raw input if it cannot
    /// be parsed or the address is malformed.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || Error::InvalidAddress(input.to_string());
        let trimmed = input.trim();

        let Some(without_close) = trimmed.strip_suffix('>') else {
            return Self::new(trimmed).map_err(|_| invalid());
        };
        let open = without_close.rfind('<').ok_or_else(invalid)?;
        let email = &without_close[open + 1..];
        let name = unquote(without_close[..open].trim()).ok_or_else(invalid)?;

        Self::with_name(name, email).map_err(|_| invalid())
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the domain part of the address.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.email
            .rsplit_once('@')
            .map_or(self.email.as_str(), |(_, domain)| domain)
    }
}

/// Renders the mailbox for a header: the bare address, `"Name" <address>`
/// for ASCII names, or an encoded word followed by `<address>`.
impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            None => write!(f, "{}", self.email),
            Some(name) => {
                let encoded = encode_header(name);
                if encoded == *name {
                    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                    write!(f, "\"{escaped}\" <{}>", self.email)
                } else {
                    write!(f, "{encoded} <{}>", self.email)
                }
            }
        }
    }
}

impl std::str::FromStr for Mailbox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Checks that `addr` looks like `local@domain.tld`.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] carrying the raw input on failure.
pub fn validate(addr: &str) -> Result<()> {
    let invalid = || Error::InvalidAddress(addr.to_string());

    if addr.is_empty()
        || addr
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(&c))
    {
        return Err(invalid());
    }

    let (local, domain) = addr.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }

    Ok(())
}

/// Returns true if `addr` passes [`validate`].
#[must_use]
pub fn is_valid_email(addr: &str) -> bool {
    validate(addr).is_ok()
}

/// Strips surrounding quotes from a display name, resolving `\` escapes.
fn unquote(name: &str) -> Option<String> {
    let Some(inner) = name.strip_prefix('"') else {
        return Some(name.to_string());
    };
    let inner = inner.strip_suffix('"')?;

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            result.push(chars.next()?);
        } else {
            result.push(c);
        }
    }
    Some(result)
}
