//! SMTP service extensions advertised in the EHLO reply.

/// SMTP extensions discovered from EHLO response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH - Authentication, with the mechanisms this client implements
    Auth(Vec<AuthMechanism>),
    /// SIZE - Maximum message size (`None` or 0 means no fixed limit)
    Size(Option<usize>),
    /// 8BITMIME - 8-bit MIME transport
    EightBitMime,
    /// PIPELINING - Command pipelining
    Pipelining,
    /// CHUNKING - Chunked message transfer
    Chunking,
    /// SMTPUTF8 - UTF-8 email addresses
    SmtpUtf8,
    /// DSN - Delivery status notifications
    Dsn,
    /// BINARYMIME - Binary MIME
    BinaryMime,
    /// Unknown extension, kept verbatim
    Unknown(String),
}

impl Extension {
    /// Parses one EHLO keyword line, e.g. `AUTH PLAIN LOGIN` or `SIZE 35882577`.
    ///
    /// Some servers still advertise `AUTH=PLAIN LOGIN`; that form is accepted
    /// too.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut words = line.split(|c: char| c.is_whitespace() || c == '=');
        let Some(keyword) = words.next().filter(|k| !k.is_empty()) else {
            return Self::Unknown(line.to_string());
        };

        match keyword.to_ascii_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(words.filter_map(AuthMechanism::parse).collect()),
            "SIZE" => Self::Size(words.find(|w| !w.is_empty()).and_then(|s| s.parse().ok())),
            "8BITMIME" => Self::EightBitMime,
            "PIPELINING" => Self::Pipelining,
            "CHUNKING" => Self::Chunking,
            "SMTPUTF8" => Self::SmtpUtf8,
            "DSN" => Self::Dsn,
            "BINARYMIME" => Self::BinaryMime,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuthMechanism {
    /// PLAIN - credentials in the initial response
    #[cfg_attr(feature = "serde", serde(rename = "plain"))]
    Plain,
    /// LOGIN - username and password in two prompts
    #[cfg_attr(feature = "serde", serde(rename = "login"))]
    Login,
    /// CRAM-MD5 - HMAC over a server challenge
    #[cfg_attr(feature = "serde", serde(rename = "cram-md5"))]
    CramMd5,
    /// `XOAUTH2` - `OAuth2` bearer token (Google/Microsoft)
    #[cfg_attr(feature = "serde", serde(rename = "xoauth2"))]
    XOAuth2,
}

impl AuthMechanism {
    /// Order in which mechanisms are picked when none is configured.
    pub const PREFERENCE: [Self; 3] = [Self::CramMd5, Self::Plain, Self::Login];

    /// Parses an authentication mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            "CRAM-MD5" => Some(Self::CramMd5),
            "XOAUTH2" => Some(Self::XOAuth2),
            _ => None,
        }
    }

    /// Returns the mechanism name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::CramMd5 => "CRAM-MD5",
            Self::XOAuth2 => "XOAUTH2",
        }
    }
}

impl std::fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
