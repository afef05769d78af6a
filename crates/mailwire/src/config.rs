//! Connection configuration.

use std::time::Duration;

use mailwire_smtp::{AuthMechanism, Dsn};
use serde::{Deserialize, Serialize};

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// No encryption (port 25). **Not recommended for production.**
    None,
    /// Plaintext connect, upgraded with STARTTLS when the server offers it
    /// (port 587).
    #[default]
    StartTls,
    /// TLS from the start (port 465).
    Tls,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::StartTls => 587,
            Self::Tls => 465,
        }
    }
}

/// Username and password (or access token for XOAUTH2).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Username for authentication.
    pub username: String,
    /// Password or token.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn default_client_hostname() -> String {
    "localhost".to_string()
}

/// SMTP connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    #[serde(default)]
    pub security: Security,
    /// Credentials; no AUTH is attempted without them.
    #[serde(default)]
    pub credentials: Option<Credentials>,
    /// Mechanism to use; picked from the server's offer when unset.
    #[serde(default, alias = "authType")]
    pub auth_type: Option<AuthMechanism>,
    /// Name sent with EHLO/HELO.
    #[serde(default = "default_client_hostname")]
    pub client_hostname: String,
    /// Bound on every protocol step.
    #[serde(rename = "timeout_ms", alias = "timeoutMs", with = "millis", default = "default_timeout")]
    pub timeout: Duration,
    /// Delivery status notification settings.
    #[serde(default)]
    pub dsn: Option<Dsn>,
}

const fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl ConnectionConfig {
    /// Creates a configuration for STARTTLS on port 587 without credentials.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::builder(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new(host)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    credentials: Option<Credentials>,
    auth_type: Option<AuthMechanism>,
    client_hostname: String,
    timeout: Duration,
    dsn: Option<Dsn>,
}

impl ConnectionConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::default(),
            credentials: None,
            auth_type: None,
            client_hostname: default_client_hostname(),
            timeout: DEFAULT_TIMEOUT,
            dsn: None,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Forces an authentication mechanism.
    #[must_use]
    pub const fn auth_type(mut self, mechanism: AuthMechanism) -> Self {
        self.auth_type = Some(mechanism);
        self
    }

    /// Sets the name sent with EHLO/HELO.
    #[must_use]
    pub fn client_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.client_hostname = hostname.into();
        self
    }

    /// Sets the per-step timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets delivery status notification options.
    #[must_use]
    pub fn dsn(mut self, dsn: Dsn) -> Self {
        self.dsn = Some(dsn);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            credentials: self.credentials,
            auth_type: self.auth_type,
            client_hostname: self.client_hostname,
            timeout: self.timeout,
            dsn: self.dsn,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
