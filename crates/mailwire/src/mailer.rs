//! Send engine: one message, one connection.

use mailwire_mime::Composer;
use mailwire_smtp::connection::{connect, connect_tls};
use mailwire_smtp::{Address, Client, SmtpStream, Transport};
use tracing::{debug, info, warn};

use crate::config::{ConnectionConfig, Security};
use crate::email::{Email, EmailOptions};
use crate::error::{Error, Result};

/// Result of a send where the server accepted the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    /// Envelope recipients the server accepted.
    pub accepted: Vec<String>,
    /// Recipients the server refused, as [`Error::RecipientRejected`].
    pub rejected: Vec<Error>,
    /// Text of the server's final reply (often a queue id).
    pub response: String,
}

/// Where in the session an SMTP error happened.
#[derive(Debug, Clone, Copy)]
enum Stage {
    Handshake,
    Auth,
    Transaction,
}

/// Delivers messages with a fixed connection configuration.
///
/// Every [`send`](Self::send) opens its own connection. On the way out it
/// always attempts `QUIT` (bounded by the step timeout) and then shuts the
/// transport down, whatever the outcome.
#[derive(Debug, Clone)]
pub struct Mailer {
    config: ConnectionConfig,
}

impl Mailer {
    /// Creates a mailer.
    #[must_use]
    pub const fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    /// Returns the connection configuration.
    #[must_use]
    pub const fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Builds an email from options and sends it with `config`.
    ///
    /// # Errors
    ///
    /// Returns a validation error before connecting, or the send error.
    pub async fn send_once(config: ConnectionConfig, options: EmailOptions) -> Result<SendReport> {
        let email = Email::new(options)?;
        Self::new(config).send(&email).await
    }

    /// Connects to the configured server and sends the message.
    ///
    /// The email's delivery outcome is resolved before this returns.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the attempt. When some recipients are
    /// refused but at least one is accepted the send succeeds and the
    /// refusals are listed in [`SendReport::rejected`].
    pub async fn send(&self, email: &Email) -> Result<SendReport> {
        match self.connect().await {
            Ok(stream) => self.send_over(stream, email).await,
            Err(err) => {
                warn!(code = err.code(), error = %err, "connection failed");
                settle(email, Err(err.clone()));
                Err(err)
            }
        }
    }

    /// Sends the message over an already open transport.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn send_over<S: Transport>(&self, transport: S, email: &Email) -> Result<SendReport> {
        let mut client = Client::new(transport, self.config.timeout);
        let outcome = self.run(&mut client, email).await;

        if !client.state().is_closed()
            && let Err(err) = client.quit().await
        {
            debug!(error = %err, "QUIT failed");
        }
        if let Err(err) = client.close().await {
            debug!(error = %err, "transport shutdown failed");
        }

        match &outcome {
            Ok(report) => info!(
                accepted = report.accepted.len(),
                rejected = report.rejected.len(),
                "message delivered"
            ),
            Err(err) => warn!(code = err.code(), error = %err, "delivery failed"),
        }
        settle(email, outcome.as_ref().map(|_| ()).map_err(Clone::clone));
        outcome
    }

    async fn connect(&self) -> Result<SmtpStream> {
        let config = &self.config;
        info!(host = %config.host, port = config.port, security = ?config.security, "connecting");

        let connecting = async {
            match config.security {
                Security::Tls => connect_tls(&config.host, config.port).await,
                Security::StartTls | Security::None => connect(&config.host, config.port).await,
            }
        };

        match tokio::time::timeout(config.timeout, connecting).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(err)) => Err(Error::ConnectionFailed(err.to_string())),
            Err(_) => Err(Error::Timeout(format!(
                "connecting to {}:{}",
                config.host, config.port
            ))),
        }
    }

    async fn run<S: Transport>(&self, client: &mut Client<S>, email: &Email) -> Result<SendReport> {
        let config = &self.config;

        client
            .greet(&config.client_hostname)
            .await
            .map_err(|e| map_smtp(e, Stage::Handshake))?;

        if config.security == Security::StartTls {
            if client.server_info().supports_starttls() {
                client
                    .starttls(&config.host, &config.client_hostname)
                    .await
                    .map_err(|e| map_smtp(e, Stage::Handshake))?;
            } else {
                warn!(host = %config.host, "server does not offer STARTTLS, continuing without TLS");
            }
        }

        if let Some(credentials) = &config.credentials {
            let mechanism = config
                .auth_type
                .unwrap_or_else(|| client.server_info().preferred_auth());
            client
                .authenticate(mechanism, &credentials.username, &credentials.password)
                .await
                .map_err(|e| map_smtp(e, Stage::Auth))?;
            debug!(%mechanism, "authenticated");
        }

        let draft = email.draft();
        let payload = email.render(&mut Composer::from_entropy());

        let from = envelope(draft.from.email())?;
        client
            .mail_from(&from, Some(payload.len()), config.dsn.as_ref())
            .await
            .map_err(|e| map_smtp(e, Stage::Transaction))?;

        let notify = config.dsn.as_ref().and_then(|dsn| dsn.notify);
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for mailbox in draft.recipients() {
            let to = envelope(mailbox.email())?;
            let reply = client
                .rcpt_to(&to, notify)
                .await
                .map_err(|e| map_smtp(e, Stage::Transaction))?;

            if reply.is_success() {
                debug!(recipient = %to, "recipient accepted");
                accepted.push(to.to_string());
            } else {
                warn!(recipient = %to, code = %reply.code, "recipient rejected");
                rejected.push(Error::RecipientRejected {
                    recipient: to.to_string(),
                    code: reply.code.as_u16(),
                    message: reply.message_text(),
                });
            }
        }

        if accepted.is_empty() {
            return Err(rejected.into_iter().next().unwrap_or(Error::InvalidEmail {
                invalid: Vec::new(),
            }));
        }

        client
            .data()
            .await
            .map_err(|e| map_smtp(e, Stage::Transaction))?;
        let reply = client
            .send_message(&payload)
            .await
            .map_err(|e| map_smtp(e, Stage::Transaction))?;

        Ok(SendReport {
            accepted,
            rejected,
            response: reply.message_text(),
        })
    }
}

fn settle(email: &Email, outcome: Result<()>) {
    if email.delivery().resolve(outcome).is_err() {
        warn!("delivery outcome was already resolved, keeping the first one");
    }
}

fn envelope(email: &str) -> Result<Address> {
    Address::new(email).map_err(|_| Error::InvalidEmail {
        invalid: vec![email.to_string()],
    })
}

fn map_smtp(err: mailwire_smtp::Error, stage: Stage) -> Error {
    use mailwire_smtp::Error as Smtp;

    match err {
        Smtp::Timeout { step } => Error::Timeout(format!("no reply to {step}")),
        Smtp::Io(_) | Smtp::Tls(_) => Error::ConnectionFailed(err.to_string()),
        other => match stage {
            Stage::Handshake => Error::ConnectionFailed(other.to_string()),
            Stage::Auth => Error::AuthFailed(other.to_string()),
            Stage::Transaction => match other {
                Smtp::SmtpError { code, message } => Error::MessageRejected { code, message },
                Smtp::Protocol(_) => Error::ConnectionFailed(other.to_string()),
                other => Error::MessageRejected {
                    code: 0,
                    message: other.to_string(),
                },
            },
        },
    }
}
