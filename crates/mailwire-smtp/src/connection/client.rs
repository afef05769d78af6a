//! Sequential SMTP client with per-step timeouts.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use super::{ServerInfo, SessionState, Transport};
use crate::auth;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Dsn, DsnNotify, Extension, Reply, ReplyCode};

/// SMTP client driving one connection.
///
/// Every network round trip is bounded by the timeout given to
/// [`Client::new`]; exceeding it yields [`Error::Timeout`] naming the step.
/// Operations check the [`SessionState`] and fail with
/// [`Error::InvalidState`] when called out of order.
pub struct Client<S> {
    reader: BufReader<S>,
    server_info: ServerInfo,
    state: SessionState,
    timeout: Duration,
}

impl<S> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("server_info", &self.server_info)
            .field("state", &self.state)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<S: Transport> Client<S> {
    /// Wraps an open transport. Nothing is read until [`Client::greet`].
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self {
            reader: BufReader::new(stream),
            server_info: ServerInfo::default(),
            state: SessionState::Connected,
            timeout,
        }
    }

    /// Returns the capabilities discovered so far.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Returns the current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true if the transport is encrypted.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.reader.get_ref().is_tls()
    }

    /// Returns the transport, discarding buffered input.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }

    /// Reads the server greeting and introduces the client with EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting is not 2xx or EHLO/HELO is refused.
    pub async fn greet(&mut self, client_hostname: &str) -> Result<()> {
        self.ensure(matches!(self.state, SessionState::Connected), "greeting")?;

        let greeting = within(self.timeout, "greeting", read_reply(&mut self.reader)).await?;
        if !greeting.is_success() {
            return Err(greeting.to_error());
        }

        self.server_info.hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(server = %self.server_info.hostname, "greeting received");

        self.ehlo(client_hostname).await?;
        self.state = SessionState::Greeted;
        Ok(())
    }

    /// Sends EHLO and replaces the known capabilities.
    ///
    /// A 5xx answer falls back to HELO, leaving no extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if both EHLO and HELO are refused.
    pub async fn ehlo(&mut self, client_hostname: &str) -> Result<()> {
        let reply = self
            .round_trip(
                &Command::Ehlo {
                    hostname: client_hostname.to_string(),
                },
                "EHLO",
            )
            .await?;

        if reply.is_success() {
            // First line is the server's greeting, the rest are keywords
            self.server_info.extensions =
                reply.message.iter().skip(1).map(|l| Extension::parse(l)).collect();
            return Ok(());
        }
        if !reply.is_permanent_error() {
            return Err(reply.to_error());
        }

        debug!(code = %reply.code, "EHLO refused, falling back to HELO");
        let reply = self
            .round_trip(
                &Command::Helo {
                    hostname: client_hostname.to_string(),
                },
                "HELO",
            )
            .await?;
        if !reply.is_success() {
            return Err(reply.to_error());
        }
        self.server_info.extensions.clear();
        Ok(())
    }

    /// Upgrades the connection with STARTTLS and re-issues EHLO.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if the server does not advertise
    /// STARTTLS, or an error if the server refuses it, pipelines data after
    /// its go-ahead, or the handshake fails.
    pub async fn starttls(&mut self, host: &str, client_hostname: &str) -> Result<()> {
        self.ensure(
            matches!(self.state, SessionState::Greeted) && !self.is_tls(),
            "STARTTLS",
        )?;
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        let reply = self.round_trip(&Command::StartTls, "STARTTLS").await?;
        if !reply.is_success() {
            return Err(reply.to_error());
        }

        if !self.reader.buffer().is_empty() {
            return Err(Error::Protocol(
                "Server sent data before the TLS handshake".into(),
            ));
        }

        within(
            self.timeout,
            "TLS handshake",
            self.reader.get_mut().upgrade_to_tls(host),
        )
        .await?;
        debug!(host, "TLS established");

        // Capabilities advertised in plaintext are not trusted
        self.server_info.extensions.clear();
        self.ehlo(client_hostname).await?;
        self.state = SessionState::TlsReady;
        Ok(())
    }

    /// Runs a SASL exchange with the given mechanism.
    ///
    /// `secret` is the password, or the access token for XOAUTH2.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SmtpError`] if the server rejects the credentials.
    pub async fn authenticate(
        &mut self,
        mechanism: AuthMechanism,
        username: &str,
        secret: &str,
    ) -> Result<()> {
        self.ensure(
            matches!(self.state, SessionState::Greeted | SessionState::TlsReady),
            "AUTH",
        )?;
        debug!(%mechanism, "authenticating");

        let reply = match mechanism {
            AuthMechanism::Plain => {
                self.auth_start(mechanism, Some(auth::plain_response(username, secret)))
                    .await?
            }
            AuthMechanism::Login => {
                let prompt = self.auth_start(mechanism, None).await?;
                expect_continue(&prompt)?;
                let prompt = self.auth_continue(auth::login_response(username)).await?;
                expect_continue(&prompt)?;
                self.auth_continue(auth::login_response(secret)).await?
            }
            AuthMechanism::CramMd5 => {
                let challenge = self.auth_start(mechanism, None).await?;
                expect_continue(&challenge)?;
                let response =
                    auth::cram_md5_response(username, secret, &challenge.message_text())?;
                self.auth_continue(response).await?
            }
            AuthMechanism::XOAuth2 => {
                let reply = self
                    .auth_start(mechanism, Some(auth::xoauth2_response(username, secret)))
                    .await?;
                if reply.code == ReplyCode::AUTH_CONTINUE {
                    // Error details arrive as a challenge; an empty line
                    // collects the final status
                    self.auth_continue(String::new()).await?
                } else {
                    reply
                }
            }
        };

        if reply.code != ReplyCode::AUTH_SUCCESS {
            return Err(reply.to_error());
        }
        self.state = SessionState::Authenticated;
        Ok(())
    }

    /// Starts a mail transaction.
    ///
    /// `message_size` is sent as `SIZE=` when the server advertises SIZE;
    /// a message above a non-zero advertised limit fails before anything
    /// is sent. DSN `RET`/`ENVID` are sent only when the server advertises
    /// DSN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] or the server's rejection.
    pub async fn mail_from(
        &mut self,
        from: &Address,
        message_size: Option<usize>,
        dsn: Option<&Dsn>,
    ) -> Result<()> {
        self.ensure(self.state.can_start_transaction(), "MAIL FROM")?;

        if let (Some(size), Some(limit)) = (message_size, self.server_info.max_message_size())
            && size > limit
        {
            return Err(Error::MessageTooLarge { size, limit });
        }

        let size = message_size.filter(|_| self.server_info.supports_size());
        let dsn = dsn.filter(|_| self.server_info.supports(&Extension::Dsn));
        let command = Command::MailFrom {
            from: from.clone(),
            size,
            ret: dsn.and_then(|d| d.ret),
            envelope_id: dsn.and_then(|d| d.envelope_id.clone()),
        };

        let reply = self.round_trip(&command, "MAIL FROM").await?;
        if !reply.is_success() {
            return Err(reply.to_error());
        }
        self.state = SessionState::MailFrom;
        Ok(())
    }

    /// Offers one recipient and returns the server's verdict.
    ///
    /// A rejected recipient is not an error: the reply is returned so the
    /// caller can decide whether the transaction still has coverage.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, timeout or when called out of order.
    pub async fn rcpt_to(&mut self, to: &Address, notify: Option<DsnNotify>) -> Result<Reply> {
        self.ensure(
            matches!(self.state, SessionState::MailFrom | SessionState::Recipients),
            "RCPT TO",
        )?;

        let notify = notify.filter(|_| self.server_info.supports(&Extension::Dsn));
        let command = Command::RcptTo {
            to: to.clone(),
            notify,
        };
        let reply = self.round_trip(&command, "RCPT TO").await?;
        if reply.is_success() {
            self.state = SessionState::Recipients;
        } else {
            debug!(code = %reply.code, "recipient refused");
        }
        Ok(reply)
    }

    /// Sends DATA and waits for the 354 go-ahead.
    ///
    /// # Errors
    ///
    /// Returns an error if no recipient was accepted or the server refuses.
    pub async fn data(&mut self) -> Result<()> {
        self.ensure(matches!(self.state, SessionState::Recipients), "DATA")?;

        let reply = self.round_trip(&Command::Data, "DATA").await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(reply.to_error());
        }
        self.state = SessionState::Data;
        Ok(())
    }

    /// Streams the message and waits for final acceptance.
    ///
    /// `payload` must already be dot-stuffed and end with the `.` terminator
    /// line, as produced by `mailwire_mime::Composer::render`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not terminated or the server
    /// refuses the message.
    pub async fn send_message(&mut self, payload: &[u8]) -> Result<Reply> {
        self.ensure(matches!(self.state, SessionState::Data), "message transfer")?;
        if !payload.ends_with(b"\r\n.\r\n") {
            return Err(Error::Protocol(
                "Message payload must end with CRLF.CRLF".into(),
            ));
        }

        debug!(bytes = payload.len(), "sending message");
        let reader = &mut self.reader;
        let reply = within(self.timeout, "message transfer", async move {
            write_bytes(reader, payload).await?;
            read_reply(reader).await
        })
        .await?;

        if !reply.is_success() {
            return Err(reply.to_error());
        }
        self.state = SessionState::Delivered;
        Ok(reply)
    }

    /// Sends QUIT.
    ///
    /// The session counts as closed afterwards whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer 2xx.
    pub async fn quit(&mut self) -> Result<()> {
        self.ensure(!self.state.is_closed(), "QUIT")?;

        let reply = self.round_trip(&Command::Quit, "QUIT").await;
        self.state = SessionState::Closed;
        let reply = reply?;

        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(reply.to_error());
        }
        Ok(())
    }

    /// Shuts the transport down.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails or times out.
    pub async fn close(&mut self) -> Result<()> {
        self.state = SessionState::Closed;
        within(self.timeout, "close", async {
            self.reader.get_mut().shutdown().await?;
            Ok(())
        })
        .await
    }

    fn ensure(&self, allowed: bool, operation: &str) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "{operation} is not allowed in state {}",
                self.state
            )))
        }
    }

    async fn auth_start(
        &mut self,
        mechanism: AuthMechanism,
        initial_response: Option<String>,
    ) -> Result<Reply> {
        let command = Command::Auth {
            mechanism,
            initial_response,
        };
        self.round_trip(&command, "AUTH").await
    }

    async fn auth_continue(&mut self, response: String) -> Result<Reply> {
        self.round_trip(&Command::AuthResponse(response), "AUTH").await
    }

    async fn round_trip(&mut self, command: &Command, step: &'static str) -> Result<Reply> {
        debug!(command = command.verb(), "sending command");
        let reader = &mut self.reader;
        let reply = within(self.timeout, step, async move {
            write_bytes(reader, &command.serialize()).await?;
            read_reply(reader).await
        })
        .await?;
        debug!(command = command.verb(), code = %reply.code, "reply received");
        Ok(reply)
    }
}

fn expect_continue(reply: &Reply) -> Result<()> {
    if reply.code == ReplyCode::AUTH_CONTINUE {
        Ok(())
    } else {
        Err(reply.to_error())
    }
}

async fn within<T>(
    limit: Duration,
    step: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout { step })?
}

async fn write_bytes<S: Transport>(reader: &mut BufReader<S>, data: &[u8]) -> Result<()> {
    let stream = reader.get_mut();
    stream.write_all(data).await?;
    stream.flush().await?;
    Ok(())
}

async fn read_reply<S: Transport>(reader: &mut BufReader<S>) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )
            .into());
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(line)?;
        lines.push(line.to_string());
        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}
