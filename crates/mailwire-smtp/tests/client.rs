//! Integration tests for the SMTP client.
//!
//! A scripted server runs on the other end of an in-memory duplex pipe, so
//! every command the client sends and every reply it parses goes over a
//! real async byte stream.

#![allow(clippy::unwrap_used, clippy::similar_names)]

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream, ReadBuf,
};
use tokio::task::JoinHandle;

use mailwire_smtp::{
    Address, AuthMechanism, Client, Dsn, DsnNotify, DsnRet, Error, Extension, SessionState,
    Transport,
};

const PAYLOAD: &[u8] = b"Subject: Hi\r\n\r\nHello\r\n.\r\n";
const TIMEOUT: Duration = Duration::from_secs(5);

/// Transport over one half of a duplex pipe; the TLS upgrade only flips a flag.
struct MockTransport {
    inner: DuplexStream,
    tls: bool,
}

impl AsyncRead for MockTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for MockTransport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl Transport for MockTransport {
    async fn upgrade_to_tls(&mut self, _host: &str) -> mailwire_smtp::Result<()> {
        self.tls = true;
        Ok(())
    }

    fn is_tls(&self) -> bool {
        self.tls
    }
}

/// One server-side step.
enum Step {
    /// Expect a command line starting with the prefix, then send the reply.
    Reply(&'static str, &'static str),
    /// Read the message up to the terminator line, then send the reply.
    Data(&'static str),
    /// Expect a command line, then never answer.
    Stall(&'static str),
}

/// Spawns the scripted server; the handle yields every line it received.
fn serve(greeting: &'static str, script: Vec<Step>) -> (MockTransport, JoinHandle<Vec<String>>) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let handle = tokio::spawn(async move {
        let mut reader = BufReader::new(server);
        let mut seen = Vec::new();
        reader.get_mut().write_all(greeting.as_bytes()).await.unwrap();

        for step in script {
            match step {
                Step::Reply(expected, reply) => {
                    let Some(line) = next_line(&mut reader).await else {
                        break;
                    };
                    assert!(line.starts_with(expected), "expected {expected:?}, got {line:?}");
                    seen.push(line);
                    reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
                }
                Step::Data(reply) => {
                    let mut data = String::new();
                    loop {
                        let mut line = String::new();
                        if reader.read_line(&mut line).await.unwrap() == 0 || line == ".\r\n" {
                            break;
                        }
                        data.push_str(&line);
                    }
                    seen.push(data);
                    reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
                }
                Step::Stall(expected) => {
                    let Some(line) = next_line(&mut reader).await else {
                        break;
                    };
                    assert!(line.starts_with(expected), "expected {expected:?}, got {line:?}");
                    seen.push(line);
                    std::future::pending::<()>().await;
                }
            }
        }
        seen
    });

    (
        MockTransport {
            inner: client,
            tls: false,
        },
        handle,
    )
}

async fn next_line(reader: &mut BufReader<DuplexStream>) -> Option<String> {
    let mut line = String::new();
    match reader.read_line(&mut line).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
    }
}

fn addr(s: &str) -> Address {
    Address::new(s).unwrap()
}

const GREETING: &str = "220 smtp.test ESMTP ready\r\n";

#[tokio::test]
async fn test_full_transaction_with_plain_auth() {
    let (transport, server) = serve(
        GREETING,
        vec![
            Step::Reply(
                "EHLO client.test",
                "250-smtp.test greets client.test\r\n250-AUTH PLAIN LOGIN\r\n250 SIZE 1000\r\n",
            ),
            Step::Reply("AUTH PLAIN", "235 2.7.0 Authentication successful\r\n"),
            Step::Reply("MAIL FROM:", "250 2.1.0 Ok\r\n"),
            Step::Reply("RCPT TO:", "250 2.1.5 Ok\r\n"),
            Step::Reply("DATA", "354 End data with <CR><LF>.<CR><LF>\r\n"),
            Step::Data("250 2.0.0 Ok: queued as 12345\r\n"),
            Step::Reply("QUIT", "221 2.0.0 Bye\r\n"),
        ],
    );

    let mut client = Client::new(transport, TIMEOUT);
    client.greet("client.test").await.unwrap();
    assert_eq!(client.state(), SessionState::Greeted);
    assert_eq!(client.server_info().hostname, "smtp.test");
    assert_eq!(client.server_info().max_message_size(), Some(1000));

    client
        .authenticate(AuthMechanism::Plain, "user@x.org", "secret")
        .await
        .unwrap();
    assert_eq!(client.state(), SessionState::Authenticated);

    client
        .mail_from(&addr("a@x.org"), Some(PAYLOAD.len()), None)
        .await
        .unwrap();
    let reply = client.rcpt_to(&addr("b@y.org"), None).await.unwrap();
    assert!(reply.is_success());
    client.data().await.unwrap();
    let reply = client.send_message(PAYLOAD).await.unwrap();
    assert_eq!(reply.message_text(), "2.0.0 Ok: queued as 12345");
    assert_eq!(client.state(), SessionState::Delivered);
    client.quit().await.unwrap();
    assert_eq!(client.state(), SessionState::Closed);
    drop(client);

    let seen = server.await.unwrap();
    assert_eq!(
        seen,
        vec![
            "EHLO client.test".to_string(),
            "AUTH PLAIN AHVzZXJAeC5vcmcAc2VjcmV0".to_string(),
            format!("MAIL FROM:<a@x.org> SIZE={}", PAYLOAD.len()),
            "RCPT TO:<b@y.org>".to_string(),
            "DATA".to_string(),
            "Subject: Hi\r\n\r\nHello\r\n".to_string(),
            "QUIT".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_ehlo_falls_back_to_helo() {
    let (transport, server) = serve(
        GREETING,
        vec![
            Step::Reply("EHLO", "502 5.5.1 Command not implemented\r\n"),
            Step::Reply("HELO client.test", "250 smtp.test\r\n"),
        ],
    );

    let mut client = Client::new(transport, TIMEOUT);
    client.greet("client.test").await.unwrap();
    assert!(client.server_info().extensions.is_empty());
    drop(client);
    assert_eq!(server.await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_greeting_rejected() {
    let (transport, _server) = serve("554 5.3.2 No service\r\n", vec![]);
    let mut client = Client::new(transport, TIMEOUT);
    let err = client.greet("client.test").await.unwrap_err();
    assert!(matches!(err, Error::SmtpError { code: 554, .. }));
}

#[tokio::test]
async fn test_login_auth() {
    let (transport, server) = serve(
        GREETING,
        vec![
            Step::Reply("EHLO", "250-smtp.test\r\n250 AUTH LOGIN\r\n"),
            Step::Reply("AUTH LOGIN", "334 VXNlcm5hbWU6\r\n"),
            Step::Reply("dXNlckB4Lm9yZw==", "334 UGFzc3dvcmQ6\r\n"),
            Step::Reply("c2VjcmV0", "235 2.7.0 Accepted\r\n"),
        ],
    );

    let mut client = Client::new(transport, TIMEOUT);
    client.greet("client.test").await.unwrap();
    client
        .authenticate(AuthMechanism::Login, "user@x.org", "secret")
        .await
        .unwrap();
    drop(client);
    assert_eq!(server.await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_cram_md5_auth() {
    let (transport, server) = serve(
        GREETING,
        vec![
            Step::Reply("EHLO", "250-smtp.test\r\n250 AUTH CRAM-MD5\r\n"),
            Step::Reply(
                "AUTH CRAM-MD5",
                "334 PDE4OTYuNjk3MTcwOTUyQHBvc3RvZmZpY2UucmVzdG9uLm1jaS5uZXQ+\r\n",
            ),
            Step::Reply(
                "dGltIGI5MTNhNjAyYzdlZGE3YTQ5NWI0ZTZlNzMzNGQzODkw",
                "235 2.7.0 Accepted\r\n",
            ),
        ],
    );

    let mut client = Client::new(transport, TIMEOUT);
    client.greet("client.test").await.unwrap();
    assert_eq!(client.server_info().preferred_auth(), AuthMechanism::CramMd5);
    client
        .authenticate(AuthMechanism::CramMd5, "tim", "tanstaaftanstaaf")
        .await
        .unwrap();
    drop(client);
    assert_eq!(server.await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_xoauth2_failure_collects_final_status() {
    let (transport, server) = serve(
        GREETING,
        vec![
            Step::Reply("EHLO", "250-smtp.test\r\n250 AUTH XOAUTH2\r\n"),
            Step::Reply(
                "AUTH XOAUTH2 dXNlcj11c2VyQHgub3JnAWF1dGg9QmVhcmVyIHRvawEB",
                "334 eyJzdGF0dXMiOiI0MDEifQ==\r\n",
            ),
            Step::Reply("", "535 5.7.8 Username and Password not accepted\r\n"),
        ],
    );

    let mut client = Client::new(transport, TIMEOUT);
    client.greet("client.test").await.unwrap();
    let err = client
        .authenticate(AuthMechanism::XOAuth2, "user@x.org", "tok")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SmtpError { code: 535, .. }));
    assert!(err.is_permanent());
    assert_eq!(client.state(), SessionState::Greeted);
    drop(client);
    assert_eq!(server.await.unwrap()[2], "");
}

#[tokio::test]
async fn test_starttls_requeries_capabilities() {
    let (transport, server) = serve(
        GREETING,
        vec![
            Step::Reply("EHLO", "250-smtp.test\r\n250 STARTTLS\r\n"),
            Step::Reply("STARTTLS", "220 2.0.0 Ready to start TLS\r\n"),
            Step::Reply("EHLO", "250-smtp.test\r\n250 AUTH PLAIN\r\n"),
        ],
    );

    let mut client = Client::new(transport, TIMEOUT);
    client.greet("client.test").await.unwrap();
    assert!(!client.is_tls());
    client.starttls("smtp.test", "client.test").await.unwrap();
    assert!(client.is_tls());
    assert_eq!(client.state(), SessionState::TlsReady);
    assert!(!client.server_info().supports_starttls());
    assert_eq!(
        client.server_info().auth_mechanisms(),
        vec![AuthMechanism::Plain]
    );
    drop(client);
    assert_eq!(server.await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_starttls_not_advertised() {
    let (transport, _server) = serve(
        GREETING,
        vec![Step::Reply("EHLO", "250 smtp.test\r\n")],
    );

    let mut client = Client::new(transport, TIMEOUT);
    client.greet("client.test").await.unwrap();
    let err = client.starttls("smtp.test", "client.test").await.unwrap_err();
    assert!(matches!(err, Error::NotSupported(_)));
}

#[tokio::test]
async fn test_starttls_refuses_pipelined_data() {
    let (transport, _server) = serve(
        GREETING,
        vec![
            Step::Reply("EHLO", "250-smtp.test\r\n250 STARTTLS\r\n"),
            Step::Reply("STARTTLS", "220 Go ahead\r\n250-injected\r\n250 AUTH PLAIN\r\n"),
        ],
    );

    let mut client = Client::new(transport, TIMEOUT);
    client.greet("client.test").await.unwrap();
    let err = client.starttls("smtp.test", "client.test").await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert!(!client.is_tls());
}

#[tokio::test]
async fn test_rejected_recipient_is_not_an_error() {
    let (transport, server) = serve(
        GREETING,
        vec![
            Step::Reply("EHLO", "250 smtp.test\r\n"),
            Step::Reply("MAIL FROM:<a@x.org>", "250 Ok\r\n"),
            Step::Reply("RCPT TO:<nobody@y.org>", "550 5.1.1 No such user\r\n"),
        ],
    );

    let mut client = Client::new(transport, TIMEOUT);
    client.greet("client.test").await.unwrap();
    client.mail_from(&addr("a@x.org"), None, None).await.unwrap();
    let reply = client.rcpt_to(&addr("nobody@y.org"), None).await.unwrap();
    assert!(reply.is_permanent_error());
    assert_eq!(reply.message_text(), "5.1.1 No such user");
    assert_eq!(client.state(), SessionState::MailFrom);

    // No accepted recipient, so DATA is refused locally
    let err = client.data().await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    drop(client);
    assert!(!server.await.unwrap().iter().any(|l| l == "DATA"));
}

#[tokio::test]
async fn test_size_limit_checked_before_mail_from() {
    let (transport, server) = serve(
        GREETING,
        vec![
            Step::Reply("EHLO", "250-smtp.test\r\n250 SIZE 10\r\n"),
            Step::Reply("QUIT", "221 Bye\r\n"),
        ],
    );

    let mut client = Client::new(transport, TIMEOUT);
    client.greet("client.test").await.unwrap();
    let err = client
        .mail_from(&addr("a@x.org"), Some(100), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::MessageTooLarge {
            size: 100,
            limit: 10
        }
    ));
    client.quit().await.unwrap();
    drop(client);
    assert_eq!(server.await.unwrap(), vec!["EHLO client.test", "QUIT"]);
}

#[tokio::test]
async fn test_dsn_parameters_when_advertised() {
    let (transport, server) = serve(
        GREETING,
        vec![
            Step::Reply("EHLO", "250-smtp.test\r\n250 DSN\r\n"),
            Step::Reply("MAIL FROM:", "250 Ok\r\n"),
            Step::Reply("RCPT TO:", "250 Ok\r\n"),
        ],
    );

    let dsn = Dsn {
        ret: Some(DsnRet::Full),
        envelope_id: Some("batch 7".to_string()),
        notify: Some(DsnNotify {
            success: true,
            failure: true,
            delay: false,
        }),
    };

    let mut client = Client::new(transport, TIMEOUT);
    client.greet("client.test").await.unwrap();
    assert!(client.server_info().supports(&Extension::Dsn));
    client
        .mail_from(&addr("a@x.org"), Some(25), Some(&dsn))
        .await
        .unwrap();
    client.rcpt_to(&addr("b@y.org"), dsn.notify).await.unwrap();
    drop(client);

    let seen = server.await.unwrap();
    assert_eq!(seen[1], "MAIL FROM:<a@x.org> RET=FULL ENVID=batch+207");
    assert_eq!(seen[2], "RCPT TO:<b@y.org> NOTIFY=SUCCESS,FAILURE");
}

#[tokio::test]
async fn test_dsn_parameters_omitted_when_not_advertised() {
    let (transport, server) = serve(
        GREETING,
        vec![
            Step::Reply("EHLO", "250 smtp.test\r\n"),
            Step::Reply("MAIL FROM:", "250 Ok\r\n"),
            Step::Reply("RCPT TO:", "250 Ok\r\n"),
        ],
    );

    let dsn = Dsn {
        ret: Some(DsnRet::Headers),
        envelope_id: None,
        notify: Some(DsnNotify::default()),
    };

    let mut client = Client::new(transport, TIMEOUT);
    client.greet("client.test").await.unwrap();
    client
        .mail_from(&addr("a@x.org"), Some(25), Some(&dsn))
        .await
        .unwrap();
    client.rcpt_to(&addr("b@y.org"), dsn.notify).await.unwrap();
    drop(client);

    let seen = server.await.unwrap();
    assert_eq!(seen[1], "MAIL FROM:<a@x.org>");
    assert_eq!(seen[2], "RCPT TO:<b@y.org>");
}

#[tokio::test]
async fn test_message_rejected_after_data() {
    let (transport, _server) = serve(
        GREETING,
        vec![
            Step::Reply("EHLO", "250 smtp.test\r\n"),
            Step::Reply("MAIL FROM:", "250 Ok\r\n"),
            Step::Reply("RCPT TO:", "250 Ok\r\n"),
            Step::Reply("DATA", "354 Go ahead\r\n"),
            Step::Data("554 5.7.1 Message rejected as spam\r\n"),
        ],
    );

    let mut client = Client::new(transport, TIMEOUT);
    client.greet("client.test").await.unwrap();
    client.mail_from(&addr("a@x.org"), None, None).await.unwrap();
    client.rcpt_to(&addr("b@y.org"), None).await.unwrap();
    client.data().await.unwrap();
    let err = client.send_message(PAYLOAD).await.unwrap_err();
    assert!(matches!(err, Error::SmtpError { code: 554, .. }));
    assert_eq!(client.state(), SessionState::Data);
}

#[tokio::test]
async fn test_unterminated_payload_rejected_locally() {
    let (transport, _server) = serve(
        GREETING,
        vec![
            Step::Reply("EHLO", "250 smtp.test\r\n"),
            Step::Reply("MAIL FROM:", "250 Ok\r\n"),
            Step::Reply("RCPT TO:", "250 Ok\r\n"),
            Step::Reply("DATA", "354 Go ahead\r\n"),
        ],
    );

    let mut client = Client::new(transport, TIMEOUT);
    client.greet("client.test").await.unwrap();
    client.mail_from(&addr("a@x.org"), None, None).await.unwrap();
    client.rcpt_to(&addr("b@y.org"), None).await.unwrap();
    client.data().await.unwrap();
    let err = client
        .send_message(b"Subject: Hi\r\n\r\nno terminator\r\n")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

#[tokio::test]
async fn test_out_of_order_operations() {
    let (transport, _server) = serve(GREETING, vec![]);
    let mut client = Client::new(transport, TIMEOUT);

    let err = client.mail_from(&addr("a@x.org"), None, None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    let err = client
        .authenticate(AuthMechanism::Plain, "u", "p")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn test_connection_closed_mid_reply() {
    let (transport, server) = serve(GREETING, vec![]);
    // The server hangs up right after the greeting
    server.await.unwrap();

    let mut client = Client::new(transport, TIMEOUT);
    let err = client.greet("client.test").await.unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[tokio::test(start_paused = true)]
async fn test_step_timeout() {
    let (transport, _server) = serve(GREETING, vec![Step::Stall("EHLO")]);

    let mut client = Client::new(transport, Duration::from_secs(30));
    let err = client.greet("client.test").await.unwrap_err();
    assert!(err.is_timeout());
    assert!(matches!(err, Error::Timeout { step: "EHLO" }));
}

#[tokio::test(start_paused = true)]
async fn test_greeting_timeout() {
    let (client_half, _server_half) = tokio::io::duplex(1024);
    let transport = MockTransport {
        inner: client_half,
        tls: false,
    };

    let mut client = Client::new(transport, Duration::from_secs(10));
    let err = client.greet("client.test").await.unwrap_err();
    assert!(matches!(err, Error::Timeout { step: "greeting" }));

    // Teardown is still possible after a timeout
    let err = client.quit().await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(client.state(), SessionState::Closed);
    client.close().await.unwrap();
}
