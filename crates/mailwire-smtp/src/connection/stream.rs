//! Stream types for SMTP connections.

#![allow(clippy::missing_errors_doc)]

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::Transport;
use crate::{Error, Result};

/// A stream that can be either plaintext or TLS.
pub enum SmtpStream {
    /// Plaintext TCP stream.
    Plain(TcpStream),
    /// TLS-encrypted stream (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
    /// Left behind by a failed STARTTLS handshake.
    Closed,
}

impl SmtpStream {
    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl Transport for SmtpStream {
    async fn upgrade_to_tls(&mut self, host: &str) -> Result<()> {
        let tcp = match std::mem::replace(self, Self::Closed) {
            Self::Plain(tcp) => tcp,
            other => {
                *self = other;
                return Err(Error::InvalidState(
                    "Stream is already TLS or closed".to_string(),
                ));
            }
        };

        let tls = handshake(host, tcp).await?;
        *self = Self::Tls(Box::new(tls));
        Ok(())
    }

    fn is_tls(&self) -> bool {
        Self::is_tls(self)
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "SMTP stream is closed")
}

impl AsyncRead for SmtpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Closed => Poll::Ready(Err(closed())),
        }
    }
}

impl AsyncWrite for SmtpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Closed => Poll::Ready(Err(closed())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
            Self::Closed => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Closed => Poll::Ready(Ok(())),
        }
    }
}

/// Creates a TLS connector with the webpki root certificates.
#[must_use]
pub fn create_tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

async fn handshake(host: &str, tcp: TcpStream) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| Error::Protocol(format!("Invalid hostname: {host}")))?;
    Ok(create_tls_connector().connect(server_name, tcp).await?)
}

/// Connects to a server with TLS from the start (implicit TLS, port 465).
pub async fn connect_tls(host: &str, port: u16) -> Result<SmtpStream> {
    let tcp = TcpStream::connect((host, port)).await?;
    let tls = handshake(host, tcp).await?;
    Ok(SmtpStream::Tls(Box::new(tls)))
}

/// Connects to a server without TLS (for STARTTLS or plaintext relays).
pub async fn connect(host: &str, port: u16) -> Result<SmtpStream> {
    let tcp = TcpStream::connect((host, port)).await?;
    Ok(SmtpStream::Plain(tcp))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_closed_stream_rejects_io() {
        let mut stream = SmtpStream::Closed;
        assert!(!stream.is_tls());
        let err = stream.write_all(b"QUIT\r\n").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[tokio::test]
    async fn test_upgrade_closed_stream_fails() {
        let mut stream = SmtpStream::Closed;
        let err = stream.upgrade_to_tls("smtp.example.com").await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert!(matches!(stream, SmtpStream::Closed));
    }
}
