//! Byte-stream seam between the protocol client and the network.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::Result;

/// A connection the SMTP client can talk over.
///
/// Reads and writes come from [`AsyncRead`]/[`AsyncWrite`]; closing is
/// `AsyncWriteExt::shutdown`. The only SMTP-specific operation is the
/// in-place encryption upgrade STARTTLS needs.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {
    /// Performs the TLS handshake over the existing connection.
    ///
    /// On failure the transport is unusable.
    fn upgrade_to_tls(&mut self, host: &str) -> impl Future<Output = Result<()>> + Send;

    /// Returns true if the connection is encrypted.
    fn is_tls(&self) -> bool;
}
