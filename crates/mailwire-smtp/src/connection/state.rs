//! Session states of the SMTP client.

/// Where a [`Client`](super::Client) is in the SMTP exchange.
///
/// The sequence is strictly linear:
///
/// ```text
/// Connected → Greeted → (TlsReady) → (Authenticated) → MailFrom
///     → Recipients → Data → Delivered → Closed
/// ```
///
/// `QUIT` is accepted from every state except `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Transport open, greeting not read yet.
    #[default]
    Connected,
    /// Greeting read and EHLO/HELO accepted.
    Greeted,
    /// STARTTLS completed and capabilities re-queried.
    TlsReady,
    /// AUTH succeeded.
    Authenticated,
    /// `MAIL FROM` accepted.
    MailFrom,
    /// At least one `RCPT TO` accepted.
    Recipients,
    /// `DATA` accepted with 354, waiting for the payload.
    Data,
    /// Payload accepted.
    Delivered,
    /// `QUIT` sent or transport shut down.
    Closed,
}

impl SessionState {
    /// Returns true if a mail transaction may start from this state.
    #[must_use]
    pub const fn can_start_transaction(self) -> bool {
        matches!(
            self,
            Self::Greeted | Self::TlsReady | Self::Authenticated | Self::Delivered
        )
    }

    /// Returns true if the session has ended.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Connected => "connected",
            Self::Greeted => "greeted",
            Self::TlsReady => "tls-ready",
            Self::Authenticated => "authenticated",
            Self::MailFrom => "mail-from",
            Self::Recipients => "recipients",
            Self::Data => "data",
            Self::Delivered => "delivered",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
