//! One-shot delivery outcome shared by every clone of an [`Email`](crate::Email).

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::Error;

/// Where a message's delivery stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeliveryStatus {
    /// No send has finished yet.
    #[default]
    Pending,
    /// The server accepted the message data.
    Succeeded,
    /// The send failed with this error.
    Failed(Error),
}

impl DeliveryStatus {
    /// Returns true once an outcome has been recorded.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Returned when an outcome is recorded twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("delivery outcome already resolved")]
pub struct AlreadyResolved;

/// Set-once slot for a delivery outcome.
///
/// The first [`resolve`](Self::resolve) wins; later calls are refused with
/// [`AlreadyResolved`] and leave the recorded outcome untouched.
#[derive(Debug, Clone)]
pub struct Delivery {
    tx: Arc<watch::Sender<DeliveryStatus>>,
}

impl Default for Delivery {
    fn default() -> Self {
        Self::new()
    }
}

impl Delivery {
    /// Creates a pending slot.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DeliveryStatus::Pending);
        Self { tx: Arc::new(tx) }
    }

    /// Records the outcome of a send.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyResolved`] if an outcome was already recorded.
    pub fn resolve(&self, outcome: Result<(), Error>) -> Result<(), AlreadyResolved> {
        let mut outcome = Some(outcome);
        let resolved = self.tx.send_if_modified(|status| {
            if status.is_resolved() {
                return false;
            }
            *status = match outcome.take() {
                Some(Ok(())) => DeliveryStatus::Succeeded,
                Some(Err(err)) => DeliveryStatus::Failed(err),
                None => return false,
            };
            true
        });

        if resolved { Ok(()) } else { Err(AlreadyResolved) }
    }

    /// Returns the current status without waiting.
    #[must_use]
    pub fn status(&self) -> DeliveryStatus {
        self.tx.borrow().clone()
    }

    /// Waits until an outcome is recorded.
    pub async fn wait(&self) -> DeliveryStatus {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(DeliveryStatus::is_resolved).await {
            Ok(status) => (*status).clone(),
            Err(_) => self.status(),
        }
    }
}
