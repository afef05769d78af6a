//! Batch adapter for message-queue consumers.
//!
//! The queue itself (storage, redelivery, backoff) lives outside this crate.
//! [`process_batch`] sends each job once, acknowledges successes and hands
//! failures back to the queue through [`QueueItem::retry`].

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ConnectionConfig;
use crate::email::{Email, EmailOptions};
use crate::error::Result;
use crate::mailer::{Mailer, SendReport};

/// One queued message: where to send it and what to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueJob {
    /// Connection settings.
    #[serde(alias = "mailerOptions")]
    pub connection: ConnectionConfig,
    /// Message input.
    #[serde(alias = "emailOptions")]
    pub email: EmailOptions,
}

/// Outcome of one job in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessResult {
    /// Whether the message was delivered.
    pub success: bool,
    /// Error text on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The job's message input.
    pub email: EmailOptions,
}

/// Sends a single queued message.
pub trait Deliver: Send + Sync {
    /// Builds and sends the job's message once.
    fn deliver(&self, job: &QueueJob) -> impl Future<Output = Result<SendReport>> + Send;
}

/// Delivers jobs over SMTP, one connection per job.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpDeliverer;

impl Deliver for SmtpDeliverer {
    async fn deliver(&self, job: &QueueJob) -> Result<SendReport> {
        let email = Email::new(job.email.clone())?;
        Mailer::new(job.connection.clone()).send(&email).await
    }
}

/// A message handed out by the external queue.
pub trait QueueItem {
    /// The job carried by this item.
    fn job(&self) -> &QueueJob;

    /// Marks the item as done.
    fn ack(&mut self);

    /// Returns the item to the queue for another attempt.
    fn retry(&mut self);
}

/// Hooks called after each job in a batch.
pub trait BatchObserver {
    /// Called after a job was delivered.
    fn on_success(&self, _result: &ProcessResult) {}

    /// Called after a job failed.
    fn on_error(&self, _result: &ProcessResult) {}
}

impl BatchObserver for () {}

/// Sends every item in order, one at a time.
///
/// Delivered items are acknowledged; failed items are retried through the
/// queue. Returns one result per item, in batch order.
pub async fn process_batch<D, I, O>(deliverer: &D, items: &mut [I], observer: &O) -> Vec<ProcessResult>
where
    D: Deliver,
    I: QueueItem,
    O: BatchObserver + ?Sized,
{
    let mut results = Vec::with_capacity(items.len());

    for item in items.iter_mut() {
        let outcome = deliverer.deliver(item.job()).await;
        let email = item.job().email.clone();

        let result = match outcome {
            Ok(report) => {
                item.ack();
                info!(accepted = report.accepted.len(), "queued message delivered");
                let result = ProcessResult {
                    success: true,
                    error: None,
                    email,
                };
                observer.on_success(&result);
                result
            }
            Err(err) => {
                item.retry();
                warn!(code = err.code(), error = %err, "queued message failed, retrying");
                let result = ProcessResult {
                    success: false,
                    error: Some(err.to_string()),
                    email,
                };
                observer.on_error(&result);
                result
            }
        };
        results.push(result);
    }

    results
}
