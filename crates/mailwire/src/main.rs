//! `mailwire` - send one queued message from a JSON job file.
//!
//! ```text
//! mailwire job.json
//! ```
//!
//! The file holds a [`QueueJob`](mailwire::QueueJob):
//! `{ "connection": { ... }, "email": { ... } }`. Logging follows `RUST_LOG`.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, bail};
use mailwire::{Email, Mailer, QueueJob};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        bail!("usage: mailwire <job.json>");
    };

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let job: QueueJob = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", path.display()))?;

    let email = Email::new(job.email).context("building message")?;
    info!(host = %job.connection.host, port = job.connection.port, "sending");

    let report = Mailer::new(job.connection)
        .send(&email)
        .await
        .context("sending message")?;

    for recipient in &report.accepted {
        println!("accepted  {recipient}");
    }
    for rejection in &report.rejected {
        println!("rejected  {rejection}");
    }
    println!("server    {}", report.response);

    Ok(())
}
