use std::sync::Arc;
use std::{fmt, time};

use anyhow::Context;
use tracing::field::display;
use tracing::Span;

use crate::clock::{Clock, SystemClock};
use crate::comic_client::{ComicClient, Digest};
use crate::configuration::Settings;
use crate::domain::EmailAddress;
use crate::email_client::EmailClient;
use crate::store::StoreError;
use crate::subscribers::SubscriberSet;
use crate::telemetry::spawn_blocking_with_tracing;
use crate::utils::error_chain_fmt;
use crate::verification::{VerificationLedger, TTL_RETAIN};

/// Pause between two consecutive digest emails
pub const SEND_PAUSE: time::Duration = time::Duration::from_millis(100);

/// Digest cycle error
#[derive(thiserror::Error)]
pub enum DigestError {
    #[error("Failed to fetch the digest content")]
    FetchError(#[source] anyhow::Error),
    #[error("Failed to access the record store")]
    IoError(#[from] StoreError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl fmt::Debug for DigestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Outcome of a digest cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DigestReport {
    pub sent: usize,
    pub failed: usize,
    pub swept: usize,
}

/// Mail today's digest to every subscriber, then sweep stale verification codes
///
/// The sweep runs even when the digest content could not be fetched; the fetch
/// error is returned afterwards.
#[tracing::instrument(
    name = "Running a digest cycle",
    skip_all,
    fields(sent = tracing::field::Empty, failed = tracing::field::Empty, swept = tracing::field::Empty)
)]
pub async fn run_digest_cycle(
    subscribers: &SubscriberSet,
    ledger: &VerificationLedger,
    comic_client: &ComicClient,
    email_client: &EmailClient,
) -> Result<DigestReport, DigestError> {
    let mut report = DigestReport::default();

    // Get the list of subscribers
    let subscribers = subscribers.clone();
    let recipients = spawn_blocking_with_tracing(move || subscribers.list())
        .await
        .context("Failed to spawn blocking task")??;

    // Fetch the digest and send it to each subscriber
    let delivery = if recipients.is_empty() {
        tracing::info!("No subscribers, skipping the digest");
        Ok(())
    } else {
        match comic_client.fetch_digest().await {
            Ok(digest) => {
                deliver_digest(email_client, &digest, recipients, &mut report).await;
                Ok(())
            }
            Err(e) => Err(DigestError::FetchError(e)),
        }
    };

    // Purge stale verification codes
    let ledger = ledger.clone();
    report.swept = spawn_blocking_with_tracing(move || ledger.sweep(TTL_RETAIN))
        .await
        .context("Failed to spawn blocking task")??;

    Span::current()
        .record("sent", display(report.sent))
        .record("failed", display(report.failed))
        .record("swept", display(report.swept));
    tracing::info!(
        "Digest cycle completed: {} sent, {} failed, {} codes swept",
        report.sent,
        report.failed,
        report.swept
    );
    delivery.map(|()| report)
}

/// Send `digest` to each recipient, pausing between sends, counting successes and failures
async fn deliver_digest(
    email_client: &EmailClient,
    digest: &Digest,
    recipients: Vec<String>,
    report: &mut DigestReport,
) {
    for (n, recipient) in recipients.into_iter().enumerate() {
        // Don't flood the email API
        if n > 0 {
            tokio::time::sleep(SEND_PAUSE).await;
        }
        match EmailAddress::parse(recipient) {
            Ok(email) => {
                if let Err(e) = email_client
                    .send_email(&email, &digest.subject, &digest.html, &digest.text)
                    .await
                {
                    report.failed += 1;
                    tracing::error!(
                        error.cause_chain = ?e,
                        error.message = %e,
                        "Failed to deliver the digest to {}", email
                    );
                } else {
                    report.sent += 1;
                }
            }

            // Invalid email address: skip this particular subscriber
            Err(e) => {
                report.failed += 1;
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Skipping a subscriber because their stored email address is invalid"
                );
            }
        }
    }
}

/// Background worker mailing the digest at a fixed interval
pub struct DigestWorker {
    subscribers: SubscriberSet,
    ledger: VerificationLedger,
    comic_client: ComicClient,
    email_client: EmailClient,
    interval: time::Duration,
}

impl DigestWorker {
    /// Build a digest worker based on settings
    pub fn build(config: Settings) -> anyhow::Result<Self> {
        Self::build_with_clock(config, Arc::new(SystemClock))
    }

    /// Build a digest worker based on settings and a time source
    pub fn build_with_clock(config: Settings, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let (subscribers, ledger) = config.storage.open(clock)?;
        Ok(Self {
            subscribers,
            ledger,
            comic_client: config.digest.client()?,
            email_client: config.email_client.client()?,
            interval: config.digest.interval(),
        })
    }

    /// Run a single digest cycle
    pub async fn run_once(&self) -> Result<DigestReport, DigestError> {
        run_digest_cycle(
            &self.subscribers,
            &self.ledger,
            &self.comic_client,
            &self.email_client,
        )
        .await
    }

    /// Run a digest cycle every interval until the process is stopped
    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        loop {
            tokio::time::sleep(self.interval).await;
            if let Err(e) = self.run_once().await {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Digest cycle failed"
                );
            }
        }
    }
}
