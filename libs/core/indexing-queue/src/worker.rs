//! Queue worker loop.
//!
//! A worker repeatedly claims the next due entry from the store, hands it
//! to its [`EntryProcessor`], and records the outcome transition. Multiple
//! workers may share a store: the claim compare-and-swap guarantees an
//! entry is only ever processed by one worker at a time, and expired
//! leases make abandoned entries re-claimable.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::entry::{EntryStatus, QueueEntry};
use crate::error::{ErrorCategory, QueueError, QueueResult};
use crate::metrics::QueueMetrics;
use crate::store::QueueStore;

/// Trait for entry processors.
///
/// Downstream crates implement this to apply an entry's action plan
/// (embedding generation, search indexing, cleanup).
///
/// Return `Ok(())` for success. Failures are categorized through
/// [`QueueError::category`]: transient errors are rescheduled with
/// backoff, permanent errors dead-letter the entry immediately.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntryProcessor: Send + Sync {
    /// Process a single claimed entry.
    async fn process(&self, entry: &QueueEntry) -> Result<(), QueueError>;

    /// Processor name for logging.
    fn name(&self) -> &'static str;
}

/// Generic queue worker.
pub struct QueueWorker<S, P>
where
    S: QueueStore,
    P: EntryProcessor,
{
    store: Arc<S>,
    processor: Arc<P>,
    config: WorkerConfig,
    metrics: QueueMetrics,
}

impl<S, P> QueueWorker<S, P>
where
    S: QueueStore + 'static,
    P: EntryProcessor + 'static,
{
    pub fn new(store: Arc<S>, processor: Arc<P>, config: WorkerConfig) -> Self {
        let metrics = QueueMetrics::new(config.node_id.clone());
        Self {
            store,
            processor,
            config,
            metrics,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run the worker loop until the shutdown signal flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> QueueResult<()> {
        info!(
            node_id = %self.config.node_id,
            processor = %self.processor.name(),
            lease_secs = %self.config.lease_duration.as_secs(),
            "Starting queue worker"
        );

        loop {
            if *shutdown.borrow() {
                info!("Received shutdown signal, stopping worker");
                break;
            }

            match self.tick().await {
                Ok(true) => {
                    // Processed an entry; immediately look for the next one
                    continue;
                }
                Ok(false) => {}
                Err(e) if e.is_version_conflict() => {
                    // Another worker won the race; nothing to do
                    self.metrics.claim_conflict();
                    debug!(error = %e, "Lost claim race");
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "Worker tick failed");
                }
            }

            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Received shutdown signal, stopping worker");
                        break;
                    }
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!(node_id = %self.config.node_id, "Queue worker stopped");
        Ok(())
    }

    /// Claim and process at most one entry. Returns whether one was claimed.
    pub async fn tick(&self) -> QueueResult<bool> {
        let Some(entry) = self
            .store
            .claim_next(&self.config.node_id, self.config.lease_duration)
            .await?
        else {
            return Ok(false);
        };

        self.metrics.entry_claimed();
        self.process_entry(entry).await?;
        Ok(true)
    }

    async fn process_entry(&self, entry: QueueEntry) -> QueueResult<()> {
        debug!(
            entry_id = %entry.id,
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            operation = %entry.operation,
            retry_count = %entry.retry_count,
            "Processing entry"
        );

        let start = Instant::now();

        match self.processor.process(&entry).await {
            Ok(()) => {
                self.store.complete(entry.id, entry.version).await?;
                self.metrics.entry_completed(start.elapsed());
                debug!(entry_id = %entry.id, "Entry completed");
                Ok(())
            }
            Err(e) => self.handle_failure(&entry, e).await,
        }
    }

    async fn handle_failure(&self, entry: &QueueEntry, error: QueueError) -> QueueResult<()> {
        let category = error.category();
        warn!(
            entry_id = %entry.id,
            entity_type = %entry.entity_type,
            error = %error,
            error_category = ?category,
            retry_count = %entry.retry_count,
            "Entry processing failed"
        );

        match category {
            ErrorCategory::Permanent => {
                self.store
                    .dead_letter(entry.id, entry.version, &error.to_string())
                    .await?;
                self.metrics.entry_dead_lettered();
                warn!(entry_id = %entry.id, "Permanent error, entry dead-lettered");
                Ok(())
            }
            ErrorCategory::Transient => {
                let backoff = self.config.backoff_delay(entry.retry_count);
                let status = self
                    .store
                    .fail(entry.id, entry.version, &error.to_string(), backoff)
                    .await?;

                match status {
                    EntryStatus::DeadLetter => {
                        self.metrics.entry_dead_lettered();
                        warn!(
                            entry_id = %entry.id,
                            max_retries = %entry.max_retries,
                            "Retries exhausted, entry dead-lettered"
                        );
                    }
                    _ => {
                        self.metrics.entry_retried();
                        info!(
                            entry_id = %entry.id,
                            backoff_ms = %backoff.as_millis(),
                            "Entry rescheduled with backoff"
                        );
                    }
                }
                Ok(())
            }
        }
    }
}
