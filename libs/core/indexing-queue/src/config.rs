//! Worker configuration.

use std::time::Duration;
use uuid::Uuid;

/// Configuration for a queue worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Unique node identity recorded as the lease owner on claimed entries
    pub node_id: String,

    /// How long a claim remains exclusive before other workers may reclaim it
    pub lease_duration: Duration,

    /// Poll interval when no claimable entry is available
    pub poll_interval: Duration,

    /// Base delay of the retry backoff (doubled per attempt)
    pub backoff_base: Duration,

    /// Upper bound of the retry backoff
    pub backoff_cap: Duration,
}

impl WorkerConfig {
    pub fn new() -> Self {
        Self {
            node_id: format!("worker-{}", Uuid::new_v4()),
            lease_duration: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(300),
        }
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = node_id.into();
        self
    }

    pub fn with_lease_duration(mut self, lease: Duration) -> Self {
        self.lease_duration = lease;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }

    /// Capped exponential backoff for a retry attempt.
    ///
    /// `retry_count` is the number of failures already recorded, so the
    /// first retry waits `backoff_base`, the second twice that, and so on
    /// up to `backoff_cap`.
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let base_ms = self.backoff_base.as_millis() as u64;
        let cap_ms = self.backoff_cap.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(retry_count));
        Duration::from_millis(delay_ms.min(cap_ms))
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}
