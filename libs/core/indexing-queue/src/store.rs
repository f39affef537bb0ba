//! Queue store contract.
//!
//! The store owns entry durability and every status transition. All
//! transitions are guarded by the entry's optimistic version counter, so
//! on SQL-backed stores each method maps to a conditional update
//! (`... WHERE id = ? AND version = ?`); the in-memory store enforces the
//! same compare-and-swap semantics.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::entry::{EnqueueRequest, EntryStatus, QueueEntry};
use crate::error::QueueResult;

/// Durable storage for queue entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Persist a new entry in `Pending` state and return its id.
    async fn enqueue(&self, request: EnqueueRequest) -> QueueResult<Uuid>;

    /// Atomically claim the next due entry for `node_id`.
    ///
    /// Claimable entries are `Pending` with `scheduled_for` in the past,
    /// or `Processing` entries whose lease has expired (crash recovery).
    /// Ordering: priority weight descending, then `scheduled_for`
    /// ascending. A successful claim flips the entry to `Processing`,
    /// records the lease owner, sets `visibility_timeout_until = now +
    /// lease`, and bumps the version; the compare-and-swap on
    /// (status, version) guarantees no two workers hold the same entry.
    async fn claim_next(&self, node_id: &str, lease: Duration) -> QueueResult<Option<QueueEntry>>;

    /// Mark a claimed entry `Completed`. `version` must match the
    /// version observed at claim time.
    async fn complete(&self, id: Uuid, version: u64) -> QueueResult<()>;

    /// Record a retryable failure.
    ///
    /// Increments `retry_count`; below `max_retries` the entry reverts to
    /// `Pending` with `scheduled_for = now + backoff`, otherwise it is
    /// dead-lettered. Returns the resulting status.
    async fn fail(
        &self,
        id: Uuid,
        version: u64,
        error: &str,
        backoff: Duration,
    ) -> QueueResult<EntryStatus>;

    /// Terminally fail a single entry without consuming retries
    /// (undeserializable payload, permanent processing error).
    async fn dead_letter(&self, id: Uuid, version: u64, reason: &str) -> QueueResult<()>;

    /// Fetch an entry by id.
    async fn get(&self, id: Uuid) -> QueueResult<Option<QueueEntry>>;

    /// Entry counts per status, for monitoring.
    async fn counts(&self) -> QueueResult<HashMap<EntryStatus, usize>>;
}
