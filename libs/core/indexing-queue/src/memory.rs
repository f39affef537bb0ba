//! In-memory queue store.
//!
//! Reference implementation of [`QueueStore`] used by tests and embedded
//! deployments. A single mutex guards the entry map, which makes every
//! transition trivially atomic; the version checks still run so the store
//! behaves exactly like a conditional-update SQL store under races.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::entry::{EnqueueRequest, EntryStatus, QueueEntry};
use crate::error::{QueueError, QueueResult};
use crate::store::QueueStore;

#[derive(Default)]
struct Inner {
    entries: HashMap<Uuid, QueueEntry>,
    /// Enqueue sequence per entry, the final FIFO tiebreaker.
    sequence: HashMap<Uuid, u64>,
    next_seq: u64,
}

/// In-memory [`QueueStore`] implementation.
#[derive(Default)]
pub struct InMemoryQueueStore {
    inner: Mutex<Inner>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_version(entry: &QueueEntry, expected: u64) -> QueueResult<()> {
        if entry.version != expected {
            return Err(QueueError::VersionConflict {
                id: entry.id,
                expected,
                actual: entry.version,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn enqueue(&self, request: EnqueueRequest) -> QueueResult<Uuid> {
        let mut inner = self.inner.lock().await;
        let entry = request.into_entry(Utc::now());
        let id = entry.id;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.sequence.insert(id, seq);
        debug!(entry_id = %id, entity_type = %entry.entity_type, "Enqueued entry");
        inner.entries.insert(id, entry);
        Ok(id)
    }

    async fn claim_next(&self, node_id: &str, lease: Duration) -> QueueResult<Option<QueueEntry>> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();

        let candidate = inner
            .entries
            .values()
            .filter(|entry| match entry.status {
                EntryStatus::Pending => entry.scheduled_for <= now,
                // Expired lease: a crashed or stalled worker abandoned it
                EntryStatus::Processing => entry
                    .visibility_timeout_until
                    .map(|until| until < now)
                    .unwrap_or(false),
                _ => false,
            })
            .min_by_key(|entry| {
                let seq = inner.sequence.get(&entry.id).copied().unwrap_or(u64::MAX);
                (-entry.priority_weight, entry.scheduled_for, seq)
            })
            .map(|entry| entry.id);

        let Some(id) = candidate else {
            return Ok(None);
        };

        let lease_chrono =
            chrono::Duration::from_std(lease).unwrap_or_else(|_| chrono::Duration::seconds(30));

        let entry = inner
            .entries
            .get_mut(&id)
            .ok_or(QueueError::EntryNotFound(id))?;
        entry.status = EntryStatus::Processing;
        entry.processing_node = Some(node_id.to_string());
        entry.visibility_timeout_until = Some(now + lease_chrono);
        entry.version += 1;
        entry.updated_at = now;

        debug!(entry_id = %id, node = %node_id, "Claimed entry");
        Ok(Some(entry.clone()))
    }

    async fn complete(&self, id: Uuid, version: u64) -> QueueResult<()> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .entries
            .get_mut(&id)
            .ok_or(QueueError::EntryNotFound(id))?;
        Self::check_version(entry, version)?;
        if entry.status != EntryStatus::Processing {
            return Err(QueueError::InvalidTransition {
                id,
                status: entry.status.to_string(),
            });
        }

        entry.status = EntryStatus::Completed;
        entry.visibility_timeout_until = None;
        entry.version += 1;
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn fail(
        &self,
        id: Uuid,
        version: u64,
        error: &str,
        backoff: Duration,
    ) -> QueueResult<EntryStatus> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .entries
            .get_mut(&id)
            .ok_or(QueueError::EntryNotFound(id))?;
        Self::check_version(entry, version)?;
        if entry.status != EntryStatus::Processing {
            return Err(QueueError::InvalidTransition {
                id,
                status: entry.status.to_string(),
            });
        }

        let now = Utc::now();
        entry.retry_count += 1;
        entry.error_message = Some(error.to_string());
        entry.processing_node = None;
        entry.visibility_timeout_until = None;
        entry.version += 1;
        entry.updated_at = now;

        if entry.retry_count < entry.max_retries {
            let backoff_chrono = chrono::Duration::from_std(backoff)
                .unwrap_or_else(|_| chrono::Duration::seconds(1));
            entry.status = EntryStatus::Pending;
            entry.scheduled_for = now + backoff_chrono;
        } else {
            entry.status = EntryStatus::DeadLetter;
        }

        Ok(entry.status)
    }

    async fn dead_letter(&self, id: Uuid, version: u64, reason: &str) -> QueueResult<()> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .entries
            .get_mut(&id)
            .ok_or(QueueError::EntryNotFound(id))?;
        Self::check_version(entry, version)?;

        entry.status = EntryStatus::DeadLetter;
        entry.error_message = Some(reason.to_string());
        entry.processing_node = None;
        entry.visibility_timeout_until = None;
        entry.version += 1;
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn get(&self, id: Uuid) -> QueueResult<Option<QueueEntry>> {
        let inner = self.inner.lock().await;
        Ok(inner.entries.get(&id).cloned())
    }

    async fn counts(&self) -> QueueResult<HashMap<EntryStatus, usize>> {
        let inner = self.inner.lock().await;
        let mut counts: HashMap<EntryStatus, usize> = HashMap::new();
        for entry in inner.entries.values() {
            *counts.entry(entry.status).or_default() += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ActionPlan, Operation, Priority};

    fn request(entity_id: &str) -> EnqueueRequest {
        EnqueueRequest::new(
            "document",
            entity_id,
            Operation::Create,
            ActionPlan::for_write(),
            r#"{"content":"hello"}"#,
        )
    }

    #[tokio::test]
    async fn test_enqueue_then_get() {
        let store = InMemoryQueueStore::new();
        let id = store.enqueue(request("doc-1")).await.unwrap();

        let entry = store.get(id).await.unwrap().unwrap();
        assert_eq!(entry.entity_id, "doc-1");
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.version, 0);
    }

    #[tokio::test]
    async fn test_claim_sets_lease_and_bumps_version() {
        let store = InMemoryQueueStore::new();
        let id = store.enqueue(request("doc-1")).await.unwrap();

        let claimed = store
            .claim_next("node-a", Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(claimed.id, id);
        assert_eq!(claimed.status, EntryStatus::Processing);
        assert_eq!(claimed.processing_node.as_deref(), Some("node-a"));
        assert!(claimed.visibility_timeout_until.is_some());
        assert_eq!(claimed.version, 1);

        // Nothing else is claimable while the lease is live
        let second = store
            .claim_next("node-b", Duration::from_secs(30))
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_priority_then_fifo_ordering() {
        let store = InMemoryQueueStore::new();
        let low = store
            .enqueue(request("low").with_priority(Priority::Low))
            .await
            .unwrap();
        let first_normal = store.enqueue(request("normal-1")).await.unwrap();
        let second_normal = store.enqueue(request("normal-2")).await.unwrap();
        let high = store
            .enqueue(request("high").with_priority(Priority::High))
            .await
            .unwrap();

        let lease = Duration::from_secs(30);
        assert_eq!(store.claim_next("n", lease).await.unwrap().unwrap().id, high);
        assert_eq!(
            store.claim_next("n", lease).await.unwrap().unwrap().id,
            first_normal
        );
        assert_eq!(
            store.claim_next("n", lease).await.unwrap().unwrap().id,
            second_normal
        );
        assert_eq!(store.claim_next("n", lease).await.unwrap().unwrap().id, low);
    }

    #[tokio::test]
    async fn test_expired_lease_is_reclaimable_by_other_node() {
        let store = InMemoryQueueStore::new();
        store.enqueue(request("doc-1")).await.unwrap();

        // Claim with an already-expired lease to simulate a crashed worker
        let first = store
            .claim_next("node-a", Duration::from_millis(0))
            .await
            .unwrap()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;

        let reclaimed = store
            .claim_next("node-b", Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reclaimed.id, first.id);
        assert_eq!(reclaimed.processing_node.as_deref(), Some("node-b"));
        assert_eq!(reclaimed.version, first.version + 1);

        // The original owner's completion attempt loses the version race
        let stale = store.complete(first.id, first.version).await;
        assert!(stale.unwrap_err().is_version_conflict());
    }

    #[tokio::test]
    async fn test_complete_requires_matching_version() {
        let store = InMemoryQueueStore::new();
        let id = store.enqueue(request("doc-1")).await.unwrap();
        let claimed = store
            .claim_next("node-a", Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();

        assert!(store.complete(id, claimed.version + 7).await.is_err());
        store.complete(id, claimed.version).await.unwrap();

        let entry = store.get(id).await.unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Completed);
        assert!(entry.status.is_terminal());
    }

    #[tokio::test]
    async fn test_fail_reschedules_with_backoff_until_exhausted() {
        let store = InMemoryQueueStore::new();
        let id = store
            .enqueue(request("doc-1").with_max_retries(2))
            .await
            .unwrap();

        let lease = Duration::from_secs(30);
        let claimed = store.claim_next("n", lease).await.unwrap().unwrap();
        let status = store
            .fail(id, claimed.version, "backend 503", Duration::from_millis(0))
            .await
            .unwrap();
        assert_eq!(status, EntryStatus::Pending);

        let entry = store.get(id).await.unwrap().unwrap();
        assert_eq!(entry.retry_count, 1);
        assert_eq!(entry.error_message.as_deref(), Some("backend 503"));

        // Second failure reaches max_retries and dead-letters
        tokio::time::sleep(Duration::from_millis(5)).await;
        let claimed = store.claim_next("n", lease).await.unwrap().unwrap();
        let status = store
            .fail(id, claimed.version, "backend 503", Duration::from_millis(0))
            .await
            .unwrap();
        assert_eq!(status, EntryStatus::DeadLetter);

        // Dead-lettered entries are never handed out again
        assert!(store.claim_next("n", lease).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retry_backoff_delays_next_claim() {
        let store = InMemoryQueueStore::new();
        let id = store.enqueue(request("doc-1")).await.unwrap();

        let lease = Duration::from_secs(30);
        let claimed = store.claim_next("n", lease).await.unwrap().unwrap();
        store
            .fail(id, claimed.version, "timeout", Duration::from_secs(3600))
            .await
            .unwrap();

        // Rescheduled an hour out: not claimable now
        assert!(store.claim_next("n", lease).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dead_letter_is_item_scoped() {
        let store = InMemoryQueueStore::new();
        let poisoned = store.enqueue(request("poisoned")).await.unwrap();
        let healthy = store.enqueue(request("healthy")).await.unwrap();

        let lease = Duration::from_secs(30);
        let claimed = store.claim_next("n", lease).await.unwrap().unwrap();
        assert_eq!(claimed.id, poisoned);
        store
            .dead_letter(poisoned, claimed.version, "unparseable payload")
            .await
            .unwrap();

        // The other entry is unaffected
        let next = store.claim_next("n", lease).await.unwrap().unwrap();
        assert_eq!(next.id, healthy);

        let counts = store.counts().await.unwrap();
        assert_eq!(counts.get(&EntryStatus::DeadLetter), Some(&1));
        assert_eq!(counts.get(&EntryStatus::Processing), Some(&1));
    }
}
