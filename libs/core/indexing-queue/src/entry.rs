//! Queue entry model and state machine.
//!
//! An entry records one indexing task for an entity mutation. Entries are
//! never deleted before reaching a terminal state (`Completed` or
//! `DeadLetter`); failed entries are rescheduled with backoff until their
//! retry budget is exhausted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Entity mutation that produced the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// How the producer wants the entry handled.
///
/// `Sync` is a dispatch hint: such entries are enqueued at high priority
/// so a worker picks them up ahead of bulk work. Processing itself is
/// always asynchronous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStrategy {
    Sync,
    Async,
}

/// Lifecycle state of a queue entry.
///
/// `Pending → Processing → Completed` on the happy path. A retryable
/// failure reverts to `Pending` with a future `scheduled_for`; exhausting
/// `max_retries` (or a permanent failure) ends in `DeadLetter`. `Failed`
/// is reserved for stores that stage a failure before rescheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    DeadLetter,
}

impl EntryStatus {
    /// Terminal states are never left once entered.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryStatus::Completed | EntryStatus::DeadLetter)
    }
}

/// Named priority bands with numeric weights.
///
/// Dequeue ordering is weight descending, then `scheduled_for` ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    pub fn weight(&self) -> i64 {
        match self {
            Priority::High => 100,
            Priority::Normal => 50,
            Priority::Low => 10,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// Independent switches describing what a worker should do with an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub generate_embedding: bool,
    pub index_for_search: bool,
    pub enable_analysis: bool,
    pub remove_from_search: bool,
    pub cleanup_embeddings: bool,
}

impl ActionPlan {
    /// Plan for a create/update: embed and index the new content.
    pub fn for_write() -> Self {
        Self {
            generate_embedding: true,
            index_for_search: true,
            ..Self::default()
        }
    }

    /// Plan for a delete: tear the entity out of search and vectors.
    pub fn for_delete() -> Self {
        Self {
            remove_from_search: true,
            cleanup_embeddings: true,
            ..Self::default()
        }
    }

    pub fn with_analysis(mut self) -> Self {
        self.enable_analysis = true;
        self
    }

    /// An empty plan makes the entry a no-op; producers should not enqueue it.
    pub fn is_empty(&self) -> bool {
        !(self.generate_embedding
            || self.index_for_search
            || self.enable_analysis
            || self.remove_from_search
            || self.cleanup_embeddings)
    }
}

/// A durable queue entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: String,
    pub entity_class_name: String,
    pub operation: Operation,
    pub strategy: DispatchStrategy,
    pub status: EntryStatus,
    pub priority: Priority,
    /// Numeric dequeue weight; defaults to the priority band's weight.
    pub priority_weight: i64,
    pub action_plan: ActionPlan,
    /// Serialized snapshot of the entity at enqueue time.
    pub payload: String,
    pub retry_count: u32,
    pub max_retries: u32,
    pub error_message: Option<String>,
    /// Lease owner while `Processing`.
    pub processing_node: Option<String>,
    /// Earliest instant the entry may be claimed.
    pub scheduled_for: DateTime<Utc>,
    /// Lease expiry; an expired lease makes the entry re-claimable.
    pub visibility_timeout_until: Option<DateTime<Utc>>,
    /// Optimistic lock counter; bumped on every transition.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Producer-side request to enqueue an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub entity_type: String,
    pub entity_id: String,
    pub entity_class_name: String,
    pub operation: Operation,
    pub strategy: DispatchStrategy,
    pub action_plan: ActionPlan,
    pub payload: String,
    pub priority: Priority,
    pub priority_weight: Option<i64>,
    pub max_retries: u32,
}

impl EnqueueRequest {
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        operation: Operation,
        action_plan: ActionPlan,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            entity_class_name: String::new(),
            operation,
            strategy: DispatchStrategy::Async,
            action_plan,
            payload: payload.into(),
            priority: Priority::Normal,
            priority_weight: None,
            max_retries: 3,
        }
    }

    /// Mark the request synchronous: dispatched at high priority.
    pub fn sync(mut self) -> Self {
        self.strategy = DispatchStrategy::Sync;
        self.priority = Priority::High;
        self
    }

    pub fn with_entity_class_name(mut self, name: impl Into<String>) -> Self {
        self.entity_class_name = name.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_priority_weight(mut self, weight: i64) -> Self {
        self.priority_weight = Some(weight);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Materialize the durable entry for this request.
    pub fn into_entry(self, now: DateTime<Utc>) -> QueueEntry {
        let weight = self.priority_weight.unwrap_or_else(|| self.priority.weight());
        QueueEntry {
            id: Uuid::new_v4(),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            entity_class_name: self.entity_class_name,
            operation: self.operation,
            strategy: self.strategy,
            status: EntryStatus::Pending,
            priority: self.priority,
            priority_weight: weight,
            action_plan: self.action_plan,
            payload: self.payload,
            retry_count: 0,
            max_retries: self.max_retries,
            error_message: None,
            processing_node: None,
            scheduled_for: now,
            visibility_timeout_until: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
