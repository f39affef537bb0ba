use async_trait::async_trait;

use crate::error::VectorResult;
use crate::models::{
    BatchOutcome, VectorMetadata, VectorRecord, VectorSearchQuery, VectorSearchResult,
    VectorStatistics,
};

/// Storage and similarity search for content embeddings.
///
/// Backends must be behaviorally interchangeable: given identical records
/// and the same threshold, every implementation ranks identical embeddings
/// identically (cosine similarity descending, insertion order on ties).
/// Vectors are partitioned by entity type; a `vector_id` is only unique
/// within its namespace.
///
/// Transient backend errors (remote 5xx, connection loss) surface as
/// `VectorError::Backend`; retrying them is the caller's concern, the
/// indexing queue's backoff in the write path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorDatabase: Send + Sync {
    /// Idempotent upsert. Replaces any existing record for
    /// (entity_type, entity_id), incrementing its version and refreshing
    /// `updated_at` while preserving `created_at`. Returns the vector id.
    async fn store(
        &self,
        entity_type: &str,
        entity_id: &str,
        content: &str,
        embedding: Vec<f32>,
        metadata: VectorMetadata,
    ) -> VectorResult<String>;

    /// Fetch a record by its vector id.
    async fn get(&self, vector_id: &str) -> VectorResult<Option<VectorRecord>>;

    /// Fetch the record for an entity, if any.
    async fn get_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> VectorResult<Option<VectorRecord>>;

    /// Ranked similarity search. Results below `query.threshold` are
    /// excluded; ties break by insertion order.
    async fn search(
        &self,
        query_embedding: &[f32],
        query: VectorSearchQuery,
    ) -> VectorResult<Vec<VectorSearchResult>>;

    /// Convenience search always scoped to one namespace.
    async fn search_by_entity_type(
        &self,
        query_embedding: &[f32],
        entity_type: &str,
        limit: usize,
        threshold: f32,
    ) -> VectorResult<Vec<VectorSearchResult>>;

    /// Remove an entity's record. Idempotent: absent records yield
    /// `Ok(false)`, not an error.
    async fn remove(&self, entity_type: &str, entity_id: &str) -> VectorResult<bool>;

    /// Remove a record by vector id. Idempotent like [`remove`].
    ///
    /// [`remove`]: VectorDatabase::remove
    async fn remove_by_id(&self, vector_id: &str) -> VectorResult<bool>;

    /// Best-effort batch upsert; per-item failures do not abort the batch.
    async fn batch_store(&self, records: Vec<VectorRecord>) -> VectorResult<BatchOutcome>;

    /// Best-effort batch update; an alias of upsert semantics per item.
    async fn batch_update(&self, records: Vec<VectorRecord>) -> VectorResult<BatchOutcome>;

    /// Best-effort batch removal by (entity_type, entity_id) pairs.
    async fn batch_remove(&self, keys: Vec<(String, String)>) -> VectorResult<BatchOutcome>;

    /// Record counts per namespace plus backend identity.
    async fn statistics(&self) -> VectorResult<VectorStatistics>;
}
