use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata payload attached to a stored vector
pub type VectorMetadata = serde_json::Map<String, serde_json::Value>;

/// A stored content embedding.
///
/// The `vector_id` is deterministic for a given (entity_type, entity_id)
/// and unique within its entity-type namespace; collisions across
/// namespaces are harmless because every lookup is namespace-scoped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub vector_id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: VectorMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
    /// Monotonically incremented on every upsert of the same entity
    pub version: u64,
}

impl VectorRecord {
    /// Deterministic vector id for an entity within its namespace.
    pub fn vector_id_for(entity_type: &str, entity_id: &str) -> String {
        format!("{}::{}", entity_type, entity_id)
    }

    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        content: impl Into<String>,
        embedding: Vec<f32>,
        metadata: VectorMetadata,
    ) -> Self {
        let entity_type = entity_type.into();
        let entity_id = entity_id.into();
        let now = Utc::now();
        Self {
            vector_id: Self::vector_id_for(&entity_type, &entity_id),
            entity_type,
            entity_id,
            content: content.into(),
            embedding,
            metadata,
            created_at: now,
            updated_at: now,
            active: true,
            version: 1,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}

/// A search hit: the record plus its ranking scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchResult {
    pub record: VectorRecord,
    /// Cosine similarity clamped to [0, 1]
    pub similarity: f32,
    /// Cosine distance, `1 - similarity`
    pub distance: f32,
}

impl VectorSearchResult {
    pub fn new(record: VectorRecord, similarity: f32) -> Self {
        Self {
            distance: 1.0 - similarity,
            similarity,
            record,
        }
    }
}

/// Search parameters.
#[derive(Debug, Clone)]
pub struct VectorSearchQuery {
    /// Restrict the search to one entity-type namespace
    pub entity_type: Option<String>,
    pub limit: usize,
    /// Results with similarity strictly below the threshold are excluded
    pub threshold: f32,
}

impl VectorSearchQuery {
    pub fn new(limit: usize, threshold: f32) -> Self {
        Self {
            entity_type: None,
            limit,
            threshold,
        }
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }
}

impl Default for VectorSearchQuery {
    fn default() -> Self {
        Self::new(25, 0.0)
    }
}

/// Outcome of a best-effort batch operation.
///
/// Per-item failures are logged and counted; they never abort the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Backend statistics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStatistics {
    /// Backend identity, e.g. "in-memory" or "qdrant"
    pub backend: String,
    pub total_records: usize,
    pub records_by_entity_type: HashMap<String, usize>,
}
