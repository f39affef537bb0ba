//! Queue processor for search indexing.
//!
//! The write path: an entity mutation enqueues an entry; a worker claims
//! it and this processor applies the entry's action plan: embedding
//! generation, metadata index upsert, the analysis hook, and for deletes
//! the vector and index teardown.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use domain_vector::{EmbeddingProvider, VectorDatabase};
use indexing_queue::{EntryProcessor, QueueEntry, QueueError};

use crate::error::RelationshipResult;
use crate::metadata::{MetadataIndex, MetadataRecord, RelatedEntityRef};

/// Downstream hook invoked for entries whose plan enables analysis.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisHook: Send + Sync {
    async fn analyze(&self, entry: &QueueEntry) -> RelationshipResult<()>;
}

/// Default hook that does nothing.
pub struct NoopAnalysisHook;

#[async_trait]
impl AnalysisHook for NoopAnalysisHook {
    async fn analyze(&self, entry: &QueueEntry) -> RelationshipResult<()> {
        debug!(entry_id = %entry.id, "Analysis hook invoked (noop)");
        Ok(())
    }
}

/// Entity snapshot carried in the queue entry payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPayload {
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub related: Vec<RelatedEntityRef>,
}

impl IndexPayload {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: serde_json::Map::new(),
            related: Vec::new(),
        }
    }

    pub fn with_metadata_entry(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_related(mut self, related: RelatedEntityRef) -> Self {
        self.related.push(related);
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Applies indexing action plans to the vector database and metadata index.
pub struct SearchIndexProcessor {
    vector_database: Arc<dyn VectorDatabase>,
    embeddings: Arc<dyn EmbeddingProvider>,
    metadata_index: Arc<dyn MetadataIndex>,
    analysis: Arc<dyn AnalysisHook>,
}

impl SearchIndexProcessor {
    pub fn new(
        vector_database: Arc<dyn VectorDatabase>,
        embeddings: Arc<dyn EmbeddingProvider>,
        metadata_index: Arc<dyn MetadataIndex>,
    ) -> Self {
        Self {
            vector_database,
            embeddings,
            metadata_index,
            analysis: Arc::new(NoopAnalysisHook),
        }
    }

    pub fn with_analysis_hook(mut self, hook: Arc<dyn AnalysisHook>) -> Self {
        self.analysis = hook;
        self
    }

    /// An undeserializable payload is fatal for this entry only.
    fn parse_payload(entry: &QueueEntry) -> Result<IndexPayload, QueueError> {
        serde_json::from_str(&entry.payload)
            .map_err(|e| QueueError::permanent(format!("unparseable payload: {}", e)))
    }

    async fn apply_write(&self, entry: &QueueEntry) -> Result<(), QueueError> {
        let payload = Self::parse_payload(entry)?;
        let plan = entry.action_plan;

        if plan.generate_embedding {
            let embedding = self
                .embeddings
                .embed(&payload.content)
                .await
                .map_err(|e| QueueError::transient(format!("embedding failed: {}", e)))?;
            self.vector_database
                .store(
                    &entry.entity_type,
                    &entry.entity_id,
                    &payload.content,
                    embedding,
                    payload.metadata.clone(),
                )
                .await
                .map_err(|e| QueueError::transient(format!("vector store failed: {}", e)))?;
        }

        if plan.index_for_search {
            let mut record =
                MetadataRecord::new(&entry.entity_type, &entry.entity_id, &payload.content);
            record.metadata = payload.metadata.clone();
            record.related = payload.related.clone();
            self.metadata_index
                .upsert(record)
                .await
                .map_err(|e| QueueError::transient(format!("metadata upsert failed: {}", e)))?;
        }

        if plan.enable_analysis {
            self.analysis
                .analyze(entry)
                .await
                .map_err(|e| QueueError::transient(format!("analysis hook failed: {}", e)))?;
        }

        Ok(())
    }

    async fn apply_delete(&self, entry: &QueueEntry) -> Result<(), QueueError> {
        let plan = entry.action_plan;

        if plan.remove_from_search {
            self.metadata_index
                .delete(&entry.entity_type, &entry.entity_id)
                .await
                .map_err(|e| QueueError::transient(format!("metadata delete failed: {}", e)))?;
        }

        if plan.cleanup_embeddings {
            self.vector_database
                .remove(&entry.entity_type, &entry.entity_id)
                .await
                .map_err(|e| QueueError::transient(format!("vector remove failed: {}", e)))?;
        }

        Ok(())
    }
}

#[async_trait]
impl EntryProcessor for SearchIndexProcessor {
    async fn process(&self, entry: &QueueEntry) -> Result<(), QueueError> {
        let plan = entry.action_plan;

        if plan.remove_from_search || plan.cleanup_embeddings {
            self.apply_delete(entry).await?;
        }

        if plan.generate_embedding || plan.index_for_search || plan.enable_analysis {
            self.apply_write(entry).await?;
        }

        debug!(
            entry_id = %entry.id,
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            "Action plan applied"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SearchIndexProcessor"
    }
}
