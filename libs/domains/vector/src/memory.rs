//! In-memory vector database.
//!
//! Fast backend for development, testing, and embedded deployments. All
//! records live in a single map keyed by vector id (which embeds the
//! namespace, so ids are globally unique here); an insertion sequence per
//! record provides the deterministic tie-break on equal similarity.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::database::VectorDatabase;
use crate::error::{VectorError, VectorResult};
use crate::models::{
    BatchOutcome, VectorMetadata, VectorRecord, VectorSearchQuery, VectorSearchResult,
    VectorStatistics,
};
use crate::similarity::cosine_similarity;

#[derive(Default)]
struct Inner {
    records: HashMap<String, StoredRecord>,
    next_seq: u64,
}

struct StoredRecord {
    record: VectorRecord,
    /// Insertion order, stable across upserts of the same entity
    seq: u64,
}

/// In-memory [`VectorDatabase`] implementation.
#[derive(Default)]
pub struct InMemoryVectorDatabase {
    inner: RwLock<Inner>,
}

impl InMemoryVectorDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn validate(entity_type: &str, entity_id: &str, embedding: &[f32]) -> VectorResult<()> {
        if entity_type.trim().is_empty() || entity_id.trim().is_empty() {
            return Err(VectorError::Validation(
                "entity_type and entity_id must be non-empty".to_string(),
            ));
        }
        if embedding.is_empty() {
            return Err(VectorError::Validation(
                "embedding must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    async fn upsert(
        &self,
        entity_type: &str,
        entity_id: &str,
        content: &str,
        embedding: Vec<f32>,
        metadata: VectorMetadata,
    ) -> VectorResult<String> {
        Self::validate(entity_type, entity_id, &embedding)?;

        let vector_id = VectorRecord::vector_id_for(entity_type, entity_id);
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        // Replacing a record keeps its creation time and insertion slot
        let previous = inner
            .records
            .get(&vector_id)
            .map(|stored| (stored.record.version, stored.record.created_at, stored.seq));

        match previous {
            Some((version, created_at, seq)) => {
                inner.records.insert(
                    vector_id.clone(),
                    StoredRecord {
                        record: VectorRecord {
                            vector_id: vector_id.clone(),
                            entity_type: entity_type.to_string(),
                            entity_id: entity_id.to_string(),
                            content: content.to_string(),
                            embedding,
                            metadata,
                            created_at,
                            updated_at: now,
                            active: true,
                            version: version + 1,
                        },
                        seq,
                    },
                );
            }
            None => {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                inner.records.insert(
                    vector_id.clone(),
                    StoredRecord {
                        record: VectorRecord::new(
                            entity_type,
                            entity_id,
                            content,
                            embedding,
                            metadata,
                        ),
                        seq,
                    },
                );
            }
        }

        debug!(vector_id = %vector_id, "Stored vector");
        Ok(vector_id)
    }
}

#[async_trait]
impl VectorDatabase for InMemoryVectorDatabase {
    async fn store(
        &self,
        entity_type: &str,
        entity_id: &str,
        content: &str,
        embedding: Vec<f32>,
        metadata: VectorMetadata,
    ) -> VectorResult<String> {
        self.upsert(entity_type, entity_id, content, embedding, metadata)
            .await
    }

    async fn get(&self, vector_id: &str) -> VectorResult<Option<VectorRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.records.get(vector_id).map(|s| s.record.clone()))
    }

    async fn get_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> VectorResult<Option<VectorRecord>> {
        self.get(&VectorRecord::vector_id_for(entity_type, entity_id))
            .await
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        query: VectorSearchQuery,
    ) -> VectorResult<Vec<VectorSearchResult>> {
        if query_embedding.is_empty() {
            return Err(VectorError::Validation(
                "query embedding must be non-empty".to_string(),
            ));
        }

        let inner = self.inner.read().await;

        let mut scored: Vec<(f32, u64, VectorRecord)> = inner
            .records
            .values()
            .filter(|stored| stored.record.active)
            .filter(|stored| match &query.entity_type {
                Some(entity_type) => stored.record.entity_type == *entity_type,
                None => true,
            })
            .map(|stored| {
                let similarity = cosine_similarity(query_embedding, &stored.record.embedding);
                (similarity, stored.seq, stored.record.clone())
            })
            .filter(|(similarity, _, _)| *similarity >= query.threshold)
            .collect();

        // Similarity descending, insertion order on ties
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        scored.truncate(query.limit);

        let results = scored
            .into_iter()
            .map(|(similarity, _, record)| VectorSearchResult::new(record, similarity))
            .collect::<Vec<_>>();

        debug!(
            results = results.len(),
            threshold = query.threshold,
            limit = query.limit,
            "Vector search complete"
        );
        Ok(results)
    }

    async fn search_by_entity_type(
        &self,
        query_embedding: &[f32],
        entity_type: &str,
        limit: usize,
        threshold: f32,
    ) -> VectorResult<Vec<VectorSearchResult>> {
        self.search(
            query_embedding,
            VectorSearchQuery::new(limit, threshold).with_entity_type(entity_type),
        )
        .await
    }

    async fn remove(&self, entity_type: &str, entity_id: &str) -> VectorResult<bool> {
        self.remove_by_id(&VectorRecord::vector_id_for(entity_type, entity_id))
            .await
    }

    async fn remove_by_id(&self, vector_id: &str) -> VectorResult<bool> {
        let mut inner = self.inner.write().await;
        let removed = inner.records.remove(vector_id).is_some();
        if removed {
            debug!(vector_id = %vector_id, "Removed vector");
        }
        Ok(removed)
    }

    async fn batch_store(&self, records: Vec<VectorRecord>) -> VectorResult<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        for record in records {
            match self
                .upsert(
                    &record.entity_type,
                    &record.entity_id,
                    &record.content,
                    record.embedding,
                    record.metadata,
                )
                .await
            {
                Ok(_) => outcome.record_success(),
                Err(e) => {
                    warn!(entity_id = %record.entity_id, error = %e, "Skipping invalid record in batch");
                    outcome.record_failure();
                }
            }
        }
        Ok(outcome)
    }

    async fn batch_update(&self, records: Vec<VectorRecord>) -> VectorResult<BatchOutcome> {
        // Upsert semantics make update identical to store per item
        self.batch_store(records).await
    }

    async fn batch_remove(&self, keys: Vec<(String, String)>) -> VectorResult<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        for (entity_type, entity_id) in keys {
            match self.remove(&entity_type, &entity_id).await {
                Ok(true) => outcome.record_success(),
                Ok(false) => outcome.record_failure(),
                Err(e) => {
                    warn!(entity_id = %entity_id, error = %e, "Batch remove failed for key");
                    outcome.record_failure();
                }
            }
        }
        Ok(outcome)
    }

    async fn statistics(&self) -> VectorResult<VectorStatistics> {
        let inner = self.inner.read().await;
        let mut by_type: HashMap<String, usize> = HashMap::new();
        for stored in inner.records.values() {
            *by_type.entry(stored.record.entity_type.clone()).or_default() += 1;
        }
        Ok(VectorStatistics {
            backend: "in-memory".to_string(),
            total_records: inner.records.len(),
            records_by_entity_type: by_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> InMemoryVectorDatabase {
        let db = InMemoryVectorDatabase::new();
        db.store("document", "doc-1", "alpha", vec![1.0, 0.0, 0.0], VectorMetadata::new())
            .await
            .unwrap();
        db.store("document", "doc-2", "beta", vec![0.0, 1.0, 0.0], VectorMetadata::new())
            .await
            .unwrap();
        db.store("order", "ord-1", "gamma", vec![1.0, 0.0, 0.0], VectorMetadata::new())
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_store_then_get_by_entity() {
        let db = InMemoryVectorDatabase::new();
        let mut metadata = VectorMetadata::new();
        metadata.insert("status".into(), serde_json::json!("published"));

        let vector_id = db
            .store("document", "doc-1", "hello world", vec![0.1, 0.2, 0.3], metadata.clone())
            .await
            .unwrap();

        let record = db.get_by_entity("document", "doc-1").await.unwrap().unwrap();
        assert_eq!(record.vector_id, vector_id);
        assert_eq!(record.embedding, vec![0.1, 0.2, 0.3]);
        assert_eq!(record.metadata, metadata);
        assert_eq!(record.content, "hello world");
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_and_versioned() {
        let db = InMemoryVectorDatabase::new();
        db.store("document", "doc-1", "v1", vec![1.0, 0.0], VectorMetadata::new())
            .await
            .unwrap();
        let first = db.get_by_entity("document", "doc-1").await.unwrap().unwrap();

        db.store("document", "doc-1", "v2", vec![0.0, 1.0], VectorMetadata::new())
            .await
            .unwrap();

        let second = db.get_by_entity("document", "doc-1").await.unwrap().unwrap();
        assert_eq!(second.version, first.version + 1);
        assert_eq!(second.content, "v2");
        assert_eq!(second.created_at, first.created_at);

        // Exactly one retrievable record remains
        let stats = db.statistics().await.unwrap();
        assert_eq!(stats.records_by_entity_type.get("document"), Some(&1));
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity_descending() {
        let db = InMemoryVectorDatabase::new();
        db.store("document", "far", "far", vec![0.0, 1.0], VectorMetadata::new())
            .await
            .unwrap();
        db.store("document", "near", "near", vec![0.9, 0.1], VectorMetadata::new())
            .await
            .unwrap();
        db.store("document", "exact", "exact", vec![1.0, 0.0], VectorMetadata::new())
            .await
            .unwrap();

        let results = db
            .search_by_entity_type(&[1.0, 0.0], "document", 10, 0.0)
            .await
            .unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.record.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near", "far"]);
        assert!(results[0].similarity > results[1].similarity);
        assert!(results[1].similarity > results[2].similarity);
    }

    #[tokio::test]
    async fn test_search_threshold_excludes_low_scores() {
        let db = seeded().await;
        let results = db
            .search_by_entity_type(&[1.0, 0.0, 0.0], "document", 10, 0.5)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.entity_id, "doc-1");
    }

    #[tokio::test]
    async fn test_search_ties_break_by_insertion_order() {
        let db = InMemoryVectorDatabase::new();
        // Identical embeddings, stored b-then-a
        db.store("document", "second", "x", vec![1.0, 1.0], VectorMetadata::new())
            .await
            .unwrap();
        db.store("document", "third", "x", vec![1.0, 1.0], VectorMetadata::new())
            .await
            .unwrap();

        let results = db
            .search_by_entity_type(&[1.0, 1.0], "document", 10, 0.0)
            .await
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.record.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["second", "third"]);
    }

    #[tokio::test]
    async fn test_search_is_namespace_scoped() {
        let db = seeded().await;
        let results = db
            .search_by_entity_type(&[1.0, 0.0, 0.0], "order", 10, 0.0)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.entity_type, "order");
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let db = seeded().await;
        assert!(db.remove("document", "doc-1").await.unwrap());
        assert!(!db.remove("document", "doc-1").await.unwrap());
        assert!(db.get_by_entity("document", "doc-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_store_is_best_effort() {
        let db = InMemoryVectorDatabase::new();
        let valid = VectorRecord::new("document", "ok", "x", vec![1.0], VectorMetadata::new());
        let invalid = VectorRecord::new("document", "bad", "x", vec![], VectorMetadata::new());

        let outcome = db.batch_store(vec![valid, invalid]).await.unwrap();
        assert_eq!(outcome, BatchOutcome { succeeded: 1, failed: 1 });
        assert!(db.get_by_entity("document", "ok").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_batch_remove_counts_missing_as_failed() {
        let db = seeded().await;
        let outcome = db
            .batch_remove(vec![
                ("document".into(), "doc-1".into()),
                ("document".into(), "ghost".into()),
            ])
            .await
            .unwrap();
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed, 1);
    }

    #[tokio::test]
    async fn test_statistics() {
        let db = seeded().await;
        let stats = db.statistics().await.unwrap();
        assert_eq!(stats.backend, "in-memory");
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.records_by_entity_type.get("document"), Some(&2));
        assert_eq!(stats.records_by_entity_type.get("order"), Some(&1));
    }
}
