//! Denormalized metadata index.
//!
//! One row per entity with its searchable content, flattened metadata,
//! and relationship back-references. The metadata fallback tier evaluates
//! filters against these rows without relational joins; the indexing
//! queue's worker keeps them current after entity writes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::RelationshipResult;

/// Back-reference to a related entity, stored denormalized on the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntityRef {
    pub relationship_type: String,
    pub to_type: String,
    pub to_id: String,
}

impl RelatedEntityRef {
    pub fn new(
        relationship_type: impl Into<String>,
        to_type: impl Into<String>,
        to_id: impl Into<String>,
    ) -> Self {
        Self {
            relationship_type: relationship_type.into(),
            to_type: to_type.into(),
            to_id: to_id.into(),
        }
    }
}

/// A denormalized index row for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub entity_type: String,
    pub entity_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub related: Vec<RelatedEntityRef>,
    pub updated_at: DateTime<Utc>,
}

impl MetadataRecord {
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            content: content.into(),
            metadata: serde_json::Map::new(),
            related: Vec::new(),
            updated_at: Utc::now(),
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
}

/// Storage contract for the denormalized index.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataIndex: Send + Sync {
    /// Insert or replace the row for (entity_type, entity_id).
    async fn upsert(&self, record: MetadataRecord) -> RelationshipResult<()>;

    /// Delete a row. Idempotent: absent rows yield `Ok(false)`.
    async fn delete(&self, entity_type: &str, entity_id: &str) -> RelationshipResult<bool>;

    /// Fetch a single row.
    async fn get(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> RelationshipResult<Option<MetadataRecord>>;

    /// All rows of one entity type, in insertion order.
    async fn find_by_entity_type(
        &self,
        entity_type: &str,
    ) -> RelationshipResult<Vec<MetadataRecord>>;
}

#[derive(Default)]
struct IndexInner {
    records: HashMap<String, MetadataRecord>,
    /// Insertion order of keys, for deterministic listings
    order: Vec<String>,
}

/// In-memory [`MetadataIndex`] implementation.
#[derive(Default)]
pub struct InMemoryMetadataIndex {
    inner: RwLock<IndexInner>,
}

impl InMemoryMetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(entity_type: &str, entity_id: &str) -> String {
        format!("{}::{}", entity_type, entity_id)
    }
}

#[async_trait]
impl MetadataIndex for InMemoryMetadataIndex {
    async fn upsert(&self, record: MetadataRecord) -> RelationshipResult<()> {
        let key = Self::key(&record.entity_type, &record.entity_id);
        let mut inner = self.inner.write().await;
        if !inner.records.contains_key(&key) {
            inner.order.push(key.clone());
        }
        inner.records.insert(key, record);
        Ok(())
    }

    async fn delete(&self, entity_type: &str, entity_id: &str) -> RelationshipResult<bool> {
        let key = Self::key(entity_type, entity_id);
        let mut inner = self.inner.write().await;
        let removed = inner.records.remove(&key).is_some();
        if removed {
            inner.order.retain(|k| k != &key);
        }
        Ok(removed)
    }

    async fn get(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> RelationshipResult<Option<MetadataRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.records.get(&Self::key(entity_type, entity_id)).cloned())
    }

    async fn find_by_entity_type(
        &self,
        entity_type: &str,
    ) -> RelationshipResult<Vec<MetadataRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|key| inner.records.get(key))
            .filter(|record| record.entity_type == entity_type)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_then_get() {
        let index = InMemoryMetadataIndex::new();
        index
            .upsert(
                MetadataRecord::new("document", "doc-1", "hello")
                    .with_metadata_entry("status", serde_json::json!("published")),
            )
            .await
            .unwrap();

        let record = index.get("document", "doc-1").await.unwrap().unwrap();
        assert_eq!(record.content, "hello");
        assert_eq!(record.metadata.get("status"), Some(&serde_json::json!("published")));
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_row() {
        let index = InMemoryMetadataIndex::new();
        index
            .upsert(MetadataRecord::new("document", "doc-1", "v1"))
            .await
            .unwrap();
        index
            .upsert(MetadataRecord::new("document", "doc-1", "v2"))
            .await
            .unwrap();

        let rows = index.find_by_entity_type("document").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content, "v2");
    }

    #[tokio::test]
    async fn test_find_preserves_insertion_order_per_type() {
        let index = InMemoryMetadataIndex::new();
        index
            .upsert(MetadataRecord::new("document", "a", "a"))
            .await
            .unwrap();
        index
            .upsert(MetadataRecord::new("order", "x", "x"))
            .await
            .unwrap();
        index
            .upsert(MetadataRecord::new("document", "b", "b"))
            .await
            .unwrap();

        let docs = index.find_by_entity_type("document").await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let index = InMemoryMetadataIndex::new();
        index
            .upsert(MetadataRecord::new("document", "doc-1", "x"))
            .await
            .unwrap();

        assert!(index.delete("document", "doc-1").await.unwrap());
        assert!(!index.delete("document", "doc-1").await.unwrap());
        assert!(index.get("document", "doc-1").await.unwrap().is_none());
    }
}
