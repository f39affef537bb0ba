use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    self, CreateCollectionBuilder, DeletePointsBuilder, Distance, GetPointsBuilder, PointId,
    PointStruct, PointsIdsList, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::QdrantConfig;
use crate::database::VectorDatabase;
use crate::error::{VectorError, VectorResult};
use crate::models::{
    BatchOutcome, VectorMetadata, VectorRecord, VectorSearchQuery, VectorSearchResult,
    VectorStatistics,
};

/// Qdrant-backed [`VectorDatabase`].
///
/// One collection per entity-type namespace (`<prefix>_<entity_type>`),
/// cosine distance, created lazily on first store with the embedding's
/// dimension. Qdrant's cosine score matches the in-memory backend's
/// clamped similarity, so the two rank identical embeddings identically
/// for the same threshold.
pub struct QdrantVectorDatabase {
    client: Qdrant,
    config: QdrantConfig,
}

impl QdrantVectorDatabase {
    pub async fn new(config: QdrantConfig) -> VectorResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        builder = builder.timeout(Duration::from_secs(config.timeout_secs));

        let client = builder
            .build()
            .map_err(|e| VectorError::Backend(format!("Failed to build client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn from_client(client: Qdrant, config: QdrantConfig) -> Self {
        Self { client, config }
    }

    fn collection_name(&self, entity_type: &str) -> String {
        format!("{}_{}", self.config.collection_prefix, entity_type)
    }

    fn entity_type_of(&self, collection_name: &str) -> Option<String> {
        let prefix = format!("{}_", self.config.collection_prefix);
        collection_name
            .strip_prefix(&prefix)
            .map(|s| s.to_string())
    }

    /// Deterministic point id so an upsert of the same entity replaces
    /// the existing point.
    fn point_id_for(vector_id: &str) -> PointId {
        let uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, vector_id.as_bytes());
        PointId::from(uuid.to_string())
    }

    async fn ensure_collection(&self, name: &str, dimension: usize) -> VectorResult<()> {
        if self.client.collection_exists(name).await? {
            return Ok(());
        }

        let builder = CreateCollectionBuilder::new(name).vectors_config(VectorParamsBuilder::new(
            dimension as u64,
            Distance::Cosine,
        ));
        self.client.create_collection(builder).await?;
        debug!(collection = %name, dimension = dimension, "Created collection");
        Ok(())
    }

    fn record_to_payload(record: &VectorRecord) -> HashMap<String, QdrantValue> {
        let mut payload = HashMap::new();
        payload.insert("vector_id".to_string(), QdrantValue::from(record.vector_id.clone()));
        payload.insert("entity_type".to_string(), QdrantValue::from(record.entity_type.clone()));
        payload.insert("entity_id".to_string(), QdrantValue::from(record.entity_id.clone()));
        payload.insert("content".to_string(), QdrantValue::from(record.content.clone()));
        payload.insert(
            "metadata".to_string(),
            QdrantValue::from(serde_json::Value::Object(record.metadata.clone()).to_string()),
        );
        payload.insert("created_at".to_string(), QdrantValue::from(record.created_at.to_rfc3339()));
        payload.insert("updated_at".to_string(), QdrantValue::from(record.updated_at.to_rfc3339()));
        payload.insert("active".to_string(), QdrantValue::from(record.active));
        payload.insert("version".to_string(), QdrantValue::from(record.version as i64));
        payload
    }

    fn payload_to_record(
        payload: &HashMap<String, QdrantValue>,
        embedding: Vec<f32>,
    ) -> VectorResult<VectorRecord> {
        let string_field = |key: &str| -> VectorResult<String> {
            payload
                .get(key)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .ok_or_else(|| VectorError::Internal(format!("Missing payload field: {}", key)))
        };

        let metadata: VectorMetadata = payload
            .get("metadata")
            .and_then(|v| v.as_str())
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();

        let timestamp = |key: &str| -> DateTime<Utc> {
            payload
                .get(key)
                .and_then(|v| v.as_str())
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now)
        };

        Ok(VectorRecord {
            vector_id: string_field("vector_id")?,
            entity_type: string_field("entity_type")?,
            entity_id: string_field("entity_id")?,
            content: string_field("content")?,
            embedding,
            metadata,
            created_at: timestamp("created_at"),
            updated_at: timestamp("updated_at"),
            active: payload
                .get("active")
                .and_then(|v| v.as_bool())
                .unwrap_or(true),
            version: payload
                .get("version")
                .and_then(|v| v.as_integer())
                .unwrap_or(1) as u64,
        })
    }

    fn extract_vector(vectors: Option<qdrant::VectorsOutput>) -> Vec<f32> {
        use qdrant::vectors_output::VectorsOptions;
        match vectors.and_then(|v| v.vectors_options) {
            Some(VectorsOptions::Vector(v)) => v.data,
            _ => Vec::new(),
        }
    }

    async fn fetch_record(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> VectorResult<Option<VectorRecord>> {
        let collection = self.collection_name(entity_type);
        if !self.client.collection_exists(&collection).await? {
            return Ok(None);
        }

        let vector_id = VectorRecord::vector_id_for(entity_type, entity_id);
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&collection, vec![Self::point_id_for(&vector_id)])
                    .with_payload(true)
                    .with_vectors(true),
            )
            .await?;

        let Some(point) = response.result.into_iter().next() else {
            return Ok(None);
        };

        let embedding = Self::extract_vector(point.vectors);
        Self::payload_to_record(&point.payload, embedding).map(Some)
    }

    async fn search_collection(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> VectorResult<Vec<VectorSearchResult>> {
        if !self.client.collection_exists(collection).await? {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, query_embedding.to_vec(), limit as u64)
                    .with_payload(true)
                    .with_vectors(true)
                    .score_threshold(threshold),
            )
            .await?;

        let mut results = Vec::with_capacity(response.result.len());
        for point in response.result {
            let embedding = Self::extract_vector(point.vectors);
            match Self::payload_to_record(&point.payload, embedding) {
                Ok(record) => {
                    let similarity = point.score.clamp(0.0, 1.0);
                    if similarity >= threshold {
                        results.push(VectorSearchResult::new(record, similarity));
                    }
                }
                Err(e) => warn!(collection = %collection, error = %e, "Skipping malformed point"),
            }
        }
        Ok(results)
    }

    async fn namespace_collections(&self) -> VectorResult<Vec<String>> {
        let prefix = format!("{}_", self.config.collection_prefix);
        let collections = self.client.list_collections().await?;
        Ok(collections
            .collections
            .into_iter()
            .map(|c| c.name)
            .filter(|name| name.starts_with(&prefix))
            .collect())
    }
}

#[async_trait]
impl VectorDatabase for QdrantVectorDatabase {
    async fn store(
        &self,
        entity_type: &str,
        entity_id: &str,
        content: &str,
        embedding: Vec<f32>,
        metadata: VectorMetadata,
    ) -> VectorResult<String> {
        if embedding.is_empty() {
            return Err(VectorError::Validation(
                "embedding must be non-empty".to_string(),
            ));
        }

        let collection = self.collection_name(entity_type);
        self.ensure_collection(&collection, embedding.len()).await?;

        // Carry forward version and created_at on re-store
        let existing = self.fetch_record(entity_type, entity_id).await?;
        let mut record = VectorRecord::new(entity_type, entity_id, content, embedding, metadata);
        if let Some(previous) = existing {
            record.version = previous.version + 1;
            record.created_at = previous.created_at;
        }

        let point = PointStruct::new(
            Self::point_id_for(&record.vector_id),
            record.embedding.clone(),
            Self::record_to_payload(&record),
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(&collection, vec![point]).wait(true))
            .await?;

        debug!(vector_id = %record.vector_id, collection = %collection, "Stored vector");
        Ok(record.vector_id)
    }

    async fn get(&self, vector_id: &str) -> VectorResult<Option<VectorRecord>> {
        // The namespace is embedded in the id
        let Some((entity_type, entity_id)) = vector_id.split_once("::") else {
            return Ok(None);
        };
        self.fetch_record(entity_type, entity_id).await
    }

    async fn get_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> VectorResult<Option<VectorRecord>> {
        self.fetch_record(entity_type, entity_id).await
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

        let mut results = match &query.entity_type {
            Some(entity_type) => {
                let collection = self.collection_name(entity_type);
                self.search_collection(&collection, query_embedding, query.limit, query.threshold)
                    .await?
            }
            None => {
                let mut merged = Vec::new();
                for collection in self.namespace_collections().await? {
                    merged.extend(
                        self.search_collection(
                            &collection,
                            query_embedding,
                            query.limit,
                            query.threshold,
                        )
                        .await?,
                    );
                }
                merged
            }
        };

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(query.limit);
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
        let collection = self.collection_name(entity_type);
        if !self.client.collection_exists(&collection).await? {
            return Ok(false);
        }

        let existing = self.fetch_record(entity_type, entity_id).await?;
        if existing.is_none() {
            return Ok(false);
        }

        let vector_id = VectorRecord::vector_id_for(entity_type, entity_id);
        self.client
            .delete_points(
                DeletePointsBuilder::new(&collection)
                    .points(PointsIdsList {
                        ids: vec![Self::point_id_for(&vector_id)],
                    })
                    .wait(true),
            )
            .await?;

        debug!(vector_id = %vector_id, "Removed vector");
        Ok(true)
    }

    async fn remove_by_id(&self, vector_id: &str) -> VectorResult<bool> {
        let Some((entity_type, entity_id)) = vector_id.split_once("::") else {
            return Ok(false);
        };
        self.remove(entity_type, entity_id).await
    }

    async fn batch_store(&self, records: Vec<VectorRecord>) -> VectorResult<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        for record in records {
            match self
                .store(
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
                    warn!(entity_id = %record.entity_id, error = %e, "Batch store failed for record");
                    outcome.record_failure();
                }
            }
        }
        Ok(outcome)
    }

    async fn batch_update(&self, records: Vec<VectorRecord>) -> VectorResult<BatchOutcome> {
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
        let mut by_type = HashMap::new();
        let mut total = 0usize;

        for collection in self.namespace_collections().await? {
            let info = self.client.collection_info(&collection).await?;
            let count = info
                .result
                .and_then(|r| r.points_count)
                .unwrap_or(0) as usize;
            total += count;
            if let Some(entity_type) = self.entity_type_of(&collection) {
                by_type.insert(entity_type, count);
            }
        }

        Ok(VectorStatistics {
            backend: "qdrant".to_string(),
            total_records: total,
            records_by_entity_type: by_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_naming() {
        let config = QdrantConfig::default().with_collection_prefix("vectors");
        // Naming helpers don't need a live client
        let prefix = format!("{}_", config.collection_prefix);
        assert_eq!(format!("{}document", prefix), "vectors_document");
    }

    #[test]
    fn test_point_id_is_deterministic() {
        let a = QdrantVectorDatabase::point_id_for("document::doc-1");
        let b = QdrantVectorDatabase::point_id_for("document::doc-1");
        let c = QdrantVectorDatabase::point_id_for("document::doc-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_payload_round_trip() {
        let mut metadata = VectorMetadata::new();
        metadata.insert("status".into(), serde_json::json!("published"));
        metadata.insert("pages".into(), serde_json::json!(12));

        let record = VectorRecord::new("document", "doc-1", "hello", vec![0.1, 0.2], metadata);
        let payload = QdrantVectorDatabase::record_to_payload(&record);
        let restored =
            QdrantVectorDatabase::payload_to_record(&payload, record.embedding.clone()).unwrap();

        assert_eq!(restored.vector_id, record.vector_id);
        assert_eq!(restored.entity_type, record.entity_type);
        assert_eq!(restored.entity_id, record.entity_id);
        assert_eq!(restored.content, record.content);
        assert_eq!(restored.metadata, record.metadata);
        assert_eq!(restored.version, record.version);
        assert_eq!(restored.embedding, record.embedding);
        assert!(restored.active);
    }
}
