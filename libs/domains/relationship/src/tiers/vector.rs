use std::sync::Arc;

use async_trait::async_trait;
use domain_vector::{EmbeddingProvider, VectorDatabase};
use tracing::{debug, warn};

use super::{QueryTier, TierResult};
use crate::cache::QueryCache;
use crate::config::RelationshipQueryProperties;
use crate::models::{
    ExecutionStage, QueryOptions, RagDocument, RagResponse, RelationshipQueryPlan,
};

/// Tier 3: semantic search against the vector database.
///
/// Entered only when the plan asks for semantic search or carries no
/// direct filters at all.
pub struct VectorTier {
    database: Arc<dyn VectorDatabase>,
    embeddings: Arc<dyn EmbeddingProvider>,
    cache: Arc<QueryCache>,
    properties: RelationshipQueryProperties,
}

impl VectorTier {
    pub fn new(
        database: Arc<dyn VectorDatabase>,
        embeddings: Arc<dyn EmbeddingProvider>,
        cache: Arc<QueryCache>,
        properties: RelationshipQueryProperties,
    ) -> Self {
        Self {
            database,
            embeddings,
            cache,
            properties,
        }
    }

    async fn query_embedding(&self, text: &str) -> Result<Vec<f32>, String> {
        let key = QueryCache::hash(text);
        if let Some(cached) = self.cache.get_embedding(&key) {
            debug!("Query embedding served from cache");
            return Ok(cached);
        }

        let embedding = self
            .embeddings
            .embed(text)
            .await
            .map_err(|e| e.to_string())?;
        self.cache.put_embedding(key, embedding.clone());
        Ok(embedding)
    }
}

#[async_trait]
impl QueryTier for VectorTier {
    fn stage(&self) -> ExecutionStage {
        ExecutionStage::FallbackVector
    }

    fn applies(&self, plan: &RelationshipQueryPlan) -> bool {
        plan.needs_semantic_search || !plan.has_direct_filters()
    }

    async fn attempt(
        &self,
        query: &str,
        plan: &RelationshipQueryPlan,
        options: &QueryOptions,
    ) -> TierResult {
        let embedding = match self.query_embedding(plan.semantic_text()).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "Embedding generation failed in vector fallback");
                return TierResult::Failed(e);
            }
        };

        let limit = options
            .limit
            .or(plan.limit)
            .unwrap_or(self.properties.vector_limit);
        let threshold = options
            .similarity_threshold
            .unwrap_or(self.properties.similarity_threshold);

        let matches = match self
            .database
            .search_by_entity_type(&embedding, &plan.primary_entity_type, limit, threshold)
            .await
        {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, "Vector fallback search failed");
                return TierResult::Failed(e.to_string());
            }
        };

        if matches.is_empty() {
            return TierResult::Empty;
        }

        let mut documents: Vec<RagDocument> = matches
            .into_iter()
            .map(|result| {
                let mut metadata = result.record.metadata.clone();
                metadata.insert(
                    "similarity".to_string(),
                    serde_json::json!(result.similarity),
                );
                metadata.insert("source".to_string(), serde_json::json!("vector-fallback"));
                RagDocument::new(result.record.entity_id)
                    .with_content(result.record.content)
                    .with_metadata(metadata)
            })
            .collect();

        // The backend already ranks, but the contract is ours to keep
        documents.sort_by(|a, b| {
            b.similarity()
                .unwrap_or(0.0)
                .partial_cmp(&a.similarity().unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        TierResult::Matched(RagResponse::tagged(
            query,
            Some(plan.primary_entity_type.clone()),
            documents,
            ExecutionStage::FallbackVector,
        ))
    }
}
