use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{QueryTier, TierResult};
use crate::config::RelationshipQueryProperties;
use crate::metadata::MetadataIndex;
use crate::models::{
    ExecutionStage, QueryOptions, RagDocument, RagResponse, RelationshipQueryPlan, ReturnMode,
};
use crate::traversal::MetadataTraversalService;

/// Tier 2: filter evaluation against the denormalized metadata index.
pub struct MetadataTier {
    traversal: MetadataTraversalService,
    index: Arc<dyn MetadataIndex>,
    properties: RelationshipQueryProperties,
}

impl MetadataTier {
    pub fn new(index: Arc<dyn MetadataIndex>, properties: RelationshipQueryProperties) -> Self {
        Self {
            traversal: MetadataTraversalService::new(index.clone()),
            index,
            properties,
        }
    }

    fn effective_limit(&self, plan: &RelationshipQueryPlan, options: &QueryOptions) -> usize {
        options
            .limit
            .or(plan.limit)
            .unwrap_or(self.properties.default_limit)
    }
}

#[async_trait]
impl QueryTier for MetadataTier {
    fn stage(&self) -> ExecutionStage {
        ExecutionStage::FallbackMetadata
    }

    async fn attempt(
        &self,
        query: &str,
        plan: &RelationshipQueryPlan,
        options: &QueryOptions,
    ) -> TierResult {
        let limit = self.effective_limit(plan, options);
        let entity_ids = match self.traversal.traverse(plan, limit).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Metadata fallback traversal failed");
                return TierResult::Failed(e.to_string());
            }
        };

        if entity_ids.is_empty() {
            return TierResult::Empty;
        }

        let return_mode = options.return_mode.unwrap_or(plan.return_mode);
        let mut documents = Vec::with_capacity(entity_ids.len());
        for entity_id in entity_ids {
            if return_mode == ReturnMode::Ids {
                documents.push(
                    RagDocument::new(entity_id)
                        .with_metadata_entry("source", serde_json::json!("fallback_metadata")),
                );
                continue;
            }

            // Content comes from the index row itself; no relational read
            match self.index.get(&plan.primary_entity_type, &entity_id).await {
                Ok(Some(record)) => {
                    documents.push(
                        RagDocument::new(entity_id)
                            .with_content(record.content)
                            .with_metadata_entry("source", serde_json::json!("fallback_metadata")),
                    );
                }
                Ok(None) => {
                    documents.push(
                        RagDocument::new(entity_id)
                            .with_metadata_entry("source", serde_json::json!("fallback_metadata")),
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Metadata row read failed mid-build");
                    return TierResult::Failed(e.to_string());
                }
            }
        }

        TierResult::Matched(RagResponse::tagged(
            query,
            Some(plan.primary_entity_type.clone()),
            documents,
            ExecutionStage::FallbackMetadata,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{InMemoryMetadataIndex, MetadataRecord};
    use crate::models::{FilterCondition, FilterOperator};
    use serde_json::json;

    async fn tier_with_rows() -> MetadataTier {
        let index = Arc::new(InMemoryMetadataIndex::new());
        index
            .upsert(
                MetadataRecord::new("document", "doc-1", "published content")
                    .with_metadata_entry("status", json!("published")),
            )
            .await
            .unwrap();
        index
            .upsert(
                MetadataRecord::new("document", "doc-2", "draft content")
                    .with_metadata_entry("status", json!("draft")),
            )
            .await
            .unwrap();
        MetadataTier::new(index, RelationshipQueryProperties::default())
    }

    #[tokio::test]
    async fn test_matching_rows_become_documents_with_content() {
        let tier = tier_with_rows().await;
        let plan = RelationshipQueryPlan::new("q", "document").with_direct_filter(
            "document",
            FilterCondition::new("status", FilterOperator::Equals, json!("published")),
        );

        let result = tier.attempt("q", &plan, &QueryOptions::defaults()).await;
        match result {
            TierResult::Matched(response) => {
                assert_eq!(
                    response.execution_stage(),
                    Some(ExecutionStage::FallbackMetadata)
                );
                assert_eq!(response.documents.len(), 1);
                assert_eq!(response.documents[0].id, "doc-1");
                assert_eq!(
                    response.documents[0].content.as_deref(),
                    Some("published content")
                );
            }
            other => panic!("expected Matched, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_matching_rows_is_empty() {
        let tier = tier_with_rows().await;
        let plan = RelationshipQueryPlan::new("q", "document").with_direct_filter(
            "document",
            FilterCondition::new("status", FilterOperator::Equals, json!("archived")),
        );

        let result = tier.attempt("q", &plan, &QueryOptions::defaults()).await;
        assert!(matches!(result, TierResult::Empty));
    }

    #[tokio::test]
    async fn test_ids_return_mode_skips_content_lookup() {
        let tier = tier_with_rows().await;
        let plan = RelationshipQueryPlan::new("q", "document");
        let options = QueryOptions::defaults().with_return_mode(ReturnMode::Ids);

        let result = tier.attempt("q", &plan, &options).await;
        match result {
            TierResult::Matched(response) => {
                assert_eq!(response.documents.len(), 2);
                assert!(response.documents.iter().all(|d| d.content.is_none()));
            }
            other => panic!("expected Matched, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_options_limit_caps_results() {
        let tier = tier_with_rows().await;
        let plan = RelationshipQueryPlan::new("q", "document");
        let options = QueryOptions::defaults().with_limit(1);

        let result = tier.attempt("q", &plan, &options).await;
        match result {
            TierResult::Matched(response) => assert_eq!(response.documents.len(), 1),
            other => panic!("expected Matched, got {:?}", other),
        }
    }
}
