use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{QueryTier, TierResult};
use crate::collaborators::PrimaryQueryExecutor;
use crate::models::{ExecutionStage, QueryOptions, RagResponse, RelationshipQueryPlan};

/// Tier 1: the primary relational executor.
pub struct PrimaryTier {
    executor: Arc<dyn PrimaryQueryExecutor>,
}

impl PrimaryTier {
    pub fn new(executor: Arc<dyn PrimaryQueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl QueryTier for PrimaryTier {
    fn stage(&self) -> ExecutionStage {
        ExecutionStage::Primary
    }

    async fn attempt(
        &self,
        query: &str,
        plan: &RelationshipQueryPlan,
        options: &QueryOptions,
    ) -> TierResult {
        match self
            .executor
            .execute_relationship_query(query, &plan.candidate_entity_types, options)
            .await
        {
            Ok(response) if response.has_documents() => {
                // Re-tag so the stage is authoritative regardless of what
                // the executor put in the metadata
                let tagged = RagResponse::tagged(
                    query,
                    response
                        .entity_type
                        .clone()
                        .or_else(|| Some(plan.primary_entity_type.clone())),
                    response.documents,
                    ExecutionStage::Primary,
                );
                TierResult::Matched(tagged)
            }
            Ok(_) => TierResult::Empty,
            Err(e) => {
                warn!(error = %e, "Primary relationship query failed, attempting fallback chain");
                TierResult::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MockPrimaryQueryExecutor;
    use crate::error::RelationshipError;
    use crate::models::RagDocument;

    fn plan() -> RelationshipQueryPlan {
        RelationshipQueryPlan::new("find docs", "document")
    }

    #[tokio::test]
    async fn test_non_empty_result_is_matched_and_tagged() {
        let mut executor = MockPrimaryQueryExecutor::new();
        executor
            .expect_execute_relationship_query()
            .returning(|query, _, _| {
                Ok(RagResponse::tagged(
                    query,
                    Some("document".to_string()),
                    vec![RagDocument::new("doc-1")],
                    ExecutionStage::Primary,
                ))
            });

        let tier = PrimaryTier::new(Arc::new(executor));
        let result = tier
            .attempt("find docs", &plan(), &QueryOptions::defaults())
            .await;

        match result {
            TierResult::Matched(response) => {
                assert_eq!(response.execution_stage(), Some(ExecutionStage::Primary));
                assert_eq!(response.documents[0].id, "doc-1");
            }
            other => panic!("expected Matched, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_result_falls_through() {
        let mut executor = MockPrimaryQueryExecutor::new();
        executor
            .expect_execute_relationship_query()
            .returning(|query, _, _| {
                Ok(RagResponse::tagged(
                    query,
                    None,
                    Vec::new(),
                    ExecutionStage::Primary,
                ))
            });

        let tier = PrimaryTier::new(Arc::new(executor));
        let result = tier
            .attempt("find docs", &plan(), &QueryOptions::defaults())
            .await;
        assert!(matches!(result, TierResult::Empty));
    }

    #[tokio::test]
    async fn test_executor_error_falls_through() {
        let mut executor = MockPrimaryQueryExecutor::new();
        executor
            .expect_execute_relationship_query()
            .returning(|_, _, _| Err(RelationshipError::Primary("connection refused".into())));

        let tier = PrimaryTier::new(Arc::new(executor));
        let result = tier
            .attempt("find docs", &plan(), &QueryOptions::defaults())
            .await;
        assert!(matches!(result, TierResult::Failed(_)));
    }
}
