//! Seams to external collaborators.
//!
//! Plan translation and the primary relational executor are implemented
//! elsewhere (an LLM call and a relational query engine respectively);
//! the orchestrator only depends on these traits.

use async_trait::async_trait;

use crate::error::RelationshipResult;
use crate::models::{QueryOptions, RagResponse, RelationshipQueryPlan};

/// Natural-language-to-plan translation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryPlanner: Send + Sync {
    async fn plan_query(
        &self,
        query: &str,
        candidate_entity_types: &[String],
    ) -> RelationshipResult<RelationshipQueryPlan>;
}

/// The primary relational query executor (tier 1). May fail; the
/// orchestrator treats failures as a fall-through.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrimaryQueryExecutor: Send + Sync {
    async fn execute_relationship_query(
        &self,
        query: &str,
        candidate_entity_types: &[String],
        options: &QueryOptions,
    ) -> RelationshipResult<RagResponse>;
}
