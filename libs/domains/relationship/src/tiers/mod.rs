//! Fallback tier strategy objects.
//!
//! Each tier implements the same `attempt` contract and the orchestrator
//! walks an ordered list until one produces documents. `Empty` and
//! `Failed` both advance the chain: "backend unavailable" and "no data"
//! are deliberately treated the same, but stay distinguishable for
//! logging and metrics.

mod metadata;
mod primary;
mod simple;
mod vector;

pub use metadata::MetadataTier;
pub use primary::PrimaryTier;
pub use simple::SimpleTier;
pub use vector::VectorTier;

use async_trait::async_trait;

use crate::models::{ExecutionStage, QueryOptions, RagResponse, RelationshipQueryPlan};

/// Outcome of one tier attempt.
#[derive(Debug)]
pub enum TierResult {
    /// The tier produced at least one document; the response is tagged
    /// with the tier's stage.
    Matched(RagResponse),
    /// The tier ran cleanly but found nothing.
    Empty,
    /// The tier failed (exception, unavailable backend).
    Failed(String),
}

/// One strategy in the fallback chain.
#[async_trait]
pub trait QueryTier: Send + Sync {
    /// The stage this tier reports on produced responses.
    fn stage(&self) -> ExecutionStage;

    /// Whether the tier should run for this plan at all. Skipped tiers
    /// don't count as failures.
    fn applies(&self, plan: &RelationshipQueryPlan) -> bool {
        let _ = plan;
        true
    }

    /// Try to answer the query. Must not panic; failures are returned as
    /// [`TierResult::Failed`].
    async fn attempt(
        &self,
        query: &str,
        plan: &RelationshipQueryPlan,
        options: &QueryOptions,
    ) -> TierResult;
}
