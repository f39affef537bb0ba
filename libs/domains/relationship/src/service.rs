//! The reliable query orchestrator.
//!
//! Walks an ordered chain of tier strategies until one produces
//! documents, guaranteeing a tagged response even when planning, the
//! relational executor, or the vector infrastructure is unavailable.
//! Degradation, not fail-fast, is the contract: `execute` never returns
//! an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::cache::QueryCache;
use crate::collaborators::{PrimaryQueryExecutor, QueryPlanner};
use crate::config::RelationshipQueryProperties;
use crate::metadata::MetadataIndex;
use crate::metrics::QueryMetrics;
use crate::models::{ExecutionStage, QueryOptions, RagResponse, RelationshipQueryPlan};
use crate::registry::EntityRegistry;
use crate::tiers::{MetadataTier, PrimaryTier, QueryTier, SimpleTier, TierResult, VectorTier};
use domain_vector::{EmbeddingProvider, VectorDatabase};
use validator::Validate;

/// Multi-tier relationship query service.
pub struct ReliableRelationshipQueryService {
    planner: Arc<dyn QueryPlanner>,
    tiers: Vec<Arc<dyn QueryTier>>,
    cache: Arc<QueryCache>,
    metrics: Arc<QueryMetrics>,
    properties: RelationshipQueryProperties,
}

impl ReliableRelationshipQueryService {
    /// Assemble from an explicit tier chain. Tiers run in the given order.
    pub fn new(
        planner: Arc<dyn QueryPlanner>,
        tiers: Vec<Arc<dyn QueryTier>>,
        cache: Arc<QueryCache>,
        metrics: Arc<QueryMetrics>,
        properties: RelationshipQueryProperties,
    ) -> Self {
        Self {
            planner,
            tiers,
            cache,
            metrics,
            properties,
        }
    }

    /// Assemble the standard four-tier chain, honoring the fallback
    /// toggles in `properties`.
    #[allow(clippy::too_many_arguments)]
    pub fn with_standard_tiers(
        planner: Arc<dyn QueryPlanner>,
        executor: Arc<dyn PrimaryQueryExecutor>,
        metadata_index: Arc<dyn MetadataIndex>,
        vector_database: Arc<dyn VectorDatabase>,
        embeddings: Arc<dyn EmbeddingProvider>,
        registry: Arc<EntityRegistry>,
        properties: RelationshipQueryProperties,
    ) -> Self {
        let cache = Arc::new(if properties.cache_enabled {
            QueryCache::new(properties.cache_ttl, properties.cache_max_entries)
        } else {
            QueryCache::disabled()
        });

        let mut tiers: Vec<Arc<dyn QueryTier>> = vec![Arc::new(PrimaryTier::new(executor))];
        if properties.fallback_to_metadata {
            tiers.push(Arc::new(MetadataTier::new(
                metadata_index,
                properties.clone(),
            )));
        }
        if properties.fallback_to_vector {
            tiers.push(Arc::new(VectorTier::new(
                vector_database,
                embeddings,
                cache.clone(),
                properties.clone(),
            )));
        }
        if properties.fallback_to_simple {
            tiers.push(Arc::new(SimpleTier::new(registry, properties.clone())));
        }

        Self::new(planner, tiers, cache, Arc::new(QueryMetrics::new()), properties)
    }

    pub fn metrics(&self) -> &Arc<QueryMetrics> {
        &self.metrics
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Execute a query through the fallback chain.
    ///
    /// Always returns a response whose metadata reports the producing
    /// stage. Tier exceptions, timeouts, and empty results all advance
    /// the chain; nothing is surfaced to the caller as an error.
    #[instrument(skip(self, options), fields(query = %query))]
    pub async fn execute(
        &self,
        query: &str,
        candidate_entity_types: &[String],
        options: Option<QueryOptions>,
    ) -> RagResponse {
        let options = options.unwrap_or_default();

        let cache_key = QueryCache::response_key(query, candidate_entity_types, &options);
        if let Some(hit) = self.cache.get_response(&cache_key) {
            self.metrics.record_cache_hit();
            debug!("Response served from cache");
            return hit;
        }

        let started = Instant::now();
        let deadline = options.deadline;

        let plan = self
            .safe_plan(query, candidate_entity_types, started, deadline)
            .await;

        let mut deadline_hit = false;
        for tier in &self.tiers {
            let stage = tier.stage();

            if Self::remaining(started, deadline) == Some(Duration::ZERO) {
                warn!(stage = %stage, "Deadline exceeded before tier, short-circuiting");
                deadline_hit = true;
                break;
            }

            if !tier.applies(&plan) {
                debug!(stage = %stage, "Tier does not apply to this plan, skipping");
                continue;
            }

            let budget = self.tier_budget(started, deadline);
            match tokio::time::timeout(budget, tier.attempt(query, &plan, &options)).await {
                Ok(TierResult::Matched(response)) => {
                    self.metrics.record_stage(stage);
                    self.cache.put_response(cache_key, response.clone());
                    info!(
                        stage = %stage,
                        documents = response.documents.len(),
                        "Query answered"
                    );
                    return response;
                }
                Ok(TierResult::Empty) => {
                    debug!(stage = %stage, "Tier found no matches, advancing");
                }
                Ok(TierResult::Failed(reason)) => {
                    warn!(stage = %stage, reason = %reason, "Tier failed, advancing");
                }
                Err(_) => {
                    warn!(
                        stage = %stage,
                        budget_ms = %budget.as_millis(),
                        "Tier timed out, advancing"
                    );
                }
            }
        }

        // Total failure: still a tagged response, never an error
        let note = if deadline_hit {
            "deadline exceeded before any tier produced results"
        } else {
            "all fallback tiers produced no results"
        };
        self.metrics.record_stage(ExecutionStage::FallbackSimple);
        RagResponse::empty(
            query,
            Some(plan.primary_entity_type.clone()),
            ExecutionStage::FallbackSimple,
            note,
        )
    }

    /// Plan the query, synthesizing a filters-only plan when the planner
    /// fails, times out, or returns something degenerate.
    async fn safe_plan(
        &self,
        query: &str,
        candidate_entity_types: &[String],
        started: Instant,
        deadline: Option<Duration>,
    ) -> RelationshipQueryPlan {
        let budget = self.tier_budget(started, deadline);
        match tokio::time::timeout(
            budget,
            self.planner.plan_query(query, candidate_entity_types),
        )
        .await
        {
            Ok(Ok(plan)) => {
                if plan.validate().is_ok() {
                    plan
                } else {
                    warn!("Planner returned a degenerate plan; synthesizing");
                    RelationshipQueryPlan::synthesized(query, candidate_entity_types)
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Planner failed; synthesizing plan");
                RelationshipQueryPlan::synthesized(query, candidate_entity_types)
            }
            Err(_) => {
                warn!(budget_ms = %budget.as_millis(), "Planner timed out; synthesizing plan");
                RelationshipQueryPlan::synthesized(query, candidate_entity_types)
            }
        }
    }

    /// Time left against the caller deadline, `None` when unbounded.
    fn remaining(started: Instant, deadline: Option<Duration>) -> Option<Duration> {
        deadline.map(|total| total.saturating_sub(started.elapsed()))
    }

    /// Budget for the next suspension point: the per-tier timeout, capped
    /// by whatever remains of the caller deadline.
    fn tier_budget(&self, started: Instant, deadline: Option<Duration>) -> Duration {
        match Self::remaining(started, deadline) {
            Some(remaining) => self.properties.tier_timeout.min(remaining),
            None => self.properties.tier_timeout,
        }
    }
}
