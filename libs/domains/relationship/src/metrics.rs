//! Stage counters for the fallback chain.
//!
//! Every tier transition increments a stage-specific counter, both as an
//! in-process atomic (cheap to snapshot in health endpoints and tests)
//! and as a Prometheus counter.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;

use crate::models::ExecutionStage;

/// Point-in-time view of the stage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryMetricsSnapshot {
    pub primary_success_count: u64,
    pub fallback_metadata_count: u64,
    pub fallback_vector_count: u64,
    pub fallback_simple_count: u64,
    pub cache_hit_count: u64,
}

/// Concurrent stage metrics registry.
#[derive(Default)]
pub struct QueryMetrics {
    primary_success: AtomicU64,
    fallback_metadata: AtomicU64,
    fallback_vector: AtomicU64,
    fallback_simple: AtomicU64,
    cache_hits: AtomicU64,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_stage(&self, stage: ExecutionStage) {
        let slot = match stage {
            ExecutionStage::Primary => &self.primary_success,
            ExecutionStage::FallbackMetadata => &self.fallback_metadata,
            ExecutionStage::FallbackVector => &self.fallback_vector,
            ExecutionStage::FallbackSimple => &self.fallback_simple,
        };
        slot.fetch_add(1, Ordering::Relaxed);

        counter!(
            "relationship_query_stage_total",
            "stage" => stage.to_string()
        )
        .increment(1);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        counter!("relationship_query_cache_hits_total").increment(1);
    }

    pub fn snapshot(&self) -> QueryMetricsSnapshot {
        QueryMetricsSnapshot {
            primary_success_count: self.primary_success.load(Ordering::Relaxed),
            fallback_metadata_count: self.fallback_metadata.load(Ordering::Relaxed),
            fallback_vector_count: self.fallback_vector.load(Ordering::Relaxed),
            fallback_simple_count: self.fallback_simple.load(Ordering::Relaxed),
            cache_hit_count: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}
