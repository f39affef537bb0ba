//! Prometheus metrics for queue workers.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::info;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus recorder.
///
/// Call once at startup. Subsequent calls are no-ops.
pub fn init_metrics() {
    let _ = PROMETHEUS_HANDLE.get_or_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("Failed to install Prometheus recorder");
        info!("Prometheus metrics initialized");
        handle
    });
}

/// Render metrics in Prometheus exposition format.
pub fn render_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_default()
}

/// Queue worker metrics helper.
#[derive(Clone)]
pub struct QueueMetrics {
    node_id: String,
}

impl QueueMetrics {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
        }
    }

    pub fn entry_claimed(&self) {
        counter!(
            "indexing_queue_entries_claimed_total",
            "node" => self.node_id.clone()
        )
        .increment(1);
    }

    pub fn entry_completed(&self, duration: Duration) {
        counter!(
            "indexing_queue_entries_processed_total",
            "node" => self.node_id.clone(),
            "status" => "completed"
        )
        .increment(1);

        histogram!(
            "indexing_queue_entry_duration_seconds",
            "node" => self.node_id.clone()
        )
        .record(duration.as_secs_f64());
    }

    pub fn entry_retried(&self) {
        counter!(
            "indexing_queue_entries_retried_total",
            "node" => self.node_id.clone()
        )
        .increment(1);
    }

    pub fn entry_dead_lettered(&self) {
        counter!(
            "indexing_queue_entries_dead_lettered_total",
            "node" => self.node_id.clone()
        )
        .increment(1);
    }

    pub fn claim_conflict(&self) {
        counter!(
            "indexing_queue_claim_conflicts_total",
            "node" => self.node_id.clone()
        )
        .increment(1);
    }

    pub fn pending_depth(&self, depth: usize) {
        gauge!("indexing_queue_pending_depth").set(depth as f64);
    }
}
