//! Indexing Queue Framework
//!
//! A durable, crash-safe task queue that keeps search infrastructure
//! populated asynchronously after entity writes.
//!
//! ## Features
//!
//! - **Leased claims**: workers claim entries via a compare-and-swap on
//!   (status, version); expired leases make entries re-claimable
//! - **Priority scheduling**: weight-ordered dequeue with FIFO within a band
//! - **Retry backoff**: capped exponential rescheduling of transient failures
//! - **Dead letter state**: permanent failures and exhausted retries park the
//!   entry without touching its neighbors
//! - **Prometheus metrics**: built-in observability
//!
//! ## Example
//!
//! ```ignore
//! use indexing_queue::{
//!     ActionPlan, EnqueueRequest, EntryProcessor, InMemoryQueueStore,
//!     Operation, QueueWorker, WorkerConfig,
//! };
//!
//! let store = Arc::new(InMemoryQueueStore::new());
//!
//! // Producer side: enqueue after an entity write
//! store.enqueue(EnqueueRequest::new(
//!     "document", "doc-1", Operation::Create,
//!     ActionPlan::for_write(), payload_json,
//! )).await?;
//!
//! // Consumer side: run a worker with a domain processor
//! let worker = QueueWorker::new(store, processor, WorkerConfig::new());
//! worker.run(shutdown_rx).await?;
//! ```

mod config;
mod entry;
mod error;
mod memory;
pub mod metrics;
mod store;
mod worker;

// Re-export main types
pub use config::WorkerConfig;
pub use entry::{
    ActionPlan, DispatchStrategy, EnqueueRequest, EntryStatus, Operation, Priority, QueueEntry,
};
pub use error::{ErrorCategory, QueueError, QueueResult};
pub use memory::InMemoryQueueStore;
pub use metrics::{init_metrics, QueueMetrics};
pub use store::QueueStore;
pub use worker::{EntryProcessor, QueueWorker};
