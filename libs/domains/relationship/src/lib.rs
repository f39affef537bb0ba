//! Relationship Query Domain
//!
//! Resolves a natural-language query against a graph of relational
//! entities by trying progressively cheaper strategies until one yields
//! results. The caller always receives a response tagged with the stage
//! that produced it.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────┐
//! │ ReliableRelationshipQueryService  │  ← cache, metrics, tier walk
//! └───────┬───────────────────────────┘
//!         │ ordered tier chain
//! ┌───────▼────────┐ ┌───────────────┐ ┌─────────────┐ ┌────────────┐
//! │  PrimaryTier   │ │ MetadataTier  │ │ VectorTier  │ │ SimpleTier │
//! │ (executor)     │ │ (index rows)  │ │ (embeddings)│ │ (registry) │
//! └────────────────┘ └───────────────┘ └─────────────┘ └────────────┘
//! ```
//!
//! Write path: entity mutations enqueue indexing entries; a queue worker
//! runs [`SearchIndexProcessor`] to keep the vector database and the
//! denormalized metadata index populated.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_relationship::{
//!     EntityRegistry, InMemoryMetadataIndex, QueryOptions,
//!     RelationshipQueryProperties, ReliableRelationshipQueryService,
//! };
//! use domain_vector::InMemoryVectorDatabase;
//!
//! # async fn example(
//! #     planner: Arc<dyn domain_relationship::QueryPlanner>,
//! #     executor: Arc<dyn domain_relationship::PrimaryQueryExecutor>,
//! #     embeddings: Arc<dyn domain_vector::EmbeddingProvider>,
//! # ) {
//! let service = ReliableRelationshipQueryService::with_standard_tiers(
//!     planner,
//!     executor,
//!     Arc::new(InMemoryMetadataIndex::new()),
//!     Arc::new(InMemoryVectorDatabase::new()),
//!     embeddings,
//!     Arc::new(EntityRegistry::new()),
//!     RelationshipQueryProperties::from_env(),
//! );
//!
//! let response = service
//!     .execute("overdue invoices for acme", &["invoice".to_string()], None)
//!     .await;
//! # }
//! ```

pub mod cache;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod indexing;
pub mod metadata;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod service;
pub mod tiers;
pub mod traversal;

// Re-export commonly used types
pub use cache::{CacheStats, QueryCache};
pub use collaborators::{PrimaryQueryExecutor, QueryPlanner};
pub use config::RelationshipQueryProperties;
pub use error::{RelationshipError, RelationshipResult};
pub use indexing::{AnalysisHook, IndexPayload, NoopAnalysisHook, SearchIndexProcessor};
pub use metadata::{InMemoryMetadataIndex, MetadataIndex, MetadataRecord, RelatedEntityRef};
pub use metrics::{QueryMetrics, QueryMetricsSnapshot};
pub use models::{
    DocumentMetadata, ExecutionStage, FilterCondition, FilterOperator, QueryOptions, RagDocument,
    RagResponse, RelationshipDirection, RelationshipPath, RelationshipQueryPlan, ReturnMode,
};
pub use registry::{EntityReader, EntityRegistry, EntitySnapshot, PageRequest};
pub use service::ReliableRelationshipQueryService;
pub use tiers::{MetadataTier, PrimaryTier, QueryTier, SimpleTier, TierResult, VectorTier};
pub use traversal::MetadataTraversalService;
