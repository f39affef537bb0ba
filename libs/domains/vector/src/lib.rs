//! Vector Domain Library
//!
//! Storage and cosine-similarity search for content embeddings, with
//! pluggable, behaviorally interchangeable backends.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌───────────────────┐
//! │  VectorDatabase  │     │ EmbeddingProvider │
//! │     (trait)      │     │      (trait)      │
//! └────────┬─────────┘     └─────────┬─────────┘
//!          │                         │
//! ┌────────▼──────────────┐ ┌────────▼────────────┐
//! │ InMemoryVectorDatabase│ │ RestEmbeddingProvider│
//! │ QdrantVectorDatabase  │ │ (OpenAI-compatible) │
//! └───────────────────────┘ └─────────────────────┘
//! ```
//!
//! Every backend partitions vectors by entity type; a vector id is only
//! unique within its namespace. Given the same records and threshold,
//! all backends rank identical embeddings identically, which is what
//! allows swapping one for another without changing callers.
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_vector::{InMemoryVectorDatabase, VectorDatabase, VectorMetadata};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = InMemoryVectorDatabase::new();
//!
//! let vector_id = db
//!     .store("document", "doc-1", "hello world", vec![0.1; 384], VectorMetadata::new())
//!     .await?;
//!
//! let results = db
//!     .search_by_entity_type(&[0.1; 384], "document", 10, 0.5)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod models;
pub mod qdrant;
pub mod similarity;

// Re-export commonly used types
pub use database::VectorDatabase;
pub use embedding::{EmbeddingProvider, RestEmbeddingConfig, RestEmbeddingProvider};
pub use error::{VectorError, VectorResult};
pub use memory::InMemoryVectorDatabase;
pub use models::{
    BatchOutcome, VectorMetadata, VectorRecord, VectorSearchQuery, VectorSearchResult,
    VectorStatistics,
};
pub use qdrant::{QdrantConfig, QdrantVectorDatabase};
pub use similarity::cosine_similarity;
