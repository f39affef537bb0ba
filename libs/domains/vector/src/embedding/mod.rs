mod provider;
mod rest;

pub use provider::EmbeddingProvider;
pub use rest::{RestEmbeddingConfig, RestEmbeddingProvider};
