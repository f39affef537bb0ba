//! Relationship query configuration.

use std::time::Duration;

use core_config::env_parse_or;

/// Tunables for the fallback chain, cache, and tier budgets.
#[derive(Debug, Clone)]
pub struct RelationshipQueryProperties {
    /// Enable the metadata traversal fallback tier
    pub fallback_to_metadata: bool,
    /// Enable the vector search fallback tier
    pub fallback_to_vector: bool,
    /// Enable the simple repository fallback tier
    pub fallback_to_simple: bool,

    /// Default result limit when neither options nor plan specify one
    pub default_limit: usize,
    /// Result limit for the vector tier
    pub vector_limit: usize,
    /// Minimum cosine similarity for vector matches
    pub similarity_threshold: f32,
    /// Page size of the last-resort simple read
    pub simple_fallback_limit: usize,

    /// Independent budget applied at each suspension point
    pub tier_timeout: Duration,

    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
}

impl RelationshipQueryProperties {
    pub fn from_env() -> Self {
        Self {
            fallback_to_metadata: env_parse_or("RELATIONSHIP_FALLBACK_METADATA", true),
            fallback_to_vector: env_parse_or("RELATIONSHIP_FALLBACK_VECTOR", true),
            fallback_to_simple: env_parse_or("RELATIONSHIP_FALLBACK_SIMPLE", true),
            default_limit: env_parse_or("RELATIONSHIP_DEFAULT_LIMIT", 20),
            vector_limit: env_parse_or("RELATIONSHIP_VECTOR_LIMIT", 25),
            similarity_threshold: env_parse_or("RELATIONSHIP_SIMILARITY_THRESHOLD", 0.7),
            simple_fallback_limit: env_parse_or("RELATIONSHIP_SIMPLE_LIMIT", 20),
            tier_timeout: Duration::from_millis(env_parse_or("RELATIONSHIP_TIER_TIMEOUT_MS", 5000)),
            cache_enabled: env_parse_or("RELATIONSHIP_CACHE_ENABLED", true),
            cache_ttl: Duration::from_millis(env_parse_or("RELATIONSHIP_CACHE_TTL_MS", 300_000)),
            cache_max_entries: env_parse_or("RELATIONSHIP_CACHE_MAX_ENTRIES", 1000),
        }
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_tier_timeout(mut self, timeout: Duration) -> Self {
        self.tier_timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }
}

impl Default for RelationshipQueryProperties {
    fn default() -> Self {
        Self {
            fallback_to_metadata: true,
            fallback_to_vector: true,
            fallback_to_simple: true,
            default_limit: 20,
            vector_limit: 25,
            similarity_threshold: 0.7,
            simple_fallback_limit: 20,
            tier_timeout: Duration::from_secs(5),
            cache_enabled: true,
            cache_ttl: Duration::from_secs(300),
            cache_max_entries: 1000,
        }
    }
}
