//! Explicit entity capability registry.
//!
//! The hosting application registers a reader per entity type at startup.
//! This replaces runtime discovery of entity-to-repository bindings with
//! an explicit configuration step: no class scanning, just a map.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RelationshipResult;

/// A bounded page request for the last-resort read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }
}

/// Loaded view of an entity, enough to build a response document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub entity_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl EntitySnapshot {
    pub fn new(entity_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            content: content.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

/// Read capability for one entity type.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityReader: Send + Sync {
    /// Load one entity by id.
    async fn load(&self, entity_id: &str) -> RelationshipResult<Option<EntitySnapshot>>;

    /// Load a bounded page of entities.
    async fn load_page(&self, page: PageRequest) -> RelationshipResult<Vec<EntitySnapshot>>;
}

/// Map from entity-type string to its registered reader.
#[derive(Default)]
pub struct EntityRegistry {
    readers: RwLock<HashMap<String, Arc<dyn EntityReader>>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reader for an entity type. Later registrations replace
    /// earlier ones.
    pub fn register(&self, entity_type: impl Into<String>, reader: Arc<dyn EntityReader>) {
        let mut readers = self.readers.write().expect("registry lock poisoned");
        readers.insert(entity_type.into(), reader);
    }

    pub fn reader_for(&self, entity_type: &str) -> Option<Arc<dyn EntityReader>> {
        let readers = self.readers.read().expect("registry lock poisoned");
        readers.get(entity_type).cloned()
    }

    pub fn entity_types(&self) -> Vec<String> {
        let readers = self.readers.read().expect("registry lock poisoned");
        let mut types: Vec<String> = readers.keys().cloned().collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedReader {
        snapshots: Vec<EntitySnapshot>,
    }

    #[async_trait]
    impl EntityReader for FixedReader {
        async fn load(&self, entity_id: &str) -> RelationshipResult<Option<EntitySnapshot>> {
            Ok(self
                .snapshots
                .iter()
                .find(|s| s.entity_id == entity_id)
                .cloned())
        }

        async fn load_page(&self, page: PageRequest) -> RelationshipResult<Vec<EntitySnapshot>> {
            Ok(self
                .snapshots
                .iter()
                .skip(page.offset)
                .take(page.limit)
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn test_register_then_read() {
        let registry = EntityRegistry::new();
        registry.register(
            "document",
            Arc::new(FixedReader {
                snapshots: vec![
                    EntitySnapshot::new("doc-1", "alpha"),
                    EntitySnapshot::new("doc-2", "beta"),
                ],
            }),
        );

        let reader = registry.reader_for("document").unwrap();
        let loaded = reader.load("doc-2").await.unwrap().unwrap();
        assert_eq!(loaded.content, "beta");

        let page = reader.load_page(PageRequest::first(1)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].entity_id, "doc-1");
    }

    #[test]
    fn test_unknown_type_has_no_reader() {
        let registry = EntityRegistry::new();
        assert!(registry.reader_for("ghost").is_none());
        assert!(registry.entity_types().is_empty());
    }

    #[test]
    fn test_later_registration_replaces() {
        let registry = EntityRegistry::new();
        registry.register("document", Arc::new(FixedReader { snapshots: vec![] }));
        registry.register(
            "document",
            Arc::new(FixedReader {
                snapshots: vec![EntitySnapshot::new("doc-1", "x")],
            }),
        );
        assert_eq!(registry.entity_types(), vec!["document".to_string()]);
    }
}
