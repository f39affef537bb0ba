use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use super::{QueryTier, TierResult};
use crate::config::RelationshipQueryProperties;
use crate::models::{
    ExecutionStage, QueryOptions, RagDocument, RagResponse, RelationshipQueryPlan,
};
use crate::registry::{EntityRegistry, PageRequest};

/// Tier 4: the last resort.
///
/// Reads a bounded page of entities of the primary type through the
/// registered reader, ignoring every filter. Every document is tagged
/// `metadata.source = "simple-fallback"`.
pub struct SimpleTier {
    registry: Arc<EntityRegistry>,
    properties: RelationshipQueryProperties,
}

impl SimpleTier {
    pub fn new(registry: Arc<EntityRegistry>, properties: RelationshipQueryProperties) -> Self {
        Self {
            registry,
            properties,
        }
    }
}

#[async_trait]
impl QueryTier for SimpleTier {
    fn stage(&self) -> ExecutionStage {
        ExecutionStage::FallbackSimple
    }

    async fn attempt(
        &self,
        query: &str,
        plan: &RelationshipQueryPlan,
        options: &QueryOptions,
    ) -> TierResult {
        let Some(reader) = self.registry.reader_for(&plan.primary_entity_type) else {
            warn!(
                entity_type = %plan.primary_entity_type,
                "No reader registered for simple fallback"
            );
            return TierResult::Failed(format!(
                "no reader registered for entity type {}",
                plan.primary_entity_type
            ));
        };

        let limit = options
            .limit
            .or(plan.limit)
            .unwrap_or(self.properties.simple_fallback_limit);

        let snapshots = match reader.load_page(PageRequest::first(limit)).await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                error!(error = %e, "Simple repository fallback failed");
                return TierResult::Failed(e.to_string());
            }
        };

        if snapshots.is_empty() {
            return TierResult::Empty;
        }

        let documents = snapshots
            .into_iter()
            .map(|snapshot| {
                RagDocument::new(snapshot.entity_id)
                    .with_content(snapshot.content)
                    .with_metadata_entry("source", serde_json::json!("simple-fallback"))
            })
            .collect();

        TierResult::Matched(RagResponse::tagged(
            query,
            Some(plan.primary_entity_type.clone()),
            documents,
            ExecutionStage::FallbackSimple,
        ))
    }
}
