//! Metadata traversal fallback.
//!
//! Evaluates a plan's direct filters against the denormalized metadata
//! index using string and number comparisons only, and follows
//! relationship paths in the forward direction through each row's stored
//! back-references. No relational joins.

use std::sync::Arc;

use tracing::debug;

use crate::error::RelationshipResult;
use crate::metadata::{MetadataIndex, MetadataRecord};
use crate::models::{
    FilterCondition, FilterOperator, RelationshipDirection, RelationshipPath,
    RelationshipQueryPlan,
};

/// Normalized string form of a metadata value: trimmed, lowercased.
/// Null normalizes to `None`.
fn normalize(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.trim().to_lowercase()),
        other => Some(other.to_string().trim().to_lowercase()),
    }
}

/// Numeric form of a metadata value; unparseable values compare as 0.0.
fn as_number(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0.0),
        serde_json::Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Evaluate one condition against a candidate metadata value.
pub fn evaluate_condition(candidate: Option<&serde_json::Value>, condition: &FilterCondition) -> bool {
    let expected = &condition.value;
    match condition.operator {
        FilterOperator::Equals => {
            let left = candidate.and_then(normalize);
            let right = normalize(expected);
            left.is_some() && left == right
        }
        FilterOperator::NotEquals => {
            let left = candidate.and_then(normalize);
            let right = normalize(expected);
            left != right
        }
        FilterOperator::Contains => {
            let haystack = candidate.and_then(normalize);
            let needle = normalize(expected);
            match (haystack, needle) {
                (Some(h), Some(n)) => h.contains(&n),
                _ => false,
            }
        }
        FilterOperator::GreaterThan => {
            candidate.map(as_number).unwrap_or(0.0) > as_number(expected)
        }
        FilterOperator::LessThan => candidate.map(as_number).unwrap_or(0.0) < as_number(expected),
        FilterOperator::In => {
            let left = candidate.and_then(normalize);
            match expected {
                serde_json::Value::Array(options) => options
                    .iter()
                    .any(|option| normalize(option).is_some() && normalize(option) == left),
                single => left.is_some() && left == normalize(single),
            }
        }
    }
}

/// Fallback traversal strategy over the denormalized metadata index.
pub struct MetadataTraversalService {
    index: Arc<dyn MetadataIndex>,
}

impl MetadataTraversalService {
    pub fn new(index: Arc<dyn MetadataIndex>) -> Self {
        Self { index }
    }

    pub fn supports(&self, plan: &RelationshipQueryPlan) -> bool {
        !plan.primary_entity_type.trim().is_empty()
    }

    /// Entity ids of the primary type matching the plan's direct filters
    /// and forward relationship paths, in index order, up to `limit`.
    pub async fn traverse(
        &self,
        plan: &RelationshipQueryPlan,
        limit: usize,
    ) -> RelationshipResult<Vec<String>> {
        if !self.supports(plan) {
            return Ok(Vec::new());
        }

        let candidates = self
            .index
            .find_by_entity_type(&plan.primary_entity_type)
            .await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let filters = plan.primary_filters();
        let forward_paths: Vec<&RelationshipPath> = plan
            .relationship_paths
            .iter()
            .filter(|path| {
                path.from_type == plan.primary_entity_type
                    && path.direction == RelationshipDirection::Outgoing
            })
            .collect();

        let mut matches = Vec::new();
        for record in &candidates {
            if !Self::matches_filters(record, filters) {
                continue;
            }
            if !Self::satisfies_paths(record, &forward_paths) {
                continue;
            }
            matches.push(record.entity_id.clone());
            if matches.len() >= limit {
                break;
            }
        }

        debug!(
            entity_type = %plan.primary_entity_type,
            candidates = candidates.len(),
            matches = matches.len(),
            "Metadata traversal complete"
        );
        Ok(matches)
    }

    fn matches_filters(record: &MetadataRecord, filters: &[FilterCondition]) -> bool {
        filters
            .iter()
            .all(|condition| evaluate_condition(record.metadata.get(&condition.field), condition))
    }

    /// A forward path is satisfied when a stored back-reference of the
    /// matching relationship and target type exists, or the path is
    /// optional.
    fn satisfies_paths(record: &MetadataRecord, paths: &[&RelationshipPath]) -> bool {
        paths.iter().all(|path| {
            path.optional
                || record.related.iter().any(|related| {
                    related.relationship_type == path.relationship_type
                        && related.to_type == path.to_type
                })
        })
    }
}
