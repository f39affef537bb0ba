use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use validator::Validate;

/// Metadata map carried on documents and responses
pub type DocumentMetadata = serde_json::Map<String, serde_json::Value>;

/// Comparison operators supported by the metadata fallback.
///
/// Only string and number comparisons; no joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    In,
}

/// A single filter condition against an entity's metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: FilterOperator,
    /// Comparison value; an array for `IN`
    pub value: serde_json::Value,
}

impl FilterCondition {
    pub fn new(
        field: impl Into<String>,
        operator: FilterOperator,
        value: serde_json::Value,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// Traversal direction of a relationship path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipDirection {
    Outgoing,
    Incoming,
}

/// One hop of a relationship traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipPath {
    pub from_type: String,
    pub relationship_type: String,
    pub to_type: String,
    pub direction: RelationshipDirection,
    /// Optional paths never disqualify a candidate
    #[serde(default)]
    pub optional: bool,
}

/// How much of each matched entity the caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnMode {
    #[default]
    Full,
    Summary,
    Ids,
}

/// Structured output of natural-language-to-query translation.
///
/// Immutable once produced by the planner; the orchestrator only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RelationshipQueryPlan {
    pub original_query: String,
    /// Query text to embed for semantic search; falls back to the original
    pub semantic_query: Option<String>,
    #[validate(length(min = 1))]
    pub primary_entity_type: String,
    pub candidate_entity_types: Vec<String>,
    #[serde(default)]
    pub relationship_paths: Vec<RelationshipPath>,
    /// Per-entity-type filter conditions
    #[serde(default)]
    pub direct_filters: HashMap<String, Vec<FilterCondition>>,
    #[serde(default)]
    pub needs_semantic_search: bool,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<usize>,
    #[serde(default)]
    pub return_mode: ReturnMode,
}

impl RelationshipQueryPlan {
    pub fn new(original_query: impl Into<String>, primary_entity_type: impl Into<String>) -> Self {
        let original_query = original_query.into();
        let primary_entity_type = primary_entity_type.into();
        Self {
            semantic_query: None,
            candidate_entity_types: vec![primary_entity_type.clone()],
            relationship_paths: Vec::new(),
            direct_filters: HashMap::new(),
            needs_semantic_search: false,
            limit: None,
            return_mode: ReturnMode::Full,
            original_query,
            primary_entity_type,
        }
    }

    /// Plan used when the planner fails or returns something degenerate:
    /// no filters, semantic search off, first candidate as primary.
    pub fn synthesized(query: &str, candidate_entity_types: &[String]) -> Self {
        let primary = candidate_entity_types
            .first()
            .cloned()
            .unwrap_or_else(|| "document".to_string());
        let mut plan = Self::new(query, primary);
        plan.semantic_query = Some(query.to_string());
        if !candidate_entity_types.is_empty() {
            plan.candidate_entity_types = candidate_entity_types.to_vec();
        }
        plan
    }

    pub fn with_semantic_query(mut self, semantic_query: impl Into<String>) -> Self {
        self.semantic_query = Some(semantic_query.into());
        self
    }

    pub fn with_candidate_entity_types(mut self, types: Vec<String>) -> Self {
        self.candidate_entity_types = types;
        self
    }

    pub fn with_relationship_path(mut self, path: RelationshipPath) -> Self {
        self.relationship_paths.push(path);
        self
    }

    pub fn with_direct_filter(
        mut self,
        entity_type: impl Into<String>,
        condition: FilterCondition,
    ) -> Self {
        self.direct_filters
            .entry(entity_type.into())
            .or_default()
            .push(condition);
        self
    }

    pub fn with_semantic_search(mut self) -> Self {
        self.needs_semantic_search = true;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_return_mode(mut self, return_mode: ReturnMode) -> Self {
        self.return_mode = return_mode;
        self
    }

    /// Text to embed when the vector tier runs.
    pub fn semantic_text(&self) -> &str {
        self.semantic_query
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.original_query)
    }

    /// Filters against the primary entity type.
    pub fn primary_filters(&self) -> &[FilterCondition] {
        self.direct_filters
            .get(&self.primary_entity_type)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_direct_filters(&self) -> bool {
        self.direct_filters.values().any(|v| !v.is_empty())
    }
}

/// Per-request execution options.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub limit: Option<usize>,
    pub similarity_threshold: Option<f32>,
    pub return_mode: Option<ReturnMode>,
    /// Overall budget; an elapsed deadline short-circuits the tier walk
    pub deadline: Option<Duration>,
}

impl QueryOptions {
    pub fn defaults() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    pub fn with_return_mode(mut self, return_mode: ReturnMode) -> Self {
        self.return_mode = Some(return_mode);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// The strategy that produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStage {
    Primary,
    FallbackMetadata,
    FallbackVector,
    FallbackSimple,
}

/// A single matched document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagDocument {
    pub id: String,
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl RagDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: None,
            metadata: DocumentMetadata::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_metadata_entry(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Similarity score, when the vector tier produced this document.
    pub fn similarity(&self) -> Option<f64> {
        self.metadata.get("similarity").and_then(|v| v.as_f64())
    }
}

/// The caller-visible query result. Every response reports the stage
/// that produced it in `metadata["executionStage"]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    pub original_query: String,
    pub entity_type: Option<String>,
    pub documents: Vec<RagDocument>,
    #[serde(default)]
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl RagResponse {
    /// Response tagged with the producing stage.
    pub fn tagged(
        original_query: impl Into<String>,
        entity_type: Option<String>,
        documents: Vec<RagDocument>,
        stage: ExecutionStage,
    ) -> Self {
        let mut metadata = DocumentMetadata::new();
        metadata.insert(
            "executionStage".to_string(),
            serde_json::json!(stage.to_string()),
        );
        metadata.insert(
            "fallbackUsed".to_string(),
            serde_json::json!(stage != ExecutionStage::Primary),
        );
        metadata.insert(
            "timestamp".to_string(),
            serde_json::json!(Utc::now().to_rfc3339()),
        );
        Self {
            original_query: original_query.into(),
            entity_type,
            documents,
            metadata,
            warnings: Vec::new(),
        }
    }

    /// Empty response for a stage, with an explanatory note.
    pub fn empty(
        original_query: impl Into<String>,
        entity_type: Option<String>,
        stage: ExecutionStage,
        note: impl Into<String>,
    ) -> Self {
        let mut response = Self::tagged(original_query, entity_type, Vec::new(), stage);
        let note = note.into();
        response
            .metadata
            .insert("error".to_string(), serde_json::json!(note.clone()));
        response.warnings.push(note);
        response
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn has_documents(&self) -> bool {
        !self.documents.is_empty()
    }

    /// The stage recorded in the response metadata.
    pub fn execution_stage(&self) -> Option<ExecutionStage> {
        self.metadata
            .get("executionStage")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_stage_strings() {
        assert_eq!(ExecutionStage::Primary.to_string(), "PRIMARY");
        assert_eq!(
            ExecutionStage::FallbackMetadata.to_string(),
            "FALLBACK_METADATA"
        );
        assert_eq!(ExecutionStage::FallbackVector.to_string(), "FALLBACK_VECTOR");
        assert_eq!(ExecutionStage::FallbackSimple.to_string(), "FALLBACK_SIMPLE");
        let parsed: ExecutionStage = "FALLBACK_VECTOR".parse().unwrap();
        assert_eq!(parsed, ExecutionStage::FallbackVector);
    }

    #[test]
    fn test_plan_validation_rejects_empty_primary_type() {
        let mut plan = RelationshipQueryPlan::new("query", "document");
        assert!(plan.validate().is_ok());

        plan.primary_entity_type = String::new();
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_plan_validation_limit_bounds() {
        let plan = RelationshipQueryPlan::new("query", "document").with_limit(5000);
        assert!(plan.validate().is_err());

        let plan = RelationshipQueryPlan::new("query", "document").with_limit(100);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_synthesized_plan_defaults() {
        let plan = RelationshipQueryPlan::synthesized("find docs", &["order".to_string()]);
        assert_eq!(plan.primary_entity_type, "order");
        assert_eq!(plan.semantic_query.as_deref(), Some("find docs"));
        assert!(!plan.needs_semantic_search);
        assert!(!plan.has_direct_filters());

        let plan = RelationshipQueryPlan::synthesized("find docs", &[]);
        assert_eq!(plan.primary_entity_type, "document");
    }

    #[test]
    fn test_semantic_text_falls_back_to_original() {
        let plan = RelationshipQueryPlan::new("original", "document");
        assert_eq!(plan.semantic_text(), "original");

        let plan = plan.with_semantic_query("refined");
        assert_eq!(plan.semantic_text(), "refined");

        let mut plan = RelationshipQueryPlan::new("original", "document");
        plan.semantic_query = Some("   ".to_string());
        assert_eq!(plan.semantic_text(), "original");
    }

    #[test]
    fn test_primary_filters_scoped_to_primary_type() {
        let plan = RelationshipQueryPlan::new("q", "document")
            .with_direct_filter(
                "document",
                FilterCondition::new("status", FilterOperator::Equals, serde_json::json!("live")),
            )
            .with_direct_filter(
                "order",
                FilterCondition::new("total", FilterOperator::GreaterThan, serde_json::json!(5)),
            );

        assert_eq!(plan.primary_filters().len(), 1);
        assert_eq!(plan.primary_filters()[0].field, "status");
        assert!(plan.has_direct_filters());
    }

    #[test]
    fn test_response_tagging() {
        let response = RagResponse::tagged(
            "q",
            Some("document".to_string()),
            vec![RagDocument::new("doc-1")],
            ExecutionStage::FallbackVector,
        );

        assert_eq!(response.execution_stage(), Some(ExecutionStage::FallbackVector));
        assert_eq!(response.metadata.get("fallbackUsed"), Some(&serde_json::json!(true)));
        assert!(response.has_documents());
    }

    #[test]
    fn test_primary_response_is_not_fallback() {
        let response =
            RagResponse::tagged("q", None, vec![RagDocument::new("x")], ExecutionStage::Primary);
        assert_eq!(response.metadata.get("fallbackUsed"), Some(&serde_json::json!(false)));
    }

    #[test]
    fn test_empty_response_carries_note() {
        let response = RagResponse::empty(
            "q",
            None,
            ExecutionStage::FallbackSimple,
            "all tiers exhausted",
        );
        assert!(!response.has_documents());
        assert_eq!(response.execution_stage(), Some(ExecutionStage::FallbackSimple));
        assert_eq!(response.warnings, vec!["all tiers exhausted".to_string()]);
    }
}
