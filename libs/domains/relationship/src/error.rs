use thiserror::Error;

/// Internal error type for relationship query components.
///
/// These never escape [`ReliableRelationshipQueryService::execute`]:
/// tier-level failures are logged, counted, and converted into a fall
/// through to the next tier.
///
/// [`ReliableRelationshipQueryService::execute`]: crate::service::ReliableRelationshipQueryService::execute
#[derive(Debug, Error)]
pub enum RelationshipError {
    #[error("Planning error: {0}")]
    Planning(String),

    #[error("Primary query error: {0}")]
    Primary(String),

    #[error("Metadata traversal error: {0}")]
    Traversal(String),

    #[error("Vector search error: {0}")]
    VectorSearch(String),

    #[error("Entity read error: {0}")]
    EntityRead(String),

    #[error("No reader registered for entity type: {0}")]
    UnknownEntityType(String),

    #[error("Invalid query plan: {0}")]
    InvalidPlan(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type RelationshipResult<T> = Result<T, RelationshipError>;

impl From<domain_vector::VectorError> for RelationshipError {
    fn from(err: domain_vector::VectorError) -> Self {
        RelationshipError::VectorSearch(err.to_string())
    }
}

impl From<serde_json::Error> for RelationshipError {
    fn from(err: serde_json::Error) -> Self {
        RelationshipError::Internal(format!("JSON error: {}", err))
    }
}

impl From<validator::ValidationErrors> for RelationshipError {
    fn from(err: validator::ValidationErrors) -> Self {
        RelationshipError::InvalidPlan(err.to_string())
    }
}
