// ============================================================================
// Query Errors - store and session faults
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cannot decode column {column}: {reason}")]
    Decode { column: &'static str, reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Session is closed, cannot run query {query}")]
    SessionClosed { query: &'static str },

    #[error("Could not initialize {entity} {id}: session is closed")]
    LazyInitialization { entity: &'static str, id: i64 },
}

impl QueryError {
    pub fn decode(column: &'static str, reason: impl Into<String>) -> Self {
        QueryError::Decode {
            column,
            reason: reason.into(),
        }
    }

    /// Faults caused by touching an association outside an open session
    pub fn is_session_fault(&self) -> bool {
        matches!(
            self,
            QueryError::SessionClosed { .. } | QueryError::LazyInitialization { .. }
        )
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Database(_) => "database",
            QueryError::Decode { .. } => "decode",
            QueryError::NotFound { .. } => "not_found",
            QueryError::SessionClosed { .. } | QueryError::LazyInitialization { .. } => "session",
        }
    }
}
