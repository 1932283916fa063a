use thiserror::Error;

use crate::models::session::SessionStatus;

pub type Result<T, E = AdvisorError> = std::result::Result<T, E>;

/// Reason a generated answer was rejected by the quality gate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QualityIssue {
    #[error("response too short: {length} chars (min {min})")]
    TooShort { length: usize, min: usize },

    #[error("response too long: {length} chars (max {max})")]
    TooLong { length: usize, max: usize },

    #[error("response contains banned content: {0}")]
    BannedContent(String),

    #[error("response does not mention any domain-relevant term")]
    MissingDomainRelevance,
}

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Session {id} is not active (status: {status})")]
    SessionInvalid { id: String, status: SessionStatus },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Generation failure: {0}")]
    GenerationFailure(String),

    #[error("Quality validation failed: {0}")]
    QualityValidationFailed(QualityIssue),

    #[error("Request cancelled")]
    Cancelled,
}

impl AdvisorError {
    /// Prefix a database error with the operation that produced it.
    /// Other variants pass through untouched.
    pub fn in_operation(self, operation: &str) -> Self {
        match self {
            AdvisorError::DatabaseError(msg) => {
                AdvisorError::DatabaseError(format!("{}: {}", operation, msg))
            }
            other => other,
        }
    }

    /// Stable label used by the activity log
    pub fn kind(&self) -> &'static str {
        match self {
            AdvisorError::ValidationFailed(_) => "validation_failed",
            AdvisorError::DatabaseError(_) => "database_error",
            AdvisorError::SessionNotFound(_) => "session_not_found",
            AdvisorError::SessionExpired(_) => "session_expired",
            AdvisorError::SessionInvalid { .. } => "session_invalid",
            AdvisorError::Unauthorized(_) => "unauthorized",
            AdvisorError::GenerationFailure(_) => "generation_failure",
            AdvisorError::QualityValidationFailed(_) => "quality_validation_failed",
            AdvisorError::Cancelled => "cancelled",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AdvisorError::DatabaseError(_) | AdvisorError::GenerationFailure(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_operation_wraps_database_errors_only() {
        let err = AdvisorError::DatabaseError("connection reset".to_string())
            .in_operation("create session");
        assert_eq!(
            err.to_string(),
            "Database error: create session: connection reset"
        );

        let err = AdvisorError::SessionNotFound("abc".to_string()).in_operation("get session");
        assert!(matches!(err, AdvisorError::SessionNotFound(id) if id == "abc"));
    }

    #[test]
    fn test_quality_issue_kinds_are_distinct() {
        let short = QualityIssue::TooShort { length: 5, min: 20 };
        let long = QualityIssue::TooLong { length: 3000, max: 2000 };
        assert_ne!(short, long);
        assert!(short.to_string().contains("too short"));
        assert!(long.to_string().contains("too long"));
    }

    #[test]
    fn test_kind_and_retryable() {
        assert_eq!(AdvisorError::Cancelled.kind(), "cancelled");
        assert!(!AdvisorError::Cancelled.is_retryable());
        assert!(AdvisorError::GenerationFailure("timeout".into()).is_retryable());
        assert!(!AdvisorError::Unauthorized("u1".into()).is_retryable());
    }
}
