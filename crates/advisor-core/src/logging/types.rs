use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activity type categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    RequestReceived,
    CacheHit,
    QuickAction,
    GenerationCompleted,
    FallbackUsed,
    GenerationFailed,
    RequestCancelled,
    SessionCreated,
    SessionExpired,
    SessionTerminated,
    Cleanup,
}

impl ActivityType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::RequestReceived => "request_received",
            Self::CacheHit => "cache_hit",
            Self::QuickAction => "quick_action",
            Self::GenerationCompleted => "generation_completed",
            Self::FallbackUsed => "fallback_used",
            Self::GenerationFailed => "generation_failed",
            Self::RequestCancelled => "request_cancelled",
            Self::SessionCreated => "session_created",
            Self::SessionExpired => "session_expired",
            Self::SessionTerminated => "session_terminated",
            Self::Cleanup => "cleanup",
        }
    }
}

/// Activity status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Error,
    Warning,
    Info,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// Complete activity log entry
#[derive(Debug, Clone, Serialize)]
pub struct ActivityLog {
    // Session & User
    pub session_id: Option<String>,
    pub user_id: Option<String>,

    // Activity
    pub activity_type: ActivityType,
    pub activity_status: ActivityStatus,

    // Context
    pub message_content: Option<String>,
    pub fingerprint: Option<String>,
    pub quick_action: Option<String>,

    // Metrics
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub quality_score: Option<f64>,
    pub affected_rows: Option<u64>,

    // Performance
    pub processing_time_ms: Option<u64>,
    pub llm_call_duration_ms: Option<u64>,

    // Error
    pub error_message: Option<String>,
    pub error_type: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    /// Create builder for fluent API
    pub fn builder(activity_type: ActivityType) -> ActivityLogBuilder {
        ActivityLogBuilder::new(activity_type)
    }
}

/// Builder pattern for ActivityLog
pub struct ActivityLogBuilder {
    log: ActivityLog,
}

impl ActivityLogBuilder {
    pub fn new(activity_type: ActivityType) -> Self {
        Self {
            log: ActivityLog {
                session_id: None,
                user_id: None,
                activity_type,
                activity_status: ActivityStatus::Success,
                message_content: None,
                fingerprint: None,
                quick_action: None,
                input_tokens: None,
                output_tokens: None,
                quality_score: None,
                affected_rows: None,
                processing_time_ms: None,
                llm_call_duration_ms: None,
                error_message: None,
                error_type: None,
                created_at: Utc::now(),
            },
        }
    }

    pub fn session(mut self, session_id: Option<&str>) -> Self {
        self.log.session_id = session_id.map(str::to_string);
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.log.user_id = Some(user_id.into());
        self
    }

    pub fn status(mut self, status: ActivityStatus) -> Self {
        self.log.activity_status = status;
        self
    }

    /// Message content is truncated to 200 characters
    pub fn message(mut self, content: &str) -> Self {
        self.log.message_content = Some(content.chars().take(200).collect());
        self
    }

    pub fn fingerprint(mut self, key: impl Into<String>) -> Self {
        self.log.fingerprint = Some(key.into());
        self
    }

    pub fn quick_action(mut self, action: impl Into<String>) -> Self {
        self.log.quick_action = Some(action.into());
        self
    }

    pub fn tokens(mut self, input: u32, output: u32) -> Self {
        self.log.input_tokens = Some(input);
        self.log.output_tokens = Some(output);
        self
    }

    pub fn quality_score(mut self, score: f64) -> Self {
        self.log.quality_score = Some(score);
        self
    }

    pub fn affected_rows(mut self, rows: u64) -> Self {
        self.log.affected_rows = Some(rows);
        self
    }

    pub fn processing_time(mut self, ms: u64) -> Self {
        self.log.processing_time_ms = Some(ms);
        self
    }

    pub fn llm_duration(mut self, ms: u64) -> Self {
        self.log.llm_call_duration_ms = Some(ms);
        self
    }

    pub fn error(mut self, message: impl Into<String>, error_type: impl Into<String>) -> Self {
        self.log.error_message = Some(message.into());
        self.log.error_type = Some(error_type.into());
        self.log.activity_status = ActivityStatus::Error;
        self
    }

    pub fn build(self) -> ActivityLog {
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_error_status() {
        let log = ActivityLog::builder(ActivityType::GenerationFailed)
            .session(Some("s1"))
            .error("provider timeout", "generation_failure")
            .build();

        assert_eq!(log.activity_status, ActivityStatus::Error);
        assert_eq!(log.session_id.as_deref(), Some("s1"));
        assert_eq!(log.error_type.as_deref(), Some("generation_failure"));
    }

    #[test]
    fn test_message_truncated() {
        let long = "x".repeat(500);
        let log = ActivityLog::builder(ActivityType::RequestReceived).message(&long).build();
        assert_eq!(log.message_content.map(|m| m.len()), Some(200));
    }
}
