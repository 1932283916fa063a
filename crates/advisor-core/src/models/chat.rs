use serde::{Deserialize, Serialize};

use super::session::SessionId;

// ===== CONVERSATION =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

// ===== REQUEST MODELS =====

/// Session fields used to personalise prompts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub client_name: String,
    #[serde(default)]
    pub meeting_context: String,
    #[serde(default)]
    pub service_types: Vec<String>,
    #[serde(default)]
    pub cloud_providers: Vec<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub content: String,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub session: SessionContext,
    #[serde(default)]
    pub quick_action: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), ..Default::default() }
    }

    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.session = session;
        self
    }

    pub fn with_quick_action(mut self, action: impl Into<String>) -> Self {
        self.quick_action = Some(action.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub model: String,
    pub processing_time_ms: u64,
    pub input_tokens: u32,
    pub output_tokens: u32,
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub fallback_used: bool,
    #[serde(default)]
    pub quick_action: Option<String>,
    #[serde(default)]
    pub quality_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub metadata: ResponseMetadata,
    pub tokens_used: TokenUsage,
}
