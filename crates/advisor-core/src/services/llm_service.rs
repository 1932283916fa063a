use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::GenerationConfig;
use crate::models::chat::ChatMessage;
use crate::utils::error::{AdvisorError, Result};
use crate::utils::token_estimator::estimate_tokens;

/// Sampling parameters for one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl From<&GenerationConfig> for GenerationOptions {
    fn from(cfg: &GenerationConfig) -> Self {
        Self {
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutput {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Model that actually served the request
    pub model: String,
}

/// Text-generation backend. Callers bound latency and cancellation;
/// implementations only report provider failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<GenerationOutput>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// OpenAI-compatible `/v1/chat/completions` client
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl LlmService {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AdvisorError::GenerationFailure(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[async_trait]
impl GenerationService for LlmService {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<GenerationOutput> {
        debug!("Calling generation backend (model {}, {} chars)", options.model, prompt.len());

        let request = ChatCompletionRequest {
            model: &options.model,
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            stream: false,
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AdvisorError::GenerationFailure(format!("Failed to call LLM API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("LLM API error: {} - {}", status, body);
            return Err(AdvisorError::GenerationFailure(format!(
                "LLM API error: {} - {}",
                status, body
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::GenerationFailure(format!("Failed to parse LLM response: {}", e)))?;

        into_output(parsed, prompt, &options.model)
    }
}

fn into_output(parsed: ChatCompletionResponse, prompt: &str, requested_model: &str) -> Result<GenerationOutput> {
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AdvisorError::GenerationFailure("No choices returned from LLM".to_string()))?;

    // Some backends omit usage; fall back to the word-based estimate
    let (input_tokens, output_tokens) = match parsed.usage {
        Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
        None => (
            estimate_tokens(prompt) as u32,
            estimate_tokens(&content) as u32,
        ),
    };

    Ok(GenerationOutput {
        content,
        input_tokens,
        output_tokens,
        model: parsed.model.unwrap_or_else(|| requested_model.to_string()),
    })
}
