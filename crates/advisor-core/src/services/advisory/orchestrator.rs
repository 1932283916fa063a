//! End-to-end chat request flow: cache, quick actions, knowledge-base
//! context, prompt optimization, generation and the quality gate.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::cache::{fingerprint, CachedResponse, ResponseCache};
use super::context_builder::{ContextBuilder, KnowledgeContext};
use super::optimizer::PromptOptimizer;
use super::quality::QualityFilter;
use super::quick_actions::QuickAction;
use crate::config::{KnowledgeBaseConfig, Settings};
use crate::logging::{ActivityLog, ActivityLogger, ActivityStatus, ActivityType};
use crate::models::chat::{ChatRequest, ChatResponse, ResponseMetadata, TokenUsage};
use crate::services::knowledge_base::{select_relevant, KnowledgeBase};
use crate::services::llm_service::{GenerationOptions, GenerationOutput, GenerationService};
use crate::services::query_analyzer::QueryAnalyzer;
use crate::services::session_manager::SessionManager;
use crate::utils::error::{AdvisorError, Result};
use crate::utils::Limiters;

const QUICK_ACTION_MODEL: &str = "quick-action";

/// Caller-supplied cancellation and deadline for one request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub cancel: CancellationToken,
    /// Overrides the configured generation timeout
    pub timeout: Option<Duration>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run `fut` unless the request is cancelled first
    async fn run<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AdvisorError::Cancelled),
            res = fut => res,
        }
    }
}

pub struct ChatOrchestrator {
    sessions: Arc<SessionManager>,
    cache: Arc<ResponseCache>,
    optimizer: PromptOptimizer,
    quality: QualityFilter,
    context_builder: ContextBuilder,
    knowledge: Arc<dyn KnowledgeBase>,
    generator: Arc<dyn GenerationService>,
    limiters: Limiters,
    options: GenerationOptions,
    generation_timeout: Duration,
    cache_ttl: Duration,
    kb_limits: KnowledgeBaseConfig,
    logger: Option<ActivityLogger>,
}

impl ChatOrchestrator {
    pub fn new(
        settings: &Settings,
        sessions: Arc<SessionManager>,
        cache: Arc<ResponseCache>,
        knowledge: Arc<dyn KnowledgeBase>,
        generator: Arc<dyn GenerationService>,
    ) -> Self {
        Self {
            sessions,
            cache,
            optimizer: PromptOptimizer::new(settings.optimizer.max_length),
            quality: QualityFilter::new(&settings.quality),
            context_builder: ContextBuilder::default(),
            knowledge,
            generator,
            limiters: Limiters::new(&settings.generation),
            options: GenerationOptions::from(&settings.generation),
            generation_timeout: settings.generation.timeout(),
            cache_ttl: settings.cache.ttl(),
            kb_limits: settings.knowledge_base.clone(),
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: ActivityLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_context_builder(mut self, builder: ContextBuilder) -> Self {
        self.context_builder = builder;
        self
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    fn log(&self, activity: ActivityLog) {
        if let Some(logger) = &self.logger {
            logger.log(activity);
        }
    }

    /// Validate the caller's session, take the prompt context from the
    /// stored session, then answer
    pub async fn chat_for_session(
        &self,
        session_id: &str,
        owner_id: &str,
        mut request: ChatRequest,
        ctx: &RequestContext,
    ) -> Result<ChatResponse> {
        let session = ctx.run(self.sessions.validate(session_id, owner_id)).await?;

        request.session = session.chat_context();
        request.session_id = Some(session.id.clone());
        self.sessions.touch(session_id).await?;

        self.chat(request, ctx).await
    }

    pub async fn chat(&self, request: ChatRequest, ctx: &RequestContext) -> Result<ChatResponse> {
        let started = Instant::now();
        let key = fingerprint(&request);

        self.log(
            ActivityLog::builder(ActivityType::RequestReceived)
                .session(request.session_id.as_deref())
                .message(&request.content)
                .fingerprint(key.clone())
                .build(),
        );

        let result = self.answer(&request, &key, ctx, started).await;

        if let Err(e) = &result {
            let activity = match e {
                AdvisorError::Cancelled => {
                    info!("Chat request cancelled");
                    ActivityType::RequestCancelled
                }
                _ => {
                    error!("Chat request failed: {}", e);
                    ActivityType::GenerationFailed
                }
            };
            self.log(
                ActivityLog::builder(activity)
                    .session(request.session_id.as_deref())
                    .status(ActivityStatus::Error)
                    .fingerprint(key)
                    .processing_time(started.elapsed().as_millis() as u64)
                    .error(e.to_string(), e.kind())
                    .build(),
            );
        }
        result
    }

    async fn answer(
        &self,
        request: &ChatRequest,
        key: &str,
        ctx: &RequestContext,
        started: Instant,
    ) -> Result<ChatResponse> {
        if ctx.cancel.is_cancelled() {
            return Err(AdvisorError::Cancelled);
        }
        if request.content.trim().is_empty() {
            return Err(AdvisorError::ValidationFailed("message content is required".to_string()));
        }

        // 1. cache
        if let Some(cached) = self.cache.get(key) {
            return Ok(self.from_cache(request, key, cached));
        }

        // 2. quick actions
        if let Some(action) = request.quick_action.as_deref().and_then(QuickAction::parse) {
            return Ok(self.quick_action(request, action, started));
        }

        // 3-4. prompt
        let knowledge = self.fetch_knowledge(request, ctx).await?;
        let prompt = self.context_builder.build_prompt(request, &knowledge);
        let optimized = self.optimizer.optimize(&prompt);
        let stats = PromptOptimizer::compression_stats(&prompt, &optimized);
        debug!(
            "Prompt compressed {} -> {} chars (~{} tokens saved)",
            stats.original_length, stats.optimized_length, stats.estimated_tokens_saved
        );

        // 5. generation
        let llm_started = Instant::now();
        let output = self.generate(&optimized, ctx).await?;
        let llm_ms = llm_started.elapsed().as_millis() as u64;

        // 6. quality gate
        let (content, fallback_used) = match self.quality.validate(&output.content) {
            Ok(()) => (output.content, false),
            Err(issue) => match self.quality.fallback_for(&request.content) {
                Some(text) => {
                    warn!("Generated response rejected ({}), using fallback", issue);
                    (text.to_string(), true)
                }
                // total failure surfaces as its own kind, not GenerationFailure
                None => return Err(AdvisorError::QualityValidationFailed(issue)),
            },
        };
        let quality_score = self.quality.quality_score(&content);

        // a result that raced with cancellation is dropped, never cached
        if ctx.cancel.is_cancelled() {
            return Err(AdvisorError::Cancelled);
        }

        let metadata = ResponseMetadata {
            model: output.model,
            processing_time_ms: started.elapsed().as_millis() as u64,
            input_tokens: output.input_tokens,
            output_tokens: output.output_tokens,
            cached: false,
            fallback_used,
            quick_action: request.quick_action.clone(),
            quality_score: Some(quality_score),
        };
        let tokens_used = TokenUsage {
            input_tokens: output.input_tokens,
            output_tokens: output.output_tokens,
        };

        // 7. cache write
        self.cache.set(
            key,
            CachedResponse::new(
                content.clone(),
                serde_json::to_value(&metadata).unwrap_or_default(),
                tokens_used.total(),
                self.cache_ttl,
            ),
        );

        let activity = if fallback_used {
            ActivityType::FallbackUsed
        } else {
            ActivityType::GenerationCompleted
        };
        self.log(
            ActivityLog::builder(activity)
                .session(request.session_id.as_deref())
                .status(if fallback_used { ActivityStatus::Warning } else { ActivityStatus::Success })
                .fingerprint(key)
                .tokens(tokens_used.input_tokens, tokens_used.output_tokens)
                .quality_score(quality_score)
                .processing_time(metadata.processing_time_ms)
                .llm_duration(llm_ms)
                .build(),
        );
        info!(
            "Chat answered in {}ms (llm {}ms, fallback: {})",
            metadata.processing_time_ms, llm_ms, fallback_used
        );

        Ok(ChatResponse { content, metadata, tokens_used })
    }

    fn from_cache(&self, request: &ChatRequest, key: &str, cached: CachedResponse) -> ChatResponse {
        let mut metadata: ResponseMetadata =
            serde_json::from_value(cached.metadata).unwrap_or_default();
        metadata.cached = true;
        metadata.processing_time_ms = 0;

        self.log(
            ActivityLog::builder(ActivityType::CacheHit)
                .session(request.session_id.as_deref())
                .fingerprint(key)
                .build(),
        );

        ChatResponse {
            content: cached.content,
            metadata,
            tokens_used: TokenUsage::default(),
        }
    }

    fn quick_action(&self, request: &ChatRequest, action: QuickAction, started: Instant) -> ChatResponse {
        let content = action.render(&request.session);
        let processing_time_ms = started.elapsed().as_millis() as u64;
        debug!("Quick action {} answered without generation", action.as_str());

        self.log(
            ActivityLog::builder(ActivityType::QuickAction)
                .session(request.session_id.as_deref())
                .quick_action(action.as_str())
                .processing_time(processing_time_ms)
                .build(),
        );

        ChatResponse {
            content,
            metadata: ResponseMetadata {
                model: QUICK_ACTION_MODEL.to_string(),
                processing_time_ms,
                quick_action: Some(action.as_str().to_string()),
                ..Default::default()
            },
            tokens_used: TokenUsage::default(),
        }
    }

    /// Knowledge-base failures degrade to an empty excerpt; cancellation does not
    async fn fetch_knowledge(&self, request: &ChatRequest, ctx: &RequestContext) -> Result<KnowledgeContext> {
        let industry = QueryAnalyzer::infer_industry(&request.session);
        let service_types = &request.session.service_types;

        let lookup = async {
            futures::try_join!(
                self.knowledge.service_offerings(service_types, industry.as_deref()),
                self.knowledge.past_solutions(service_types, industry.as_deref()),
            )
        };

        let (offerings, solutions) = match ctx.run(lookup).await {
            Ok(found) => found,
            Err(AdvisorError::Cancelled) => return Err(AdvisorError::Cancelled),
            Err(e) => {
                warn!("Knowledge base lookup failed, continuing without it: {}", e);
                return Ok(KnowledgeContext::default());
            }
        };

        let keywords = QueryAnalyzer::extract_keywords(&request.content);
        Ok(KnowledgeContext {
            offerings: select_relevant(offerings, &keywords, self.kb_limits.max_offerings),
            solutions: select_relevant(solutions, &keywords, self.kb_limits.max_solutions),
        })
    }

    /// Generation call bounded by the concurrency limit, the timeout and
    /// the caller's cancellation. No cache lock is held here.
    async fn generate(&self, prompt: &str, ctx: &RequestContext) -> Result<GenerationOutput> {
        let (_permit, waited) = ctx.run(self.limiters.acquire_generation()).await?;
        if waited > Duration::from_millis(100) {
            debug!("Waited {}ms for a generation slot", waited.as_millis());
        }

        let timeout = ctx.timeout.unwrap_or(self.generation_timeout);
        let call = async {
            match tokio::time::timeout(timeout, self.generator.generate(prompt, &self.options)).await {
                Ok(res) => res,
                Err(_) => Err(AdvisorError::GenerationFailure(format!(
                    "generation timed out after {}ms",
                    timeout.as_millis()
                ))),
            }
        };
        ctx.run(call).await
    }
}
