use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use advisor_core::config::Settings;
use advisor_core::database::InMemorySessionStore;
use advisor_core::models::chat::{ChatRequest, SessionContext};
use advisor_core::models::session::{keys, Session, SessionMetadata};
use advisor_core::services::{
    ChatOrchestrator, GenerationOptions, GenerationOutput, GenerationService,
    InMemoryKnowledgeBase, RequestContext, ResponseCache, SessionManager,
};
use advisor_core::utils::{AdvisorError, Result};
use async_trait::async_trait;

/// Returns a fixed answer and counts calls
struct ScriptedGenerator {
    answer: String,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn new(answer: &str) -> Arc<Self> {
        Self::slow(answer, Duration::ZERO)
    }

    fn slow(answer: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            answer: answer.to_string(),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn generate(&self, _prompt: &str, options: &GenerationOptions) -> Result<GenerationOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(GenerationOutput {
            content: self.answer.clone(),
            input_tokens: 250,
            output_tokens: 60,
            model: options.model.clone(),
        })
    }
}

fn build(generator: Arc<ScriptedGenerator>) -> ChatOrchestrator {
    let settings = Settings::default();
    let sessions = Arc::new(SessionManager::new(
        Arc::new(InMemorySessionStore::new()),
        &settings.session,
    ));
    ChatOrchestrator::new(
        &settings,
        sessions,
        Arc::new(ResponseCache::new(settings.cache.max_entries)),
        Arc::new(InMemoryKnowledgeBase::default()),
        generator,
    )
}

fn request(content: &str) -> ChatRequest {
    ChatRequest::new(content).with_session(SessionContext {
        client_name: "Initech".to_string(),
        service_types: vec!["migration".to_string()],
        ..Default::default()
    })
}

const ANSWER: &str = "Start with a two-week assessment, then migrate a low-risk pilot workload to the cloud.";

#[tokio::test]
async fn identical_requests_call_generation_once() {
    let generator = ScriptedGenerator::new(ANSWER);
    let orchestrator = build(generator.clone());
    let ctx = RequestContext::new();

    let first = orchestrator.chat(request("How should we start?"), &ctx).await.unwrap();
    let second = orchestrator.chat(request("How should we start?"), &ctx).await.unwrap();

    assert_eq!(generator.calls(), 1);
    assert_eq!(first.content, ANSWER);
    assert_eq!(second.content, ANSWER);
    assert!(second.metadata.cached);
    assert_eq!(second.metadata.processing_time_ms, 0);
    assert_eq!(first.metadata.model, "advisor-default");
}

#[tokio::test]
async fn short_answer_to_cost_question_uses_fallback() {
    let generator = ScriptedGenerator::new("Depends.");
    let orchestrator = build(generator.clone());

    let resp = orchestrator
        .chat(request("What is the expected cost?"), &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(generator.calls(), 1);
    assert!(resp.metadata.fallback_used);
    assert!(resp.content.to_lowercase().contains("cost"));
    assert!(resp.content.len() >= 20);
}

#[tokio::test]
async fn different_questions_are_cached_separately() {
    let generator = ScriptedGenerator::new(ANSWER);
    let orchestrator = build(generator.clone());
    let ctx = RequestContext::new();

    orchestrator.chat(request("How should we start?"), &ctx).await.unwrap();
    orchestrator.chat(request("How should we finish?"), &ctx).await.unwrap();

    assert_eq!(generator.calls(), 2);
    assert_eq!(orchestrator.cache().len(), 2);
}

#[tokio::test]
async fn cancelled_request_is_not_cached() {
    let generator = ScriptedGenerator::slow(ANSWER, Duration::from_millis(300));
    let orchestrator = build(generator.clone());
    let ctx = RequestContext::new();

    let cancel = ctx.cancel.clone();
    let (res, _) = tokio::join!(orchestrator.chat(request("How should we start?"), &ctx), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    assert!(matches!(res, Err(AdvisorError::Cancelled)));
    assert!(orchestrator.cache().is_empty());

    // a fresh request still generates
    let resp = orchestrator
        .chat(request("How should we start?"), &RequestContext::new())
        .await
        .unwrap();
    assert!(!resp.metadata.cached);
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn session_chat_uses_stored_session() {
    let generator = ScriptedGenerator::new(ANSWER);
    let orchestrator = build(generator.clone());

    let session = orchestrator
        .sessions()
        .create(
            Session::new("u1")
                .with_client("Initech")
                .with_metadata(SessionMetadata::new().with(keys::SERVICE_TYPES, "migration")),
        )
        .await
        .unwrap();

    let resp = orchestrator
        .chat_for_session(
            &session.id,
            "u1",
            ChatRequest::new("next steps").with_quick_action("next_steps"),
            &RequestContext::new(),
        )
        .await
        .unwrap();
    assert!(resp.content.contains("Initech"));
    assert!(resp.content.contains("migration"));
    assert_eq!(generator.calls(), 0);

    orchestrator.sessions().expire(&session.id).await.unwrap();
    let err = orchestrator
        .chat_for_session(&session.id, "u1", ChatRequest::new("Hello"), &RequestContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AdvisorError::SessionInvalid { .. } | AdvisorError::SessionExpired(_)));
}
