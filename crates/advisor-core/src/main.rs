use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use advisor_core::config::Settings;
use advisor_core::database::InMemorySessionStore;
use advisor_core::logging::ActivityLogger;
use advisor_core::models::chat::ChatRequest;
use advisor_core::models::session::{Session, SessionStatus};
use advisor_core::services::{
    spawn_maintenance, ChatOrchestrator, InMemoryKnowledgeBase, LlmService, RequestContext,
    ResponseCache, SessionManager,
};
use advisor_core::utils::telemetry::init_telemetry;
use advisor_core::utils::AdvisorError;

/// Interactive console: each line is a question, `/next_steps` style
/// lines trigger quick actions, Ctrl-C cancels the pending answer.
#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    let _guard = init_telemetry(&settings.logging)?;
    info!("Starting advisor console");

    let knowledge = match &settings.knowledge_base.path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading knowledge base {}", path))?;
            InMemoryKnowledgeBase::from_json(&raw)
                .with_context(|| format!("parsing knowledge base {}", path))?
        }
        None => InMemoryKnowledgeBase::default(),
    };
    info!("Knowledge base loaded ({} entries)", knowledge.len());

    let activity = ActivityLogger::tracing();
    let sessions = Arc::new(
        SessionManager::new(Arc::new(InMemorySessionStore::new()), &settings.session)
            .with_logger(activity.clone()),
    );
    let cache = Arc::new(ResponseCache::new(settings.cache.max_entries));
    let generator = Arc::new(LlmService::new(&settings.generation)?);

    let orchestrator = ChatOrchestrator::new(
        &settings,
        sessions.clone(),
        cache.clone(),
        Arc::new(knowledge),
        generator,
    )
    .with_logger(activity);

    let shutdown = CancellationToken::new();
    let maintenance = spawn_maintenance(sessions.clone(), cache, &settings.session, shutdown.clone());

    let user = std::env::var("ADVISOR_USER").unwrap_or_else(|_| "console".to_string());
    let client = std::env::args().nth(1).unwrap_or_default();
    let session = sessions.create(Session::new(user.clone()).with_client(client)).await?;
    info!("Session {} ready", session.id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        let request = match line.strip_prefix('/') {
            Some(action) => ChatRequest::new(action).with_quick_action(action),
            None => ChatRequest::new(line),
        };

        let ctx = RequestContext::new();
        let cancel = ctx.cancel.clone();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });

        let mut result = orchestrator
            .chat_for_session(&session.id, &user, request.clone(), &ctx)
            .await;
        // the idle sweep may have parked the session between lines
        if let Err(AdvisorError::SessionInvalid {
            status: SessionStatus::Inactive,
            ..
        }) = result
        {
            match sessions.refresh(&session.id, chrono::Duration::zero()).await {
                Ok(_) => {
                    info!("Session {} resumed after idle", session.id);
                    result = orchestrator
                        .chat_for_session(&session.id, &user, request, &ctx)
                        .await;
                }
                Err(e) => result = Err(e),
            }
        }

        match result {
            Ok(resp) => {
                println!("{}\n", resp.content);
                info!(
                    "model={} cached={} fallback={} {}ms",
                    resp.metadata.model,
                    resp.metadata.cached,
                    resp.metadata.fallback_used,
                    resp.metadata.processing_time_ms
                );
            }
            Err(AdvisorError::Cancelled) => println!("(cancelled)\n"),
            Err(e) => warn!("Request failed [{}]: {}", e.kind(), e),
        }
        ctrl_c.abort();
    }

    sessions.terminate(&session.id).await?;
    shutdown.cancel();
    maintenance.await?;
    info!("Advisor console stopped");
    Ok(())
}
