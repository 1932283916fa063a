pub mod advisory;
pub mod knowledge_base;
pub mod llm_service;
pub mod maintenance;
pub mod query_analyzer;
pub mod session_manager;

pub use advisory::{ChatOrchestrator, RequestContext, ResponseCache};
pub use knowledge_base::{InMemoryKnowledgeBase, KnowledgeBase};
pub use llm_service::{GenerationOptions, GenerationOutput, GenerationService, LlmService};
pub use maintenance::{run_sweep, spawn_maintenance, SweepReport};
pub use query_analyzer::QueryAnalyzer;
pub use session_manager::SessionManager;
