pub mod cache;
pub mod context_builder;
pub mod optimizer;
pub mod orchestrator;
pub mod quality;
pub mod quick_actions;

pub use cache::{fingerprint, CacheStats, CachedResponse, ResponseCache};
pub use context_builder::{ContextBuilder, KnowledgeContext};
pub use optimizer::{CompressionStats, PromptOptimizer};
pub use orchestrator::{ChatOrchestrator, RequestContext};
pub use quality::QualityFilter;
pub use quick_actions::QuickAction;
