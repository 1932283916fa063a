pub mod chat;
pub mod knowledge;
pub mod session;

pub use chat::{ChatMessage, ChatRequest, ChatResponse, ResponseMetadata, SessionContext, TokenUsage};
pub use knowledge::{KnowledgeEntry, PastSolution, ServiceOffering};
pub use session::{MetadataValue, Session, SessionId, SessionMetadata, SessionStats, SessionStatus};
