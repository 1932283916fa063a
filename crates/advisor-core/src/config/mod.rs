pub mod settings;

pub use settings::{
    CacheConfig, GenerationConfig, KnowledgeBaseConfig, LoggingConfig, OptimizerConfig,
    QualityConfig, SessionConfig, Settings,
};
