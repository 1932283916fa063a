use anyhow::{bail, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub session: SessionConfig,
    pub cache: CacheConfig,
    pub optimizer: OptimizerConfig,
    pub quality: QualityConfig,
    pub generation: GenerationConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub default_duration_hours: i64,
    pub max_duration_hours: i64,
    pub idle_timeout_minutes: i64,
    /// Interval of the background expiry/idle sweep
    pub sweep_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_duration_hours: 24,
            max_duration_hours: 24 * 7,
            idle_timeout_minutes: 60,
            sweep_interval_seconds: 300,
        }
    }
}

impl SessionConfig {
    pub fn default_duration(&self) -> chrono::Duration {
        chrono::Duration::hours(self.default_duration_hours)
    }

    pub fn max_duration(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_duration_hours)
    }

    pub fn idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.idle_timeout_minutes)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl_seconds: 3600,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Maximum prompt length in characters
    pub max_length: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { max_length: 4000 }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct QualityConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub banned_phrases: Vec<String>,
    /// Regex alternatives; at least one must match
    pub required_patterns: Vec<String>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_length: 20,
            max_length: 2000,
            banned_phrases: vec![
                "as an ai language model".to_string(),
                "i cannot help with that".to_string(),
                "i don't have access to".to_string(),
                "lorem ipsum".to_string(),
                "[insert".to_string(),
            ],
            required_patterns: vec![
                r"\b(cloud|aws|azure|gcp|kubernetes|k8s|devops|ci/cd)\b".to_string(),
                r"\b(migrat\w*|moderni[sz]\w*|architect\w*|infrastructure|platform)\b".to_string(),
                r"\b(cost\w*|pric\w*|budget|roi|tco|saving\w*)\b".to_string(),
                r"\b(secur\w*|complian\w*|governance|risk)\b".to_string(),
                r"\b(service\w*|solution\w*|recommend\w*|approach|strategy|timeline|phase\w*)\b"
                    .to_string(),
            ],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_seconds: u64,
    pub max_concurrency: usize,
    pub acquire_timeout_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            api_key: None,
            model: "advisor-default".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            top_p: 0.9,
            timeout_seconds: 60,
            max_concurrency: 8,
            acquire_timeout_ms: 5000,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    pub max_offerings: usize,
    pub max_solutions: usize,
    /// JSON file with `offerings` and `solutions` arrays
    pub path: Option<String>,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            max_offerings: 3,
            max_solutions: 2,
            path: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when RUST_LOG is unset
    pub level: String,
    pub json: bool,
    /// Daily rolling log files are written here when set
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,advisor_core=debug".to_string(),
            json: true,
            directory: None,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("ADVISOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.max_entries == 0 {
            bail!("cache.max_entries must be greater than zero");
        }
        if self.quality.min_length >= self.quality.max_length {
            bail!(
                "quality.min_length ({}) must be below quality.max_length ({})",
                self.quality.min_length,
                self.quality.max_length
            );
        }
        if self.session.default_duration_hours <= 0
            || self.session.default_duration_hours > self.session.max_duration_hours
        {
            bail!(
                "session.default_duration_hours ({}) must be within 1..={}",
                self.session.default_duration_hours,
                self.session.max_duration_hours
            );
        }
        if self.optimizer.max_length == 0 {
            bail!("optimizer.max_length must be greater than zero");
        }
        Ok(())
    }
}
