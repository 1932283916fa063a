use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::chat::SessionContext;

pub type SessionId = String;

/// Metadata keys the orchestrator reads back out of a session
pub mod keys {
    pub const SERVICE_TYPES: &str = "service_types";
    pub const CLOUD_PROVIDERS: &str = "cloud_providers";
    pub const INDUSTRY: &str = "industry";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Inactive,
    Expired,
    Terminated,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 4] = [
        SessionStatus::Active,
        SessionStatus::Inactive,
        SessionStatus::Expired,
        SessionStatus::Terminated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Expired => "expired",
            Self::Terminated => "terminated",
        }
    }

    /// Expired and Terminated admit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Terminated)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primitive values allowed in session metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// String-keyed metadata bag with typed accessors.
/// A lookup with the wrong type returns `None` instead of panicking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionMetadata(BTreeMap<String, MetadataValue>);

impl SessionMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<MetadataValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(MetadataValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(MetadataValue::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen to floats
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(MetadataValue::Float(v)) => Some(*v),
            Some(MetadataValue::Integer(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(MetadataValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    /// Comma-separated text value split into trimmed, non-empty items
    pub fn text_list(&self, key: &str) -> Vec<String> {
        self.get_str(key)
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Advisory session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: String,
    pub client_name: String,
    pub context: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub metadata: SessionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Unsaved session draft; `SessionManager::create` fills in the rest
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            user_id: user_id.into(),
            client_name: String::new(),
            context: String::new(),
            status: SessionStatus::Active,
            metadata: SessionMetadata::new(),
            created_at: now,
            updated_at: now,
            last_activity: now,
            expires_at: None,
        }
    }

    pub fn with_client(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_metadata(mut self, metadata: SessionMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now > at).unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Project the session into the prompt-building context
    pub fn chat_context(&self) -> SessionContext {
        SessionContext {
            client_name: self.client_name.clone(),
            meeting_context: self.context.clone(),
            service_types: self.metadata.text_list(keys::SERVICE_TYPES),
            cloud_providers: self.metadata.text_list(keys::CLOUD_PROVIDERS),
            industry: self.metadata.get_str(keys::INDUSTRY).map(str::to_string),
        }
    }
}

/// Aggregated session counts. Parts are read independently and may not sum
/// exactly to `total` under concurrent writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total: u64,
    pub active: u64,
    pub expired: u64,
    pub by_status: BTreeMap<String, u64>,
}
