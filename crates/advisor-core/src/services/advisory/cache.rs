use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::chat::ChatRequest;

/// Previously generated answer
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub content: String,
    /// Opaque to the cache; the orchestrator stores `ResponseMetadata` here
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub tokens_used: u32,
}

impl CachedResponse {
    pub fn new(
        content: impl Into<String>,
        metadata: serde_json::Value,
        tokens_used: u32,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            content: content.into(),
            metadata,
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            tokens_used,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

struct Slot {
    response: CachedResponse,
    /// Insertion sequence, breaks `created_at` ties
    seq: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Slot>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Inner {
    /// Remove the entry with the earliest creation time
    fn evict_oldest(&mut self) -> Option<String> {
        let oldest = self
            .entries
            .iter()
            .min_by(|(_, a), (_, b)| {
                a.response
                    .created_at
                    .cmp(&b.response.created_at)
                    .then(a.seq.cmp(&b.seq))
            })
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&oldest);
        self.evictions += 1;
        Some(oldest)
    }
}

/// Bounded, time-expiring response cache.
///
/// Eviction is FIFO by creation time: when full, the entry created first
/// goes, regardless of how recently it was read. Every operation runs under
/// one mutex, so the capacity check and the insert are a single atomic step.
pub struct ResponseCache {
    inner: Mutex<Inner>,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        info!("Initializing response cache (capacity {})", max_entries);
        Self {
            inner: Mutex::new(Inner::default()),
            max_entries: max_entries.max(1),
        }
    }

    /// Live entry for `key`. Expired entries are removed and count as a miss.
    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let now = Utc::now();
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(key) {
            Some(slot) if !slot.response.is_expired_at(now) => {
                let response = slot.response.clone();
                inner.hits += 1;
                debug!("Cache hit for {}", short(key));
                return Some(response);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.remove(key);
            debug!("Cache entry {} expired, removed", short(key));
        }
        inner.misses += 1;
        None
    }

    pub fn set(&self, key: impl Into<String>, response: CachedResponse) {
        let key = key.into();
        let mut inner = self.inner.lock();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_entries {
            if let Some(evicted) = inner.evict_oldest() {
                debug!("Cache full, evicted {}", short(&evicted));
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(key, Slot { response, seq });
    }

    pub fn remove(&self, key: &str) -> Option<CachedResponse> {
        self.inner.lock().entries.remove(key).map(|slot| slot.response)
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, slot| !slot.response.is_expired_at(now));
        let removed = before - inner.entries.len();
        if removed > 0 {
            info!("Purged {} expired cache entries", removed);
        }
        removed
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let lookups = inner.hits + inner.misses;
        CacheStats {
            size: inner.entries.len(),
            capacity: self.max_entries,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
}

fn short(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// SHA-256 fingerprint of the normalized request fields.
/// Each field is length-prefixed so field boundaries cannot shift.
pub fn fingerprint(request: &ChatRequest) -> String {
    let mut service_types: Vec<String> = request
        .session
        .service_types
        .iter()
        .map(|s| normalize(s))
        .filter(|s| !s.is_empty())
        .collect();
    service_types.sort();

    let fields = [
        normalize(&request.content),
        normalize(&request.session.client_name),
        request
            .quick_action
            .as_deref()
            .map(normalize)
            .unwrap_or_default(),
    ];

    let mut hasher = Sha256::new();
    for field in &fields {
        hash_field(&mut hasher, field);
    }
    hasher.update((service_types.len() as u64).to_be_bytes());
    for service_type in &service_types {
        hash_field(&mut hasher, service_type);
    }
    hex::encode(hasher.finalize())
}

fn hash_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_be_bytes());
    hasher.update(field.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::SessionContext;

    fn response(content: &str, ttl: Duration) -> CachedResponse {
        CachedResponse::new(content, serde_json::Value::Null, 42, ttl)
    }

    #[test]
    fn test_set_then_get_returns_content() {
        let cache = ResponseCache::new(10);
        cache.set("k1", response("Migrate the billing service first.", Duration::from_secs(60)));

        let hit = cache.get("k1").unwrap();
        assert_eq!(hit.content, "Migrate the billing service first.");
        assert_eq!(hit.tokens_used, 42);
        assert!(cache.get("unknown").is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let cache = ResponseCache::new(10);
        cache.set("k1", response("stale", Duration::from_millis(20)));
        std::thread::sleep(Duration::from_millis(40));

        assert!(cache.get("k1").is_none());
        assert_eq!(cache.len(), 0);
        assert!(cache.get("k1").is_none());
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_capacity_evicts_earliest_created() {
        let cache = ResponseCache::new(3);
        for key in ["a", "b", "c"] {
            cache.set(key, response(key, Duration::from_secs(60)));
        }
        // reading "a" does not protect it
        assert!(cache.get("a").is_some());

        cache.set("d", response("d", Duration::from_secs(60)));
        assert_eq!(cache.len(), 3);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("d").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = ResponseCache::new(2);
        cache.set("a", response("a1", Duration::from_secs(60)));
        cache.set("b", response("b", Duration::from_secs(60)));
        cache.set("a", response("a2", Duration::from_secs(60)));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").unwrap().content, "a2");
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_size_bounded_under_concurrent_sets() {
        let cache = std::sync::Arc::new(ResponseCache::new(16));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        cache.set(
                            format!("{}-{}", t, i),
                            response("x", Duration::from_secs(60)),
                        );
                        assert!(cache.len() <= 16);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 16);
    }

    #[test]
    fn test_purge_expired() {
        let cache = ResponseCache::new(10);
        cache.set("old", response("old", Duration::from_millis(10)));
        cache.set("new", response("new", Duration::from_secs(60)));
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fingerprint_distinguishes_equal_length_content() {
        let a = ChatRequest::new("What does migration cost?");
        let b = ChatRequest::new("What does security cost?!");
        assert_eq!(a.content.len(), b.content.len());
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_normalizes() {
        let session = SessionContext {
            client_name: "Acme".to_string(),
            service_types: vec!["security".to_string(), "migration".to_string()],
            ..Default::default()
        };
        let a = ChatRequest::new("  What about   COST? ").with_session(session.clone());
        let mut reordered = session.clone();
        reordered.client_name = "acme ".to_string();
        reordered.service_types.reverse();
        let b = ChatRequest::new("what about cost?").with_session(reordered);
        assert_eq!(fingerprint(&a), fingerprint(&b));

        let c = ChatRequest::new("what about cost?")
            .with_session(session)
            .with_quick_action("next_steps");
        assert_ne!(fingerprint(&a), fingerprint(&c));
        assert_eq!(fingerprint(&a).len(), 64);
    }

    #[test]
    fn test_fingerprint_field_boundaries() {
        let a = ChatRequest::new("ab").with_session(SessionContext {
            client_name: "c".to_string(),
            ..Default::default()
        });
        let b = ChatRequest::new("a").with_session(SessionContext {
            client_name: "bc".to_string(),
            ..Default::default()
        });
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_service_type_boundaries() {
        let with_types = |types: &[&str]| {
            ChatRequest::new("scope?").with_session(SessionContext {
                service_types: types.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            })
        };
        let joined = fingerprint(&with_types(&["a,b"]));
        let split = fingerprint(&with_types(&["a", "b"]));
        assert_ne!(joined, split);
        assert_ne!(
            fingerprint(&with_types(&["ab"])),
            fingerprint(&with_types(&["a", "b"]))
        );
    }
}
