//! Session persistence port

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::session::{Session, SessionStatus};
use crate::utils::error::Result;

/// Persistence collaborator for session records.
///
/// Implementations own their own synchronization; the session manager keeps
/// no mutable state of its own. Failures surface as `AdvisorError::DatabaseError`.
/// Mutating calls report `false` when the id does not exist.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: &Session) -> Result<()>;
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;
    async fn update(&self, session: &Session) -> Result<bool>;
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn get_by_user(&self, user_id: &str) -> Result<Vec<Session>>;
    /// Sessions flagged `Active`; the flag may lag behind `expires_at`
    async fn get_active_by_user(&self, user_id: &str) -> Result<Vec<Session>>;
    /// Newest first
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Session>>;
    /// `None` counts every session
    async fn count(&self, status: Option<SessionStatus>) -> Result<u64>;
    /// Sessions flagged `Expired` or whose `expires_at` is before `now`
    async fn count_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    async fn update_status(&self, id: &str, status: SessionStatus) -> Result<bool>;
    /// Atomically set `to` only while the current status is one of `from`.
    /// `false` when the id is missing or the status no longer matches.
    async fn update_status_if(
        &self,
        id: &str,
        from: &[SessionStatus],
        to: SessionStatus,
    ) -> Result<bool>;
    async fn update_last_activity(&self, id: &str, at: DateTime<Utc>) -> Result<bool>;
    async fn set_expiration(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool>;

    /// Move `Active`, unexpired sessions idle since before `idle_since` to `Inactive`
    async fn mark_idle(&self, idle_since: DateTime<Utc>) -> Result<u64>;
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
    /// Delete sessions whose last activity is before `idle_since`
    async fn delete_inactive(&self, idle_since: DateTime<Utc>) -> Result<u64>;
}
