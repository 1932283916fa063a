//! Session lifecycle management.
//!
//! State machine: `Active -> Expired` (explicit or detected lazily from
//! `expires_at`), `Active -> Terminated`, `Active <-> Inactive` (idle sweep and
//! refresh). `Expired` and `Terminated` are terminal, and a session whose
//! `expires_at` has passed counts as `Expired` whatever its stored flag says.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::database::SessionStore;
use crate::logging::{ActivityLog, ActivityLogger, ActivityType};
use crate::models::session::{Session, SessionStats, SessionStatus};
use crate::utils::error::{AdvisorError, Result};

/// Statuses a session can still leave
const LIVE: &[SessionStatus] = &[SessionStatus::Active, SessionStatus::Inactive];

pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    default_duration: Duration,
    max_duration: Duration,
    logger: Option<ActivityLogger>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, cfg: &SessionConfig) -> Self {
        Self {
            store,
            default_duration: cfg.default_duration(),
            max_duration: cfg.max_duration(),
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: ActivityLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    fn log(&self, activity: ActivityLog) {
        if let Some(logger) = &self.logger {
            logger.log(activity);
        }
    }

    fn require_id(id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(AdvisorError::ValidationFailed("session id is required".to_string()));
        }
        Ok(())
    }

    async fn fetch(&self, id: &str, operation: &str) -> Result<Session> {
        Self::require_id(id)?;
        self.store
            .get_by_id(id)
            .await
            .map_err(|e| e.in_operation(operation))?
            .ok_or_else(|| AdvisorError::SessionNotFound(id.to_string()))
    }

    pub async fn create(&self, mut session: Session) -> Result<Session> {
        if session.user_id.trim().is_empty() {
            return Err(AdvisorError::ValidationFailed("user id is required".to_string()));
        }

        let now = Utc::now();
        if let Some(expires_at) = session.expires_at {
            if expires_at < now {
                return Err(AdvisorError::ValidationFailed(format!(
                    "expiration {} is in the past",
                    expires_at
                )));
            }
        }

        if session.id.trim().is_empty() {
            session.id = Uuid::new_v4().to_string();
        }
        session.created_at = now;
        session.updated_at = now;
        session.last_activity = now;
        session.status = SessionStatus::Active;
        session.expires_at = Some(session.expires_at.unwrap_or(now + self.default_duration));

        self.store
            .create(&session)
            .await
            .map_err(|e| e.in_operation("create session"))?;

        info!("Created session {} for user {}", session.id, session.user_id);
        self.log(
            ActivityLog::builder(ActivityType::SessionCreated)
                .session(Some(&session.id))
                .user(session.user_id.clone())
                .build(),
        );
        Ok(session)
    }

    pub async fn get(&self, id: &str) -> Result<Session> {
        self.fetch(id, "get session").await
    }

    pub async fn update(&self, mut session: Session) -> Result<Session> {
        Self::require_id(&session.id)?;
        session.updated_at = Utc::now();

        let found = self
            .store
            .update(&session)
            .await
            .map_err(|e| e.in_operation("update session"))?;
        if !found {
            return Err(AdvisorError::SessionNotFound(session.id));
        }
        Ok(session)
    }

    /// Deleting an unknown id is not an error
    pub async fn delete(&self, id: &str) -> Result<()> {
        Self::require_id(id)?;
        let removed = self
            .store
            .delete(id)
            .await
            .map_err(|e| e.in_operation("delete session"))?;
        debug!("Delete session {} (existed: {})", id, removed);
        Ok(())
    }

    pub async fn expire(&self, id: &str) -> Result<()> {
        self.transition(id, SessionStatus::Expired, ActivityType::SessionExpired)
            .await
    }

    pub async fn terminate(&self, id: &str) -> Result<()> {
        self.transition(id, SessionStatus::Terminated, ActivityType::SessionTerminated)
            .await
    }

    /// Move into a terminal state. Already-terminal sessions are left as they are.
    async fn transition(
        &self,
        id: &str,
        target: SessionStatus,
        activity: ActivityType,
    ) -> Result<()> {
        let operation = format!("{} session", target);
        let session = self.fetch(id, &operation).await?;
        if session.status.is_terminal() {
            debug!(
                "Session {} already {}, ignoring transition to {}",
                id, session.status, target
            );
            return Ok(());
        }

        let changed = self
            .store
            .update_status_if(id, LIVE, target)
            .await
            .map_err(|e| e.in_operation(&operation))?;
        if !changed {
            // lost a race with another terminal transition or a delete
            let current = self.fetch(id, &operation).await?;
            debug!(
                "Session {} became {} concurrently, ignoring transition to {}",
                id, current.status, target
            );
            return Ok(());
        }

        info!("Session {} transitioned {} -> {}", id, session.status, target);
        self.log(
            ActivityLog::builder(activity)
                .session(Some(id))
                .user(session.user_id)
                .build(),
        );
        Ok(())
    }

    /// Check ownership, expiry and status, in that order
    pub async fn validate(&self, id: &str, owner_id: &str) -> Result<Session> {
        let session = self.fetch(id, "validate session").await?;

        if session.user_id != owner_id {
            warn!("User {} attempted to use session {} owned by another user", owner_id, id);
            return Err(AdvisorError::Unauthorized(format!(
                "session {} does not belong to user {}",
                id, owner_id
            )));
        }

        if session.is_expired() {
            self.persist_expiry(&session).await;
            return Err(AdvisorError::SessionExpired(id.to_string()));
        }

        if session.status != SessionStatus::Active {
            return Err(AdvisorError::SessionInvalid {
                id: id.to_string(),
                status: session.status,
            });
        }

        Ok(session)
    }

    /// Best-effort write of `Expired` for a lapsed session still flagged live
    async fn persist_expiry(&self, session: &Session) {
        if session.status.is_terminal() {
            return;
        }
        match self
            .store
            .update_status_if(&session.id, LIVE, SessionStatus::Expired)
            .await
        {
            Ok(true) => self.log(
                ActivityLog::builder(ActivityType::SessionExpired)
                    .session(Some(&session.id))
                    .user(session.user_id.clone())
                    .build(),
            ),
            Ok(false) => {}
            Err(e) => warn!("Failed to persist lazy expiry of session {}: {}", session.id, e),
        }
    }

    /// Extend the session. Non-positive durations use the default, long ones
    /// are clamped to the maximum. Returns the new expiry.
    ///
    /// Terminal and lapsed sessions are never revived.
    pub async fn refresh(&self, id: &str, duration: Duration) -> Result<DateTime<Utc>> {
        let session = self.fetch(id, "refresh session").await?;
        if session.status.is_terminal() {
            return Err(AdvisorError::SessionInvalid {
                id: id.to_string(),
                status: session.status,
            });
        }
        if session.is_expired() {
            self.persist_expiry(&session).await;
            return Err(AdvisorError::SessionExpired(id.to_string()));
        }

        let duration = self.effective_duration(duration);
        let now = Utc::now();
        let expires_at = now + duration;

        self.store
            .set_expiration(id, expires_at)
            .await
            .map_err(|e| e.in_operation("refresh session"))?;

        // re-checks the status after the write; reactivates Inactive
        let live = self
            .store
            .update_status_if(id, LIVE, SessionStatus::Active)
            .await
            .map_err(|e| e.in_operation("reactivate session"))?;
        if !live {
            let current = self.fetch(id, "refresh session").await?;
            warn!("Session {} became {} during refresh", id, current.status);
            return Err(AdvisorError::SessionInvalid {
                id: id.to_string(),
                status: current.status,
            });
        }
        if session.status == SessionStatus::Inactive {
            info!("Session {} reactivated", id);
        }

        if let Err(e) = self.store.update_last_activity(id, now).await {
            warn!("Failed to update last activity for session {}: {}", id, e);
        }

        debug!("Session {} refreshed until {}", id, expires_at);
        Ok(expires_at)
    }

    fn effective_duration(&self, requested: Duration) -> Duration {
        if requested <= Duration::zero() {
            self.default_duration
        } else if requested > self.max_duration {
            self.max_duration
        } else {
            requested
        }
    }

    /// Last-activity bump. Only a blank id is an error; store failures are logged.
    pub async fn touch(&self, id: &str) -> Result<()> {
        Self::require_id(id)?;
        if let Err(e) = self.store.update_last_activity(id, Utc::now()).await {
            warn!("Failed to update last activity for session {}: {}", id, e);
        }
        Ok(())
    }

    /// Active sessions of a user, re-filtered against the clock
    pub async fn active_sessions_for(&self, user_id: &str) -> Result<Vec<Session>> {
        let now = Utc::now();
        let sessions = self
            .store
            .get_active_by_user(user_id)
            .await
            .map_err(|e| e.in_operation("list active sessions"))?;

        Ok(sessions
            .into_iter()
            .filter(|s| !s.is_expired_at(now))
            .collect())
    }

    pub async fn sessions_for(&self, user_id: &str) -> Result<Vec<Session>> {
        self.store
            .get_by_user(user_id)
            .await
            .map_err(|e| e.in_operation("list user sessions"))
    }

    pub async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Session>> {
        self.store
            .list(limit, offset)
            .await
            .map_err(|e| e.in_operation("list sessions"))
    }

    /// Mark sessions idle for longer than `threshold` as Inactive. Lapsed
    /// sessions are left for expiry.
    pub async fn mark_idle(&self, threshold: Duration) -> Result<u64> {
        let marked = self
            .store
            .mark_idle(Utc::now() - threshold)
            .await
            .map_err(|e| e.in_operation("mark idle sessions"))?;
        if marked > 0 {
            info!("Marked {} idle sessions inactive", marked);
        }
        Ok(marked)
    }

    pub async fn cleanup_expired(&self) -> Result<u64> {
        let removed = self
            .store
            .delete_expired(Utc::now())
            .await
            .map_err(|e| e.in_operation("cleanup expired sessions"))?;
        self.log_cleanup("expired", removed);
        Ok(removed)
    }

    pub async fn cleanup_inactive(&self, threshold: Duration) -> Result<u64> {
        let removed = self
            .store
            .delete_inactive(Utc::now() - threshold)
            .await
            .map_err(|e| e.in_operation("cleanup inactive sessions"))?;
        self.log_cleanup("inactive", removed);
        Ok(removed)
    }

    fn log_cleanup(&self, kind: &str, removed: u64) {
        if removed > 0 {
            info!("Cleaned up {} {} sessions", removed, kind);
        }
        self.log(
            ActivityLog::builder(ActivityType::Cleanup)
                .message(kind)
                .affected_rows(removed)
                .build(),
        );
    }

    /// Independent count queries; see `SessionStats` for the consistency caveat
    pub async fn stats(&self) -> Result<SessionStats> {
        let now = Utc::now();
        let (total, expired, per_status) = futures::try_join!(
            self.store.count(None),
            self.store.count_expired(now),
            futures::future::try_join_all(
                SessionStatus::ALL
                    .iter()
                    .map(|status| self.store.count(Some(*status)))
            ),
        )
        .map_err(|e| e.in_operation("session stats"))?;

        let by_status: BTreeMap<String, u64> = SessionStatus::ALL
            .iter()
            .zip(per_status)
            .map(|(status, count)| (status.as_str().to_string(), count))
            .collect();
        let active = by_status
            .get(SessionStatus::Active.as_str())
            .copied()
            .unwrap_or_default();

        Ok(SessionStats {
            total,
            active,
            expired,
            by_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{InMemorySessionStore, MockSessionStore};

    fn manager() -> (SessionManager, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::new());
        (SessionManager::new(store.clone(), &SessionConfig::default()), store)
    }

    fn stored(id: &str, user: &str, expires_in: Duration) -> Session {
        let mut s = Session::new(user);
        s.id = id.to_string();
        s.expires_at = Some(Utc::now() + expires_in);
        s
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let (mgr, _) = manager();
        let before = Utc::now();
        let session = mgr.create(Session::new("u1")).await.unwrap();

        assert!(!session.id.is_empty());
        assert_eq!(session.status, SessionStatus::Active);
        let expires_at = session.expires_at.unwrap();
        assert!(expires_at > Utc::now());
        assert!(expires_at >= before + Duration::hours(24));
        assert!(expires_at <= Utc::now() + Duration::hours(24));
    }

    #[tokio::test]
    async fn test_create_keeps_caller_id_and_expiry() {
        let (mgr, _) = manager();
        let expiry = Utc::now() + Duration::hours(2);
        let mut draft = Session::new("u1").with_expires_at(expiry);
        draft.id = "custom-id".to_string();

        let session = mgr.create(draft).await.unwrap();
        assert_eq!(session.id, "custom-id");
        assert_eq!(session.expires_at, Some(expiry));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (mgr, store) = manager();

        let err = mgr.create(Session::new("  ")).await.unwrap_err();
        assert!(matches!(err, AdvisorError::ValidationFailed(_)));

        let past = Session::new("u1").with_expires_at(Utc::now() - Duration::minutes(1));
        let err = mgr.create(past).await.unwrap_err();
        assert!(matches!(err, AdvisorError::ValidationFailed(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_create_wraps_store_failure() {
        let mut store = MockSessionStore::new();
        store
            .expect_create()
            .returning(|_| Err(AdvisorError::DatabaseError("disk full".to_string())));
        let mgr = SessionManager::new(Arc::new(store), &SessionConfig::default());

        let err = mgr.create(Session::new("u1")).await.unwrap_err();
        match err {
            AdvisorError::DatabaseError(msg) => assert_eq!(msg, "create session: disk full"),
            other => panic!("expected DatabaseError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_errors() {
        let (mgr, _) = manager();
        assert!(matches!(
            mgr.get("").await.unwrap_err(),
            AdvisorError::ValidationFailed(_)
        ));
        assert!(matches!(
            mgr.get("missing").await.unwrap_err(),
            AdvisorError::SessionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at() {
        let (mgr, _) = manager();
        let mut session = mgr.create(Session::new("u1")).await.unwrap();
        let created = session.updated_at;
        session.client_name = "Globex".to_string();

        let updated = mgr.update(session).await.unwrap();
        assert!(updated.updated_at >= created);
        assert_eq!(mgr.get(&updated.id).await.unwrap().client_name, "Globex");

        let mut ghost = Session::new("u1");
        ghost.id = "ghost".to_string();
        assert!(matches!(
            mgr.update(ghost).await.unwrap_err(),
            AdvisorError::SessionNotFound(_)
        ));
        assert!(matches!(
            mgr.update(Session::new("u1")).await.unwrap_err(),
            AdvisorError::ValidationFailed(_)
        ));
    }

    #[tokio::test]
    async fn test_validate_order_unauthorized_before_expired() {
        let (mgr, store) = manager();
        store
            .create(&stored("s1", "u1", Duration::minutes(-5)))
            .await
            .unwrap();

        let err = mgr.validate("s1", "wrong-user").await.unwrap_err();
        assert!(matches!(err, AdvisorError::Unauthorized(_)));

        let err = mgr.validate("s1", "u1").await.unwrap_err();
        assert!(matches!(err, AdvisorError::SessionExpired(_)));
        // lazily persisted
        let s = store.get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(s.status, SessionStatus::Expired);
    }

    #[tokio::test]
    async fn test_validate_status_checks() {
        let (mgr, _) = manager();
        let session = mgr.create(Session::new("u1")).await.unwrap();
        assert!(mgr.validate(&session.id, "u1").await.is_ok());

        mgr.terminate(&session.id).await.unwrap();
        let err = mgr.validate(&session.id, "u1").await.unwrap_err();
        assert!(matches!(
            err,
            AdvisorError::SessionInvalid { status: SessionStatus::Terminated, .. }
        ));

        assert!(matches!(
            mgr.validate("missing", "u1").await.unwrap_err(),
            AdvisorError::SessionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_status_operations_are_idempotent() {
        let (mgr, store) = manager();
        let session = mgr.create(Session::new("u1")).await.unwrap();

        mgr.expire(&session.id).await.unwrap();
        mgr.expire(&session.id).await.unwrap();
        // terminal: terminate is a no-op
        mgr.terminate(&session.id).await.unwrap();
        let s = store.get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(s.status, SessionStatus::Expired);

        mgr.delete(&session.id).await.unwrap();
        mgr.delete(&session.id).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_clamps_to_max() {
        let (mgr, _) = manager();
        let session = mgr.create(Session::new("u1")).await.unwrap();

        let expires_at = mgr.refresh(&session.id, Duration::days(365)).await.unwrap();
        assert!(expires_at <= Utc::now() + Duration::days(7));
        assert!(expires_at > Utc::now() + Duration::days(7) - Duration::minutes(1));

        let expires_at = mgr.refresh(&session.id, Duration::zero()).await.unwrap();
        assert!(expires_at <= Utc::now() + Duration::hours(24));
        assert!(expires_at > Utc::now() + Duration::hours(23));

        let expires_at = mgr.refresh(&session.id, Duration::hours(-3)).await.unwrap();
        assert!(expires_at > Utc::now() + Duration::hours(23));
    }

    #[tokio::test]
    async fn test_refresh_rejects_terminal_sessions() {
        let (mgr, _) = manager();
        let session = mgr.create(Session::new("u1")).await.unwrap();
        mgr.terminate(&session.id).await.unwrap();

        let err = mgr.refresh(&session.id, Duration::hours(1)).await.unwrap_err();
        assert!(matches!(err, AdvisorError::SessionInvalid { .. }));
    }

    #[tokio::test]
    async fn test_refresh_survives_last_activity_failure() {
        let mut store = MockSessionStore::new();
        store
            .expect_get_by_id()
            .returning(|id| Ok(Some(stored(id, "u1", Duration::hours(1)))));
        store.expect_set_expiration().times(1).returning(|_, _| Ok(true));
        store
            .expect_update_status_if()
            .times(1)
            .returning(|_, _, _| Ok(true));
        store
            .expect_update_last_activity()
            .times(1)
            .returning(|_, _| Err(AdvisorError::DatabaseError("timeout".to_string())));
        let mgr = SessionManager::new(Arc::new(store), &SessionConfig::default());

        assert!(mgr.refresh("s1", Duration::hours(2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_loses_to_concurrent_terminate() {
        let mut store = MockSessionStore::new();
        let mut inactive = stored("s1", "u1", Duration::hours(1));
        inactive.status = SessionStatus::Inactive;
        let mut terminated = inactive.clone();
        terminated.status = SessionStatus::Terminated;

        // second read sees the terminate that landed mid-refresh
        let mut reads = vec![terminated, inactive];
        store
            .expect_get_by_id()
            .times(2)
            .returning(move |_| Ok(reads.pop()));
        store.expect_set_expiration().times(1).returning(|_, _| Ok(true));
        store
            .expect_update_status_if()
            .withf(|_, from, to| from.contains(&SessionStatus::Inactive) && *to == SessionStatus::Active)
            .times(1)
            .returning(|_, _, _| Ok(false));
        store.expect_update_status().never();
        store.expect_update_last_activity().never();
        let mgr = SessionManager::new(Arc::new(store), &SessionConfig::default());

        let err = mgr.refresh("s1", Duration::hours(2)).await.unwrap_err();
        assert!(matches!(
            err,
            AdvisorError::SessionInvalid { status: SessionStatus::Terminated, .. }
        ));
    }

    #[tokio::test]
    async fn test_refresh_rejects_lapsed_active_session() {
        let (mgr, store) = manager();
        store
            .create(&stored("s1", "u1", Duration::hours(-1)))
            .await
            .unwrap();

        let err = mgr.refresh("s1", Duration::hours(2)).await.unwrap_err();
        assert!(matches!(err, AdvisorError::SessionExpired(_)));

        let s = store.get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(s.status, SessionStatus::Expired);
        assert!(s.is_expired());
        assert!(matches!(
            mgr.validate("s1", "u1").await.unwrap_err(),
            AdvisorError::SessionExpired(_)
        ));
    }

    #[tokio::test]
    async fn test_lapsed_session_stays_terminal() {
        let (mgr, store) = manager();
        store
            .create(&stored("idle", "u1", Duration::minutes(-1)))
            .await
            .unwrap();
        store
            .create(&stored("ended", "u1", Duration::minutes(-1)))
            .await
            .unwrap();

        // not idled, so refresh has nothing to reactivate
        assert_eq!(mgr.mark_idle(Duration::seconds(-1)).await.unwrap(), 0);
        assert!(mgr.refresh("idle", Duration::hours(1)).await.is_err());

        mgr.terminate("ended").await.unwrap();
        let err = mgr.refresh("ended", Duration::hours(1)).await.unwrap_err();
        assert!(matches!(
            err,
            AdvisorError::SessionInvalid { status: SessionStatus::Terminated, .. }
        ));
        // expire after terminate keeps the first terminal state
        mgr.expire("ended").await.unwrap();
        let s = store.get_by_id("ended").await.unwrap().unwrap();
        assert_eq!(s.status, SessionStatus::Terminated);
    }

    #[tokio::test]
    async fn test_transition_does_not_overwrite_concurrent_terminal_state() {
        let mut store = MockSessionStore::new();
        let mut expired = stored("s1", "u1", Duration::hours(1));
        let live = expired.clone();
        expired.status = SessionStatus::Expired;

        let mut reads = vec![expired, live];
        store
            .expect_get_by_id()
            .times(2)
            .returning(move |_| Ok(reads.pop()));
        store
            .expect_update_status_if()
            .times(1)
            .returning(|_, _, _| Ok(false));
        store.expect_update_status().never();
        let mgr = SessionManager::new(Arc::new(store), &SessionConfig::default());

        mgr.terminate("s1").await.unwrap();
    }

    #[tokio::test]
    async fn test_touch_requires_id() {
        let mut store = MockSessionStore::new();
        store.expect_update_last_activity().never();
        let mgr = SessionManager::new(Arc::new(store), &SessionConfig::default());

        assert!(matches!(
            mgr.touch("  ").await.unwrap_err(),
            AdvisorError::ValidationFailed(_)
        ));
    }

    #[tokio::test]
    async fn test_idle_sessions_become_inactive_and_refresh_reactivates() {
        let (mgr, store) = manager();
        let session = mgr.create(Session::new("u1")).await.unwrap();

        assert_eq!(mgr.mark_idle(Duration::seconds(-1)).await.unwrap(), 1);
        let err = mgr.validate(&session.id, "u1").await.unwrap_err();
        assert!(matches!(
            err,
            AdvisorError::SessionInvalid { status: SessionStatus::Inactive, .. }
        ));

        mgr.refresh(&session.id, Duration::hours(1)).await.unwrap();
        let s = store.get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(s.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_active_sessions_filters_lapsed() {
        let (mgr, store) = manager();
        store.create(&stored("live", "u1", Duration::hours(1))).await.unwrap();
        store.create(&stored("lapsed", "u1", Duration::minutes(-1))).await.unwrap();

        let active = mgr.active_sessions_for("u1").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "live");
    }

    #[tokio::test]
    async fn test_cleanup_is_repeatable() {
        let (mgr, store) = manager();
        store.create(&stored("lapsed", "u1", Duration::minutes(-1))).await.unwrap();
        mgr.create(Session::new("u1")).await.unwrap();

        assert_eq!(mgr.cleanup_expired().await.unwrap(), 1);
        assert_eq!(mgr.cleanup_expired().await.unwrap(), 0);
        assert_eq!(mgr.cleanup_inactive(Duration::hours(1)).await.unwrap(), 0);
        assert_eq!(mgr.cleanup_inactive(Duration::seconds(-1)).await.unwrap(), 1);
        assert_eq!(mgr.cleanup_inactive(Duration::seconds(-1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let (mgr, store) = manager();
        mgr.create(Session::new("u1")).await.unwrap();
        let t = mgr.create(Session::new("u2")).await.unwrap();
        mgr.terminate(&t.id).await.unwrap();
        store.create(&stored("lapsed", "u1", Duration::minutes(-1))).await.unwrap();

        let stats = mgr.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        // lapsed session still flagged Active in the store
        assert_eq!(stats.active, 2);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.by_status.get("terminated"), Some(&1));
        assert_eq!(stats.by_status.get("inactive"), Some(&0));
    }
}
