use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use super::store::SessionStore;
use crate::models::session::{Session, SessionStatus};
use crate::utils::error::{AdvisorError, Result};

/// In-process session store backed by DashMap
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn remove_where(&self, predicate: impl Fn(&Session) -> bool) -> u64 {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !predicate(session));
        before.saturating_sub(self.sessions.len()) as u64
    }

    fn modify(&self, id: &str, f: impl FnOnce(&mut Session)) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                f(entry.value_mut());
                entry.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: &Session) -> Result<()> {
        match self.sessions.entry(session.id.clone()) {
            Entry::Occupied(_) => Err(AdvisorError::DatabaseError(format!(
                "duplicate session id {}",
                session.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                debug!("Stored session {}", session.id);
                Ok(())
            }
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|entry| entry.value().clone()))
    }

    async fn update(&self, session: &Session) -> Result<bool> {
        match self.sessions.get_mut(&session.id) {
            Some(mut entry) => {
                *entry.value_mut() = session.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.sessions.remove(id).is_some())
    }

    async fn get_by_user(&self, user_id: &str) -> Result<Vec<Session>> {
        Ok(self
            .sessions
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get_active_by_user(&self, user_id: &str) -> Result<Vec<Session>> {
        Ok(self
            .sessions
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.status == SessionStatus::Active)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Session>> {
        let mut all: Vec<Session> = self.sessions.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, status: Option<SessionStatus>) -> Result<u64> {
        let count = match status {
            None => self.sessions.len(),
            Some(status) => self.sessions.iter().filter(|e| e.status == status).count(),
        };
        Ok(count as u64)
    }

    async fn count_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        Ok(self
            .sessions
            .iter()
            .filter(|e| e.status == SessionStatus::Expired || e.is_expired_at(now))
            .count() as u64)
    }

    async fn update_status(&self, id: &str, status: SessionStatus) -> Result<bool> {
        Ok(self.modify(id, |session| session.status = status))
    }

    async fn update_status_if(
        &self,
        id: &str,
        from: &[SessionStatus],
        to: SessionStatus,
    ) -> Result<bool> {
        // the shard lock is held across check and write
        match self.sessions.get_mut(id) {
            Some(mut entry) if from.contains(&entry.status) => {
                entry.status = to;
                entry.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_last_activity(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        Ok(self.modify(id, |session| session.last_activity = at))
    }

    async fn set_expiration(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        Ok(self.modify(id, |session| session.expires_at = Some(expires_at)))
    }

    async fn mark_idle(&self, idle_since: DateTime<Utc>) -> Result<u64> {
        let mut marked = 0u64;
        let now = Utc::now();
        for mut entry in self.sessions.iter_mut() {
            if entry.status == SessionStatus::Active
                && entry.last_activity < idle_since
                && !entry.is_expired_at(now)
            {
                entry.status = SessionStatus::Inactive;
                entry.updated_at = now;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        Ok(self.remove_where(|s| s.status == SessionStatus::Expired || s.is_expired_at(now)))
    }

    async fn delete_inactive(&self, idle_since: DateTime<Utc>) -> Result<u64> {
        Ok(self.remove_where(|s| s.last_activity < idle_since))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(id: &str, user: &str) -> Session {
        let mut s = Session::new(user);
        s.id = id.to_string();
        s.expires_at = Some(Utc::now() + Duration::hours(1));
        s
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let store = InMemorySessionStore::new();
        store.create(&session("s1", "u1")).await.unwrap();
        let err = store.create(&session("s1", "u1")).await.unwrap_err();
        assert!(matches!(err, AdvisorError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn test_active_by_user_filters_on_flag_only() {
        let store = InMemorySessionStore::new();
        let mut lapsed = session("s2", "u1");
        lapsed.expires_at = Some(Utc::now() - Duration::minutes(5));
        store.create(&session("s1", "u1")).await.unwrap();
        store.create(&lapsed).await.unwrap();
        store.create(&session("s3", "u2")).await.unwrap();
        store.update_status("s3", SessionStatus::Terminated).await.unwrap();

        let active = store.get_active_by_user("u1").await.unwrap();
        assert_eq!(active.len(), 2);
        assert!(store.get_active_by_user("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_deletes_are_repeatable() {
        let store = InMemorySessionStore::new();
        let mut lapsed = session("old", "u1");
        lapsed.expires_at = Some(Utc::now() - Duration::minutes(1));
        store.create(&lapsed).await.unwrap();
        store.create(&session("fresh", "u1")).await.unwrap();

        assert_eq!(store.delete_expired(Utc::now()).await.unwrap(), 1);
        assert_eq!(store.delete_expired(Utc::now()).await.unwrap(), 0);
        assert_eq!(store.len(), 1);

        let cutoff = Utc::now() + Duration::seconds(1);
        assert_eq!(store.delete_inactive(cutoff).await.unwrap(), 1);
        assert_eq!(store.delete_inactive(cutoff).await.unwrap(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_mark_idle_only_touches_active() {
        let store = InMemorySessionStore::new();
        store.create(&session("a", "u1")).await.unwrap();
        store.create(&session("t", "u1")).await.unwrap();
        store.update_status("t", SessionStatus::Terminated).await.unwrap();

        let cutoff = Utc::now() + Duration::seconds(1);
        assert_eq!(store.mark_idle(cutoff).await.unwrap(), 1);
        let a = store.get_by_id("a").await.unwrap().unwrap();
        assert_eq!(a.status, SessionStatus::Inactive);
        let t = store.get_by_id("t").await.unwrap().unwrap();
        assert_eq!(t.status, SessionStatus::Terminated);
    }

    #[tokio::test]
    async fn test_mark_idle_skips_lapsed_sessions() {
        let store = InMemorySessionStore::new();
        let mut lapsed = session("lapsed", "u1");
        lapsed.expires_at = Some(Utc::now() - Duration::minutes(1));
        store.create(&lapsed).await.unwrap();

        let cutoff = Utc::now() + Duration::seconds(1);
        assert_eq!(store.mark_idle(cutoff).await.unwrap(), 0);
        let s = store.get_by_id("lapsed").await.unwrap().unwrap();
        assert_eq!(s.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_update_status_if_checks_current_status() {
        let store = InMemorySessionStore::new();
        store.create(&session("s1", "u1")).await.unwrap();
        let live = [SessionStatus::Active, SessionStatus::Inactive];

        assert!(store
            .update_status_if("s1", &live, SessionStatus::Terminated)
            .await
            .unwrap());
        // already terminal: neither expire nor reactivate may overwrite it
        assert!(!store
            .update_status_if("s1", &live, SessionStatus::Expired)
            .await
            .unwrap());
        assert!(!store
            .update_status_if("s1", &[SessionStatus::Inactive], SessionStatus::Active)
            .await
            .unwrap());
        let s = store.get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(s.status, SessionStatus::Terminated);

        assert!(!store
            .update_status_if("nope", &live, SessionStatus::Expired)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_modify_missing_reports_false() {
        let store = InMemorySessionStore::new();
        assert!(!store.update_status("nope", SessionStatus::Expired).await.unwrap());
        assert!(!store.set_expiration("nope", Utc::now()).await.unwrap());
        assert!(!store.delete("nope").await.unwrap());
    }
}
