//! Session registry used by the HTTP shell.
//!
//! Each session is owned by exactly one entry and guarded by its own async
//! mutex: actions on one session run one after another, while different
//! sessions proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chat::session::SessionState;

pub type SessionHandle = Arc<Mutex<SessionState>>;

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new session seeded with the greeting.
    pub async fn create(&self) -> (Uuid, SessionHandle) {
        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(SessionState::new()));
        self.sessions.write().await.insert(id, handle.clone());
        debug!("Session {id} started");
        (id, handle)
    }

    /// Looks up a session and marks it active.
    ///
    /// The touch happens under the map's read lock, which excludes
    /// `evict_idle`, so a session handed out here cannot be reaped before the
    /// caller gets to lock it.
    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        let handle = sessions.get(&id)?;
        if let Ok(mut state) = handle.try_lock() {
            state.touch();
        }
        Some(handle.clone())
    }

    /// Ends a session. Its state is dropped once the last in-flight action
    /// holding the handle finishes.
    pub async fn end(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            debug!("Session {id} ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Ends every session idle for longer than `max_idle`. Sessions busy with
    /// an action are skipped; they are active by definition.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_idle) else {
            warn!("Idle timeout {max_idle} is out of range; skipping eviction");
            return 0;
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(state) => state.last_active() >= cutoff,
            Err(_) => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {evicted} idle sessions ({} active)", sessions.len());
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::session::ConversationTurn;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SessionStore::new();
        let (id, handle) = store.create().await;
        let fetched = store.get(id).await.unwrap();
        assert!(Arc::ptr_eq(&handle, &fetched));
        assert_eq!(fetched.lock().await.history().len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let (a, _) = store.create().await;
        let (b, _) = store.create().await;
        assert_ne!(a, b);

        {
            let handle = store.get(a).await.unwrap();
            let mut state = handle.lock().await;
            state.push(ConversationTurn::user("only in a"));
            state.record_resume("resume a".to_string());
        }

        let b_handle = store.get(b).await.unwrap();
        let b_state = b_handle.lock().await;
        assert_eq!(b_state.history().len(), 1);
        assert!(!b_state.resume_available());
    }

    #[tokio::test]
    async fn test_end_removes_session() {
        let store = SessionStore::new();
        let (id, _) = store.create().await;
        assert!(store.end(id).await);
        assert!(!store.end(id).await);
        assert!(store.get(id).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_evict_idle_only_removes_stale_sessions() {
        let store = SessionStore::new();
        let (stale, _) = store.create().await;
        let (fresh, _) = store.create().await;

        // Nothing is older than an hour yet.
        assert_eq!(store.evict_idle(Duration::hours(1)).await, 0);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        store.get(fresh).await.unwrap().lock().await.touch();

        assert_eq!(store.evict_idle(Duration::milliseconds(10)).await, 1);
        assert!(store.get(stale).await.is_none());
        assert!(store.get(fresh).await.is_some());
    }

    #[tokio::test]
    async fn test_evict_idle_with_out_of_range_timeout_is_a_no_op() {
        let store = SessionStore::new();
        let (id, _) = store.create().await;

        let evicted = tokio::spawn({
            let store = store.clone();
            async move { store.evict_idle(Duration::days(100_000_000)).await }
        })
        .await
        .unwrap();

        assert_eq!(evicted, 0);
        assert!(store.get(id).await.is_some());
    }

    #[tokio::test]
    async fn test_get_marks_session_active_before_eviction() {
        let store = SessionStore::new();
        let (id, handle) = store.create().await;
        let created_at = handle.lock().await.last_active();

        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        let fetched = store.get(id).await.unwrap();
        assert!(fetched.lock().await.last_active() > created_at);

        // Idle for 30ms before the lookup, but the lookup counts as activity.
        assert_eq!(store.evict_idle(Duration::milliseconds(25)).await, 0);
        assert!(store.get(id).await.is_some());
    }

    #[tokio::test]
    async fn test_evict_idle_skips_busy_sessions() {
        let store = SessionStore::new();
        let (id, handle) = store.create().await;
        let _guard = handle.lock().await;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(store.evict_idle(Duration::zero()).await, 0);
        assert!(store.get(id).await.is_some());
    }
}
