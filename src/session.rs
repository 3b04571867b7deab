use crate::errors::{AppError, AppResult};
use crate::models::{Analysis, ChatEntry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const DEFAULT_MAX_SESSIONS: usize = 256;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// What one browser tab has done so far.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub analysis: Option<Analysis>,
    pub chat: Vec<ChatEntry>,
}

struct SessionEntry {
    state: SessionState,
    last_seen: Instant,
}

/// In-memory sessions. Idle sessions expire, and opening past the cap evicts
/// the least recently used one.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_SESSIONS, DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_sessions: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            max_sessions: max_sessions.max(1),
            idle_timeout,
        }
    }

    pub async fn open_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        self.purge_idle(&mut sessions, now);

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            tracing::info!(session_id = %oldest, "evicted least recently used session");
        }

        sessions.insert(
            session_id.clone(),
            SessionEntry {
                state: SessionState::default(),
                last_seen: now,
            },
        );
        session_id
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.with_session(session_id, |_| ()).await.is_ok()
    }

    pub async fn snapshot(&self, session_id: &str) -> AppResult<SessionState> {
        self.with_session(session_id, |state| state.clone()).await
    }

    /// Runs `update` against the session's state while holding the lock.
    /// Counts as activity for idle expiry.
    pub async fn with_session<T>(
        &self,
        session_id: &str,
        update: impl FnOnce(&mut SessionState) -> T,
    ) -> AppResult<T> {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        self.purge_idle(&mut sessions, now);
        let Some(entry) = sessions.get_mut(session_id) else {
            return Err(not_found(session_id));
        };
        entry.last_seen = now;
        Ok(update(&mut entry.state))
    }

    pub async fn close_session(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(session_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn purge_idle(&self, sessions: &mut HashMap<String, SessionEntry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_timeout);
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::debug!(expired, "idle sessions expired");
        }
    }
}

fn not_found(session_id: &str) -> AppError {
    AppError::NotFound(format!("No active session {}", session_id))
}

#[cfg(test)]
mod tests {
    use super::SessionManager;
    use crate::models::{AnswerSource, ChatEntry};
    use chrono::Utc;
    use std::time::Duration;

    #[tokio::test]
    async fn sessions_are_isolated() {
        let manager = SessionManager::new();
        let first = manager.open_session().await;
        let second = manager.open_session().await;
        assert_ne!(first, second);

        manager
            .with_session(&first, |state| {
                state.chat.push(ChatEntry {
                    question: "q".to_string(),
                    answer: "a".to_string(),
                    source: AnswerSource::Fallback,
                    asked_at: Utc::now(),
                })
            })
            .await
            .expect("session exists");

        assert_eq!(manager.snapshot(&first).await.expect("first").chat.len(), 1);
        assert!(manager.snapshot(&second).await.expect("second").chat.is_empty());
        assert_eq!(manager.len().await, 2);
    }

    #[tokio::test]
    async fn closed_session_is_not_found() {
        let manager = SessionManager::new();
        let id = manager.open_session().await;
        assert!(manager.contains(&id).await);
        assert!(manager.close_session(&id).await);
        assert!(!manager.close_session(&id).await);
        assert!(!manager.contains(&id).await);
        let error = manager.snapshot(&id).await.expect_err("closed");
        assert!(error.to_string().starts_with("NOT_FOUND"));
    }

    #[tokio::test]
    async fn cap_evicts_least_recently_used() {
        let manager = SessionManager::with_limits(2, Duration::from_secs(600));
        let first = manager.open_session().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = manager.open_session().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        // Touching the first session makes the second the oldest.
        assert!(manager.contains(&first).await);
        tokio::time::sleep(Duration::from_millis(5)).await;

        let third = manager.open_session().await;
        assert_eq!(manager.len().await, 2);
        assert!(manager.contains(&first).await);
        assert!(!manager.contains(&second).await);
        assert!(manager.contains(&third).await);
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let manager = SessionManager::with_limits(16, Duration::from_millis(50));
        let idle = manager.open_session().await;
        tokio::time::sleep(Duration::from_millis(120)).await;

        let fresh = manager.open_session().await;
        assert_eq!(manager.len().await, 1);
        assert!(manager.contains(&fresh).await);
        let error = manager.snapshot(&idle).await.expect_err("expired");
        assert!(error.to_string().starts_with("NOT_FOUND"));
    }
}
