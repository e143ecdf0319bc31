use super::state::ConversationState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Shortest period the sweeper runs at.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

pub type SessionHandle = Arc<AsyncMutex<ConversationState>>;

/// Conversation state per session id. Work on one session is serialized
/// through its own lock; different sessions never contend.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
    history_size: usize,
    retention: Duration,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub entries_evicted: usize,
    pub sessions_dropped: usize,
}

impl SessionStore {
    pub fn new(history_size: usize, retention: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            history_size,
            retention,
        }
    }

    /// Handle for `session_id`, created on first use.
    pub fn session(&self, session_id: &str) -> SessionHandle {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(ConversationState::new(self.history_size))))
            .clone()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn set_preference(&self, session_id: &str, category: &str, value: &str) {
        let handle = self.session(session_id);
        handle
            .lock()
            .await
            .set_preference(category, value, Instant::now());
    }

    /// Copy of a session's state, if the session exists.
    pub async fn snapshot(&self, session_id: &str) -> Option<ConversationState> {
        let handle = {
            let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.get(session_id).cloned()
        }?;
        let state = handle.lock().await;
        Some(state.clone())
    }

    /// Evict history older than the retention window and forget sessions
    /// that have been idle for longer than it. Sessions busy right now are
    /// left for the next sweep.
    pub fn sweep(&self) -> SweepReport {
        let Some(cutoff) = Instant::now().checked_sub(self.retention) else {
            return SweepReport::default();
        };

        let mut report = SweepReport::default();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|id, handle| {
            let Ok(mut state) = handle.try_lock() else {
                return true;
            };
            report.entries_evicted += state.evict_before(cutoff);
            let keep = state.last_updated() >= cutoff;
            if !keep {
                debug!(session = %id, "dropping idle session");
                report.sessions_dropped += 1;
            }
            keep
        });
        report
    }

    /// Run [`SessionStore::sweep`] every `interval` (at least one second)
    /// until `cancel` fires.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(MIN_SWEEP_INTERVAL));
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let report = self.sweep();
                        if report != SweepReport::default() {
                            debug!(
                                evicted = report.entries_evicted,
                                dropped = report.sessions_dropped,
                                "session sweep"
                            );
                        }
                    }
                }
            }
        })
    }
}
