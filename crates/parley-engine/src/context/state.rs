use parley_common::IntentLabel;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tokio::time::Instant;

/// Which context rule shaped a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    OpenApplication,
    PlayMusic,
    CloseApplication,
    PreferredApplication,
    /// No rule matched; the ensemble decision went through as-is.
    PassThrough,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::OpenApplication => "open_application",
            RuleKind::PlayMusic => "play_music",
            RuleKind::CloseApplication => "close_application",
            RuleKind::PreferredApplication => "preferred_application",
            RuleKind::PassThrough => "pass_through",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub rule: RuleKind,
    pub input: String,
    pub label: IntentLabel,
    pub application: Option<String>,
    pub at: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct AppStatus {
    pub open: bool,
    pub changed_at: Instant,
}

/// Short-lived memory of one conversation.
#[derive(Debug, Clone)]
pub struct ConversationState {
    history: VecDeque<HistoryEntry>,
    capacity: usize,
    apps: HashMap<String, AppStatus>,
    preferences: HashMap<String, String>,
    last_updated: Instant,
}

impl ConversationState {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            apps: HashMap::new(),
            preferences: HashMap::new(),
            last_updated: Instant::now(),
        }
    }

    /// Append to the ring buffer, dropping the oldest entry when full.
    pub fn record(&mut self, entry: HistoryEntry) {
        while self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.last_updated = entry.at;
        self.history.push_back(entry);
    }

    /// Newest first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Most recent application mentioned in the conversation.
    pub fn recent_application(&self) -> Option<&str> {
        self.history().find_map(|e| e.application.as_deref())
    }

    /// Whether recent turns were about music.
    pub fn recently_musical(&self) -> bool {
        self.history()
            .any(|e| matches!(e.label, IntentLabel::PlayMusic | IntentLabel::PauseMusic))
    }

    pub fn set_app_open(&mut self, name: &str, open: bool, at: Instant) {
        self.apps.insert(
            name.to_string(),
            AppStatus {
                open,
                changed_at: at,
            },
        );
        self.last_updated = at;
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.apps.get(name).is_some_and(|s| s.open)
    }

    /// Open applications, most recently opened first.
    pub fn open_applications(&self) -> Vec<&str> {
        let mut open: Vec<(&String, &AppStatus)> =
            self.apps.iter().filter(|(_, s)| s.open).collect();
        open.sort_by(|a, b| b.1.changed_at.cmp(&a.1.changed_at).then(a.0.cmp(b.0)));
        open.into_iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn preference(&self, category: &str) -> Option<&str> {
        self.preferences.get(category).map(String::as_str)
    }

    pub fn set_preference(&mut self, category: &str, value: &str, at: Instant) {
        self.preferences
            .insert(category.to_string(), value.to_string());
        self.last_updated = at;
    }

    pub fn last_updated(&self) -> Instant {
        self.last_updated
    }

    /// Drop history entries recorded before `cutoff`. Returns how many went.
    pub fn evict_before(&mut self, cutoff: Instant) -> usize {
        let before = self.history.len();
        self.history.retain(|e| e.at >= cutoff);
        before - self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(input: &str, app: Option<&str>, at: Instant) -> HistoryEntry {
        HistoryEntry {
            rule: RuleKind::PassThrough,
            input: input.to_string(),
            label: IntentLabel::OpenApplication,
            application: app.map(String::from),
            at,
        }
    }

    #[test]
    fn test_ring_buffer_evicts_oldest_first() {
        let now = Instant::now();
        let mut state = ConversationState::new(2);
        state.record(entry("one", None, now));
        state.record(entry("two", None, now));
        state.record(entry("three", None, now));

        let inputs: Vec<&str> = state.history().map(|e| e.input.as_str()).collect();
        assert_eq!(inputs, vec!["three", "two"]);
    }

    #[test]
    fn test_recent_application_is_newest_mention() {
        let now = Instant::now();
        let mut state = ConversationState::new(8);
        state.record(entry("open chrome", Some("Chrome"), now));
        state.record(entry("hmm", None, now));
        state.record(entry("open slack", Some("Slack"), now));
        assert_eq!(state.recent_application(), Some("Slack"));
    }

    #[test]
    fn test_open_applications_order() {
        let t0 = Instant::now();
        let mut state = ConversationState::new(8);
        state.set_app_open("Chrome", true, t0);
        state.set_app_open("Slack", true, t0 + std::time::Duration::from_secs(1));
        state.set_app_open("Notepad", false, t0 + std::time::Duration::from_secs(2));
        assert_eq!(state.open_applications(), vec!["Slack", "Chrome"]);
    }
}
