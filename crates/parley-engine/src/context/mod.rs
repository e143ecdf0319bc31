//! Conversation context: per-session memory and the rules that use it to
//! correct ensemble decisions.

pub mod adjuster;
pub mod state;
pub mod store;

pub use adjuster::{ContextAdjuster, MUSIC_PREFERENCE};
pub use state::{AppStatus, ConversationState, HistoryEntry, RuleKind};
pub use store::{SessionHandle, SessionStore, SweepReport};
