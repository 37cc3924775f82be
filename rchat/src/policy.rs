//! Per-conversation limits and history conventions.
//!
//! ```rust
//! use rchat::{ChatPolicy, HistoryMode};
//!
//! let policy = ChatPolicy::default().with_max_rounds(0).with_history_mode(HistoryMode::Full);
//! assert_eq!(policy.max_rounds, 1);
//! assert_eq!(policy.history_mode, HistoryMode::Full);
//! ```

pub const DEFAULT_MAX_ROUNDS: u32 = 10;

/// Which messages a reply carries back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    /// Only the messages produced by this call.
    #[default]
    Delta,
    /// The conversation so far, input and produced messages included.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatPolicy {
    /// Provider round trips allowed per call. Never below one.
    pub max_rounds: u32,
    pub history_mode: HistoryMode,
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            history_mode: HistoryMode::Delta,
        }
    }
}

impl ChatPolicy {
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn with_history_mode(mut self, history_mode: HistoryMode) -> Self {
        self.history_mode = history_mode;
        self
    }
}
