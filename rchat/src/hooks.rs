//! Lifecycle callbacks for orchestration runs.

use std::time::Duration;

use rcommon::ConversationId;

use crate::RunOutcome;

pub trait ChatRuntimeHooks: Send + Sync {
    fn on_round_start(&self, _conversation: &ConversationId, _round: u32) {}

    fn on_round_complete(
        &self,
        _conversation: &ConversationId,
        _round: u32,
        _tool_calls: usize,
        _elapsed: Duration,
    ) {
    }

    fn on_round_limit_exceeded(&self, _conversation: &ConversationId, _max_rounds: u32) {}

    fn on_cancelled(&self, _conversation: &ConversationId, _round: u32) {}

    fn on_run_finished(&self, _conversation: &ConversationId, _outcome: &RunOutcome) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChatRuntimeHooks;

impl ChatRuntimeHooks for NoopChatRuntimeHooks {}
