//! Tracing-based observability hooks for provider calls, tool executions and chat rounds.
//!
//! ```rust
//! use rchat::ChatRuntimeHooks;
//! use robserve::TracingObservabilityHooks;
//!
//! fn accepts_chat_hooks(_hooks: &dyn ChatRuntimeHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_chat_hooks(&hooks);
//! ```

use std::time::Duration;

use rchat::{ChatRuntimeHooks, RunOutcome};
use rcommon::ConversationId;
use rprovider::{ProviderError, ProviderId, ProviderOperationHooks, ToolCall};
use rtooling::{ToolError, ToolExecutionContext, ToolExecutionResult, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_request_start(&self, provider: ProviderId, operation: &str) {
        tracing::info!(
            phase = "provider",
            event = "request_start",
            provider = %provider,
            operation
        );
    }

    fn on_success(&self, provider: ProviderId, operation: &str, elapsed: Duration) {
        tracing::info!(
            phase = "provider",
            event = "success",
            provider = %provider,
            operation,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        error: &ProviderError,
        elapsed: Duration,
    ) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider = %provider,
            operation,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            status = error.status,
            retryable = error.retryable,
            error = %error
        );
    }
}

impl ToolRuntimeHooks for TracingObservabilityHooks {
    fn on_unknown_tool(&self, tool_call: &ToolCall, available: &[String]) {
        tracing::warn!(
            phase = "tool",
            event = "unknown_tool",
            tool_id = tool_call.tool_id,
            tool_call_id = tool_call.id,
            available = available.join(",")
        );
    }

    fn on_execution_start(&self, tool_call: &ToolCall, context: &ToolExecutionContext) {
        tracing::info!(
            phase = "tool",
            event = "execution_start",
            tool_id = tool_call.tool_id,
            tool_call_id = tool_call.id,
            conversation_id = %context.conversation_id,
            round = context.round
        );
    }

    fn on_execution_success(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        result: &ToolExecutionResult,
        elapsed: Duration,
    ) {
        tracing::info!(
            phase = "tool",
            event = "execution_success",
            tool_id = tool_call.tool_id,
            tool_call_id = tool_call.id,
            conversation_id = %context.conversation_id,
            round = context.round,
            output_bytes = result.output.len(),
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_execution_failure(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        tracing::error!(
            phase = "tool",
            event = "execution_failure",
            tool_id = tool_call.tool_id,
            tool_call_id = tool_call.id,
            conversation_id = %context.conversation_id,
            round = context.round,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            error = %error
        );
    }
}

impl ChatRuntimeHooks for TracingObservabilityHooks {
    fn on_round_start(&self, conversation: &ConversationId, round: u32) {
        tracing::debug!(
            phase = "chat",
            event = "round_start",
            conversation_id = %conversation,
            round
        );
    }

    fn on_round_complete(
        &self,
        conversation: &ConversationId,
        round: u32,
        tool_calls: usize,
        elapsed: Duration,
    ) {
        tracing::info!(
            phase = "chat",
            event = "round_complete",
            conversation_id = %conversation,
            round,
            tool_calls,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_round_limit_exceeded(&self, conversation: &ConversationId, max_rounds: u32) {
        tracing::warn!(
            phase = "chat",
            event = "round_limit_exceeded",
            conversation_id = %conversation,
            max_rounds
        );
    }

    fn on_cancelled(&self, conversation: &ConversationId, round: u32) {
        tracing::warn!(
            phase = "chat",
            event = "cancelled",
            conversation_id = %conversation,
            round
        );
    }

    fn on_run_finished(&self, conversation: &ConversationId, outcome: &RunOutcome) {
        tracing::info!(
            phase = "chat",
            event = "run_finished",
            conversation_id = %conversation,
            status = ?outcome.status,
            rounds = outcome.rounds,
            provider = %outcome.provider,
            model = outcome.model,
            stop_reason = ?outcome.stop_reason,
            input_tokens = outcome.usage.input_tokens,
            output_tokens = outcome.usage.output_tokens
        );
    }
}
