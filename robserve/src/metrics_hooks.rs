//! Metrics-based observability hooks for provider calls, tool executions and chat rounds.
//!
//! ```rust
//! use rprovider::ProviderOperationHooks;
//! use robserve::MetricsObservabilityHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use rchat::{ChatRuntimeHooks, RunOutcome};
use rcommon::ConversationId;
use rprovider::{ProviderError, ProviderId, ProviderOperationHooks, ToolCall};
use rtooling::{ToolError, ToolExecutionContext, ToolExecutionResult, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_request_start(&self, provider: ProviderId, operation: &str) {
        metrics::counter!(
            "ragged_provider_request_start_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_success(&self, provider: ProviderId, operation: &str, elapsed: Duration) {
        metrics::counter!(
            "ragged_provider_success_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "ragged_provider_request_duration_seconds",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        error: &ProviderError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "ragged_provider_failure_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "ragged_provider_request_duration_seconds",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }
}

impl ToolRuntimeHooks for MetricsObservabilityHooks {
    fn on_unknown_tool(&self, tool_call: &ToolCall, _available: &[String]) {
        metrics::counter!(
            "ragged_tool_unknown_total",
            "tool_id" => tool_call.tool_id.clone()
        )
        .increment(1);
    }

    fn on_execution_start(&self, tool_call: &ToolCall, _context: &ToolExecutionContext) {
        metrics::counter!(
            "ragged_tool_execution_start_total",
            "tool_id" => tool_call.tool_id.clone()
        )
        .increment(1);
    }

    fn on_execution_success(
        &self,
        tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _result: &ToolExecutionResult,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "ragged_tool_execution_success_total",
            "tool_id" => tool_call.tool_id.clone()
        )
        .increment(1);
        metrics::histogram!(
            "ragged_tool_execution_duration_seconds",
            "tool_id" => tool_call.tool_id.clone(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_execution_failure(
        &self,
        tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "ragged_tool_execution_failure_total",
            "tool_id" => tool_call.tool_id.clone(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "ragged_tool_execution_duration_seconds",
            "tool_id" => tool_call.tool_id.clone(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }
}

impl ChatRuntimeHooks for MetricsObservabilityHooks {
    fn on_round_start(&self, _conversation: &ConversationId, _round: u32) {
        metrics::counter!("ragged_chat_round_start_total").increment(1);
    }

    fn on_round_complete(
        &self,
        _conversation: &ConversationId,
        _round: u32,
        tool_calls: usize,
        elapsed: Duration,
    ) {
        metrics::histogram!("ragged_chat_round_duration_seconds").record(elapsed.as_secs_f64());
        metrics::histogram!("ragged_chat_tool_calls_per_round").record(tool_calls as f64);
    }

    fn on_round_limit_exceeded(&self, _conversation: &ConversationId, _max_rounds: u32) {
        metrics::counter!("ragged_chat_round_limit_exceeded_total").increment(1);
    }

    fn on_cancelled(&self, _conversation: &ConversationId, _round: u32) {
        metrics::counter!("ragged_chat_cancelled_total").increment(1);
    }

    fn on_run_finished(&self, _conversation: &ConversationId, outcome: &RunOutcome) {
        metrics::counter!(
            "ragged_chat_run_finished_total",
            "provider" => outcome.provider.to_string(),
            "status" => format!("{:?}", outcome.status)
        )
        .increment(1);
        metrics::histogram!(
            "ragged_chat_rounds_per_run",
            "provider" => outcome.provider.to_string()
        )
        .record(f64::from(outcome.rounds));
        metrics::counter!(
            "ragged_chat_tokens_total",
            "provider" => outcome.provider.to_string(),
            "direction" => "input"
        )
        .increment(u64::from(outcome.usage.input_tokens));
        metrics::counter!(
            "ragged_chat_tokens_total",
            "provider" => outcome.provider.to_string(),
            "direction" => "output"
        )
        .increment(u64::from(outcome.usage.output_tokens));
    }
}
