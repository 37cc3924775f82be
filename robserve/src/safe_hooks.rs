//! Wrappers that keep a panicking hook from unwinding into a provider call, tool batch or run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use rchat::{ChatRuntimeHooks, RunOutcome};
use rcommon::ConversationId;
use rprovider::{ProviderError, ProviderId, ProviderOperationHooks, ToolCall};
use rtooling::{ToolError, ToolExecutionContext, ToolExecutionResult, ToolRuntimeHooks};

pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_request_start(&self, provider: ProviderId, operation: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_request_start(provider, operation)
        }));
    }

    fn on_success(&self, provider: ProviderId, operation: &str, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_success(provider, operation, elapsed)
        }));
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        error: &ProviderError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(provider, operation, error, elapsed)
        }));
    }
}

pub struct SafeToolHooks<H> {
    inner: H,
}

impl<H> SafeToolHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ToolRuntimeHooks for SafeToolHooks<H>
where
    H: ToolRuntimeHooks,
{
    fn on_unknown_tool(&self, tool_call: &ToolCall, available: &[String]) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_unknown_tool(tool_call, available)
        }));
    }

    fn on_execution_start(&self, tool_call: &ToolCall, context: &ToolExecutionContext) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_execution_start(tool_call, context)
        }));
    }

    fn on_execution_success(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        result: &ToolExecutionResult,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_execution_success(tool_call, context, result, elapsed)
        }));
    }

    fn on_execution_failure(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_execution_failure(tool_call, context, error, elapsed)
        }));
    }
}

pub struct SafeChatHooks<H> {
    inner: H,
}

impl<H> SafeChatHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ChatRuntimeHooks for SafeChatHooks<H>
where
    H: ChatRuntimeHooks,
{
    fn on_round_start(&self, conversation: &ConversationId, round: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_round_start(conversation, round)
        }));
    }

    fn on_round_complete(
        &self,
        conversation: &ConversationId,
        round: u32,
        tool_calls: usize,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_round_complete(conversation, round, tool_calls, elapsed)
        }));
    }

    fn on_round_limit_exceeded(&self, conversation: &ConversationId, max_rounds: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_round_limit_exceeded(conversation, max_rounds)
        }));
    }

    fn on_cancelled(&self, conversation: &ConversationId, round: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_cancelled(conversation, round)
        }));
    }

    fn on_run_finished(&self, conversation: &ConversationId, outcome: &RunOutcome) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_run_finished(conversation, outcome)
        }));
    }
}
