use std::sync::{Arc, Mutex};
use std::time::Duration;

use rchat::{Chat, ChatRuntimeHooks, RunOutcome, RunStatus};
use rcommon::ConversationId;
use rprovider::{
    ChatRequest, ChatResponse, FnProvider, Message, ProviderError, ProviderId,
    ProviderOperationHooks, StopReason, TokenUsage, ToolCall,
};
use rtooling::{
    ToolBuilder, ToolError, ToolExecutionContext, ToolExecutionResult, ToolRuntimeHooks,
};

use crate::{
    MetricsObservabilityHooks, SafeChatHooks, SafeProviderHooks, SafeToolHooks,
    TracingObservabilityHooks,
};

fn sample_tool_call() -> ToolCall {
    ToolCall::new("call-1", "echo", "{}")
}

fn sample_tool_context() -> ToolExecutionContext {
    ToolExecutionContext::new("conversation-1").with_round(2)
}

fn sample_outcome() -> RunOutcome {
    RunOutcome {
        status: RunStatus::Finished,
        messages: vec![Message::bot("done")],
        history: vec![Message::user("hi"), Message::bot("done")],
        rounds: 1,
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage {
            input_tokens: 4,
            output_tokens: 2,
            total_tokens: 6,
        },
        provider: ProviderId::Ollama,
        model: "llama3.2".to_string(),
    }
}

fn exercise_provider_hooks(hooks: &dyn ProviderOperationHooks) {
    let provider_error = ProviderError::from_status(429, "slow down");

    hooks.on_request_start(ProviderId::OpenAi, "chat");
    hooks.on_success(ProviderId::OpenAi, "chat", Duration::from_millis(12));
    hooks.on_failure(
        ProviderId::Cohere,
        "chat_stream",
        &provider_error,
        Duration::from_millis(40),
    );
}

fn exercise_tool_hooks(hooks: &dyn ToolRuntimeHooks) {
    let tool_error = ToolError::execution("tool failed");

    hooks.on_unknown_tool(&sample_tool_call(), &["ls".to_string(), "cat".to_string()]);
    hooks.on_execution_start(&sample_tool_call(), &sample_tool_context());
    hooks.on_execution_success(
        &sample_tool_call(),
        &sample_tool_context(),
        &ToolExecutionResult::new("call-1", "echo", "ok"),
        Duration::from_millis(20),
    );
    hooks.on_execution_failure(
        &sample_tool_call(),
        &sample_tool_context(),
        &tool_error,
        Duration::from_millis(20),
    );
}

fn exercise_chat_hooks(hooks: &dyn ChatRuntimeHooks) {
    let conversation = ConversationId::from("conversation-1");

    hooks.on_round_start(&conversation, 1);
    hooks.on_round_complete(&conversation, 1, 2, Duration::from_millis(30));
    hooks.on_round_limit_exceeded(&conversation, 10);
    hooks.on_cancelled(&conversation, 3);
    hooks.on_run_finished(&conversation, &sample_outcome());
}

#[test]
fn tracing_hooks_smoke_test_all_callbacks() {
    let hooks = TracingObservabilityHooks;

    exercise_provider_hooks(&hooks);
    exercise_tool_hooks(&hooks);
    exercise_chat_hooks(&hooks);
}

#[test]
fn metrics_hooks_smoke_test_all_callbacks() {
    let hooks = MetricsObservabilityHooks;

    exercise_provider_hooks(&hooks);
    exercise_tool_hooks(&hooks);
    exercise_chat_hooks(&hooks);
}

#[derive(Default, Clone)]
struct RecordingHooks {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingHooks {
    fn push(&self, event: &'static str) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl ProviderOperationHooks for RecordingHooks {
    fn on_request_start(&self, _provider: ProviderId, _operation: &str) {
        self.push("request_start");
    }

    fn on_success(&self, _provider: ProviderId, _operation: &str, _elapsed: Duration) {
        self.push("success");
    }

    fn on_failure(
        &self,
        _provider: ProviderId,
        _operation: &str,
        _error: &ProviderError,
        _elapsed: Duration,
    ) {
        self.push("failure");
    }
}

impl ToolRuntimeHooks for RecordingHooks {
    fn on_unknown_tool(&self, _tool_call: &ToolCall, _available: &[String]) {
        self.push("unknown");
    }

    fn on_execution_start(&self, _tool_call: &ToolCall, _context: &ToolExecutionContext) {
        self.push("start");
    }

    fn on_execution_success(
        &self,
        _tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _result: &ToolExecutionResult,
        _elapsed: Duration,
    ) {
        self.push("success");
    }

    fn on_execution_failure(
        &self,
        _tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _error: &ToolError,
        _elapsed: Duration,
    ) {
        self.push("failure");
    }
}

impl ChatRuntimeHooks for RecordingHooks {
    fn on_round_start(&self, _conversation: &ConversationId, _round: u32) {
        self.push("round_start");
    }

    fn on_round_complete(
        &self,
        _conversation: &ConversationId,
        _round: u32,
        _tool_calls: usize,
        _elapsed: Duration,
    ) {
        self.push("round_complete");
    }

    fn on_round_limit_exceeded(&self, _conversation: &ConversationId, _max_rounds: u32) {
        self.push("round_limit_exceeded");
    }

    fn on_cancelled(&self, _conversation: &ConversationId, _round: u32) {
        self.push("cancelled");
    }

    fn on_run_finished(&self, _conversation: &ConversationId, _outcome: &RunOutcome) {
        self.push("run_finished");
    }
}

struct PanicHooks;

impl ProviderOperationHooks for PanicHooks {
    fn on_request_start(&self, _provider: ProviderId, _operation: &str) {
        panic!("request_start panic");
    }

    fn on_success(&self, _provider: ProviderId, _operation: &str, _elapsed: Duration) {
        panic!("success panic");
    }

    fn on_failure(
        &self,
        _provider: ProviderId,
        _operation: &str,
        _error: &ProviderError,
        _elapsed: Duration,
    ) {
        panic!("failure panic");
    }
}

impl ToolRuntimeHooks for PanicHooks {
    fn on_unknown_tool(&self, _tool_call: &ToolCall, _available: &[String]) {
        panic!("unknown panic");
    }

    fn on_execution_start(&self, _tool_call: &ToolCall, _context: &ToolExecutionContext) {
        panic!("start panic");
    }

    fn on_execution_success(
        &self,
        _tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _result: &ToolExecutionResult,
        _elapsed: Duration,
    ) {
        panic!("success panic");
    }

    fn on_execution_failure(
        &self,
        _tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _error: &ToolError,
        _elapsed: Duration,
    ) {
        panic!("failure panic");
    }
}

impl ChatRuntimeHooks for PanicHooks {
    fn on_round_start(&self, _conversation: &ConversationId, _round: u32) {
        panic!("round_start panic");
    }

    fn on_round_complete(
        &self,
        _conversation: &ConversationId,
        _round: u32,
        _tool_calls: usize,
        _elapsed: Duration,
    ) {
        panic!("round_complete panic");
    }

    fn on_round_limit_exceeded(&self, _conversation: &ConversationId, _max_rounds: u32) {
        panic!("round_limit_exceeded panic");
    }

    fn on_cancelled(&self, _conversation: &ConversationId, _round: u32) {
        panic!("cancelled panic");
    }

    fn on_run_finished(&self, _conversation: &ConversationId, _outcome: &RunOutcome) {
        panic!("run_finished panic");
    }
}

#[test]
fn safe_hooks_delegate_when_inner_succeeds() {
    let inner = RecordingHooks::default();
    let events = Arc::clone(&inner.events);

    exercise_provider_hooks(&SafeProviderHooks::new(inner.clone()));
    exercise_tool_hooks(&SafeToolHooks::new(inner.clone()));
    exercise_chat_hooks(&SafeChatHooks::new(inner));

    assert_eq!(
        *events.lock().expect("events lock"),
        vec![
            "request_start",
            "success",
            "failure",
            "unknown",
            "start",
            "success",
            "failure",
            "round_start",
            "round_complete",
            "round_limit_exceeded",
            "cancelled",
            "run_finished",
        ]
    );
}

#[test]
fn safe_hooks_swallow_panics() {
    exercise_provider_hooks(&SafeProviderHooks::new(PanicHooks));
    exercise_tool_hooks(&SafeToolHooks::new(PanicHooks));
    exercise_chat_hooks(&SafeChatHooks::new(PanicHooks));
}

#[tokio::test]
async fn panicking_hooks_cannot_break_a_chat_run() {
    let provider = FnProvider::new(|request: ChatRequest| async move {
        let answered = request.history.iter().any(|message| message.tool_call_id.is_some());
        let history = if answered {
            vec![Message::bot("done")]
        } else {
            vec![Message::bot_with_tool_calls(
                "",
                vec![ToolCall::new("call_1", "ls", "{}")],
            )]
        };
        Ok(ChatResponse::new(ProviderId::Custom, "fake", history))
    });

    let mut chat = Chat::builder(Arc::new(provider))
        .tool(ToolBuilder::new("ls").sync_handler(|_args, _ctx| Ok("Cargo.toml".to_string())))
        .tool_hooks(Arc::new(SafeToolHooks::new(PanicHooks)))
        .hooks(Arc::new(SafeChatHooks::new(PanicHooks)))
        .build();

    let reply = chat.chat("list").await.expect("run should succeed");

    assert_eq!(reply.rounds, 2);
    assert_eq!(reply.text(), "done");
}
