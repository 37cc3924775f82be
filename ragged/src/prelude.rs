//! Common imports for most ragged applications.

pub use crate::{
    bot_message, chat_builder_from_config, chat_from_json_config, error_message, observed,
    parse_provider_id, system_message, tool_result_message, user_message,
};
pub use crate::{messages, msg};
pub use crate::{
    BoxFuture, CancellationToken, Chat, ChatBuilder, ChatCallOptions, ChatError, ChatErrorKind,
    ChatEvent, ChatEventReceiver, ChatEventSender, ChatInput, ChatPolicy, ChatProvider, ChatReply,
    ChatRequest, ChatResponse, ConversationId, FieldSchema, FnProvider, HistoryMode, Message,
    MessageKind, ProviderConfig, ProviderError, ProviderId, RunStatus, StopReason, StreamEvent,
    Tool, ToolBuilder, ToolCall, ToolChoice, ToolDefinition, ToolError, ToolExecutionContext,
    ToolRegistry, TracingObservabilityHooks, event_channel, required_string,
};
