//! Unified facade over the ragged workspace crates.
//!
//! This crate is meant to be the single dependency for most applications. It re-exports the
//! provider, tooling, chat and observability crates and adds message helpers, macros and
//! config-driven chat construction.
//!
//! ```rust
//! use ragged::prelude::*;
//!
//! # async fn demo() -> Result<(), ChatError> {
//! let mut chat = Chat::from_fn(|request: ChatRequest| async move {
//!     let turns = request.history.len();
//!     Ok(ChatResponse::new(ProviderId::Custom, "echo", vec![bot_message(format!("turn {turns}"))]))
//! });
//!
//! let reply = chat.chat(messages![user => "Hello!"]).await?;
//! assert_eq!(reply.text(), "turn 1");
//! # Ok(())
//! # }
//! ```

mod macros;

pub mod prelude;
pub mod runtime;
pub mod util;

pub use rchat;
pub use rcommon;
pub use robserve;
pub use rprovider;
pub use rtooling;

pub use rchat::{
    CancellationToken, Chat, ChatBuilder, ChatCallOptions, ChatError, ChatErrorKind, ChatEvent,
    ChatEventReceiver, ChatEventSender, ChatInput, ChatPolicy, ChatReply, ChatRuntimeHooks,
    DEFAULT_MAX_ROUNDS, HistoryMode, NoopChatRuntimeHooks, RunOutcome, RunStatus,
    ToolOrchestrator, event_channel,
};
pub use rcommon::{BoxFuture, ConversationId, GenerationOptions, MetadataMap};
pub use robserve::{
    MetricsObservabilityHooks, SafeChatHooks, SafeProviderHooks, SafeToolHooks,
    TracingObservabilityHooks,
};
pub use rprovider::{
    BoxedEventStream, ChatProvider, ChatRequest, ChatRequestBuilder, ChatResponse, FieldSchema,
    FieldType, FnProvider, Message, MessageKind, NoopOperationHooks, PartialToolCall,
    ProviderConfig, ProviderError, ProviderErrorKind, ProviderFuture, ProviderId,
    ProviderOperationHooks, SecretString, StopReason, StreamEvent, TokenUsage, ToolCall,
    ToolChoice, ToolDefinition, VecEventStream,
};
pub use rtooling::{
    DefaultToolRuntime, FunctionTool, NoopToolRuntimeHooks, Tool, ToolBuilder, ToolError,
    ToolErrorKind, ToolExecutionContext, ToolExecutionResult, ToolFuture, ToolRegistry,
    ToolRuntime, ToolRuntimeHooks, deserialize_arguments, parse_arguments, required_number,
    required_string,
};

pub use runtime::{
    chat_builder_from_config, chat_builder_from_config_with_hooks, chat_from_json_config, observed,
};
pub use util::{
    bot_message, error_message, parse_provider_id, system_message, tool_result_message,
    user_message,
};
