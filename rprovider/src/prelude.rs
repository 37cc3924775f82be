//! Common `rprovider` imports for downstream crates.

pub use crate::{
    BoxedEventStream, ChatProvider, ChatRequest, ChatRequestBuilder, ChatResponse, FieldSchema,
    FieldType, FnProvider, Message, MessageKind, NoopOperationHooks, ProviderConfig,
    ProviderError, ProviderErrorKind, ProviderId, ProviderOperationHooks, StopReason,
    StreamEvent, TokenUsage, ToolCall, ToolChoice, ToolDefinition,
};
pub use rcommon::{BoxFuture, ConversationId, GenerationOptions, MetadataMap};
