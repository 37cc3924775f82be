//! Provider layer for the ragged conversational client.
//!
//! Holds the canonical message model, the [`ChatProvider`] capability, per-backend mappers
//! and the streaming accumulators that turn wire fragments into [`StreamEvent`]s.

pub mod accumulate;
pub mod adapters;
mod config;
mod credentials;
mod error;
mod hooks;
pub mod mapper;
mod model;
pub mod prelude;
mod provider;
mod schema;
mod stream;
mod transport;

pub use accumulate::{
    ChatCompletionSnapshot, ChoiceSnapshot, CompletionDetector, CompletionFinished,
    DeltaAccumulator, DetectorState, accumulate, accumulate_chunk, extract_events,
    parse_finish_reason,
};
pub use config::{
    AssistantsConfig, COHERE_API_KEY_ENVS, CohereConfig, OPENAI_API_KEY_ENV, OllamaConfig,
    OpenAiConfig, ProviderConfig,
};
pub use credentials::{SecretString, resolve_api_key};
pub use error::{ProviderError, ProviderErrorKind};
pub use hooks::{NoopOperationHooks, ProviderOperationHooks, observe_operation};
pub use mapper::ProviderMapper;
pub use model::{
    ChatRequest, ChatRequestBuilder, ChatResponse, Message, MessageKind, ProviderId, StopReason,
    TokenUsage, ToolCall, ToolChoice, ToolDefinition,
};
pub use provider::{ChatProvider, FnProvider, ProviderFuture};
pub use schema::{FieldSchema, FieldType};
pub use stream::{
    BoxedEventStream, ChatEventStream, PartialToolCall, StreamEvent, VecEventStream,
    replay_events,
};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{
    SseEvent, SseStream, Transport, TransportRequest, extract_error_message,
};
