//! OpenAI chat-completions provider over the transport collaborator.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use serde_json::Value;

use crate::mapper::encode;
use crate::{
    BoxedEventStream, ChatProvider, ChatRequest, ChatResponse, CompletionDetector,
    CompletionFinished, DeltaAccumulator, NoopOperationHooks, ProviderError, ProviderFuture,
    ProviderId, ProviderMapper, ProviderOperationHooks, SecretString, SseEvent, StreamEvent,
    Transport, TransportRequest, observe_operation,
};

use super::mapper::OpenAiMapper;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

pub type CompletionStream<'a> =
    Pin<Box<dyn Stream<Item = Result<CompletionFinished, ProviderError>> + Send + 'a>>;

#[derive(Clone)]
pub struct OpenAiProvider {
    transport: Arc<dyn Transport>,
    mapper: OpenAiMapper,
    api_key: Option<SecretString>,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl OpenAiProvider {
    pub fn new(transport: Arc<dyn Transport>, api_key: Option<SecretString>) -> Self {
        Self {
            transport,
            mapper: OpenAiMapper::default(),
            api_key,
            hooks: Arc::new(NoopOperationHooks),
        }
    }

    pub fn with_mapper(mut self, mapper: OpenAiMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.mapper = self.mapper.with_default_model(model);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn mapper(&self) -> &OpenAiMapper {
        &self.mapper
    }

    #[cfg(feature = "http")]
    pub fn default_http_transport(client: reqwest::Client) -> crate::HttpTransport {
        crate::HttpTransport::new(client, OPENAI_BASE_URL)
    }

    fn transport_request(&self, body: Value) -> TransportRequest {
        TransportRequest::new(CHAT_COMPLETIONS_PATH, body).with_auth(self.api_key.clone())
    }

    /// Streams plain completions, yielding once per response that finishes with `"stop"`.
    pub fn completion_stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<CompletionStream<'a>, ProviderError>> {
        Box::pin(async move {
            let body = encode(&self.mapper.map_stream_request(&request)?)?;
            let mut events = observe_operation(
                self.hooks.as_ref(),
                self.id(),
                "completion_stream",
                self.transport.stream(self.transport_request(body)),
            )
            .await?;
            let mut detector = CompletionDetector::new();

            let stream = try_stream! {
                while let Some(event) = events.next().await {
                    let chunk = match parse_chunk(&event?)? {
                        ChunkFrame::Data(chunk) => chunk,
                        ChunkFrame::Skip => continue,
                        ChunkFrame::Done => break,
                    };

                    if let Some(finished) = detector.push(&chunk)? {
                        yield finished;
                    }
                }
            };

            Ok(Box::pin(stream) as CompletionStream<'a>)
        })
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("transport", &self.transport)
            .field("mapper", &self.mapper)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl ChatProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        self.mapper.provider()
    }

    fn chat<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<ChatResponse, ProviderError>> {
        Box::pin(async move {
            let body = self.mapper.encode_request(&request)?;
            observe_operation(self.hooks.as_ref(), self.id(), "chat", async {
                let response = self.transport.send(self.transport_request(body)).await?;
                self.mapper.decode_response(response)
            })
            .await
        })
    }

    fn chat_stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            let wire = self.mapper.map_stream_request(&request)?;
            let mut accumulator = DeltaAccumulator::new(self.id(), wire.model.clone());
            let body = encode(&wire)?;
            let mut events = observe_operation(
                self.hooks.as_ref(),
                self.id(),
                "chat_stream",
                self.transport.stream(self.transport_request(body)),
            )
            .await?;

            let stream = try_stream! {
                while let Some(event) = events.next().await {
                    let chunk = match parse_chunk(&event?)? {
                        ChunkFrame::Data(chunk) => chunk,
                        ChunkFrame::Skip => continue,
                        ChunkFrame::Done => break,
                    };

                    for item in accumulator.push(chunk)? {
                        yield item;
                    }
                }

                yield StreamEvent::Finished(accumulator.finish()?);
            };

            Ok(Box::pin(stream) as BoxedEventStream<'a>)
        })
    }
}

pub(crate) enum ChunkFrame {
    Data(Value),
    Skip,
    Done,
}

/// Decodes one SSE frame of a chat-completions stream.
pub(crate) fn parse_chunk(event: &SseEvent) -> Result<ChunkFrame, ProviderError> {
    let data = event.data.trim();
    if data.is_empty() {
        return Ok(ChunkFrame::Skip);
    }

    if data == "[DONE]" {
        return Ok(ChunkFrame::Done);
    }

    let chunk: Value = serde_json::from_str(data)
        .map_err(|err| ProviderError::protocol(format!("invalid stream chunk: {err}")))?;

    if let Some(error) = chunk.get("error").filter(|error| !error.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .unwrap_or("backend reported a stream error");
        return Err(ProviderError::server(message));
    }

    Ok(ChunkFrame::Data(chunk))
}
