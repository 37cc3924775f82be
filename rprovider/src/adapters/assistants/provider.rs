//! OpenAI assistants provider. Every run is streamed; `chat` drains the stream.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;
use serde_json::Value;

use crate::mapper::encode;
use crate::{
    BoxedEventStream, ChatProvider, ChatRequest, ChatResponse, NoopOperationHooks, ProviderError,
    ProviderFuture, ProviderId, ProviderMapper, ProviderOperationHooks, SecretString, StreamEvent,
    Transport, TransportRequest, observe_operation,
};

use super::mapper::AssistantsMapper;
use super::snapshots::{RunSnapshots, apply_event};

pub const THREAD_RUNS_PATH: &str = "threads/runs";
pub const ASSISTANTS_BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

#[derive(Clone)]
pub struct AssistantsProvider {
    transport: Arc<dyn Transport>,
    mapper: AssistantsMapper,
    api_key: SecretString,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl AssistantsProvider {
    pub fn new(
        transport: Arc<dyn Transport>,
        api_key: SecretString,
        assistant_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            mapper: AssistantsMapper::new(assistant_id),
            api_key,
            hooks: Arc::new(NoopOperationHooks),
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.mapper = self.mapper.with_default_model(model);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    fn transport_request(&self, body: Value) -> TransportRequest {
        let (name, value) = ASSISTANTS_BETA_HEADER;
        TransportRequest::new(THREAD_RUNS_PATH, body)
            .with_auth(Some(self.api_key.clone()))
            .with_header(name, value)
    }
}

impl std::fmt::Debug for AssistantsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantsProvider")
            .field("transport", &self.transport)
            .field("mapper", &self.mapper)
            .finish_non_exhaustive()
    }
}

impl ChatProvider for AssistantsProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAiAssistants
    }

    fn chat<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<ChatResponse, ProviderError>> {
        Box::pin(async move {
            let mut events = self.chat_stream(request).await?;
            while let Some(event) = events.next().await {
                if let StreamEvent::Finished(response) = event? {
                    return Ok(response);
                }
            }

            Err(ProviderError::protocol("run stream ended without a result"))
        })
    }

    fn chat_stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            let body = encode(&self.mapper.map_request(&request)?)?;
            let mut events = observe_operation(
                self.hooks.as_ref(),
                self.id(),
                "chat_stream",
                self.transport.stream(self.transport_request(body)),
            )
            .await?;
            let mut snapshots = RunSnapshots::default();

            let stream = try_stream! {
                while let Some(event) = events.next().await {
                    let event = event?;
                    let data = event.data.trim();
                    if event.event == "done" || data == "[DONE]" {
                        break;
                    }
                    if data.is_empty() {
                        continue;
                    }

                    let data: Value = serde_json::from_str(data).map_err(|err| {
                        ProviderError::protocol(format!("invalid run event payload: {err}"))
                    })?;
                    for item in apply_event(&mut snapshots, &event.event, data)? {
                        yield item;
                    }
                }

                let response = self.mapper.map_response(snapshots.into_result()?)?;
                yield StreamEvent::Finished(response);
            };

            Ok(Box::pin(stream) as BoxedEventStream<'a>)
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::adapters::fakes::FakeTransport;
    use crate::{Message, SseEvent, StopReason};

    fn run_event(name: &str, data: Value) -> Result<SseEvent, ProviderError> {
        Ok(SseEvent::new(name, data.to_string()))
    }

    fn completed_run_events() -> Vec<Result<SseEvent, ProviderError>> {
        vec![
            run_event("thread.created", json!({"id": "thread_1"})),
            run_event(
                "thread.run.created",
                json!({"id": "run_1", "status": "queued", "model": "gpt-4o"}),
            ),
            run_event(
                "thread.message.created",
                json!({"id": "msg_1", "role": "assistant", "content": []}),
            ),
            run_event(
                "thread.message.delta",
                json!({"id": "msg_1", "delta": {"content": [
                    {"index": 0, "type": "text", "text": {"value": "Hi there"}}
                ]}}),
            ),
            run_event(
                "thread.message.completed",
                json!({"id": "msg_1", "role": "assistant", "content": [
                    {"type": "text", "text": {"value": "Hi there"}}
                ]}),
            ),
            run_event(
                "thread.run.completed",
                json!({"id": "run_1", "status": "completed", "model": "gpt-4o"}),
            ),
            Ok(SseEvent::new("done", "[DONE]")),
        ]
    }

    #[tokio::test]
    async fn chat_drains_the_run_stream() {
        let transport = Arc::new(FakeTransport::default().with_stream(completed_run_events()));
        let provider =
            AssistantsProvider::new(transport.clone(), SecretString::new("sk"), "asst_1");

        let response = provider
            .chat(ChatRequest::new(vec![
                Message::system("dropped"),
                Message::user("hello"),
            ]))
            .await
            .expect("chat should succeed");

        assert_eq!(response.history, vec![Message::bot("Hi there")]);
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.provider, ProviderId::OpenAiAssistants);

        let sent = transport.sent();
        assert_eq!(sent[0].path, "threads/runs");
        assert!(
            sent[0]
                .headers
                .contains(&("OpenAI-Beta".to_string(), "assistants=v2".to_string()))
        );
        assert_eq!(sent[0].body["assistant_id"], "asst_1");
        assert_eq!(
            sent[0].body["thread"]["messages"],
            json!([{"role": "user", "content": "hello"}])
        );
    }

    #[tokio::test]
    async fn stream_without_run_is_a_protocol_error() {
        let transport = Arc::new(
            FakeTransport::default().with_stream(vec![Ok(SseEvent::new("done", "[DONE]"))]),
        );
        let provider = AssistantsProvider::new(transport, SecretString::new("sk"), "asst_1");

        let error = provider
            .chat(ChatRequest::new(vec![Message::user("hello")]))
            .await
            .expect_err("empty run stream should fail");
        assert_eq!(error.kind, crate::ProviderErrorKind::Protocol);
    }
}
