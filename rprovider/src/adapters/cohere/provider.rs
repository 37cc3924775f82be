//! Cohere v2 chat provider.
//!
//! Cohere streams typed events rather than chat-completion chunks. Each event is rewritten
//! into the equivalent chunk so the shared [`DeltaAccumulator`] drives the event lifecycle.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;
use serde_json::{Value, json};

use crate::adapters::openai::{ChunkFrame, parse_chunk};
use crate::mapper::encode;
use crate::{
    BoxedEventStream, ChatProvider, ChatRequest, ChatResponse, DeltaAccumulator,
    NoopOperationHooks, ProviderError, ProviderFuture, ProviderId, ProviderMapper,
    ProviderOperationHooks, SecretString, SseEvent, StreamEvent, Transport, TransportRequest,
    observe_operation,
};

use super::mapper::CohereMapper;

pub const COHERE_BASE_URL: &str = "https://api.cohere.com";
pub const COHERE_CHAT_PATH: &str = "v2/chat";

#[derive(Clone)]
pub struct CohereProvider {
    transport: Arc<dyn Transport>,
    mapper: CohereMapper,
    api_key: SecretString,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl CohereProvider {
    pub fn new(transport: Arc<dyn Transport>, api_key: SecretString) -> Self {
        Self {
            transport,
            mapper: CohereMapper::default(),
            api_key,
            hooks: Arc::new(NoopOperationHooks),
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.mapper = CohereMapper::new(model);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn default_http_transport(client: reqwest::Client) -> crate::HttpTransport {
        crate::HttpTransport::new(client, COHERE_BASE_URL)
    }

    fn transport_request(&self, body: Value) -> TransportRequest {
        TransportRequest::new(COHERE_CHAT_PATH, body).with_auth(Some(self.api_key.clone()))
    }
}

impl std::fmt::Debug for CohereProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CohereProvider")
            .field("transport", &self.transport)
            .field("mapper", &self.mapper)
            .finish_non_exhaustive()
    }
}

impl ChatProvider for CohereProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Cohere
    }

    fn chat<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<ChatResponse, ProviderError>> {
        Box::pin(async move {
            let wire = self.mapper.map_request(&request)?;
            let model = wire.model.clone();
            let body = encode(&wire)?;
            let mut response = observe_operation(self.hooks.as_ref(), self.id(), "chat", async {
                let response = self.transport.send(self.transport_request(body)).await?;
                self.mapper.decode_response(response)
            })
            .await?;

            response.model = model;
            Ok(response)
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
                    let event = event?;
                    let data = match parse_chunk(&event)? {
                        ChunkFrame::Data(data) => data,
                        ChunkFrame::Skip => continue,
                        ChunkFrame::Done => break,
                    };

                    let Some(chunk) = fragment_from_event(&event, &data) else {
                        continue;
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

/// Rewrites one Cohere stream event as a chat-completion chunk. Events that carry nothing the
/// accumulator tracks yield `None`.
pub fn fragment_from_event(event: &SseEvent, data: &Value) -> Option<Value> {
    let kind = data
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or(event.event.as_str());
    let message = data.pointer("/delta/message");
    let index = data.get("index").and_then(Value::as_u64).unwrap_or(0);

    let delta = match kind {
        "message-start" => {
            let mut chunk = choice_chunk(json!({"role": "assistant"}), None);
            if let Some(id) = data.get("id").and_then(Value::as_str) {
                chunk["id"] = json!(id);
            }
            return Some(chunk);
        }
        "content-delta" | "content-start" => {
            let text = message?.pointer("/content/text")?.as_str()?;
            json!({"content": text})
        }
        "tool-plan-delta" => {
            let plan = message?.get("tool_plan")?.as_str()?;
            json!({"content": plan})
        }
        "tool-call-start" => {
            let call = message?.get("tool_calls")?;
            json!({"tool_calls": [{
                "index": index,
                "id": call.get("id").cloned().unwrap_or(Value::Null),
                "type": "function",
                "function": {
                    "name": call.pointer("/function/name").cloned().unwrap_or(Value::Null),
                    "arguments": call
                        .pointer("/function/arguments")
                        .cloned()
                        .unwrap_or_else(|| json!("")),
                }
            }]})
        }
        "tool-call-delta" => {
            let arguments = message?.pointer("/tool_calls/function/arguments")?.as_str()?;
            json!({"tool_calls": [{"index": index, "function": {"arguments": arguments}}]})
        }
        "message-end" => {
            let reason = data
                .pointer("/delta/finish_reason")
                .and_then(Value::as_str)
                .map(finish_reason_to_chunk)
                .unwrap_or("stop");
            let mut chunk = choice_chunk(json!({}), Some(reason));
            if let Some(usage) = data.pointer("/delta/usage") {
                let counts = usage.get("billed_units").or_else(|| usage.get("tokens"));
                let read = |key: &str| {
                    counts
                        .and_then(|counts| counts.get(key))
                        .and_then(Value::as_f64)
                        .unwrap_or_default() as u64
                };
                chunk["usage"] = json!({
                    "prompt_tokens": read("input_tokens"),
                    "completion_tokens": read("output_tokens"),
                });
            }
            return Some(chunk);
        }
        _ => return None,
    };

    Some(choice_chunk(delta, None))
}

fn choice_chunk(delta: Value, finish_reason: Option<&str>) -> Value {
    json!({"choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}]})
}

fn finish_reason_to_chunk(reason: &str) -> &str {
    match reason {
        "COMPLETE" | "STOP_SEQUENCE" => "stop",
        "MAX_TOKENS" => "length",
        "TOOL_CALL" => "tool_calls",
        other => other,
    }
}
