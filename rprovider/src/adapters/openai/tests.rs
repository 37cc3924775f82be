//! Focused unit tests for the OpenAI adapter.

#![cfg(test)]

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::{Value, json};

use crate::adapters::fakes::{FakeTransport, data_events};
use crate::{
    ChatProvider, ChatRequest, FieldSchema, Message, MessageKind, ProviderErrorKind, ProviderId,
    ProviderMapper, SecretString, SseEvent, StopReason, StreamEvent, ToolCall, ToolDefinition,
};

use super::mapper::{OpenAiMapper, message_from_wire};
use super::provider::OpenAiProvider;
use super::wire::OpenAiChatResponse;

fn request(history: Vec<Message>) -> ChatRequest {
    ChatRequest::new(history)
}

#[test]
fn user_message_maps_to_user_role() {
    let mapper = OpenAiMapper::default();
    let wire = mapper
        .encode_request(&request(vec![Message::user("Hello, how are you?")]))
        .expect("request should map");

    assert_eq!(
        wire["messages"],
        json!([{"role": "user", "content": "Hello, how are you?"}])
    );
    assert_eq!(wire["model"], "gpt-4o-mini");
    assert!(wire.get("stream").is_none());
    assert!(wire.get("tools").is_none());
}

#[test]
fn assistant_response_maps_to_bot_message() {
    let mapper = OpenAiMapper::default();
    let response = mapper
        .decode_response(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "I'm well"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 3, "total_tokens": 8}
        }))
        .expect("response should map");

    assert_eq!(response.history, vec![Message::bot("I'm well")]);
    assert_eq!(response.stop_reason, StopReason::EndTurn);
    assert_eq!(response.usage.total_tokens, 8);
}

#[test]
fn tool_without_schema_has_no_parameters() {
    let mapper = OpenAiMapper::default();
    let wire = mapper
        .encode_request(
            &request(vec![Message::user("list files")])
                .with_tools(vec![ToolDefinition::new("ls", "List files")]),
        )
        .expect("request should map");

    let function = &wire["tools"][0]["function"];
    assert_eq!(function["name"], "ls");
    assert!(function.get("parameters").is_none(), "{function}");
}

#[test]
fn tool_schema_maps_to_json_schema_parameters() {
    let mapper = OpenAiMapper::default();
    let tool = ToolDefinition::new("read_file", "Read a file").with_input_schema(
        FieldSchema::object("").field("path", FieldSchema::string("File path").required()),
    );
    let wire = mapper
        .encode_request(&request(vec![Message::user("read")]).with_tools(vec![tool]))
        .expect("request should map");

    assert_eq!(
        wire["tools"][0]["function"]["parameters"],
        json!({
            "type": "object",
            "properties": {"path": {"type": "string", "description": "File path"}},
            "required": ["path"]
        })
    );
}

#[test]
fn error_messages_are_dropped_not_rejected() {
    let mapper = OpenAiMapper::default();
    let wire = mapper
        .map_request(&request(vec![
            Message::system("be brief"),
            Message::error("previous call failed"),
            Message::user("hi"),
        ]))
        .expect("request should map");

    let roles = wire
        .messages
        .iter()
        .map(|message| message.role.as_str())
        .collect::<Vec<_>>();
    assert_eq!(roles, vec!["system", "user"]);
}

#[test]
fn supported_message_kinds_round_trip() {
    let mapper = OpenAiMapper::default();
    let history = vec![
        Message::system("be brief"),
        Message::user("what is in /tmp?"),
        Message::bot_with_tool_calls("", vec![ToolCall::new("call_1", "ls", "{\"path\":\"/tmp\"}")]),
        Message::tool_result("call_1", "a.txt"),
        Message::bot("There is one file."),
    ];

    let wire = mapper
        .map_request(&request(history.clone()))
        .expect("request should map");
    assert_eq!(wire.messages[2].content, None);

    let restored = wire
        .messages
        .iter()
        .filter_map(message_from_wire)
        .collect::<Vec<_>>();
    assert_eq!(restored, history);
}

#[test]
fn required_tool_and_overrides_reach_the_wire() {
    let mapper = OpenAiMapper::default();
    let mut chat_request = request(vec![Message::user("hi")])
        .with_model("gpt-4.1")
        .with_tools(vec![ToolDefinition::new("ls", "List files")])
        .with_tool_choice(crate::ToolChoice::Required("ls".to_string()));
    chat_request
        .overrides
        .insert("seed".to_string(), json!(7));

    let wire = mapper.encode_request(&chat_request).expect("request should map");
    assert_eq!(wire["model"], "gpt-4.1");
    assert_eq!(
        wire["tool_choice"],
        json!({"type": "function", "function": {"name": "ls"}})
    );
    assert_eq!(wire["seed"], 7);
}

#[test]
fn invalid_history_fails_before_any_network_call() {
    let mapper = OpenAiMapper::default();
    let error = mapper
        .map_request(&request(vec![Message::tool_result("call_9", "orphan")]))
        .expect_err("orphaned tool result should fail");
    assert_eq!(error.kind, ProviderErrorKind::Mapping);
}

#[test]
fn response_tool_calls_without_ids_get_positional_ids() {
    let mapper = OpenAiMapper::default();
    let wire: OpenAiChatResponse = serde_json::from_value(json!({
        "choices": [{
            "message": {"role": "assistant", "content": null, "tool_calls": [
                {"type": "function", "function": {"name": "ls", "arguments": "{}"}}
            ]},
            "finish_reason": "tool_calls"
        }]
    }))
    .expect("fixture should parse");

    let response = mapper.map_response(wire).expect("response should map");
    assert_eq!(response.model, "gpt-4o-mini");
    assert_eq!(response.stop_reason, StopReason::ToolUse);
    assert_eq!(
        response.tool_calls().cloned().collect::<Vec<_>>(),
        vec![ToolCall::new("call_0", "ls", "{}")]
    );
}

#[test]
fn stream_request_includes_usage_only_for_openai() {
    let chat_request = request(vec![Message::user("hi")]);

    let openai = OpenAiMapper::default()
        .map_stream_request(&chat_request)
        .expect("request should map");
    assert!(openai.stream);
    assert!(openai.stream_options.is_some());

    let compatible = OpenAiMapper::new(ProviderId::Ollama, "llama3.2")
        .map_stream_request(&chat_request)
        .expect("request should map");
    assert!(compatible.stream);
    assert!(compatible.stream_options.is_none());
}

#[tokio::test]
async fn chat_posts_to_completions_with_bearer_key() {
    let transport = Arc::new(FakeTransport::default().with_response(Ok(json!({
        "model": "gpt-4o-mini",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "pong"},
            "finish_reason": "stop"}]
    }))));
    let provider = OpenAiProvider::new(transport.clone(), Some(SecretString::new("sk-test")));

    let response = provider
        .chat(request(vec![Message::user("ping")]))
        .await
        .expect("chat should succeed");

    assert_eq!(response.text(), "pong");
    assert_eq!(response.provider, ProviderId::OpenAi);

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].path, "chat/completions");
    assert_eq!(
        sent[0].auth.as_ref().map(SecretString::expose),
        Some("sk-test")
    );
}

#[tokio::test]
async fn chat_stream_accumulates_fragments_until_done_marker() {
    let mut events = data_events(&[
        json!({"id": "c1", "model": "gpt-4o-mini", "choices": [{"index": 0,
            "delta": {"role": "assistant", "content": ""}}]}),
        json!({"id": "c1", "choices": [{"index": 0, "delta": {"content": "po"}}]}),
        json!({"id": "c1", "choices": [{"index": 0, "delta": {"content": "ng"},
            "finish_reason": "stop"}]}),
        json!({"id": "c1", "choices": [], "usage": {"prompt_tokens": 3,
            "completion_tokens": 2, "total_tokens": 5}}),
    ]);
    events.push(Ok(SseEvent::data("[DONE]")));
    events.push(Ok(SseEvent::data("{\"never\": \"parsed\"")));

    let transport = Arc::new(FakeTransport::default().with_stream(events));
    let provider = OpenAiProvider::new(transport.clone(), None);

    let stream = provider
        .chat_stream(request(vec![Message::user("ping")]))
        .await
        .expect("stream should open");
    let collected = stream
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("stream should not fail");

    assert_eq!(collected.first(), Some(&StreamEvent::Started));
    let Some(StreamEvent::Finished(response)) = collected.last() else {
        panic!("stream should end with Finished: {collected:?}");
    };
    assert_eq!(response.text(), "pong");
    assert_eq!(response.usage.total_tokens, 5);
    assert_eq!(
        collected
            .iter()
            .filter(|event| matches!(event, StreamEvent::TextDone { .. }))
            .count(),
        1
    );

    let body: &Value = &transport.sent()[0].body;
    assert_eq!(body["stream"], true);
    assert_eq!(body["stream_options"]["include_usage"], true);
}

#[tokio::test]
async fn stream_cut_off_before_finish_reason_fails_instead_of_finishing() {
    let transport = Arc::new(FakeTransport::default().with_stream(data_events(&[json!({
        "id": "c1", "choices": [{"index": 0, "delta": {"content": "The answer is"}}]
    })])));
    let provider = OpenAiProvider::new(transport, None);

    let collected = provider
        .chat_stream(request(vec![Message::user("what is it?")]))
        .await
        .expect("stream should open")
        .collect::<Vec<_>>()
        .await;

    assert!(
        !collected
            .iter()
            .any(|event| matches!(event, Ok(StreamEvent::Finished(_)))),
        "truncated stream must not finish: {collected:?}"
    );
    let error = collected
        .last()
        .expect("stream should yield")
        .as_ref()
        .expect_err("stream should end with an error");
    assert_eq!(error.kind, ProviderErrorKind::Protocol);
    assert_eq!(error.message, "stream ended before the response finished");
}

#[tokio::test]
async fn mid_stream_error_frame_fails_the_stream() {
    let transport = Arc::new(FakeTransport::default().with_stream(data_events(&[json!({
        "error": {"message": "model overloaded"}
    })])));
    let provider = OpenAiProvider::new(transport, None);

    let mut stream = provider
        .chat_stream(request(vec![Message::user("ping")]))
        .await
        .expect("stream should open");
    let error = stream
        .next()
        .await
        .expect("stream should yield")
        .expect_err("error frame should fail");

    assert_eq!(error.kind, ProviderErrorKind::Server);
    assert_eq!(error.message, "model overloaded");
}

#[tokio::test]
async fn completion_stream_yields_one_item_per_finished_response() {
    let transport = Arc::new(FakeTransport::default().with_stream(data_events(&[
        json!({"id": "a", "choices": [{"index": 0, "delta": {"content": "one"}}]}),
        json!({"id": "a", "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]}),
        json!({"id": "b", "choices": [{"index": 0, "delta": {"content": "two"}}]}),
    ])));
    let provider = OpenAiProvider::new(transport, None);

    let finished = provider
        .completion_stream(request(vec![Message::user("count")]))
        .await
        .expect("stream should open")
        .collect::<Vec<_>>()
        .await;

    assert_eq!(finished.len(), 1);
    let first = finished[0].as_ref().expect("item should be ok");
    assert_eq!(first.id.as_deref(), Some("a"));
    assert_eq!(first.content, "one");
}

#[test]
fn message_kinds_without_wire_role_are_listed() {
    assert_eq!(super::wire_role(MessageKind::Error), None);
    assert_eq!(super::wire_role(MessageKind::ToolResult), Some("tool"));
}
