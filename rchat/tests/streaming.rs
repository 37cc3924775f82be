use std::sync::Arc;

use futures_util::StreamExt;
use rchat::prelude::*;
use rprovider::{
    BoxedEventStream, ChatProvider, ChatRequest, ChatResponse, Message, MessageKind,
    PartialToolCall, ProviderError, ProviderFuture, ProviderId, StreamEvent, ToolCall,
    VecEventStream,
};
use rtooling::ToolBuilder;

/// Streams a tool call on the first round and a two-fragment answer once a result is present.
/// Created events are deliberately omitted so the channel has to synthesize them.
struct FragmentProvider;

impl FragmentProvider {
    fn final_response(request: &ChatRequest) -> ChatResponse {
        if has_tool_result(request) {
            ChatResponse::new(ProviderId::Custom, "frag", vec![Message::bot("Hello")])
        } else {
            ChatResponse::new(
                ProviderId::Custom,
                "frag",
                vec![Message::bot_with_tool_calls("", vec![ls_call()])],
            )
        }
    }
}

fn ls_call() -> ToolCall {
    ToolCall::new("call_1", "ls", "{}")
}

fn has_tool_result(request: &ChatRequest) -> bool {
    request
        .history
        .iter()
        .any(|message| message.kind == MessageKind::ToolResult)
}

impl ChatProvider for FragmentProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Custom
    }

    fn chat<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<ChatResponse, ProviderError>> {
        Box::pin(async move { Ok(Self::final_response(&request)) })
    }

    fn chat_stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            let response = Self::final_response(&request);
            let events = if has_tool_result(&request) {
                vec![
                    StreamEvent::Started,
                    StreamEvent::TextDelta {
                        choice: 0,
                        delta: "Hel".to_string(),
                        text_so_far: "Hel".to_string(),
                    },
                    StreamEvent::TextDelta {
                        choice: 0,
                        delta: "lo".to_string(),
                        text_so_far: "Hello".to_string(),
                    },
                    StreamEvent::TextDone {
                        choice: 0,
                        text: "Hello".to_string(),
                    },
                    StreamEvent::Finished(response),
                ]
            } else {
                vec![
                    StreamEvent::Started,
                    StreamEvent::ToolCallDelta {
                        choice: 0,
                        index: 0,
                        delta: "{}".to_string(),
                        snapshot: PartialToolCall::from(&ls_call()),
                    },
                    StreamEvent::ToolCallDone {
                        choice: 0,
                        index: 0,
                        call: ls_call(),
                    },
                    StreamEvent::Finished(response),
                ]
            };
            Ok(Box::pin(VecEventStream::new(events.into_iter().map(Ok).collect()))
                as BoxedEventStream<'a>)
        })
    }
}

fn label(event: &ChatEvent) -> String {
    match event {
        ChatEvent::RoundStarted { round } => format!("round:{round}"),
        ChatEvent::Provider(StreamEvent::Started) => "started".to_string(),
        ChatEvent::Provider(StreamEvent::TextCreated { .. }) => "text-created".to_string(),
        ChatEvent::Provider(StreamEvent::TextDelta { delta, .. }) => format!("text:{delta}"),
        ChatEvent::Provider(StreamEvent::TextDone { .. }) => "text-done".to_string(),
        ChatEvent::Provider(StreamEvent::ToolCallCreated { .. }) => "tool-created".to_string(),
        ChatEvent::Provider(StreamEvent::ToolCallDelta { .. }) => "tool-delta".to_string(),
        ChatEvent::Provider(StreamEvent::ToolCallDone { call, .. }) => {
            format!("tool-done:{}", call.tool_id)
        }
        ChatEvent::Provider(StreamEvent::Finished(_)) => "finished".to_string(),
        ChatEvent::ToolResult { round, message } => format!("result:{round}:{}", message.text),
        ChatEvent::RoundLimitExceeded { max_rounds } => format!("limit:{max_rounds}"),
        ChatEvent::Completed { status, rounds } => format!("completed:{status:?}:{rounds}"),
    }
}

fn ls_chat() -> Chat {
    Chat::builder(Arc::new(FragmentProvider))
        .tool(ToolBuilder::new("ls").sync_handler(|_args, _ctx| Ok("Cargo.toml".to_string())))
        .build()
}

#[tokio::test]
async fn streamed_rounds_arrive_in_order_with_synthesized_created_events() {
    let mut chat = ls_chat();
    let (mut sender, receiver) = event_channel(4);
    let collector = tokio::spawn(receiver.collect::<Vec<_>>());

    let reply = chat
        .chat_stream("list the files", &mut sender)
        .await
        .expect("stream should succeed");
    drop(sender);
    let events = collector.await.expect("collector task");

    assert_eq!(reply.text(), "Hello");
    assert_eq!(reply.rounds, 2);
    assert_eq!(
        events.iter().map(label).collect::<Vec<_>>(),
        vec![
            "round:1",
            "started",
            "tool-created",
            "tool-delta",
            "tool-done:ls",
            "finished",
            "result:1:Cargo.toml",
            "round:2",
            "started",
            "text-created",
            "text:Hel",
            "text:lo",
            "text-done",
            "finished",
            "completed:Finished:2",
        ]
    );
    assert_eq!(chat.history().len(), 4);
}

#[tokio::test]
async fn streaming_and_plain_calls_agree_on_the_transcript() {
    let mut streamed = ls_chat();
    let mut plain = ls_chat();
    let (mut sender, mut receiver) = event_channel(1);
    let drain = tokio::spawn(async move { while receiver.recv().await.is_some() {} });

    let streamed_reply = streamed
        .chat_stream("list", &mut sender)
        .await
        .expect("stream should succeed");
    drop(sender);
    drain.await.expect("drain task");
    let plain_reply = plain.chat("list").await.expect("chat should succeed");

    assert_eq!(streamed_reply.messages, plain_reply.messages);
    assert_eq!(streamed.history(), plain.history());
}

#[tokio::test]
async fn dropping_the_receiver_fails_the_run() {
    let mut chat = ls_chat();
    let (mut sender, receiver) = event_channel(1);
    drop(receiver);

    let error = chat
        .chat_stream("list", &mut sender)
        .await
        .expect_err("closed channel should fail");

    assert_eq!(error.kind, ChatErrorKind::Channel);
    assert!(chat.history().is_empty());
}
