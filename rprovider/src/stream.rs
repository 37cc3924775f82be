//! Streaming event contracts and in-memory stream utilities.
//!
//! ```rust
//! use rprovider::{BoxedEventStream, StreamEvent, VecEventStream};
//!
//! let stream = VecEventStream::new(vec![Ok(StreamEvent::Started)]);
//! let _boxed: BoxedEventStream<'static> = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::{ChatResponse, MessageKind, ProviderError, ToolCall};

/// Best-known state of a tool call while its fragments are still arriving.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartialToolCall {
    pub id: Option<String>,
    pub tool_id: Option<String>,
    pub raw_arguments: String,
}

impl From<&ToolCall> for PartialToolCall {
    fn from(value: &ToolCall) -> Self {
        Self {
            id: Some(value.id.clone()),
            tool_id: Some(value.tool_id.clone()),
            raw_arguments: value.raw_arguments.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Started,
    TextCreated {
        choice: u32,
    },
    TextDelta {
        choice: u32,
        delta: String,
        text_so_far: String,
    },
    TextDone {
        choice: u32,
        text: String,
    },
    ToolCallCreated {
        choice: u32,
        index: u32,
        snapshot: PartialToolCall,
    },
    ToolCallDelta {
        choice: u32,
        index: u32,
        delta: String,
        snapshot: PartialToolCall,
    },
    ToolCallDone {
        choice: u32,
        index: u32,
        call: ToolCall,
    },
    Finished(ChatResponse),
}

/// Provider stream contract.
///
/// Invariants for consumers:
/// - `Started` is the first event.
/// - A `*Created` event precedes every `*Delta` for the same unit.
/// - Each text or tool-call unit gets at most one `*Done`.
/// - `Finished` is terminal; nothing follows it.
pub trait ChatEventStream: Stream<Item = Result<StreamEvent, ProviderError>> + Send {}

impl<T> ChatEventStream for T where T: Stream<Item = Result<StreamEvent, ProviderError>> + Send {}

pub type BoxedEventStream<'a> = Pin<Box<dyn ChatEventStream + 'a>>;

#[derive(Debug)]
pub struct VecEventStream {
    events: VecDeque<Result<StreamEvent, ProviderError>>,
}

impl VecEventStream {
    pub fn new(events: Vec<Result<StreamEvent, ProviderError>>) -> Self {
        Self {
            events: events.into(),
        }
    }

    pub fn replay(response: ChatResponse) -> Self {
        Self::new(replay_events(response).into_iter().map(Ok).collect())
    }
}

impl Stream for VecEventStream {
    type Item = Result<StreamEvent, ProviderError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<StreamEvent, ProviderError>>> {
        Poll::Ready(self.events.pop_front())
    }
}

/// Renders a complete response as the event sequence a streaming backend would have produced.
pub fn replay_events(response: ChatResponse) -> Vec<StreamEvent> {
    let mut events = vec![StreamEvent::Started];
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for message in response
        .history
        .iter()
        .filter(|message| message.kind == MessageKind::Bot)
    {
        text.push_str(&message.text);
        tool_calls.extend(message.tool_calls.iter().cloned());
    }

    if !text.is_empty() || tool_calls.is_empty() {
        events.push(StreamEvent::TextCreated { choice: 0 });
        if !text.is_empty() {
            events.push(StreamEvent::TextDelta {
                choice: 0,
                delta: text.clone(),
                text_so_far: text.clone(),
            });
        }
        events.push(StreamEvent::TextDone { choice: 0, text });
    }

    for (index, call) in tool_calls.into_iter().enumerate() {
        let index = index as u32;
        events.push(StreamEvent::ToolCallCreated {
            choice: 0,
            index,
            snapshot: PartialToolCall::from(&call),
        });
        events.push(StreamEvent::ToolCallDone {
            choice: 0,
            index,
            call,
        });
    }

    events.push(StreamEvent::Finished(response));
    events
}
