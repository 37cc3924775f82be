//! Typed event channel between a running orchestration and its consumers.
//!
//! The sending side owns the ordering guarantees: within a round, every text or tool-call unit
//! gets exactly one created event before any delta, and at most one done event.
//!
//! Consumers must drain the receiver while the run is in progress; the channel is bounded.

use std::collections::HashSet;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use rprovider::{Message, PartialToolCall, StreamEvent};
use tokio::sync::mpsc;

use crate::{ChatError, RunStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    RoundStarted { round: u32 },
    Provider(StreamEvent),
    ToolResult { round: u32, message: Message },
    RoundLimitExceeded { max_rounds: u32 },
    Completed { status: RunStatus, rounds: u32 },
}

/// Creates a bounded channel. A capacity of zero is raised to one.
pub fn event_channel(capacity: usize) -> (ChatEventSender, ChatEventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ChatEventSender {
            tx,
            round: RoundUnits::default(),
        },
        ChatEventReceiver { rx },
    )
}

#[derive(Debug, Default)]
struct RoundUnits {
    started: bool,
    text_created: HashSet<u32>,
    text_done: HashSet<u32>,
    tool_created: HashSet<(u32, u32)>,
    tool_done: HashSet<(u32, u32)>,
}

#[derive(Debug)]
pub struct ChatEventSender {
    tx: mpsc::Sender<ChatEvent>,
    round: RoundUnits,
}

impl ChatEventSender {
    /// Sends `event`, first synthesizing any missing created event and dropping duplicates.
    pub async fn send(&mut self, event: ChatEvent) -> Result<(), ChatError> {
        if matches!(event, ChatEvent::RoundStarted { .. }) {
            self.round = RoundUnits::default();
        }

        match event {
            ChatEvent::Provider(provider_event) => {
                for event in self.normalize(provider_event) {
                    self.deliver(ChatEvent::Provider(event)).await?;
                }
                Ok(())
            }
            other => self.deliver(other).await,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn deliver(&self, event: ChatEvent) -> Result<(), ChatError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| ChatError::channel("chat event receiver was dropped"))
    }

    fn normalize(&mut self, event: StreamEvent) -> Vec<StreamEvent> {
        let units = &mut self.round;
        let mut out = Vec::with_capacity(2);

        match &event {
            StreamEvent::Started => {
                if units.started {
                    return out;
                }
                units.started = true;
            }
            StreamEvent::TextCreated { choice } => {
                if !units.text_created.insert(*choice) {
                    return out;
                }
            }
            StreamEvent::TextDelta { choice, .. } => {
                if units.text_done.contains(choice) {
                    return out;
                }
                if units.text_created.insert(*choice) {
                    out.push(StreamEvent::TextCreated { choice: *choice });
                }
            }
            StreamEvent::TextDone { choice, .. } => {
                if units.text_done.contains(choice) {
                    return out;
                }
                units.text_done.insert(*choice);
                if units.text_created.insert(*choice) {
                    out.push(StreamEvent::TextCreated { choice: *choice });
                }
            }
            StreamEvent::ToolCallCreated { choice, index, .. } => {
                if !units.tool_created.insert((*choice, *index)) {
                    return out;
                }
            }
            StreamEvent::ToolCallDelta {
                choice,
                index,
                snapshot,
                ..
            } => {
                if units.tool_done.contains(&(*choice, *index)) {
                    return out;
                }
                if units.tool_created.insert((*choice, *index)) {
                    out.push(StreamEvent::ToolCallCreated {
                        choice: *choice,
                        index: *index,
                        snapshot: snapshot.clone(),
                    });
                }
            }
            StreamEvent::ToolCallDone {
                choice,
                index,
                call,
            } => {
                if !units.tool_done.insert((*choice, *index)) {
                    return out;
                }
                if units.tool_created.insert((*choice, *index)) {
                    out.push(StreamEvent::ToolCallCreated {
                        choice: *choice,
                        index: *index,
                        snapshot: PartialToolCall::from(call),
                    });
                }
            }
            StreamEvent::Finished(_) => {}
        }

        out.push(event);
        out
    }
}

#[derive(Debug)]
pub struct ChatEventReceiver {
    rx: mpsc::Receiver<ChatEvent>,
}

impl ChatEventReceiver {
    pub async fn recv(&mut self) -> Option<ChatEvent> {
        self.rx.recv().await
    }
}

impl Stream for ChatEventReceiver {
    type Item = ChatEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
