//! Inputs, per-call options and results of a chat run.

use rcommon::GenerationOptions;
use rprovider::{Message, MessageKind, ProviderId, StopReason, TokenUsage, ToolChoice};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::HistoryMode;

/// How a run ended. Hitting the round limit is a status, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Finished,
    RoundLimitExceeded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Messages appended by this run, in order.
    pub messages: Vec<Message>,
    /// The request history with `messages` appended.
    pub history: Vec<Message>,
    pub rounds: u32,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
    pub provider: ProviderId,
    pub model: String,
}

impl RunOutcome {
    pub fn is_finished(&self) -> bool {
        self.status == RunStatus::Finished
    }
}

/// Anything [`crate::Chat::chat`] accepts: bare text becomes one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Text(String),
    Messages(Vec<Message>),
}

impl ChatInput {
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Self::Text(text) => vec![Message::user(text)],
            Self::Messages(messages) => messages,
        }
    }
}

impl From<&str> for ChatInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ChatInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Message> for ChatInput {
    fn from(value: Message) -> Self {
        Self::Messages(vec![value])
    }
}

impl From<Vec<Message>> for ChatInput {
    fn from(value: Vec<Message>) -> Self {
        Self::Messages(value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatCallOptions {
    pub model: Option<String>,
    pub generation: GenerationOptions,
    pub tool_choice: ToolChoice,
    pub overrides: Map<String, Value>,
    pub max_rounds: Option<u32>,
    pub history_mode: Option<HistoryMode>,
    pub cancellation: Option<CancellationToken>,
}

impl ChatCallOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_generation(mut self, generation: GenerationOptions) -> Self {
        self.generation = generation;
        self
    }

    pub fn require_tool(mut self, tool_id: impl Into<String>) -> Self {
        self.tool_choice = ToolChoice::Required(tool_id.into());
        self
    }

    pub fn with_override(mut self, key: impl Into<String>, value: Value) -> Self {
        self.overrides.insert(key.into(), value);
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }

    pub fn with_history_mode(mut self, history_mode: HistoryMode) -> Self {
        self.history_mode = Some(history_mode);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub status: RunStatus,
    /// Produced messages, or the whole conversation under [`HistoryMode::Full`].
    pub messages: Vec<Message>,
    pub rounds: u32,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

impl ChatReply {
    pub fn is_round_limit_exceeded(&self) -> bool {
        self.status == RunStatus::RoundLimitExceeded
    }

    /// Text of the last bot message, empty when there is none.
    pub fn text(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|message| message.kind == MessageKind::Bot)
            .map(|message| message.text.as_str())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_input_becomes_one_user_message() {
        assert_eq!(
            ChatInput::from("hi").into_messages(),
            vec![Message::user("hi")]
        );
        assert_eq!(
            ChatInput::from(vec![Message::system("s"), Message::user("u")]).into_messages(),
            vec![Message::system("s"), Message::user("u")]
        );
    }

    #[test]
    fn reply_text_is_the_last_bot_message() {
        let reply = ChatReply {
            status: RunStatus::Finished,
            messages: vec![
                Message::bot("checking"),
                Message::tool_result("call_1", "42"),
                Message::bot("the answer is 42"),
            ],
            rounds: 2,
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        };

        assert_eq!(reply.text(), "the answer is 42");
        assert!(!reply.is_round_limit_exceeded());
    }
}
