//! Canonical model <-> assistants thread/run mapping.
//!
//! Threads only know `user` and `assistant` messages. System and error messages are dropped,
//! tool results are replayed as user text and issued tool calls are rendered into bot text.

use serde_json::{Value, json};

use crate::adapters::openai::tool_to_wire;
use crate::{
    ChatRequest, ChatResponse, Message, MessageKind, ProviderError, ProviderId, ProviderMapper,
    StopReason, TokenUsage, ToolCall, ToolChoice,
};

use super::wire::{AssistantsMessage, AssistantsRunRequest, AssistantsRunResult, AssistantsThread};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantsMapper {
    assistant_id: String,
    default_model: Option<String>,
}

impl AssistantsMapper {
    pub fn new(assistant_id: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            default_model: None,
        }
    }

    /// Overrides the model configured on the assistant for every run.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }
}

impl ProviderMapper for AssistantsMapper {
    type WireRequest = AssistantsRunRequest;
    type WireResponse = AssistantsRunResult;

    fn map_request(&self, request: &ChatRequest) -> Result<AssistantsRunRequest, ProviderError> {
        request.validate()?;

        if self.assistant_id.trim().is_empty() {
            return Err(ProviderError::mapping("assistant id must not be empty"));
        }

        let model = request
            .model
            .clone()
            .filter(|model| !model.trim().is_empty())
            .or_else(|| self.default_model.clone());

        Ok(AssistantsRunRequest {
            assistant_id: self.assistant_id.clone(),
            model,
            thread: AssistantsThread {
                messages: request.history.iter().filter_map(message_to_wire).collect(),
            },
            tools: request.tools.iter().map(tool_to_wire).collect(),
            tool_choice: match &request.tool_choice {
                ToolChoice::Auto => None,
                ToolChoice::Required(tool_id) => {
                    Some(json!({"type": "function", "function": {"name": tool_id}}))
                }
            },
            temperature: request.options.temperature,
            max_completion_tokens: request.options.max_tokens,
            stream: true,
            extra: request.overrides.clone(),
        })
    }

    fn map_response(&self, result: AssistantsRunResult) -> Result<ChatResponse, ProviderError> {
        let run = &result.run;
        let status = run.get("status").and_then(Value::as_str).unwrap_or_default();
        let model = run
            .get("model")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .or_else(|| self.default_model.clone())
            .unwrap_or_default();

        let mut history = result
            .messages
            .iter()
            .filter(|message| message.get("role").and_then(Value::as_str) == Some("assistant"))
            .map(|message| Message::bot(message_text(message)))
            .collect::<Vec<_>>();

        let stop_reason = match status {
            "completed" => StopReason::EndTurn,
            "incomplete" => StopReason::MaxTokens,
            "requires_action" => {
                let calls = required_tool_calls(run)?;
                match history.last_mut() {
                    Some(last) => last.tool_calls = calls,
                    None => history.push(Message::bot_with_tool_calls("", calls)),
                }
                StopReason::ToolUse
            }
            "failed" | "expired" => {
                let reason = run
                    .pointer("/last_error/message")
                    .and_then(Value::as_str)
                    .map(ToString::to_string)
                    .unwrap_or_else(|| format!("run {status}"));
                history.push(Message::error(reason));
                StopReason::Other
            }
            "cancelled" => StopReason::Cancelled,
            other => {
                return Err(ProviderError::protocol(format!(
                    "run ended in non-terminal status '{other}'"
                )));
            }
        };

        if history.is_empty() && stop_reason != StopReason::Cancelled {
            history.push(Message::bot(""));
        }

        Ok(
            ChatResponse::new(ProviderId::OpenAiAssistants, model, history)
                .with_stop_reason(stop_reason)
                .with_usage(run.get("usage").map(usage_from_run).unwrap_or_default()),
        )
    }
}

pub fn message_to_wire(message: &Message) -> Option<AssistantsMessage> {
    let (role, content) = match message.kind {
        MessageKind::User => ("user", message.text.clone()),
        MessageKind::Bot => ("assistant", render_bot_text(message)),
        MessageKind::ToolResult => (
            "user",
            format!(
                "Tool result for call {}: {}",
                message.tool_call_id.as_deref().unwrap_or_default(),
                message.text
            ),
        ),
        MessageKind::System | MessageKind::Error => return None,
    };

    Some(AssistantsMessage {
        role: role.to_string(),
        content,
    })
}

pub fn message_from_wire(message: &AssistantsMessage) -> Option<Message> {
    match message.role.as_str() {
        "user" => Some(Message::user(message.content.clone())),
        "assistant" => Some(Message::bot(message.content.clone())),
        _ => None,
    }
}

fn render_bot_text(message: &Message) -> String {
    let mut lines = Vec::with_capacity(message.tool_calls.len() + 1);
    if !message.text.is_empty() {
        lines.push(message.text.clone());
    }

    lines.extend(message.tool_calls.iter().map(|call| {
        format!(
            "Called tool {} (call {}) with arguments {}",
            call.tool_id, call.id, call.raw_arguments
        )
    }));

    lines.join("\n")
}

/// Joins the text parts of a `thread.message` object.
pub fn message_text(message: &Value) -> String {
    message
        .get("content")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.pointer("/text/value").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

fn required_tool_calls(run: &Value) -> Result<Vec<ToolCall>, ProviderError> {
    let calls = run
        .pointer("/required_action/submit_tool_outputs/tool_calls")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::protocol("requires_action run lists no tool calls"))?;

    Ok(calls
        .iter()
        .enumerate()
        .map(|(index, call)| {
            ToolCall::new(
                call.get("id")
                    .and_then(Value::as_str)
                    .map(ToString::to_string)
                    .unwrap_or_else(|| format!("call_{index}")),
                call.pointer("/function/name")
                    .and_then(Value::as_str)
                    .unwrap_or_default(),
                call.pointer("/function/arguments")
                    .and_then(Value::as_str)
                    .unwrap_or_default(),
            )
        })
        .collect())
}

fn usage_from_run(usage: &Value) -> TokenUsage {
    let read = |key: &str| usage.get(key).and_then(Value::as_u64).unwrap_or_default() as u32;

    TokenUsage {
        input_tokens: read("prompt_tokens"),
        output_tokens: read("completion_tokens"),
        total_tokens: read("total_tokens"),
    }
}
