//! Canonical model <-> chat-completions mapping.

use serde_json::json;

use crate::{
    ChatRequest, ChatResponse, Message, MessageKind, ProviderError, ProviderId, ProviderMapper,
    TokenUsage, ToolCall, ToolChoice, ToolDefinition, parse_finish_reason,
};

use super::wire::{
    OpenAiChatRequest, OpenAiChatResponse, OpenAiFunction, OpenAiFunctionCall, OpenAiMessage,
    OpenAiStreamOptions, OpenAiTool, OpenAiToolCall, OpenAiUsage, function_type,
};

pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Wire role for each canonical kind. `None` means the kind is dropped from requests.
pub fn wire_role(kind: MessageKind) -> Option<&'static str> {
    match kind {
        MessageKind::System => Some("system"),
        MessageKind::User => Some("user"),
        MessageKind::Bot => Some("assistant"),
        MessageKind::ToolResult => Some("tool"),
        MessageKind::Error => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiMapper {
    provider: ProviderId,
    default_model: String,
    include_usage: bool,
}

impl Default for OpenAiMapper {
    fn default() -> Self {
        Self::new(ProviderId::OpenAi, OPENAI_DEFAULT_MODEL)
    }
}

impl OpenAiMapper {
    pub fn new(provider: ProviderId, default_model: impl Into<String>) -> Self {
        Self {
            provider,
            default_model: default_model.into(),
            include_usage: provider == ProviderId::OpenAi,
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Asks the backend for a trailing usage chunk on streamed responses.
    pub fn with_stream_usage(mut self, include_usage: bool) -> Self {
        self.include_usage = include_usage;
        self
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn map_stream_request(
        &self,
        request: &ChatRequest,
    ) -> Result<OpenAiChatRequest, ProviderError> {
        let mut wire = self.map_request(request)?;
        wire.stream = true;
        if self.include_usage {
            wire.stream_options = Some(OpenAiStreamOptions {
                include_usage: true,
            });
        }
        Ok(wire)
    }

    fn resolve_model(&self, request: &ChatRequest) -> String {
        request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or(&self.default_model)
            .to_string()
    }
}

impl ProviderMapper for OpenAiMapper {
    type WireRequest = OpenAiChatRequest;
    type WireResponse = OpenAiChatResponse;

    fn map_request(&self, request: &ChatRequest) -> Result<OpenAiChatRequest, ProviderError> {
        request.validate()?;

        let tool_choice = match &request.tool_choice {
            ToolChoice::Auto => None,
            ToolChoice::Required(tool_id) => {
                Some(json!({"type": "function", "function": {"name": tool_id}}))
            }
        };

        Ok(OpenAiChatRequest {
            model: self.resolve_model(request),
            messages: request.history.iter().filter_map(message_to_wire).collect(),
            tools: request.tools.iter().map(tool_to_wire).collect(),
            tool_choice,
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            stream: false,
            stream_options: None,
            extra: request.overrides.clone(),
        })
    }

    fn map_response(&self, response: OpenAiChatResponse) -> Result<ChatResponse, ProviderError> {
        let choice = response
            .choices
            .into_iter()
            .min_by_key(|choice| choice.index)
            .ok_or_else(|| ProviderError::protocol("response contained no choices"))?;

        let message = message_from_wire(&choice.message).ok_or_else(|| {
            ProviderError::protocol(format!(
                "unexpected response role '{}'",
                choice.message.role
            ))
        })?;

        Ok(ChatResponse::new(
            self.provider,
            response
                .model
                .unwrap_or_else(|| self.default_model.clone()),
            vec![message],
        )
        .with_stop_reason(parse_finish_reason(choice.finish_reason.as_deref()))
        .with_usage(response.usage.map(usage_from_wire).unwrap_or_default()))
    }
}

pub fn message_to_wire(message: &Message) -> Option<OpenAiMessage> {
    let role = wire_role(message.kind)?;
    let content = if message.kind == MessageKind::Bot
        && message.text.is_empty()
        && message.has_tool_calls()
    {
        None
    } else {
        Some(message.text.clone())
    };

    Some(OpenAiMessage {
        role: role.to_string(),
        content,
        tool_calls: message
            .tool_calls
            .iter()
            .map(|call| OpenAiToolCall {
                id: call.id.clone(),
                kind: function_type(),
                function: OpenAiFunctionCall {
                    name: call.tool_id.clone(),
                    arguments: call.raw_arguments.clone(),
                },
            })
            .collect(),
        tool_call_id: if message.kind == MessageKind::ToolResult {
            message.tool_call_id.clone()
        } else {
            None
        },
    })
}

/// Inverse of [`message_to_wire`]. Unknown roles yield `None`.
pub fn message_from_wire(message: &OpenAiMessage) -> Option<Message> {
    let text = message.content.clone().unwrap_or_default();
    let mapped = match message.role.as_str() {
        "system" | "developer" => Message::system(text),
        "user" => Message::user(text),
        "assistant" => Message::bot_with_tool_calls(
            text,
            message
                .tool_calls
                .iter()
                .enumerate()
                .map(|(index, call)| {
                    let id = if call.id.is_empty() {
                        format!("call_{index}")
                    } else {
                        call.id.clone()
                    };
                    ToolCall::new(id, &call.function.name, &call.function.arguments)
                })
                .collect(),
        ),
        "tool" => Message::tool_result(message.tool_call_id.clone().unwrap_or_default(), text),
        _ => return None,
    };

    Some(mapped)
}

pub fn tool_to_wire(tool: &ToolDefinition) -> OpenAiTool {
    OpenAiTool {
        kind: function_type(),
        function: OpenAiFunction {
            name: tool.id.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters_json(),
        },
    }
}

fn usage_from_wire(usage: OpenAiUsage) -> TokenUsage {
    let total_tokens = if usage.total_tokens == 0 {
        usage.prompt_tokens.saturating_add(usage.completion_tokens)
    } else {
        usage.total_tokens
    };

    TokenUsage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        total_tokens,
    }
}
