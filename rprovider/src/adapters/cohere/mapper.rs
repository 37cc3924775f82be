//! Canonical model <-> Cohere v2 chat mapping.

use crate::adapters::openai::{OpenAiFunctionCall, function_type, tool_to_wire};
use crate::{
    ChatRequest, ChatResponse, Message, MessageKind, ProviderError, ProviderId, ProviderMapper,
    StopReason, TokenUsage, ToolCall, ToolChoice,
};

use super::wire::{
    CohereChatRequest, CohereChatResponse, CohereContent, CohereMessage, CohereToolCall,
    CohereUsage,
};

pub const COHERE_DEFAULT_MODEL: &str = "command-r-plus";

pub fn wire_role(kind: MessageKind) -> Option<&'static str> {
    match kind {
        MessageKind::System => Some("system"),
        MessageKind::User => Some("user"),
        MessageKind::Bot => Some("assistant"),
        MessageKind::ToolResult => Some("tool"),
        MessageKind::Error => None,
    }
}

pub fn parse_finish_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("COMPLETE") | Some("STOP_SEQUENCE") => StopReason::EndTurn,
        Some("MAX_TOKENS") => StopReason::MaxTokens,
        Some("TOOL_CALL") => StopReason::ToolUse,
        _ => StopReason::Other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohereMapper {
    default_model: String,
}

impl Default for CohereMapper {
    fn default() -> Self {
        Self::new(COHERE_DEFAULT_MODEL)
    }
}

impl CohereMapper {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn map_stream_request(
        &self,
        request: &ChatRequest,
    ) -> Result<CohereChatRequest, ProviderError> {
        let mut wire = self.map_request(request)?;
        wire.stream = true;
        Ok(wire)
    }
}

impl ProviderMapper for CohereMapper {
    type WireRequest = CohereChatRequest;
    type WireResponse = CohereChatResponse;

    fn map_request(&self, request: &ChatRequest) -> Result<CohereChatRequest, ProviderError> {
        request.validate()?;

        // Cohere has no way to name the required tool, so only that tool is offered.
        let (tools, tool_choice) = match &request.tool_choice {
            ToolChoice::Auto => (request.tools.iter().map(tool_to_wire).collect(), None),
            ToolChoice::Required(tool_id) => (
                request
                    .tools
                    .iter()
                    .filter(|tool| &tool.id == tool_id)
                    .map(tool_to_wire)
                    .collect(),
                Some("REQUIRED".to_string()),
            ),
        };

        let model = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or(&self.default_model)
            .to_string();

        Ok(CohereChatRequest {
            model,
            messages: request.history.iter().filter_map(message_to_wire).collect(),
            tools,
            tool_choice,
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            stream: false,
            extra: request.overrides.clone(),
        })
    }

    fn map_response(&self, response: CohereChatResponse) -> Result<ChatResponse, ProviderError> {
        let message = message_from_wire(&response.message).ok_or_else(|| {
            ProviderError::protocol(format!(
                "unexpected response role '{}'",
                response.message.role
            ))
        })?;

        Ok(
            ChatResponse::new(ProviderId::Cohere, self.default_model.clone(), vec![message])
                .with_stop_reason(parse_finish_reason(response.finish_reason.as_deref()))
                .with_usage(response.usage.map(usage_from_wire).unwrap_or_default()),
        )
    }
}

pub fn message_to_wire(message: &Message) -> Option<CohereMessage> {
    let role = wire_role(message.kind)?;
    let plan_only = message.kind == MessageKind::Bot && message.has_tool_calls();

    let (content, tool_plan) = if plan_only {
        let plan = (!message.text.is_empty()).then(|| message.text.clone());
        (None, plan)
    } else {
        (Some(CohereContent::Text(message.text.clone())), None)
    };

    Some(CohereMessage {
        role: role.to_string(),
        content,
        tool_calls: message
            .tool_calls
            .iter()
            .map(|call| CohereToolCall {
                id: call.id.clone(),
                kind: function_type(),
                function: OpenAiFunctionCall {
                    name: call.tool_id.clone(),
                    arguments: call.raw_arguments.clone(),
                },
            })
            .collect(),
        tool_plan,
        tool_call_id: if message.kind == MessageKind::ToolResult {
            message.tool_call_id.clone()
        } else {
            None
        },
    })
}

pub fn message_from_wire(message: &CohereMessage) -> Option<Message> {
    let text = message
        .content
        .as_ref()
        .map(CohereContent::joined_text)
        .filter(|text| !text.is_empty())
        .or_else(|| message.tool_plan.clone())
        .unwrap_or_default();

    let mapped = match message.role.as_str() {
        "system" => Message::system(text),
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

fn usage_from_wire(usage: CohereUsage) -> TokenUsage {
    let counts = usage.billed_units.or(usage.tokens).unwrap_or_default();
    let input_tokens = counts.input_tokens.max(0.0) as u32;
    let output_tokens = counts.output_tokens.max(0.0) as u32;

    TokenUsage {
        input_tokens,
        output_tokens,
        total_tokens: input_tokens.saturating_add(output_tokens),
    }
}
