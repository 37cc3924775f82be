//! Provider-agnostic message, tool, request, and response model types.
//!
//! ```rust
//! use rprovider::{ChatRequest, Message, ProviderErrorKind};
//!
//! let ok = ChatRequest::builder()
//!     .message(Message::user("Summarize this diff"))
//!     .build();
//! assert!(ok.is_ok());
//!
//! let err = ChatRequest::builder()
//!     .message(Message::tool_result("call_1", "orphaned"))
//!     .build()
//!     .err()
//!     .expect("tool result without a prior call should fail");
//! assert_eq!(err.kind, ProviderErrorKind::Mapping);
//! ```

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::ops::AddAssign;

use rcommon::{GenerationOptions, MetadataMap};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{FieldSchema, ProviderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenAi,
    OpenAiAssistants,
    Cohere,
    Ollama,
    /// Caller-supplied providers, such as closures wrapped in `FnProvider`.
    Custom,
}

impl ProviderId {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open-ai" | "open_ai" => Some(Self::OpenAi),
            "openai-assistants" | "openai_assistants" | "assistants" => {
                Some(Self::OpenAiAssistants)
            }
            "cohere" | "co" => Some(Self::Cohere),
            "ollama" | "local" => Some(Self::Ollama),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let id = match self {
            Self::OpenAi => "openai",
            Self::OpenAiAssistants => "openai-assistants",
            Self::Cohere => "cohere",
            Self::Ollama => "ollama",
            Self::Custom => "custom",
        };

        f.write_str(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    System,
    User,
    Bot,
    ToolResult,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub tool_id: String,
    pub raw_arguments: String,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        tool_id: impl Into<String>,
        raw_arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tool_id: tool_id.into(),
            raw_arguments: raw_arguments.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageKind::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageKind::User, text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Bot, text)
    }

    pub fn bot_with_tool_calls(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::bot(text)
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(MessageKind::ToolResult, text)
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, text)
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub id: String,
    pub description: String,
    /// `None` means the tool takes no input, which differs from an empty object.
    pub input_schema: Option<FieldSchema>,
}

impl ToolDefinition {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            input_schema: None,
        }
    }

    pub fn with_input_schema(mut self, schema: FieldSchema) -> Self {
        self.input_schema = Some(schema);
        self
    }

    pub fn parameters_json(&self) -> Option<Value> {
        self.input_schema.as_ref().map(FieldSchema::to_json_schema)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolChoice {
    #[default]
    Auto,
    /// The model must call the named tool. The tool loop ends once its result is appended.
    Required(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    Cancelled,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens = self.input_tokens.saturating_add(rhs.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(rhs.output_tokens);
        self.total_tokens = self.total_tokens.saturating_add(rhs.total_tokens);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub provider: ProviderId,
    pub model: String,
    /// New messages produced by this response.
    pub history: Vec<Message>,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

impl ChatResponse {
    pub fn new(provider: ProviderId, model: impl Into<String>, history: Vec<Message>) -> Self {
        Self {
            provider,
            model: model.into(),
            history,
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    pub fn with_stop_reason(mut self, stop_reason: StopReason) -> Self {
        self.stop_reason = stop_reason;
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.history
            .iter()
            .filter(|message| message.kind == MessageKind::Bot)
            .flat_map(|message| message.tool_calls.iter())
    }

    pub fn text(&self) -> String {
        self.history
            .iter()
            .filter(|message| message.kind == MessageKind::Bot)
            .map(|message| message.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatRequest {
    pub model: Option<String>,
    pub history: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
    pub options: GenerationOptions,
    /// Opaque per-provider fields merged into the top level of the wire request.
    pub overrides: Map<String, Value>,
    pub metadata: MetadataMap,
}

impl ChatRequest {
    pub fn builder() -> ChatRequestBuilder {
        ChatRequestBuilder::default()
    }

    pub fn new(history: Vec<Message>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn required_tool(&self) -> Option<&str> {
        match &self.tool_choice {
            ToolChoice::Required(id) => Some(id.as_str()),
            ToolChoice::Auto => None,
        }
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.history.is_empty() {
            return Err(ProviderError::mapping(
                "at least one message is required",
            ));
        }

        let mut tool_ids = HashSet::new();
        for tool in &self.tools {
            if tool.id.trim().is_empty() {
                return Err(ProviderError::mapping("tool id must not be empty"));
            }

            if !tool_ids.insert(tool.id.as_str()) {
                return Err(ProviderError::mapping(format!(
                    "duplicate tool id '{}'",
                    tool.id
                )));
            }

            if let Some(schema) = &tool.input_schema
                && !schema.is_object()
            {
                return Err(ProviderError::mapping(format!(
                    "input schema for tool '{}' must be an object",
                    tool.id
                )));
            }
        }

        if let Some(required) = self.required_tool()
            && !tool_ids.contains(required)
        {
            return Err(ProviderError::mapping(format!(
                "required tool '{required}' is not declared"
            )));
        }

        let mut issued_calls = HashSet::new();
        for message in &self.history {
            match message.kind {
                MessageKind::Bot => {
                    issued_calls.extend(message.tool_calls.iter().map(|call| call.id.as_str()));
                }
                MessageKind::ToolResult => {
                    let Some(call_id) = message.tool_call_id.as_deref() else {
                        return Err(ProviderError::mapping(
                            "tool-result message is missing tool_call_id",
                        ));
                    };

                    if !issued_calls.contains(call_id) {
                        return Err(ProviderError::mapping(format!(
                            "tool-result references unknown tool call '{call_id}'"
                        )));
                    }
                }
                MessageKind::System | MessageKind::User | MessageKind::Error => {}
            }
        }

        if let Some(max_tokens) = self.options.max_tokens
            && max_tokens == 0
        {
            return Err(ProviderError::invalid_request(
                "max_tokens must be greater than zero",
            ));
        }

        if let Some(temperature) = self.options.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ProviderError::invalid_request(
                "temperature must be in the inclusive range 0.0..=2.0",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatRequestBuilder {
    request: ChatRequest,
}

impl ChatRequestBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.request.model = Some(model.into());
        self
    }

    pub fn message(mut self, message: Message) -> Self {
        self.request.history.push(message);
        self
    }

    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.request.history.extend(messages);
        self
    }

    pub fn tool(mut self, tool: ToolDefinition) -> Self {
        self.request.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.request.tools.extend(tools);
        self
    }

    pub fn require_tool(mut self, tool_id: impl Into<String>) -> Self {
        self.request.tool_choice = ToolChoice::Required(tool_id.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.request.options.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.request.options.max_tokens = Some(max_tokens);
        self
    }

    pub fn override_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.request.overrides.insert(key.into(), value);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.metadata.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<ChatRequest, ProviderError> {
        self.request.validate()?;
        Ok(self.request)
    }
}
