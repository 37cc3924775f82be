//! Cohere v2 chat payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::adapters::openai::{OpenAiFunctionCall, OpenAiTool};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohereChatRequest {
    pub model: String,
    pub messages: Vec<CohereMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<OpenAiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohereMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<CohereContent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<CohereToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Requests send plain strings; responses return typed content parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CohereContent {
    Text(String),
    Parts(Vec<CohereContentPart>),
}

impl CohereContent {
    pub fn joined_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohereContentPart {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohereToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "crate::adapters::openai::function_type")]
    pub kind: String,
    pub function: OpenAiFunctionCall,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CohereChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    pub message: CohereMessage,
    #[serde(default)]
    pub usage: Option<CohereUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct CohereUsage {
    #[serde(default)]
    pub billed_units: Option<CohereTokenCounts>,
    #[serde(default)]
    pub tokens: Option<CohereTokenCounts>,
}

/// Counts arrive as JSON numbers that may carry a fractional part.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct CohereTokenCounts {
    #[serde(default)]
    pub input_tokens: f64,
    #[serde(default)]
    pub output_tokens: f64,
}
