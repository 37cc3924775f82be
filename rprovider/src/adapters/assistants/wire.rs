//! Assistants run payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::adapters::openai::OpenAiTool;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantsRunRequest {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub thread: AssistantsThread,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<OpenAiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    pub stream: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantsThread {
    pub messages: Vec<AssistantsMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantsMessage {
    pub role: String,
    pub content: String,
}

/// Terminal state of one run, assembled from the event stream's snapshots.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssistantsRunResult {
    pub run: Value,
    /// `thread.message` objects in creation order.
    #[serde(default)]
    pub messages: Vec<Value>,
}
