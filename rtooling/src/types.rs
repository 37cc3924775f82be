//! Tool runtime context and execution result types.

use rcommon::{ConversationId, MetadataMap};
use rprovider::{Message, ToolCall};

use crate::ToolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolExecutionContext {
    pub conversation_id: ConversationId,
    /// One-based orchestration round the call was issued in.
    pub round: u32,
    pub metadata: MetadataMap,
}

impl ToolExecutionContext {
    pub fn new(conversation_id: impl Into<ConversationId>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            round: 1,
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_round(mut self, round: u32) -> Self {
        self.round = round;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolExecutionResult {
    pub tool_call_id: String,
    pub tool_id: String,
    pub output: String,
}

impl ToolExecutionResult {
    pub fn new(
        tool_call_id: impl Into<String>,
        tool_id: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_id: tool_id.into(),
            output: output.into(),
        }
    }

    pub fn from_call(call: &ToolCall, output: impl Into<String>) -> Self {
        Self::new(call.id.clone(), call.tool_id.clone(), output)
    }

    /// Renders a failed execution as the result the model sees.
    pub fn from_error(call: &ToolCall, error: &ToolError) -> Self {
        Self::from_call(call, error.to_model_text())
    }

    pub fn into_message(self) -> Message {
        Message::tool_result(self.tool_call_id, self.output)
    }
}

#[cfg(test)]
mod tests {
    use rprovider::MessageKind;

    use super::*;

    #[test]
    fn results_become_tool_result_messages() {
        let call = ToolCall::new("call_9", "weather", "{}");
        let message = ToolExecutionResult::from_call(&call, "sunny").into_message();

        assert_eq!(message.kind, MessageKind::ToolResult);
        assert_eq!(message.tool_call_id.as_deref(), Some("call_9"));
        assert_eq!(message.text, "sunny");
    }

    #[test]
    fn errors_render_through_model_text() {
        let call = ToolCall::new("call_1", "weather", "{");
        let result =
            ToolExecutionResult::from_error(&call, &ToolError::execution("backend offline"));

        assert_eq!(result.output, "Error: backend offline");
        assert_eq!(result.tool_id, "weather");
    }
}
