//! Finish detection for plain text completions, without tool-call tracking.

use serde_json::Value;

use crate::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorState {
    #[default]
    Collecting,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionFinished {
    pub id: Option<String>,
    pub content: String,
}

/// Tracks one logical response at a time. Only an explicit `"stop"` finish reason completes it;
/// the end of the transport stream does not.
#[derive(Debug, Clone, Default)]
pub struct CompletionDetector {
    id: Option<String>,
    content: String,
    state: DetectorState,
}

impl CompletionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn push(&mut self, chunk: &Value) -> Result<Option<CompletionFinished>, ProviderError> {
        if !chunk.is_object() {
            return Err(ProviderError::protocol("stream chunk must be a JSON object"));
        }

        let id = chunk.get("id").and_then(Value::as_str);
        if id.is_some() && id != self.id.as_deref() {
            self.id = id.map(ToString::to_string);
            self.content.clear();
            self.state = DetectorState::Collecting;
        }

        if self.state == DetectorState::Finished {
            return Ok(None);
        }

        let Some(choice) = chunk.pointer("/choices/0") else {
            return Ok(None);
        };

        if let Some(content) = choice.pointer("/delta/content").and_then(Value::as_str) {
            self.content.push_str(content);
        }

        if choice.get("finish_reason").and_then(Value::as_str) != Some("stop") {
            return Ok(None);
        }

        self.state = DetectorState::Finished;
        Ok(Some(CompletionFinished {
            id: self.id.clone(),
            content: self.content.clone(),
        }))
    }
}
