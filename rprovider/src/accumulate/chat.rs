//! Chat-completion snapshots rebuilt from streamed chunks, and the events they imply.
//!
//! Chunks follow the chat-completions shape: `{id, model, choices: [{index, delta,
//! finish_reason}], usage}`. Backends with another stream shape translate into it first.
//!
//! ```rust
//! use rprovider::{DeltaAccumulator, ProviderId, StreamEvent};
//! use serde_json::json;
//!
//! let mut accumulator = DeltaAccumulator::new(ProviderId::OpenAi, "gpt-4o-mini");
//! let events = accumulator
//!     .push(json!({"id": "c1", "choices": [{"index": 0, "delta": {"content": "Hi"}}]}))
//!     .expect("chunk should apply");
//! assert_eq!(events[0], StreamEvent::Started);
//!
//! accumulator
//!     .push(json!({"id": "c1", "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]}))
//!     .expect("chunk should apply");
//! let response = accumulator.finish().expect("response should build");
//! assert_eq!(response.text(), "Hi");
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::{
    ChatResponse, Message, PartialToolCall, ProviderError, ProviderId, StopReason, StreamEvent,
    TokenUsage, ToolCall, accumulate,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChoiceSnapshot {
    /// Accumulated `delta` objects: `role`, `content`, `tool_calls`.
    pub message: Value,
    pub finish_reason: Option<String>,
    /// Tool-call index touched by the most recent fragment.
    pub current_tool_call: Option<u32>,
    /// Tool calls sealed by a fragment for another index or by the finish reason.
    pub completed_tool_calls: BTreeSet<u32>,
}

impl ChoiceSnapshot {
    pub fn content(&self) -> Option<&str> {
        self.message.get("content").and_then(Value::as_str)
    }

    fn tool_calls(&self) -> Vec<(u32, &Value)> {
        let mut calls = self
            .message
            .get("tool_calls")
            .and_then(Value::as_array)
            .map(|calls| {
                calls
                    .iter()
                    .enumerate()
                    .map(|(position, call)| {
                        let index = call
                            .get("index")
                            .and_then(Value::as_u64)
                            .unwrap_or(position as u64);
                        (u32::try_from(index).unwrap_or(u32::MAX), call)
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        calls.sort_by_key(|(index, _)| *index);
        calls
    }

    fn tool_call_done(&self, index: u32) -> bool {
        self.completed_tool_calls.contains(&index)
    }

    /// Moves the current tool call to `index`, sealing the one it leaves.
    fn touch_tool_call(&mut self, choice: u32, index: u32) -> Result<(), ProviderError> {
        if self.completed_tool_calls.contains(&index) {
            return Err(ProviderError::protocol(format!(
                "tool call {index} of choice {choice} received a fragment after it completed"
            )));
        }
        if let Some(current) = self.current_tool_call
            && current != index
        {
            self.completed_tool_calls.insert(current);
        }
        self.current_tool_call = Some(index);
        Ok(())
    }

    fn mark_finished(&mut self, reason: &str) {
        self.finish_reason = Some(reason.to_string());
        let indices = self
            .tool_calls()
            .into_iter()
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        self.completed_tool_calls.extend(indices);
        self.current_tool_call = None;
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatCompletionSnapshot {
    pub id: Option<String>,
    pub model: Option<String>,
    pub choices: BTreeMap<u32, ChoiceSnapshot>,
    pub usage: Option<Value>,
}

impl ChatCompletionSnapshot {
    pub fn is_finished(&self) -> bool {
        self.choices
            .values()
            .any(|choice| choice.finish_reason.is_some())
    }

    /// Converts the lowest-index choice into a canonical response with a single bot message.
    pub fn into_response(self, provider: ProviderId, fallback_model: &str) -> ChatResponse {
        let choice = self.choices.into_values().next().unwrap_or_default();
        let text = choice.content().unwrap_or_default().to_string();
        let tool_calls = choice
            .tool_calls()
            .into_iter()
            .map(|(index, call)| complete_call(index, call))
            .collect();

        ChatResponse::new(
            provider,
            self.model.unwrap_or_else(|| fallback_model.to_string()),
            vec![Message::bot_with_tool_calls(text, tool_calls)],
        )
        .with_stop_reason(parse_finish_reason(choice.finish_reason.as_deref()))
        .with_usage(self.usage.as_ref().map(usage_from_value).unwrap_or_default())
    }
}

/// Folds one chunk into `snapshot`, returning the new snapshot.
pub fn accumulate_chunk(
    snapshot: Option<ChatCompletionSnapshot>,
    chunk: Value,
) -> Result<ChatCompletionSnapshot, ProviderError> {
    let Value::Object(mut chunk) = chunk else {
        return Err(ProviderError::protocol("stream chunk must be a JSON object"));
    };
    let mut snapshot = snapshot.unwrap_or_default();

    if let Some(id) = chunk.get("id").and_then(Value::as_str) {
        snapshot.id = Some(id.to_string());
    }

    if let Some(model) = chunk.get("model").and_then(Value::as_str) {
        snapshot.model = Some(model.to_string());
    }

    if let Some(usage) = chunk.remove("usage")
        && !usage.is_null()
    {
        snapshot.usage = Some(accumulate(snapshot.usage.take(), usage)?);
    }

    let choices = match chunk.remove("choices") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(choices)) => choices,
        Some(_) => return Err(ProviderError::protocol("`choices` must be an array")),
    };

    for choice in choices {
        let Value::Object(mut choice) = choice else {
            return Err(ProviderError::protocol("choice must be a JSON object"));
        };
        let index = read_index(choice.get("index"), "choice")?.unwrap_or(0);
        let entry = snapshot.choices.entry(index).or_default();

        if let Some(delta) = choice.remove("delta")
            && !delta.is_null()
        {
            if !delta.is_object() {
                return Err(ProviderError::protocol(format!(
                    "delta for choice {index} must be a JSON object"
                )));
            }
            let known = entry
                .message
                .get("tool_calls")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            for call_index in touched_tool_calls(&delta, known)? {
                entry.touch_tool_call(index, call_index)?;
            }
            entry.message = accumulate(Some(std::mem::take(&mut entry.message)), delta)?;
        }

        if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
            entry.mark_finished(reason);
        }
    }

    Ok(snapshot)
}

fn read_index(value: Option<&Value>, what: &str) -> Result<Option<u32>, ProviderError> {
    value
        .and_then(Value::as_u64)
        .map(|index| {
            u32::try_from(index).map_err(|_| {
                ProviderError::protocol(format!("{what} index {index} is out of range"))
            })
        })
        .transpose()
}

/// Tool-call indices a delta touches, in fragment order. Fragments without an `index` are
/// appended after the `known` calls.
fn touched_tool_calls(delta: &Value, known: usize) -> Result<Vec<u32>, ProviderError> {
    let calls = match delta.get("tool_calls") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(calls)) => calls,
        Some(_) => return Err(ProviderError::protocol("`tool_calls` must be an array")),
    };

    let mut appended = known;
    let mut touched = Vec::with_capacity(calls.len());
    for call in calls {
        let index = match read_index(call.get("index"), "tool call")? {
            Some(index) => index,
            None => {
                let position = u32::try_from(appended).map_err(|_| {
                    ProviderError::protocol("too many tool calls in one response")
                })?;
                appended += 1;
                position
            }
        };
        touched.push(index);
    }
    Ok(touched)
}

/// Diffs two consecutive snapshots into the semantic events the newest chunk made determinable.
pub fn extract_events(
    old: Option<&ChatCompletionSnapshot>,
    new: &ChatCompletionSnapshot,
) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    if old.is_none() {
        events.push(StreamEvent::Started);
    }

    for (&index, choice) in &new.choices {
        let previous = old.and_then(|snapshot| snapshot.choices.get(&index));
        choice_events(index, previous, choice, &mut events);
    }

    events
}

fn choice_events(
    index: u32,
    previous: Option<&ChoiceSnapshot>,
    choice: &ChoiceSnapshot,
    events: &mut Vec<StreamEvent>,
) {
    let old_text = previous.and_then(ChoiceSnapshot::content);
    let old_calls = previous.map(ChoiceSnapshot::tool_calls).unwrap_or_default();
    let calls = choice.tool_calls();
    let newly_finished = choice.finish_reason.is_some()
        && previous.is_none_or(|previous| previous.finish_reason.is_none());

    if let Some(text) = choice.content() {
        let known = old_text.unwrap_or_default();
        if old_text.is_none() {
            events.push(StreamEvent::TextCreated { choice: index });
        }

        let delta = text.strip_prefix(known).unwrap_or(text);
        if !delta.is_empty() {
            events.push(StreamEvent::TextDelta {
                choice: index,
                delta: delta.to_string(),
                text_so_far: text.to_string(),
            });
        }

        if newly_finished {
            events.push(StreamEvent::TextDone {
                choice: index,
                text: text.to_string(),
            });
        }
    } else if newly_finished && calls.is_empty() {
        events.push(StreamEvent::TextCreated { choice: index });
        events.push(StreamEvent::TextDone {
            choice: index,
            text: String::new(),
        });
    }

    for (call_index, call) in &calls {
        let old_call = old_calls
            .iter()
            .find(|(old_index, _)| old_index == call_index)
            .map(|(_, call)| *call);
        let snapshot = partial_call(call);

        if old_call.is_none() {
            events.push(StreamEvent::ToolCallCreated {
                choice: index,
                index: *call_index,
                snapshot: snapshot.clone(),
            });
        }

        let old_arguments = old_call.map(arguments_of).unwrap_or_default();
        let arguments = arguments_of(call);
        let delta = arguments.strip_prefix(old_arguments).unwrap_or(arguments);
        if !delta.is_empty() {
            events.push(StreamEvent::ToolCallDelta {
                choice: index,
                index: *call_index,
                delta: delta.to_string(),
                snapshot,
            });
        }

        let was_done = previous.is_some_and(|previous| previous.tool_call_done(*call_index));
        if choice.tool_call_done(*call_index) && !was_done {
            events.push(StreamEvent::ToolCallDone {
                choice: index,
                index: *call_index,
                call: complete_call(*call_index, call),
            });
        }
    }
}

fn arguments_of(call: &Value) -> &str {
    call.pointer("/function/arguments")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn partial_call(call: &Value) -> PartialToolCall {
    PartialToolCall {
        id: call.get("id").and_then(Value::as_str).map(ToString::to_string),
        tool_id: call
            .pointer("/function/name")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        raw_arguments: arguments_of(call).to_string(),
    }
}

fn complete_call(index: u32, call: &Value) -> ToolCall {
    let partial = partial_call(call);
    ToolCall {
        id: partial.id.unwrap_or_else(|| format!("call_{index}")),
        tool_id: partial.tool_id.unwrap_or_default(),
        raw_arguments: partial.raw_arguments,
    }
}

pub fn parse_finish_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("stop") => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        Some("tool_calls") | Some("function_call") => StopReason::ToolUse,
        _ => StopReason::Other,
    }
}

fn usage_from_value(usage: &Value) -> TokenUsage {
    let read = |key: &str| {
        usage
            .get(key)
            .and_then(|value| value.as_u64().or_else(|| value.as_f64().map(|v| v as u64)))
            .map_or(0, |count| u32::try_from(count).unwrap_or(u32::MAX))
    };
    let input_tokens = read("prompt_tokens");
    let output_tokens = read("completion_tokens");
    let total_tokens = match read("total_tokens") {
        0 => input_tokens.saturating_add(output_tokens),
        total => total,
    };

    TokenUsage {
        input_tokens,
        output_tokens,
        total_tokens,
    }
}

/// Stateful wrapper owning only the in-flight snapshot of one streamed response.
#[derive(Debug, Clone)]
pub struct DeltaAccumulator {
    provider: ProviderId,
    fallback_model: String,
    snapshot: Option<ChatCompletionSnapshot>,
}

impl DeltaAccumulator {
    pub fn new(provider: ProviderId, fallback_model: impl Into<String>) -> Self {
        Self {
            provider,
            fallback_model: fallback_model.into(),
            snapshot: None,
        }
    }

    pub fn push(&mut self, chunk: Value) -> Result<Vec<StreamEvent>, ProviderError> {
        let next = accumulate_chunk(self.snapshot.clone(), chunk)?;
        let events = extract_events(self.snapshot.as_ref(), &next);
        self.snapshot = Some(next);
        Ok(events)
    }

    pub fn snapshot(&self) -> Option<&ChatCompletionSnapshot> {
        self.snapshot.as_ref()
    }

    /// True once any choice has carried a finish reason.
    pub fn is_finished(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(ChatCompletionSnapshot::is_finished)
    }

    /// Consumes the accumulator. The snapshot is discarded once converted.
    ///
    /// The end of the transport stream is not completion: without a finish reason the response
    /// is truncated and this fails with a `Protocol` error.
    pub fn finish(self) -> Result<ChatResponse, ProviderError> {
        let snapshot = self
            .snapshot
            .ok_or_else(|| ProviderError::protocol("stream ended before any fragment arrived"))?;
        if !snapshot.is_finished() {
            return Err(ProviderError::protocol(
                "stream ended before the response finished",
            ));
        }
        Ok(snapshot.into_response(self.provider, &self.fallback_model))
    }
}
