//! Explicit run state rebuilt from assistants stream events.
//!
//! [`apply_event`] is the only writer. Snapshots stay inside this adapter and are converted
//! to a canonical response through [`RunSnapshots::into_result`].

use indexmap::IndexMap;
use serde_json::Value;

use crate::{PartialToolCall, ProviderError, StreamEvent, ToolCall, accumulate};

use super::mapper::message_text;
use super::wire::AssistantsRunResult;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSnapshots {
    pub run: Option<Value>,
    /// `thread.message` objects keyed by id, in creation order.
    pub messages: IndexMap<String, Value>,
    /// `thread.run.step` objects keyed by id, in creation order.
    pub steps: IndexMap<String, Value>,
    pub current_tool_call_index: Option<u32>,
    pub current_step_id: Option<String>,
}

impl RunSnapshots {
    pub fn into_result(self) -> Result<AssistantsRunResult, ProviderError> {
        let run = self
            .run
            .ok_or_else(|| ProviderError::protocol("stream ended before a run was created"))?;

        Ok(AssistantsRunResult {
            run,
            messages: self.messages.into_values().collect(),
        })
    }

    fn message_choice(&self, id: &str) -> u32 {
        self.messages.get_index_of(id).unwrap_or_default() as u32
    }

    fn finish_current_tool_call(&mut self) -> Option<StreamEvent> {
        let index = self.current_tool_call_index.take()?;
        let step_id = self.current_step_id.take()?;
        let call = self
            .steps
            .get(&step_id)
            .and_then(|step| step_tool_call(step, index))?;

        Some(StreamEvent::ToolCallDone {
            choice: 0,
            index,
            call: complete_call(call, index),
        })
    }
}

/// Applies one named stream event, returning the canonical events it completes.
pub fn apply_event(
    snapshots: &mut RunSnapshots,
    event: &str,
    data: Value,
) -> Result<Vec<StreamEvent>, ProviderError> {
    let mut events = Vec::new();

    match event {
        "thread.run.created" => {
            snapshots.run = Some(data);
            events.push(StreamEvent::Started);
        }
        "thread.run.step.created" | "thread.run.step.in_progress" => {
            let id = object_id(&data)?;
            snapshots.steps.insert(id, data);
        }
        "thread.run.step.delta" => apply_step_delta(snapshots, data, &mut events)?,
        "thread.run.step.completed"
        | "thread.run.step.failed"
        | "thread.run.step.cancelled"
        | "thread.run.step.expired" => {
            let id = object_id(&data)?;
            snapshots.steps.insert(id, data);
            events.extend(snapshots.finish_current_tool_call());
        }
        "thread.run.requires_action" => {
            events.extend(snapshots.finish_current_tool_call());
            snapshots.run = Some(data);
        }
        "thread.message.created" => {
            let id = object_id(&data)?;
            snapshots.messages.insert(id.clone(), data);
            events.push(StreamEvent::TextCreated {
                choice: snapshots.message_choice(&id),
            });
        }
        "thread.message.delta" => {
            let id = object_id(&data)?;
            let delta = data.get("delta").cloned().unwrap_or(Value::Null);
            let delta_text = message_text(&delta);
            let entry = snapshots.messages.entry(id.clone()).or_insert(Value::Null);
            *entry = accumulate(Some(std::mem::take(entry)), delta)?;
            let text_so_far = message_text(entry);

            if !delta_text.is_empty() {
                events.push(StreamEvent::TextDelta {
                    choice: snapshots.message_choice(&id),
                    delta: delta_text,
                    text_so_far,
                });
            }
        }
        "thread.message.completed" | "thread.message.incomplete" => {
            let id = object_id(&data)?;
            let text = message_text(&data);
            snapshots.messages.insert(id.clone(), data);
            events.push(StreamEvent::TextDone {
                choice: snapshots.message_choice(&id),
                text,
            });
        }
        "error" => {
            let message = data
                .get("message")
                .or_else(|| data.pointer("/error/message"))
                .and_then(Value::as_str)
                .unwrap_or("assistants stream reported an error");
            return Err(ProviderError::server(message));
        }
        event if event.starts_with("thread.run.") && !event.starts_with("thread.run.step.") => {
            snapshots.run = Some(data);
        }
        _ => {}
    }

    Ok(events)
}

fn apply_step_delta(
    snapshots: &mut RunSnapshots,
    data: Value,
    events: &mut Vec<StreamEvent>,
) -> Result<(), ProviderError> {
    let id = object_id(&data)?;
    let delta = data.get("delta").cloned().unwrap_or(Value::Null);
    let touched = delta
        .pointer("/step_details/tool_calls")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let entry = snapshots.steps.entry(id.clone()).or_insert(Value::Null);
    *entry = accumulate(Some(std::mem::take(entry)), delta)?;

    for fragment in touched {
        let index = fragment.get("index").and_then(Value::as_u64).unwrap_or(0) as u32;

        let switched = snapshots.current_tool_call_index != Some(index)
            || snapshots.current_step_id.as_deref() != Some(id.as_str());
        if switched {
            events.extend(snapshots.finish_current_tool_call());
            snapshots.current_tool_call_index = Some(index);
            snapshots.current_step_id = Some(id.clone());

            let snapshot = snapshots
                .steps
                .get(&id)
                .and_then(|step| step_tool_call(step, index))
                .map(partial_call)
                .unwrap_or_default();
            events.push(StreamEvent::ToolCallCreated {
                choice: 0,
                index,
                snapshot,
            });
        }

        let arguments = fragment
            .pointer("/function/arguments")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !arguments.is_empty() {
            let snapshot = snapshots
                .steps
                .get(&id)
                .and_then(|step| step_tool_call(step, index))
                .map(partial_call)
                .unwrap_or_default();
            events.push(StreamEvent::ToolCallDelta {
                choice: 0,
                index,
                delta: arguments.to_string(),
                snapshot,
            });
        }
    }

    Ok(())
}

fn object_id(data: &Value) -> Result<String, ProviderError> {
    data.get("id")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| ProviderError::protocol("stream event object is missing its id"))
}

fn step_tool_call(step: &Value, index: u32) -> Option<&Value> {
    step.pointer("/step_details/tool_calls")?
        .as_array()?
        .iter()
        .enumerate()
        .find(|(position, call)| {
            call.get("index")
                .and_then(Value::as_u64)
                .unwrap_or(*position as u64)
                == u64::from(index)
        })
        .map(|(_, call)| call)
}

fn partial_call(call: &Value) -> PartialToolCall {
    PartialToolCall {
        id: call.get("id").and_then(Value::as_str).map(ToString::to_string),
        tool_id: call
            .pointer("/function/name")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        raw_arguments: call
            .pointer("/function/arguments")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn complete_call(call: &Value, index: u32) -> ToolCall {
    let partial = partial_call(call);
    ToolCall {
        id: partial.id.unwrap_or_else(|| format!("call_{index}")),
        tool_id: partial.tool_id.unwrap_or_default(),
        raw_arguments: partial.raw_arguments,
    }
}
