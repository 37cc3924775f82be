//! Small convenience constructors for common types.

use crate::{Message, ProviderId};

pub fn system_message(text: impl Into<String>) -> Message {
    Message::system(text)
}

pub fn user_message(text: impl Into<String>) -> Message {
    Message::user(text)
}

pub fn bot_message(text: impl Into<String>) -> Message {
    Message::bot(text)
}

pub fn tool_result_message(tool_call_id: impl Into<String>, text: impl Into<String>) -> Message {
    Message::tool_result(tool_call_id, text)
}

pub fn error_message(text: impl Into<String>) -> Message {
    Message::error(text)
}

/// Accepts the config tags plus common aliases such as `open-ai`, `co` and `local`.
pub fn parse_provider_id(value: &str) -> Option<ProviderId> {
    ProviderId::parse(value)
}
