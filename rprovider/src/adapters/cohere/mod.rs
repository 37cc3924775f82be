mod mapper;
mod provider;
mod wire;

pub use mapper::{
    COHERE_DEFAULT_MODEL, CohereMapper, message_from_wire, message_to_wire, parse_finish_reason,
    wire_role,
};
pub use provider::{COHERE_BASE_URL, COHERE_CHAT_PATH, CohereProvider, fragment_from_event};
pub use wire::{
    CohereChatRequest, CohereChatResponse, CohereContent, CohereContentPart, CohereMessage,
    CohereTokenCounts, CohereToolCall, CohereUsage,
};
