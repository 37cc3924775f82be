mod mapper;
mod provider;
mod tests;
mod wire;

pub use mapper::{
    OPENAI_DEFAULT_MODEL, OpenAiMapper, message_from_wire, message_to_wire, tool_to_wire,
    wire_role,
};
pub use provider::{CHAT_COMPLETIONS_PATH, CompletionStream, OPENAI_BASE_URL, OpenAiProvider};
pub use wire::{
    OpenAiChatRequest, OpenAiChatResponse, OpenAiChoice, OpenAiFunction, OpenAiFunctionCall,
    OpenAiMessage, OpenAiStreamOptions, OpenAiTool, OpenAiToolCall, OpenAiUsage,
};

pub(crate) use provider::{ChunkFrame, parse_chunk};
pub(crate) use wire::function_type;
