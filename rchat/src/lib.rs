//! Conversation layer for the ragged client: the bounded tool-calling loop, its typed event
//! channel and the [`Chat`] facade that owns history.

mod channel;
mod chat;
mod error;
mod hooks;
mod orchestrator;
mod policy;
mod types;

pub mod prelude {
    pub use crate::{
        Chat, ChatBuilder, ChatCallOptions, ChatError, ChatErrorKind, ChatEvent,
        ChatEventReceiver, ChatEventSender, ChatInput, ChatPolicy, ChatReply, HistoryMode,
        RunOutcome, RunStatus, ToolOrchestrator, event_channel,
    };
    pub use tokio_util::sync::CancellationToken;
}

pub use channel::{ChatEvent, ChatEventReceiver, ChatEventSender, event_channel};
pub use chat::{Chat, ChatBuilder};
pub use error::{ChatError, ChatErrorKind};
pub use hooks::{ChatRuntimeHooks, NoopChatRuntimeHooks};
pub use orchestrator::ToolOrchestrator;
pub use policy::{ChatPolicy, DEFAULT_MAX_ROUNDS, HistoryMode};
pub use tokio_util::sync::CancellationToken;
pub use types::{ChatCallOptions, ChatInput, ChatReply, RunOutcome, RunStatus};
