mod mapper;
mod provider;
mod snapshots;
mod wire;

pub use mapper::{AssistantsMapper, message_from_wire, message_text, message_to_wire};
pub use provider::{ASSISTANTS_BETA_HEADER, AssistantsProvider, THREAD_RUNS_PATH};
pub use snapshots::{RunSnapshots, apply_event};
pub use wire::{AssistantsMessage, AssistantsRunRequest, AssistantsRunResult, AssistantsThread};
