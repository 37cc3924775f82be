//! Incremental reconstruction of streamed responses.

mod chat;
mod detector;
mod merge;

pub use chat::{
    ChatCompletionSnapshot, ChoiceSnapshot, DeltaAccumulator, accumulate_chunk, extract_events,
    parse_finish_reason,
};
pub use detector::{CompletionDetector, CompletionFinished, DetectorState};
pub use merge::accumulate;
