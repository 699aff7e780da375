mod api;
pub mod panel;

pub use api::{ChunkChoice, ChunkDelta, CompletionChunk, GenerationRequest};
pub use panel::{Feedback, UiAction, UiSpec, UiSpecNode};
