//! Turn taking: the per-call state machine and the stage pipeline it runs.

pub mod error;
pub mod events;
pub mod orchestrator;
pub mod pipeline;
pub mod state;

pub use error::TurnError;
pub use events::{EndReason, TurnEvent};
pub use orchestrator::TurnOrchestrator;
pub use pipeline::{KNOWLEDGE_CONTEXT_KEY, StageTimeouts, TranscriptionStage, TurnPipeline};
pub use state::TurnState;
