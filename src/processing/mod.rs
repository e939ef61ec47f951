//! Staged processing pipeline
//!
//! Cover and generation runs are simulated client-side: each stage advances
//! on a timer, then the backend is asked to finalize the result.

pub mod simulator;
pub mod stages;
pub mod state;

pub use simulator::{
    placeholder_mix, ProcessingEvent, ProcessingHandle, ProcessingOutcome, ProcessingRequest,
    ProcessingResult, StageSimulator, PLACEHOLDER_MIX_BYTES,
};
pub use stages::{cover_stages, generation_stages, total_duration, Stage, StagePacing};
pub use state::{ProgressState, RunPhase, SharedProgress};
