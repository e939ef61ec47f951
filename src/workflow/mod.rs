//! Creation wizard: steps, accumulated state and input validation

pub mod machine;
pub mod state;
pub mod validation;

pub use machine::{
    download_filename, highlighted_index, progress_steps, step_sequence, ProgressStep, StepStatus,
    WorkflowEvent, WorkflowMachine,
};
pub use state::{AudioFormat, Step, View, WorkflowMode, WorkflowState};
pub use validation::AudioUpload;
