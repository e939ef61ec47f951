//! Voicecover - workflow core for AI voice covers and song generation
//!
//! The crate drives the client side of a voice-cover product: capturing a
//! voice sample, uploading a song or submitting lyrics, running the staged
//! processing pipeline and reading results back from the user's library.

pub mod backend;
pub mod blob;
pub mod integration;
pub mod library;
pub mod notifications;
pub mod processing;
pub mod workflow;

use thiserror::Error;

pub use backend::{Backend, InMemoryBackend};
pub use blob::ExternalBlob;
pub use integration::{Studio, StudioConfig};
pub use processing::{ProcessingEvent, ProcessingOutcome, StageSimulator};
pub use workflow::{Step, View, WorkflowMachine, WorkflowMode, WorkflowState};

#[derive(Error, Debug, Clone)]
pub enum CoverError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Remote call failed: {0}")]
    RemoteCallError(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Blob error: {0}")]
    BlobError(String),

    #[error("Pipeline error: {0}")]
    PipelineError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for CoverError {
    fn from(e: std::io::Error) -> Self {
        CoverError::IOError(e.to_string())
    }
}

impl CoverError {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the workflow on its current step so the user
    /// can correct the input or re-submit.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // The user fixes the input and tries again
            CoverError::ValidationError(_) => true,
            // Connection may come up later
            CoverError::BackendUnavailable(_) => true,
            CoverError::RemoteCallError(_) => true,
            // Retrying cannot help
            CoverError::Unsupported(_) => false,
            CoverError::InvalidTransition(_) => false,
            CoverError::BlobError(_) => true,
            CoverError::PipelineError(_) => true,
            CoverError::ConfigError(_) => false,
            CoverError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            CoverError::ValidationError(msg) => msg.clone(),
            CoverError::BackendUnavailable(_) => "Backend not ready".to_string(),
            CoverError::RemoteCallError(_) => {
                "The request failed. Please try again.".to_string()
            }
            CoverError::Unsupported(_) => {
                "This feature is not yet available.".to_string()
            }
            CoverError::InvalidTransition(_) => {
                "That action is not available right now.".to_string()
            }
            CoverError::BlobError(_) => {
                "Audio file could not be read. Please try again.".to_string()
            }
            CoverError::PipelineError(_) => {
                "Processing pipeline error. Please try again.".to_string()
            }
            CoverError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            CoverError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(CoverError::ValidationError("x".into()).is_recoverable());
        assert!(CoverError::RemoteCallError("x".into()).is_recoverable());
        assert!(!CoverError::Unsupported("x".into()).is_recoverable());
        assert!(!CoverError::InvalidTransition("x".into()).is_recoverable());
    }

    #[test]
    fn test_validation_message_passes_through() {
        let err = CoverError::ValidationError("File size must be less than 50MB".into());
        assert_eq!(err.user_message(), "File size must be less than 50MB");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CoverError = io.into();
        assert!(matches!(err, CoverError::IOError(_)));
    }
}
