//! Integration layer
//!
//! Ties the workflow machine, processing pipeline, query cache and
//! notifications to a backend connection.

pub mod config;
pub mod orchestrator;

pub use config::{LimitsConfig, PollingConfig, StudioConfig, TimingConfig};
pub use orchestrator::{Download, Studio};
