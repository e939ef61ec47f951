//! Observable progress of a processing run
//!
//! The simulator is the only writer; everyone else reads snapshots through
//! [`SharedProgress`].

use parking_lot::RwLock;
use std::sync::Arc;

/// Lifecycle of a single simulator run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunPhase {
    /// Not started
    #[default]
    Idle,
    /// Stepping through stages
    Running,
    /// All stages done, backend finalize in flight
    Finalizing,
    /// Result delivered
    Completed,
    /// Finalize call rejected
    Failed,
    /// Stopped by its cancellation token
    Cancelled,
}

impl RunPhase {
    /// Check if the run can still make progress
    pub fn is_active(&self) -> bool {
        matches!(self, RunPhase::Running | RunPhase::Finalizing)
    }

    /// Check if the run has ended, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed | RunPhase::Cancelled)
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "Idle"),
            RunPhase::Running => write!(f, "Running"),
            RunPhase::Finalizing => write!(f, "Finalizing"),
            RunPhase::Completed => write!(f, "Completed"),
            RunPhase::Failed => write!(f, "Failed"),
            RunPhase::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Current stage plus overall progress (0-100)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgressState {
    pub phase: RunPhase,
    /// Index into the active stage list; `None` before the first stage
    pub stage_index: Option<usize>,
    /// Key of the current stage
    pub stage: Option<String>,
    pub progress: f64,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress rounded for display
    pub fn percent(&self) -> u8 {
        self.progress.round().clamp(0.0, 100.0) as u8
    }

    /// Whether stage `index` is finished from the viewer's point of view
    pub fn is_stage_complete(&self, index: usize) -> bool {
        match self.phase {
            RunPhase::Completed => true,
            _ => self.stage_index.map(|current| index < current).unwrap_or(false),
        }
    }

    /// Whether stage `index` is the one currently running
    pub fn is_stage_active(&self, index: usize) -> bool {
        self.phase.is_active() && self.stage_index == Some(index)
    }

    pub(crate) fn enter_stage(&mut self, index: usize, key: &str) {
        self.phase = RunPhase::Running;
        self.stage_index = Some(index);
        self.stage = Some(key.to_string());
    }

    /// Progress never moves backwards within a run
    pub(crate) fn advance_to(&mut self, progress: f64) {
        if progress > self.progress {
            self.progress = progress.min(100.0);
        }
    }
}

/// Thread-safe, read-mostly handle to a run's [`ProgressState`]
#[derive(Clone, Debug, Default)]
pub struct SharedProgress {
    inner: Arc<RwLock<ProgressState>>,
}

impl SharedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state (no lock held after return)
    pub fn snapshot(&self) -> ProgressState {
        self.inner.read().clone()
    }

    pub fn progress(&self) -> f64 {
        self.inner.read().progress
    }

    pub fn phase(&self) -> RunPhase {
        self.inner.read().phase
    }

    pub fn current_stage(&self) -> Option<String> {
        self.inner.read().stage.clone()
    }

    pub(crate) fn update<F: FnOnce(&mut ProgressState)>(&self, f: F) {
        f(&mut self.inner.write());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_never_decreases() {
        let mut state = ProgressState::new();
        state.advance_to(40.0);
        state.advance_to(35.0);
        assert_eq!(state.progress, 40.0);
        state.advance_to(130.0);
        assert_eq!(state.progress, 100.0);
    }

    #[test]
    fn test_stage_flags() {
        let mut state = ProgressState::new();
        assert!(!state.is_stage_complete(0));
        assert!(!state.is_stage_active(0));

        state.enter_stage(2, "synthesizing");
        assert!(state.is_stage_complete(0));
        assert!(state.is_stage_complete(1));
        assert!(state.is_stage_active(2));
        assert!(!state.is_stage_complete(2));

        state.phase = RunPhase::Completed;
        assert!(state.is_stage_complete(4));
        assert!(!state.is_stage_active(2));
    }

    #[test]
    fn test_shared_snapshot_is_independent() {
        let shared = SharedProgress::new();
        let before = shared.snapshot();

        shared.update(|s| {
            s.enter_stage(0, "analyzing");
            s.advance_to(12.5);
        });

        assert_eq!(before.phase, RunPhase::Idle);
        assert_eq!(shared.phase(), RunPhase::Running);
        assert_eq!(shared.current_stage().as_deref(), Some("analyzing"));
        assert_eq!(shared.snapshot().percent(), 13);
    }

    #[test]
    fn test_phase_classification() {
        assert!(RunPhase::Finalizing.is_active());
        assert!(!RunPhase::Idle.is_active());
        assert!(RunPhase::Cancelled.is_terminal());
        assert!(!RunPhase::Running.is_terminal());
    }
}
