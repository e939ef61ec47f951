//! Staged progress simulator
//!
//! Walks an ordered stage list on fixed timers, advancing progress in
//! [`SUBSTEPS_PER_STAGE`] equal increments per stage. When every stage has
//! elapsed the backend is told to finalize the result, then the result is
//! read back and returned from the run's future.
//!
//! Every timer wait and backend call races a [`CancellationToken`]; a
//! cancelled run makes no further backend calls and returns
//! [`ProcessingOutcome::Cancelled`], even if the finalize call was in flight.

use super::stages::{progress_at, Stage, SUBSTEPS_PER_STAGE};
use super::state::{ProgressState, RunPhase, SharedProgress};
use crate::backend::Backend;
use crate::blob::ExternalBlob;
use crate::{CoverError, Result};
use chrono::Utc;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Size of the zero-filled stand-in mix used when the backend has none
pub const PLACEHOLDER_MIX_BYTES: usize = 1024;

/// Stand-in final mix handed to the backend finalize call
pub fn placeholder_mix() -> ExternalBlob {
    ExternalBlob::from_bytes(vec![0u8; PLACEHOLDER_MIX_BYTES])
}

/// Context needed for the backend write at the end of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingRequest {
    /// Cover an uploaded song with a voice sample
    Cover {
        voice_sample_id: String,
        song_id: String,
    },
    /// Turn a submitted lyrics request into a song
    Generation {
        request_id: String,
        voice_sample_id: String,
    },
}

impl ProcessingRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingRequest::Cover { .. } => "cover",
            ProcessingRequest::Generation { .. } => "generation",
        }
    }

    fn validate(&self) -> Result<()> {
        let missing = match self {
            ProcessingRequest::Cover {
                voice_sample_id,
                song_id,
            } => [("voice sample", voice_sample_id), ("song", song_id)]
                .into_iter()
                .find(|(_, id)| id.trim().is_empty()),
            ProcessingRequest::Generation {
                request_id,
                voice_sample_id,
            } => [("lyrics request", request_id), ("voice sample", voice_sample_id)]
                .into_iter()
                .find(|(_, id)| id.trim().is_empty()),
        };

        match missing {
            Some((what, _)) => Err(CoverError::PipelineError(format!(
                "Missing {} id for {} processing",
                what,
                self.kind()
            ))),
            None => Ok(()),
        }
    }

    fn result_id(&self) -> String {
        match self {
            ProcessingRequest::Cover { .. } => format!("cover-{}", Utc::now().timestamp_millis()),
            ProcessingRequest::Generation { request_id, .. } => request_id.clone(),
        }
    }
}

/// Identifier and audio produced by a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingResult {
    pub result_id: String,
    pub final_mix: ExternalBlob,
}

/// How a run ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Completed(ProcessingResult),
    Cancelled,
}

/// Discrete notifications emitted while a run progresses
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingEvent {
    StageStarted {
        run_id: Uuid,
        index: usize,
        key: String,
    },
    Progress {
        run_id: Uuid,
        progress: f64,
    },
    StageCompleted {
        run_id: Uuid,
        index: usize,
        key: String,
    },
    /// All stages elapsed, finalize call about to be made
    Finalizing {
        run_id: Uuid,
        result_id: String,
    },
    Completed {
        run_id: Uuid,
        result_id: String,
    },
    Failed {
        run_id: Uuid,
        error: String,
    },
    Cancelled {
        run_id: Uuid,
    },
}

/// Drives one processing run
pub struct StageSimulator {
    backend: Option<Arc<dyn Backend>>,
    stages: Vec<Stage>,
    time_scale: f64,
    progress: SharedProgress,
    event_tx: Sender<ProcessingEvent>,
    event_rx: Receiver<ProcessingEvent>,
}

impl StageSimulator {
    /// Create a simulator over `stages`
    ///
    /// `backend` is `None` while no connection has been established; such a
    /// simulator refuses to start.
    pub fn new(backend: Option<Arc<dyn Backend>>, stages: Vec<Stage>) -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            backend,
            stages,
            time_scale: 1.0,
            progress: SharedProgress::new(),
            event_tx,
            event_rx,
        }
    }

    /// Multiply every timer interval by `scale`
    pub fn with_time_scale(mut self, scale: f64) -> Self {
        self.time_scale = scale.max(0.0);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Read handle to the run's progress
    pub fn progress(&self) -> SharedProgress {
        self.progress.clone()
    }

    /// Receiver for [`ProcessingEvent`]s
    pub fn event_receiver(&self) -> Receiver<ProcessingEvent> {
        self.event_rx.clone()
    }

    /// Validate and spawn the run on the current tokio runtime
    ///
    /// Errors are reported synchronously; nothing is spawned on failure.
    pub fn start(
        self,
        request: ProcessingRequest,
        cancel: CancellationToken,
    ) -> Result<ProcessingHandle> {
        let backend = self.check(&request)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CoverError::PipelineError(format!("No async runtime: {}", e)))?;

        let run_id = Uuid::new_v4();
        let progress = self.progress.clone();
        let events = self.event_rx.clone();
        let task_cancel = cancel.clone();
        let task = runtime.spawn(async move { self.execute(backend, request, task_cancel, run_id).await });

        Ok(ProcessingHandle {
            run_id,
            progress,
            events,
            cancel,
            task,
        })
    }

    /// Validate and run to completion on the calling task
    pub async fn run(
        self,
        request: ProcessingRequest,
        cancel: CancellationToken,
    ) -> Result<ProcessingOutcome> {
        let backend = self.check(&request)?;
        self.execute(backend, request, cancel, Uuid::new_v4()).await
    }

    fn check(&self, request: &ProcessingRequest) -> Result<Arc<dyn Backend>> {
        let backend = self.backend.clone().ok_or_else(|| {
            CoverError::BackendUnavailable("No backend connection for processing".to_string())
        })?;
        if self.stages.is_empty() {
            return Err(CoverError::PipelineError("Stage list is empty".to_string()));
        }
        request.validate()?;
        Ok(backend)
    }

    fn scaled(&self, interval: Duration) -> Duration {
        if self.time_scale == 1.0 {
            interval
        } else {
            interval.mul_f64(self.time_scale)
        }
    }

    fn emit(&self, event: ProcessingEvent) {
        let _ = self.event_tx.send(event);
    }

    fn cancelled(&self, run_id: Uuid) -> ProcessingOutcome {
        self.progress.update(|s| s.phase = RunPhase::Cancelled);
        self.emit(ProcessingEvent::Cancelled { run_id });
        info!(run_id = %run_id, "processing cancelled");
        ProcessingOutcome::Cancelled
    }

    async fn execute(
        self,
        backend: Arc<dyn Backend>,
        request: ProcessingRequest,
        cancel: CancellationToken,
        run_id: Uuid,
    ) -> Result<ProcessingOutcome> {
        let count = self.stages.len();
        info!(run_id = %run_id, kind = request.kind(), stages = count, "processing started");

        self.progress.update(|s| {
            *s = ProgressState::new();
            s.phase = RunPhase::Running;
        });

        for (index, stage) in self.stages.iter().enumerate() {
            self.progress.update(|s| {
                s.enter_stage(index, &stage.key);
                s.advance_to(progress_at(index, 0, count));
            });
            self.emit(ProcessingEvent::StageStarted {
                run_id,
                index,
                key: stage.key.clone(),
            });
            info!(run_id = %run_id, stage = %stage.key, index, "stage started");

            let interval = self.scaled(stage.substep_interval());
            for substep in 1..=SUBSTEPS_PER_STAGE {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(self.cancelled(run_id)),
                    _ = tokio::time::sleep(interval) => {}
                }

                let progress = progress_at(index, substep, count);
                self.progress.update(|s| s.advance_to(progress));
                self.emit(ProcessingEvent::Progress { run_id, progress });
            }

            self.emit(ProcessingEvent::StageCompleted {
                run_id,
                index,
                key: stage.key.clone(),
            });
            debug!(run_id = %run_id, stage = %stage.key, index, "stage completed");
        }

        if cancel.is_cancelled() {
            return Ok(self.cancelled(run_id));
        }

        let result_id = request.result_id();
        self.progress.update(|s| {
            s.progress = 100.0;
            s.phase = RunPhase::Finalizing;
        });
        self.emit(ProcessingEvent::Finalizing {
            run_id,
            result_id: result_id.clone(),
        });

        let placeholder = placeholder_mix();
        let finalize = async {
            match &request {
                ProcessingRequest::Cover {
                    voice_sample_id,
                    song_id,
                } => {
                    backend
                        .create_cover(&result_id, song_id, voice_sample_id, placeholder.clone())
                        .await
                }
                ProcessingRequest::Generation { request_id, .. } => {
                    backend
                        .complete_lyrics_request(request_id, placeholder.clone())
                        .await
                }
            }
        };
        let finalized = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(self.cancelled(run_id)),
            finalized = finalize => finalized,
        };

        if let Err(e) = finalized {
            warn!(run_id = %run_id, kind = request.kind(), error = %e, "rpc failed");
            self.progress.update(|s| s.phase = RunPhase::Failed);
            self.emit(ProcessingEvent::Failed {
                run_id,
                error: e.to_string(),
            });
            return Err(e);
        }

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(self.cancelled(run_id)),
            fetched = fetch_final_mix(backend.as_ref(), &request, &result_id, run_id) => fetched,
        };
        if cancel.is_cancelled() {
            return Ok(self.cancelled(run_id));
        }
        let final_mix = fetched.unwrap_or(placeholder);

        self.progress.update(|s| s.phase = RunPhase::Completed);
        self.emit(ProcessingEvent::Completed {
            run_id,
            result_id: result_id.clone(),
        });
        info!(run_id = %run_id, result_id = %result_id, "processing completed");

        Ok(ProcessingOutcome::Completed(ProcessingResult {
            result_id,
            final_mix,
        }))
    }
}

/// Read the finalized mix back from the backend
///
/// Returns `None` when the backend has no mix yet or the lookup fails.
async fn fetch_final_mix(
    backend: &dyn Backend,
    request: &ProcessingRequest,
    result_id: &str,
    run_id: Uuid,
) -> Option<ExternalBlob> {
    let cover_id = match request {
        ProcessingRequest::Cover { .. } => result_id.to_string(),
        ProcessingRequest::Generation { request_id, .. } => {
            match backend.get_lyrics_request(request_id).await {
                Ok(Some(req)) => req.generated_cover_id?,
                Ok(None) => return None,
                Err(e) => {
                    warn!(run_id = %run_id, error = %e, "lyrics request lookup failed");
                    return None;
                }
            }
        }
    };

    match backend.get_cover(&cover_id).await {
        Ok(cover) => cover.map(|c| c.final_mix),
        Err(e) => {
            warn!(run_id = %run_id, cover_id = %cover_id, error = %e, "cover lookup failed");
            None
        }
    }
}

/// Handle to a spawned run
pub struct ProcessingHandle {
    run_id: Uuid,
    progress: SharedProgress,
    events: Receiver<ProcessingEvent>,
    cancel: CancellationToken,
    task: JoinHandle<Result<ProcessingOutcome>>,
}

impl ProcessingHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn progress(&self) -> SharedProgress {
        self.progress.clone()
    }

    pub fn events(&self) -> Receiver<ProcessingEvent> {
        self.events.clone()
    }

    /// Token that stops the run when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end
    pub async fn wait(self) -> Result<ProcessingOutcome> {
        self.task
            .await
            .map_err(|e| CoverError::PipelineError(format!("Processing task aborted: {}", e)))?
    }
}
