//! Wizard state machine
//!
//! The machine is the single owner of the current view, wizard step and
//! [`WorkflowState`]. Events that do not fit the current step are rejected
//! with [`CoverError::InvalidTransition`] and leave everything untouched.
//!
//! The progress strip and its highlighted entry are derived on demand from
//! mode, persona pre-selection and step; they are never stored.

use super::state::{AudioFormat, Step, View, WorkflowMode, WorkflowState};
use crate::blob::ExternalBlob;
use crate::{CoverError, Result};
use tracing::debug;

/// Input to the machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkflowEvent {
    SelectMode(WorkflowMode),
    /// Persona picked from the personas view
    SelectPersona {
        persona_id: String,
        voice_sample_id: String,
    },
    VoiceCaptured {
        voice_sample_id: String,
        voice_blob: ExternalBlob,
    },
    SongUploaded {
        song_id: String,
        title: String,
        artist: String,
    },
    LyricsSubmitted {
        request_id: String,
        lyrics: String,
    },
    ProcessingComplete {
        cover_id: String,
        final_mix: ExternalBlob,
    },
    Restart,
    Navigate(View),
}

impl WorkflowEvent {
    fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::SelectMode(_) => "select-mode",
            WorkflowEvent::SelectPersona { .. } => "select-persona",
            WorkflowEvent::VoiceCaptured { .. } => "voice-capture-complete",
            WorkflowEvent::SongUploaded { .. } => "song-upload-complete",
            WorkflowEvent::LyricsSubmitted { .. } => "lyrics-submit-complete",
            WorkflowEvent::ProcessingComplete { .. } => "processing-complete",
            WorkflowEvent::Restart => "restart",
            WorkflowEvent::Navigate(_) => "navigate",
        }
    }
}

/// Entry in the progress strip
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressStep {
    pub step: Step,
    pub label: &'static str,
}

/// How a progress strip entry is drawn
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Current,
    Upcoming,
}

/// Steps the user walks through for `mode`, excluding the download screen
pub fn step_sequence(mode: WorkflowMode, preselected_persona: bool) -> Vec<Step> {
    let input = match mode {
        WorkflowMode::Cover => Step::Song,
        WorkflowMode::Generation => Step::Lyrics,
    };
    if preselected_persona {
        vec![input, Step::Processing]
    } else {
        vec![Step::Voice, input, Step::Processing]
    }
}

/// Progress strip: the step sequence followed by the download step
pub fn progress_steps(mode: WorkflowMode, preselected_persona: bool) -> Vec<ProgressStep> {
    step_sequence(mode, preselected_persona)
        .into_iter()
        .chain(std::iter::once(Step::Complete))
        .map(|step| ProgressStep {
            step,
            label: step.label(),
        })
        .collect()
}

/// Position of `step` in the progress strip, if shown there
pub fn highlighted_index(mode: WorkflowMode, preselected_persona: bool, step: Step) -> Option<usize> {
    progress_steps(mode, preselected_persona)
        .iter()
        .position(|entry| entry.step == step)
}

/// Suggested name for downloading the finished result
///
/// Uses the song title, else the first 20 characters of the lyrics, else
/// `song`, followed by the mode and the format extension.
pub fn download_filename(state: &WorkflowState, format: AudioFormat) -> String {
    let base = state
        .song_title
        .as_deref()
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .or_else(|| {
            state
                .lyrics
                .as_deref()
                .filter(|lyrics| !lyrics.is_empty())
                .map(|lyrics| lyrics.chars().take(20).collect())
        })
        .unwrap_or_else(|| "song".to_string());

    match state.mode {
        Some(mode) => format!("{}-{}.{}", base, mode, format.extension()),
        None => format!("{}.{}", base, format.extension()),
    }
}

#[derive(Clone, Debug, Default)]
pub struct WorkflowMachine {
    view: View,
    step: Step,
    state: WorkflowState,
    format: AudioFormat,
}

impl WorkflowMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn set_format(&mut self, format: AudioFormat) {
        self.format = format;
    }

    /// Check if the processing step is on screen
    pub fn is_processing(&self) -> bool {
        self.view == View::Create && self.step == Step::Processing
    }

    /// Apply `event`, returning the new step
    pub fn apply(&mut self, event: WorkflowEvent) -> Result<Step> {
        let name = event.name();
        let (view, step, state) = self.next(event)?;

        debug!(
            event = name,
            from = %self.step,
            to = %step,
            view = %view,
            "workflow transition"
        );

        self.view = view;
        self.step = step;
        self.state = state;
        Ok(step)
    }

    fn reject(&self, event: &WorkflowEvent) -> CoverError {
        CoverError::InvalidTransition(format!(
            "{} is not allowed at step {} in view {}",
            event.name(),
            self.step,
            self.view
        ))
    }

    fn expect_step(&self, event: &WorkflowEvent, step: Step) -> Result<()> {
        if self.view == View::Create && self.step == step {
            Ok(())
        } else {
            Err(self.reject(event))
        }
    }

    fn input_step(&self, event: &WorkflowEvent) -> Result<Step> {
        match self.state.mode {
            Some(WorkflowMode::Cover) => Ok(Step::Song),
            Some(WorkflowMode::Generation) => Ok(Step::Lyrics),
            None => Err(self.reject(event)),
        }
    }

    fn next(&self, event: WorkflowEvent) -> Result<(View, Step, WorkflowState)> {
        let current = self.state.clone();

        match event {
            WorkflowEvent::SelectMode(mode) => {
                self.expect_step(&event, Step::Mode)?;
                let step = match (current.has_preselected_persona(), mode) {
                    (false, _) => Step::Voice,
                    (true, WorkflowMode::Cover) => Step::Song,
                    (true, WorkflowMode::Generation) => Step::Lyrics,
                };
                let state = WorkflowState {
                    mode: Some(mode),
                    ..current
                };
                Ok((View::Create, step, state))
            }

            WorkflowEvent::SelectPersona {
                persona_id,
                voice_sample_id,
            } => {
                let state = WorkflowState {
                    selected_persona_id: Some(persona_id),
                    voice_sample_id: Some(voice_sample_id),
                    ..WorkflowState::default()
                };
                Ok((View::Create, Step::Mode, state))
            }

            WorkflowEvent::VoiceCaptured {
                ref voice_sample_id,
                ref voice_blob,
            } => {
                self.expect_step(&event, Step::Voice)?;
                let step = self.input_step(&event)?;
                let state = WorkflowState {
                    voice_sample_id: Some(voice_sample_id.clone()),
                    voice_blob: Some(voice_blob.clone()),
                    ..current
                };
                Ok((View::Create, step, state))
            }

            WorkflowEvent::SongUploaded {
                ref song_id,
                ref title,
                ref artist,
            } => {
                self.expect_step(&event, Step::Song)?;
                let state = WorkflowState {
                    song_id: Some(song_id.clone()),
                    song_title: Some(title.clone()),
                    song_artist: Some(artist.clone()),
                    ..current
                };
                Ok((View::Create, Step::Processing, state))
            }

            WorkflowEvent::LyricsSubmitted {
                ref request_id,
                ref lyrics,
            } => {
                self.expect_step(&event, Step::Lyrics)?;
                let state = WorkflowState {
                    lyrics_request_id: Some(request_id.clone()),
                    lyrics: Some(lyrics.clone()),
                    ..current
                };
                Ok((View::Create, Step::Processing, state))
            }

            WorkflowEvent::ProcessingComplete {
                ref cover_id,
                ref final_mix,
            } => {
                self.expect_step(&event, Step::Processing)?;
                let state = WorkflowState {
                    cover_id: Some(cover_id.clone()),
                    final_mix: Some(final_mix.clone()),
                    ..current
                };
                Ok((View::Create, Step::Complete, state))
            }

            WorkflowEvent::Restart => Ok((self.view, Step::Mode, WorkflowState::default())),

            WorkflowEvent::Navigate(View::Create) => {
                Ok((View::Create, Step::Mode, WorkflowState::default()))
            }

            WorkflowEvent::Navigate(view) => Ok((view, self.step, current)),
        }
    }

    /// Start over; also resets the download format
    pub fn restart(&mut self) -> Result<Step> {
        let step = self.apply(WorkflowEvent::Restart)?;
        self.format = AudioFormat::default();
        Ok(step)
    }

    /// Progress strip for the current mode, empty on the mode step
    pub fn progress_steps(&self) -> Vec<ProgressStep> {
        match (self.state.mode, self.step) {
            (_, Step::Mode) | (None, _) => Vec::new(),
            (Some(mode), _) => progress_steps(mode, self.state.has_preselected_persona()),
        }
    }

    pub fn highlighted_index(&self) -> Option<usize> {
        let mode = self.state.mode?;
        highlighted_index(mode, self.state.has_preselected_persona(), self.step)
    }

    /// Drawing status of entry `index` in [`Self::progress_steps`]
    pub fn step_status(&self, index: usize) -> StepStatus {
        match self.highlighted_index() {
            Some(current) if index == current => StepStatus::Current,
            Some(current) if index < current => StepStatus::Done,
            _ => StepStatus::Upcoming,
        }
    }

    /// Headline on the download screen
    pub fn completion_headline(&self) -> &'static str {
        match self.state.mode {
            Some(WorkflowMode::Generation) => "Your Song is Ready!",
            _ => "Your Cover is Ready!",
        }
    }

    pub fn completion_description(&self) -> String {
        match (
            self.state.mode,
            self.state.song_title.as_deref(),
            self.state.song_artist.as_deref(),
        ) {
            (Some(WorkflowMode::Generation), _, _) => {
                "Your AI-generated song with your voice is complete".to_string()
            }
            (_, Some(title), Some(artist)) if !title.is_empty() && !artist.is_empty() => {
                format!("\"{}\" by {} - covered with your voice", title, artist)
            }
            _ => "Your AI-generated voice cover is complete".to_string(),
        }
    }

    /// Label of the start-over action on the download screen
    pub fn restart_label(&self) -> String {
        let noun = self
            .state
            .mode
            .map(|m| m.product_noun())
            .unwrap_or("cover");
        format!("Create another {}", noun)
    }

    pub fn download_filename(&self) -> String {
        download_filename(&self.state, self.format)
    }
}
