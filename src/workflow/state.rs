//! Wizard state for the creation flow
//!
//! [`WorkflowState`] is the accumulated record of what the user has done so
//! far. The machine never edits it in place; every transition produces a
//! fresh value.

use crate::blob::ExternalBlob;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the user is creating
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowMode {
    /// Re-sing an uploaded song with the user's voice
    Cover,
    /// Compose an original song from lyrics
    Generation,
}

impl WorkflowMode {
    /// Noun used in user-facing copy ("cover" / "song")
    pub fn product_noun(&self) -> &'static str {
        match self {
            WorkflowMode::Cover => "cover",
            WorkflowMode::Generation => "song",
        }
    }
}

impl fmt::Display for WorkflowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowMode::Cover => write!(f, "cover"),
            WorkflowMode::Generation => write!(f, "generation"),
        }
    }
}

/// Wizard step within the creation view
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Mode,
    Voice,
    Song,
    Lyrics,
    Processing,
    /// Download screen shown after processing finishes
    Complete,
}

impl Step {
    /// Label shown in the progress-step strip
    pub fn label(&self) -> &'static str {
        match self {
            Step::Mode => "Mode",
            Step::Voice => "Voice",
            Step::Song => "Song",
            Step::Lyrics => "Lyrics",
            Step::Processing => "Processing",
            Step::Complete => "Download",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            Step::Mode => "mode",
            Step::Voice => "voice",
            Step::Song => "song",
            Step::Lyrics => "lyrics",
            Step::Processing => "processing",
            Step::Complete => "complete",
        };
        f.write_str(key)
    }
}

/// Top-level view
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Create,
    Library,
    Personas,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Create => write!(f, "create"),
            View::Library => write!(f, "library"),
            View::Personas => write!(f, "personas"),
        }
    }
}

/// Download container format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "wav" => Ok(AudioFormat::Wav),
            other => Err(format!("Unsupported audio format: {}", other)),
        }
    }
}

/// Everything gathered by the wizard so far
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkflowState {
    pub mode: Option<WorkflowMode>,
    pub voice_sample_id: Option<String>,
    pub voice_blob: Option<ExternalBlob>,
    pub song_id: Option<String>,
    pub song_title: Option<String>,
    pub song_artist: Option<String>,
    pub lyrics: Option<String>,
    pub lyrics_request_id: Option<String>,
    /// Id of the finished result (cover id or lyrics request id)
    pub cover_id: Option<String>,
    pub final_mix: Option<ExternalBlob>,
    /// Persona chosen from the personas view before picking a mode
    pub selected_persona_id: Option<String>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if no field has been populated
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check if a persona was chosen, which skips voice capture
    pub fn has_preselected_persona(&self) -> bool {
        self.selected_persona_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = WorkflowState::new();
        assert!(state.is_empty());
        assert!(!state.has_preselected_persona());

        let state = WorkflowState {
            selected_persona_id: Some("persona_1".into()),
            ..Default::default()
        };
        assert!(!state.is_empty());
        assert!(state.has_preselected_persona());
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("WAV".parse::<AudioFormat>(), Ok(AudioFormat::Wav));
        assert_eq!(" mp3 ".parse::<AudioFormat>(), Ok(AudioFormat::Mp3));
        assert!("flac".parse::<AudioFormat>().is_err());
        assert_eq!(AudioFormat::default(), AudioFormat::Mp3);
    }

    #[test]
    fn test_step_keys_and_labels() {
        assert_eq!(Step::Complete.to_string(), "complete");
        assert_eq!(Step::Complete.label(), "Download");
        assert_eq!(WorkflowMode::Generation.to_string(), "generation");
        assert_eq!(
            serde_json::to_string(&WorkflowMode::Cover).unwrap(),
            "\"cover\""
        );
    }
}
