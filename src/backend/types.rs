use crate::blob::ExternalBlob;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a song entered the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeType {
    /// Uploaded to be covered with the user's voice
    Cover,
    /// Generated from user lyrics
    Original,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceSample {
    pub id: String,
    pub user_id: String,
    pub voice_file: ExternalBlob,
}

/// Named, reusable pointer to an uploaded voice sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoicePersona {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub voice_sample_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub audio_file: ExternalBlob,
    pub instrumental_file: ExternalBlob,
    pub creation_date: DateTime<Utc>,
    pub mode_type: ModeType,
    pub voice_sample_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cover {
    pub id: String,
    pub original_song: Song,
    pub user_voice: VoiceSample,
    pub final_mix: ExternalBlob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum LyricsStatus {
    Pending,
    Processing,
    Complete,
    Failed(String),
}

impl LyricsStatus {
    /// Still waiting on the backend
    pub fn is_in_flight(&self) -> bool {
        matches!(self, LyricsStatus::Pending | LyricsStatus::Processing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsRequest {
    pub id: String,
    pub user_id: String,
    pub lyrics: String,
    pub style_prompt: Option<String>,
    pub voice_sample_id: String,
    pub status: LyricsStatus,
    pub generated_cover_id: Option<String>,
}

/// Arguments for [`Backend::upload_song`](super::Backend::upload_song)
#[derive(Debug, Clone)]
pub struct NewSong {
    pub id: String,
    /// Owner whose library lists the song
    pub user_id: String,
    pub title: String,
    pub artist: String,
    pub audio_file: ExternalBlob,
    pub instrumental_file: ExternalBlob,
    pub voice_sample_id: Option<String>,
    pub mode_type: ModeType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_statuses() {
        assert!(LyricsStatus::Pending.is_in_flight());
        assert!(LyricsStatus::Processing.is_in_flight());
        assert!(!LyricsStatus::Complete.is_in_flight());
        assert!(!LyricsStatus::Failed("boom".into()).is_in_flight());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&LyricsStatus::Failed("no voice".into())).unwrap();
        assert_eq!(json, r#"{"kind":"failed","reason":"no voice"}"#);

        let pending: LyricsStatus = serde_json::from_str(r#"{"kind":"pending"}"#).unwrap();
        assert_eq!(pending, LyricsStatus::Pending);
    }
}
