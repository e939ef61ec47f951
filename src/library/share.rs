//! Sharing and publishing finished songs
//!
//! Publishing to a video platform needs server-side OAuth, so
//! [`publish_progress`] only paces the upload the user sees. The finished
//! publish hands back the audio's direct URL for a manual upload.

use crate::backend::{ModeType, Song};
use crate::{CoverError, Result};
use futures::stream::Stream;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const PUBLISH_TICK: Duration = Duration::from_millis(500);
pub const PUBLISH_DURATION: Duration = Duration::from_secs(5);
pub const PUBLISH_STEP: u8 = 10;
/// Progress shown until the publish finishes
pub const PUBLISH_CAP: u8 = 90;

const SHARE_DIALOG_URL: &str = "https://www.facebook.com/dialog/share";
const SHARE_APP_ID: &str = "145634995501895";

/// Who can see a published video
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    Public,
    #[default]
    Unlisted,
    Private,
}

impl PrivacyStatus {
    pub fn description(&self) -> &'static str {
        match self {
            PrivacyStatus::Public => "Anyone can search for and view",
            PrivacyStatus::Unlisted => "Anyone with the link can view",
            PrivacyStatus::Private => "Only you can view",
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivacyStatus::Public => write!(f, "public"),
            PrivacyStatus::Unlisted => write!(f, "unlisted"),
            PrivacyStatus::Private => write!(f, "private"),
        }
    }
}

impl FromStr for PrivacyStatus {
    type Err = CoverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(PrivacyStatus::Public),
            "unlisted" => Ok(PrivacyStatus::Unlisted),
            "private" => Ok(PrivacyStatus::Private),
            other => Err(CoverError::ValidationError(format!(
                "Unknown privacy setting: {}",
                other
            ))),
        }
    }
}

/// Video settings for publishing a song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishDraft {
    pub title: String,
    pub description: String,
    pub privacy: PrivacyStatus,
}

impl PublishDraft {
    /// Default settings for `song`
    pub fn for_song(song: &Song) -> Self {
        let kind = match song.mode_type {
            ModeType::Cover => "Cover",
            ModeType::Original => "Original song",
        };
        Self {
            title: song.title.clone(),
            description: format!("{} by {}\n\nCreated with AI Voice Studio", kind, song.artist),
            privacy: PrivacyStatus::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_privacy(mut self, privacy: PrivacyStatus) -> Self {
        self.privacy = privacy;
        self
    }

    /// A title is required
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CoverError::ValidationError(
                "Please enter a video title".to_string(),
            ));
        }
        Ok(())
    }
}

/// What a finished publish hands back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub song_id: String,
    pub title: String,
    pub privacy: PrivacyStatus,
    /// Where the audio can be fetched for a manual upload
    pub audio_url: String,
}

impl PublishReceipt {
    pub fn new(song: &Song, draft: &PublishDraft) -> Self {
        Self {
            song_id: song.id.clone(),
            title: draft.title.trim().to_string(),
            privacy: draft.privacy,
            audio_url: song.audio_file.direct_url(),
        }
    }
}

/// Publish progress percentages
///
/// Rises by [`PUBLISH_STEP`] every [`PUBLISH_TICK`] up to [`PUBLISH_CAP`],
/// then yields 100 once [`PUBLISH_DURATION`] has elapsed. Ends early,
/// without yielding 100, if `cancel` fires.
pub fn publish_progress(cancel: CancellationToken) -> impl Stream<Item = u8> {
    async_stream::stream! {
        let deadline = tokio::time::Instant::now() + PUBLISH_DURATION;
        let mut progress = 0u8;
        let mut cancelled = false;

        while progress < PUBLISH_CAP {
            cancelled = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = tokio::time::sleep(PUBLISH_TICK) => false,
            };
            if cancelled {
                break;
            }
            progress = (progress + PUBLISH_STEP).min(PUBLISH_CAP);
            yield progress;
        }

        if !cancelled {
            let finished = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                _ = tokio::time::sleep_until(deadline) => true,
            };
            if finished {
                yield 100;
            }
        }
    }
}

/// Message and link for sharing a song
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharePost {
    pub title: String,
    pub text: String,
    /// The song's direct audio URL
    pub url: String,
}

impl SharePost {
    pub fn for_song(song: &Song) -> Self {
        let kind = match song.mode_type {
            ModeType::Cover => "cover",
            ModeType::Original => "song",
        };
        Self {
            title: song.title.clone(),
            text: format!("Check out my {}: \"{}\" by {}", kind, song.title, song.artist),
            url: song.audio_file.direct_url(),
        }
    }

    /// Social share-dialog link carrying the audio URL
    pub fn dialog_url(&self) -> Result<Url> {
        Url::parse_with_params(
            SHARE_DIALOG_URL,
            &[
                ("app_id", SHARE_APP_ID),
                ("display", "popup"),
                ("href", self.url.as_str()),
            ],
        )
        .map_err(|e| CoverError::ValidationError(format!("Invalid share link: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::ExternalBlob;
    use chrono::Utc;
    use futures::StreamExt;

    fn song(mode_type: ModeType, audio: ExternalBlob) -> Song {
        Song {
            id: "s1".into(),
            title: "Hello".into(),
            artist: "Adele".into(),
            audio_file: audio.clone(),
            instrumental_file: audio,
            creation_date: Utc::now(),
            mode_type,
            voice_sample_id: None,
        }
    }

    #[test]
    fn test_draft_defaults() {
        let draft = PublishDraft::for_song(&song(ModeType::Cover, ExternalBlob::from_bytes(vec![1u8])));
        assert_eq!(draft.title, "Hello");
        assert_eq!(draft.description, "Cover by Adele\n\nCreated with AI Voice Studio");
        assert_eq!(draft.privacy, PrivacyStatus::Unlisted);
        assert!(draft.validate().is_ok());

        let original = PublishDraft::for_song(&song(ModeType::Original, ExternalBlob::from_bytes(vec![1u8])));
        assert!(original.description.starts_with("Original song by Adele"));
        assert!(original.with_title("  ").validate().is_err());
    }

    #[test]
    fn test_privacy_parsing() {
        assert_eq!("Public".parse::<PrivacyStatus>().unwrap(), PrivacyStatus::Public);
        assert_eq!(PrivacyStatus::Private.to_string(), "private");
        assert!("friends".parse::<PrivacyStatus>().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_progress_pacing() {
        let started = tokio::time::Instant::now();
        let stream = publish_progress(CancellationToken::new());
        futures::pin_mut!(stream);

        let mut seen = Vec::new();
        while let Some(pct) = stream.next().await {
            seen.push((pct, started.elapsed()));
        }

        let values: Vec<_> = seen.iter().map(|(pct, _)| *pct).collect();
        assert_eq!(values, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
        assert!(seen[8].1 >= Duration::from_millis(4_500));
        assert!(seen[9].1 >= PUBLISH_DURATION);
        assert!(seen[9].1 < PUBLISH_DURATION + Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_publish_never_reaches_100() {
        let cancel = CancellationToken::new();
        let stream = publish_progress(cancel.clone());
        futures::pin_mut!(stream);

        assert_eq!(stream.next().await, Some(10));
        cancel.cancel();
        assert_eq!(stream.next().await, None);
    }

    #[test]
    fn test_share_post_uses_direct_url() {
        let remote = song(ModeType::Cover, ExternalBlob::from_url("https://cdn.voicecover.test/s1.mp3"));
        let post = SharePost::for_song(&remote);
        assert_eq!(post.text, "Check out my cover: \"Hello\" by Adele");
        assert_eq!(post.url, "https://cdn.voicecover.test/s1.mp3");

        let link = post.dialog_url().unwrap();
        assert_eq!(link.host_str(), Some("www.facebook.com"));
        let href = link
            .query_pairs()
            .find(|(k, _)| k == "href")
            .map(|(_, v)| v.into_owned());
        assert_eq!(href.as_deref(), Some("https://cdn.voicecover.test/s1.mp3"));

        let local = song(ModeType::Original, ExternalBlob::from_bytes(vec![1u8, 2]));
        let post = SharePost::for_song(&local);
        assert!(post.url.starts_with("data:"));
        assert!(post.text.starts_with("Check out my song"));
    }

    #[test]
    fn test_receipt_carries_audio_url() {
        let remote = song(ModeType::Cover, ExternalBlob::from_url("https://cdn.voicecover.test/s1.mp3"));
        let draft = PublishDraft::for_song(&remote)
            .with_title(" My Hello ")
            .with_privacy(PrivacyStatus::Public);
        let receipt = PublishReceipt::new(&remote, &draft);
        assert_eq!(receipt.title, "My Hello");
        assert_eq!(receipt.privacy, PrivacyStatus::Public);
        assert_eq!(receipt.audio_url, "https://cdn.voicecover.test/s1.mp3");
    }
}
