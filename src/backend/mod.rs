//! Client contract for the remote voice-cover backend
//!
//! The real backend does all audio work. This crate only talks to it through
//! the [`Backend`] trait; [`InMemoryBackend`] is a single-process stand-in
//! used by the CLI and tests.

pub mod memory;
pub mod types;

pub use memory::{InMemoryBackend, Operation};
pub use types::{
    Cover, LyricsRequest, LyricsStatus, ModeType, NewSong, Song, VoicePersona, VoiceSample,
};

use crate::blob::ExternalBlob;
use crate::Result;
use async_trait::async_trait;

/// Typed remote-procedure interface to the backend
///
/// Every method maps to one remote call. Implementations report failures as
/// [`CoverError::RemoteCallError`](crate::CoverError::RemoteCallError).
#[async_trait]
pub trait Backend: Send + Sync {
    async fn upload_voice_sample(&self, id: &str, user_id: &str, voice: ExternalBlob) -> Result<()>;

    async fn upload_song(&self, song: NewSong) -> Result<()>;

    async fn create_cover(
        &self,
        cover_id: &str,
        song_id: &str,
        voice_sample_id: &str,
        final_mix: ExternalBlob,
    ) -> Result<()>;

    async fn submit_lyrics_request(
        &self,
        request_id: &str,
        user_id: &str,
        lyrics: &str,
        voice_sample_id: &str,
        style_prompt: Option<&str>,
    ) -> Result<()>;

    async fn complete_lyrics_request(&self, request_id: &str, final_mix: ExternalBlob) -> Result<()>;

    async fn get_user_library(&self, user_id: &str) -> Result<Vec<Song>>;

    async fn get_all_voice_personas(&self, user_id: &str) -> Result<Vec<VoicePersona>>;

    async fn create_voice_persona(
        &self,
        id: &str,
        user_id: &str,
        name: &str,
        voice_sample_id: &str,
    ) -> Result<()>;

    async fn get_cover(&self, id: &str) -> Result<Option<Cover>>;

    async fn get_lyrics_request(&self, id: &str) -> Result<Option<LyricsRequest>>;

    async fn get_all_lyrics_requests(&self) -> Result<Vec<LyricsRequest>>;
}
