//! In-process backend
//!
//! Keeps every entity in memory and supports per-operation failure injection
//! so callers can exercise remote-failure paths.

use super::types::{
    Cover, LyricsRequest, LyricsStatus, ModeType, NewSong, Song, VoicePersona, VoiceSample,
};
use super::Backend;
use crate::blob::ExternalBlob;
use crate::{CoverError, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Backend operations, used for failure injection and call accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    UploadVoiceSample,
    UploadSong,
    CreateCover,
    SubmitLyricsRequest,
    CompleteLyricsRequest,
    GetUserLibrary,
    GetAllVoicePersonas,
    CreateVoicePersona,
    GetCover,
    GetLyricsRequest,
    GetAllLyricsRequests,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::UploadVoiceSample => "upload_voice_sample",
            Operation::UploadSong => "upload_song",
            Operation::CreateCover => "create_cover",
            Operation::SubmitLyricsRequest => "submit_lyrics_request",
            Operation::CompleteLyricsRequest => "complete_lyrics_request",
            Operation::GetUserLibrary => "get_user_library",
            Operation::GetAllVoicePersonas => "get_all_voice_personas",
            Operation::CreateVoicePersona => "create_voice_persona",
            Operation::GetCover => "get_cover",
            Operation::GetLyricsRequest => "get_lyrics_request",
            Operation::GetAllLyricsRequests => "get_all_lyrics_requests",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct Store {
    voice_samples: HashMap<String, VoiceSample>,
    songs: Vec<Song>,
    /// Song id to the user who uploaded or generated it
    song_owners: HashMap<String, String>,
    covers: HashMap<String, Cover>,
    lyrics_requests: Vec<LyricsRequest>,
    personas: Vec<VoicePersona>,
}

impl Store {
    fn song(&self, id: &str) -> Option<&Song> {
        self.songs.iter().find(|s| s.id == id)
    }

    fn owns_song(&self, user_id: &str, song: &Song) -> bool {
        self.song_owners
            .get(&song.id)
            .is_some_and(|owner| owner == user_id)
    }

    fn add_song(&mut self, owner: &str, song: Song) {
        self.song_owners.insert(song.id.clone(), owner.to_string());
        self.songs.push(song);
    }
}

/// Backend that stores everything in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    store: Arc<RwLock<Store>>,
    failing: Arc<Mutex<HashSet<Operation>>>,
    latency: Arc<Mutex<HashMap<Operation, Duration>>>,
    calls: Arc<Mutex<Vec<Operation>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `operation` fail
    pub fn fail(&self, operation: Operation) {
        self.failing.lock().insert(operation);
    }

    /// Stop failing `operation`
    pub fn recover(&self, operation: Operation) {
        self.failing.lock().remove(&operation);
    }

    /// Delay every subsequent call of `operation` by `delay` before it runs
    pub fn delay(&self, operation: Operation, delay: Duration) {
        self.latency.lock().insert(operation, delay);
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.calls.lock().iter().filter(|op| **op == operation).count()
    }

    async fn enter(&self, operation: Operation) -> Result<()> {
        self.calls.lock().push(operation);
        let delay = self.latency.lock().get(&operation).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(&operation) {
            debug!(%operation, "injected failure");
            return Err(CoverError::RemoteCallError(format!("{} rejected", operation)));
        }
        Ok(())
    }

    fn simulate_upload(blob: &ExternalBlob) {
        for pct in [0u8, 25, 50, 75, 100] {
            blob.report_upload_progress(pct);
        }
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn upload_voice_sample(&self, id: &str, user_id: &str, voice: ExternalBlob) -> Result<()> {
        self.enter(Operation::UploadVoiceSample).await?;
        Self::simulate_upload(&voice);

        let sample = VoiceSample {
            id: id.to_string(),
            user_id: user_id.to_string(),
            voice_file: voice,
        };
        self.store.write().voice_samples.insert(id.to_string(), sample);
        Ok(())
    }

    async fn upload_song(&self, song: NewSong) -> Result<()> {
        self.enter(Operation::UploadSong).await?;
        Self::simulate_upload(&song.audio_file);

        let owner = song.user_id;
        let record = Song {
            id: song.id,
            title: song.title,
            artist: song.artist,
            audio_file: song.audio_file,
            instrumental_file: song.instrumental_file,
            creation_date: Utc::now(),
            mode_type: song.mode_type,
            voice_sample_id: song.voice_sample_id,
        };
        self.store.write().add_song(&owner, record);
        Ok(())
    }

    async fn create_cover(
        &self,
        cover_id: &str,
        song_id: &str,
        voice_sample_id: &str,
        final_mix: ExternalBlob,
    ) -> Result<()> {
        self.enter(Operation::CreateCover).await?;

        let mut store = self.store.write();
        let original_song = store
            .song(song_id)
            .cloned()
            .ok_or_else(|| CoverError::RemoteCallError(format!("Song not found: {}", song_id)))?;
        let user_voice = store
            .voice_samples
            .get(voice_sample_id)
            .cloned()
            .ok_or_else(|| {
                CoverError::RemoteCallError(format!("Voice sample not found: {}", voice_sample_id))
            })?;

        store.covers.insert(
            cover_id.to_string(),
            Cover {
                id: cover_id.to_string(),
                original_song,
                user_voice,
                final_mix,
            },
        );
        Ok(())
    }

    async fn submit_lyrics_request(
        &self,
        request_id: &str,
        user_id: &str,
        lyrics: &str,
        voice_sample_id: &str,
        style_prompt: Option<&str>,
    ) -> Result<()> {
        self.enter(Operation::SubmitLyricsRequest).await?;

        self.store.write().lyrics_requests.push(LyricsRequest {
            id: request_id.to_string(),
            user_id: user_id.to_string(),
            lyrics: lyrics.to_string(),
            style_prompt: style_prompt.map(str::to_string),
            voice_sample_id: voice_sample_id.to_string(),
            status: LyricsStatus::Pending,
            generated_cover_id: None,
        });
        Ok(())
    }

    async fn complete_lyrics_request(&self, request_id: &str, final_mix: ExternalBlob) -> Result<()> {
        self.enter(Operation::CompleteLyricsRequest).await?;

        let mut store = self.store.write();
        let request = store
            .lyrics_requests
            .iter()
            .find(|r| r.id == request_id)
            .cloned()
            .ok_or_else(|| {
                CoverError::RemoteCallError(format!("Lyrics request not found: {}", request_id))
            })?;

        let title: String = request
            .lyrics
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("Untitled")
            .chars()
            .take(40)
            .collect();

        let song = Song {
            id: request.id.clone(),
            title,
            artist: "Generated".to_string(),
            audio_file: final_mix.clone(),
            instrumental_file: final_mix.clone(),
            creation_date: Utc::now(),
            mode_type: ModeType::Original,
            voice_sample_id: Some(request.voice_sample_id.clone()),
        };

        if let Some(user_voice) = store.voice_samples.get(&request.voice_sample_id).cloned() {
            store.covers.insert(
                request.id.clone(),
                Cover {
                    id: request.id.clone(),
                    original_song: song.clone(),
                    user_voice,
                    final_mix,
                },
            );
        }
        store.add_song(&request.user_id, song);

        let has_cover = store.covers.contains_key(request_id);
        if let Some(entry) = store.lyrics_requests.iter_mut().find(|r| r.id == request_id) {
            entry.status = LyricsStatus::Complete;
            entry.generated_cover_id = has_cover.then(|| request_id.to_string());
        }
        Ok(())
    }

    async fn get_user_library(&self, user_id: &str) -> Result<Vec<Song>> {
        self.enter(Operation::GetUserLibrary).await?;

        let store = self.store.read();
        Ok(store
            .songs
            .iter()
            .filter(|song| store.owns_song(user_id, song))
            .cloned()
            .collect())
    }

    async fn get_all_voice_personas(&self, user_id: &str) -> Result<Vec<VoicePersona>> {
        self.enter(Operation::GetAllVoicePersonas).await?;

        Ok(self
            .store
            .read()
            .personas
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_voice_persona(
        &self,
        id: &str,
        user_id: &str,
        name: &str,
        voice_sample_id: &str,
    ) -> Result<()> {
        self.enter(Operation::CreateVoicePersona).await?;

        self.store.write().personas.push(VoicePersona {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            voice_sample_id: voice_sample_id.to_string(),
        });
        Ok(())
    }

    async fn get_cover(&self, id: &str) -> Result<Option<Cover>> {
        self.enter(Operation::GetCover).await?;
        Ok(self.store.read().covers.get(id).cloned())
    }

    async fn get_lyrics_request(&self, id: &str) -> Result<Option<LyricsRequest>> {
        self.enter(Operation::GetLyricsRequest).await?;
        Ok(self
            .store
            .read()
            .lyrics_requests
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn get_all_lyrics_requests(&self) -> Result<Vec<LyricsRequest>> {
        self.enter(Operation::GetAllLyricsRequests).await?;
        Ok(self.store.read().lyrics_requests.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str, user_id: &str, voice_sample_id: Option<&str>) -> NewSong {
        let audio = ExternalBlob::from_bytes(vec![1u8; 8]);
        NewSong {
            id: id.to_string(),
            user_id: user_id.to_string(),
            title: "Title".to_string(),
            artist: "Artist".to_string(),
            audio_file: audio.clone(),
            instrumental_file: audio,
            voice_sample_id: voice_sample_id.map(str::to_string),
            mode_type: ModeType::Cover,
        }
    }

    #[tokio::test]
    async fn test_cover_requires_known_song_and_voice() {
        let backend = InMemoryBackend::new();
        let mix = ExternalBlob::from_bytes(vec![0u8; 4]);

        let err = backend.create_cover("c1", "missing", "v1", mix.clone()).await;
        assert!(matches!(err, Err(CoverError::RemoteCallError(_))));

        backend
            .upload_voice_sample("v1", "user", ExternalBlob::from_bytes(vec![2u8]))
            .await
            .unwrap();
        backend.upload_song(song("s1", "user", Some("v1"))).await.unwrap();
        backend.create_cover("c1", "s1", "v1", mix.clone()).await.unwrap();

        let cover = backend.get_cover("c1").await.unwrap().unwrap();
        assert_eq!(cover.original_song.id, "s1");
        assert_eq!(cover.final_mix, mix);
    }

    #[tokio::test]
    async fn test_library_is_scoped_to_owner() {
        let backend = InMemoryBackend::new();
        backend
            .upload_voice_sample("v1", "alice", ExternalBlob::from_bytes(vec![1u8]))
            .await
            .unwrap();
        backend
            .upload_voice_sample("v2", "bob", ExternalBlob::from_bytes(vec![1u8]))
            .await
            .unwrap();
        backend.upload_song(song("s1", "alice", Some("v1"))).await.unwrap();
        backend.upload_song(song("s2", "bob", Some("v2"))).await.unwrap();
        backend.upload_song(song("s3", "alice", None)).await.unwrap();
        backend.upload_song(song("s4", "bob", None)).await.unwrap();

        let library = |user: &'static str| {
            let backend = backend.clone();
            async move {
                backend
                    .get_user_library(user)
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|s| s.id)
                    .collect::<Vec<_>>()
            }
        };
        assert_eq!(library("alice").await, vec!["s1", "s3"]);
        assert_eq!(library("bob").await, vec!["s2", "s4"]);
        assert!(library("carol").await.is_empty());
    }

    #[tokio::test]
    async fn test_completing_lyrics_request_generates_song_and_cover() {
        let backend = InMemoryBackend::new();
        backend
            .upload_voice_sample("v1", "user", ExternalBlob::from_bytes(vec![1u8]))
            .await
            .unwrap();
        backend
            .submit_lyrics_request("lyrics-1", "user", "\n  First line here\nsecond", "v1", Some("trap"))
            .await
            .unwrap();

        let pending = backend.get_lyrics_request("lyrics-1").await.unwrap().unwrap();
        assert_eq!(pending.status, LyricsStatus::Pending);

        backend
            .complete_lyrics_request("lyrics-1", ExternalBlob::from_bytes(vec![0u8; 16]))
            .await
            .unwrap();

        let done = backend.get_lyrics_request("lyrics-1").await.unwrap().unwrap();
        assert_eq!(done.status, LyricsStatus::Complete);
        assert_eq!(done.generated_cover_id.as_deref(), Some("lyrics-1"));

        let library = backend.get_user_library("user").await.unwrap();
        assert_eq!(library.len(), 1);
        assert_eq!(library[0].title, "First line here");
        assert_eq!(library[0].mode_type, ModeType::Original);
    }

    #[tokio::test]
    async fn test_failure_injection_and_call_log() {
        let backend = InMemoryBackend::new();
        backend.fail(Operation::GetUserLibrary);

        assert!(backend.get_user_library("user").await.is_err());
        backend.recover(Operation::GetUserLibrary);
        assert!(backend.get_user_library("user").await.is_ok());

        assert_eq!(backend.call_count(Operation::GetUserLibrary), 2);
        assert_eq!(backend.calls(), vec![Operation::GetUserLibrary; 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_latency_delays_call() {
        let backend = InMemoryBackend::new();
        backend.delay(Operation::GetCover, Duration::from_millis(500));

        let started = tokio::time::Instant::now();
        assert!(backend.get_cover("c1").await.unwrap().is_none());
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(backend.call_count(Operation::GetCover), 1);
    }

    #[tokio::test]
    async fn test_uploads_report_progress() {
        let backend = InMemoryBackend::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let blob = ExternalBlob::from_bytes(vec![1u8; 32]).with_upload_progress(move |p| sink.lock().push(p));

        backend.upload_voice_sample("v1", "user", blob).await.unwrap();
        assert_eq!(seen.lock().last().copied(), Some(100));
    }
}
