//! Studio orchestrator
//!
//! Wires user actions to backend calls, workflow transitions and
//! notifications: Voice -> Song | Lyrics -> Processing -> Download.
//!
//! Every failing action posts one error notification and leaves the wizard
//! on its current step so the user can retry.

use crate::backend::{Backend, ModeType, NewSong, Song, VoicePersona};
use crate::blob::ExternalBlob;
use crate::integration::config::StudioConfig;
use crate::library::{
    publish_progress, song_download_filename, LibraryQueries, PublishDraft, PublishReceipt,
    QueryKey, SharePost,
};
use crate::notifications::{Notification, Notifications};
use crate::processing::{
    cover_stages, generation_stages, ProcessingEvent, ProcessingHandle, ProcessingOutcome,
    ProcessingRequest, ProcessingResult, SharedProgress, Stage, StageSimulator,
};
use crate::workflow::validation::{
    default_title, normalize_song_details, normalize_style_prompt, validate_audio,
    validate_lyrics, validate_persona,
};
use crate::workflow::{
    AudioFormat, AudioUpload, Step, View, WorkflowEvent, WorkflowMachine, WorkflowMode,
    WorkflowState,
};
use crate::{CoverError, Result};
use chrono::Utc;
use crossbeam_channel::Receiver;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// File ready to be saved by the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

fn timestamped_id(prefix: &str) -> String {
    format!("{}{}", prefix, Utc::now().timestamp_millis())
}

/// Upload progress goes to the debug log
fn traced_upload(bytes: Vec<u8>, what: &'static str) -> ExternalBlob {
    ExternalBlob::from_bytes(bytes)
        .with_upload_progress(move |pct| debug!(upload = what, percent = pct, "upload progress"))
}

/// Client-side controller for the whole product
pub struct Studio {
    config: StudioConfig,
    backend: Option<Arc<dyn Backend>>,
    machine: WorkflowMachine,
    queries: LibraryQueries,
    notifications: Notifications,
    active_run: Option<ProcessingHandle>,
}

impl Studio {
    /// Create a disconnected studio
    pub fn new(config: StudioConfig) -> Result<Self> {
        config.validate()?;

        let queries = LibraryQueries::new(None).with_intervals(
            config.polling.library_interval(),
            config.polling.lyrics_interval(),
        );
        let notifications = Notifications::with_capacity(config.notification_capacity);

        Ok(Self {
            config,
            backend: None,
            machine: WorkflowMachine::new(),
            queries,
            notifications,
            active_run: None,
        })
    }

    /// Create a studio already connected to `backend`
    pub fn connected(config: StudioConfig, backend: Arc<dyn Backend>) -> Result<Self> {
        let mut studio = Self::new(config)?;
        studio.connect(backend);
        Ok(studio)
    }

    pub fn connect(&mut self, backend: Arc<dyn Backend>) {
        info!(user_id = %self.config.user_id, "backend connected");
        self.backend = Some(Arc::clone(&backend));
        self.queries.set_backend(Some(backend));
    }

    pub fn disconnect(&mut self) {
        self.cancel_processing();
        self.backend = None;
        self.queries.set_backend(None);
        info!("backend disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn view(&self) -> View {
        self.machine.view()
    }

    pub fn step(&self) -> Step {
        self.machine.step()
    }

    pub fn state(&self) -> &WorkflowState {
        self.machine.state()
    }

    pub fn machine(&self) -> &WorkflowMachine {
        &self.machine
    }

    pub fn queries(&self) -> &LibraryQueries {
        &self.queries
    }

    /// Post `err` as an error notification and hand it back
    fn fail<T>(&mut self, err: CoverError) -> Result<T> {
        self.notifications.error(err.user_message());
        Err(err)
    }

    /// Like [`Self::fail`] but with a fixed message for remote failures
    fn remote_fail<T>(&mut self, operation: &str, message: &str, err: CoverError) -> Result<T> {
        warn!(operation, error = %err, "rpc failed");
        self.notifications.error(message);
        Err(err)
    }

    fn require_backend(&mut self) -> Result<Arc<dyn Backend>> {
        if let Some(backend) = &self.backend {
            return Ok(Arc::clone(backend));
        }
        self.fail(CoverError::BackendUnavailable(
            "No backend connection".to_string(),
        ))
    }

    /// Reject early when the wizard is not on `step`
    fn require_step(&mut self, step: Step, action: &str) -> Result<()> {
        if self.machine.view() == View::Create && self.machine.step() == step {
            Ok(())
        } else {
            self.fail(CoverError::InvalidTransition(format!(
                "{} requires step {}, current step is {}",
                action,
                step,
                self.machine.step()
            )))
        }
    }

    fn apply(&mut self, event: WorkflowEvent) -> Result<Step> {
        match self.machine.apply(event) {
            Ok(step) => Ok(step),
            Err(e) => self.fail(e),
        }
    }

    pub fn select_mode(&mut self, mode: WorkflowMode) -> Result<Step> {
        self.apply(WorkflowEvent::SelectMode(mode))
    }

    /// Reuse a saved persona's voice and return to mode selection
    pub fn select_persona(&mut self, persona: &VoicePersona) -> Result<Step> {
        self.cancel_processing();
        let step = self.apply(WorkflowEvent::SelectPersona {
            persona_id: persona.id.clone(),
            voice_sample_id: persona.voice_sample_id.clone(),
        })?;
        self.notifications
            .success("Persona selected! Choose your creation mode.");
        Ok(step)
    }

    /// Upload a voice sample and move on to song or lyrics input
    pub async fn submit_voice(&mut self, upload: AudioUpload) -> Result<String> {
        self.require_step(Step::Voice, "submit_voice")?;
        if let Err(e) = validate_audio(&upload, self.config.limits.voice_max_bytes) {
            return self.fail(e);
        }
        let backend = self.require_backend()?;

        let id = timestamped_id("voice-");
        let blob = traced_upload(upload.bytes, "voice");
        if let Err(e) = backend
            .upload_voice_sample(&id, &self.config.user_id, blob.clone())
            .await
        {
            return self.remote_fail("upload_voice_sample", "Failed to upload voice sample", e);
        }

        self.apply(WorkflowEvent::VoiceCaptured {
            voice_sample_id: id.clone(),
            voice_blob: blob,
        })?;
        self.notifications.success("Voice sample uploaded successfully!");
        Ok(id)
    }

    /// Upload the song to cover
    ///
    /// `title` defaults to the file name without its extension.
    pub async fn submit_song(
        &mut self,
        upload: AudioUpload,
        title: Option<&str>,
        artist: &str,
    ) -> Result<String> {
        self.require_step(Step::Song, "submit_song")?;
        if let Err(e) = validate_audio(&upload, self.config.limits.song_max_bytes) {
            return self.fail(e);
        }
        let fallback = default_title(&upload.file_name);
        let (title, artist) = match normalize_song_details(title.unwrap_or(fallback.as_str()), artist) {
            Ok(details) => details,
            Err(e) => return self.fail(e),
        };
        let backend = self.require_backend()?;

        let id = timestamped_id("song-");
        let audio = traced_upload(upload.bytes, "song");
        let song = NewSong {
            id: id.clone(),
            user_id: self.config.user_id.clone(),
            title: title.clone(),
            artist: artist.clone(),
            audio_file: audio.clone(),
            instrumental_file: audio,
            voice_sample_id: self.machine.state().voice_sample_id.clone(),
            mode_type: ModeType::Cover,
        };
        if let Err(e) = backend.upload_song(song).await {
            return self.remote_fail("upload_song", "Failed to upload song", e);
        }

        self.queries
            .invalidate(&QueryKey::UserLibrary(self.config.user_id.clone()));
        self.notifications.success("Song uploaded successfully!");
        self.apply(WorkflowEvent::SongUploaded {
            song_id: id.clone(),
            title,
            artist,
        })?;
        Ok(id)
    }

    /// Submit lyrics for generation
    pub async fn submit_lyrics(
        &mut self,
        lyrics: &str,
        style_prompt: Option<&str>,
    ) -> Result<String> {
        self.require_step(Step::Lyrics, "submit_lyrics")?;
        let lyrics = match validate_lyrics(
            lyrics,
            self.config.limits.lyrics_min_chars,
            self.config.limits.lyrics_max_chars,
        ) {
            Ok(lyrics) => lyrics,
            Err(e) => return self.fail(e),
        };
        let backend = self.require_backend()?;
        let voice_sample_id = match self.machine.state().voice_sample_id.clone() {
            Some(id) => id,
            None => {
                return self.fail(CoverError::ValidationError(
                    "A voice sample is required".to_string(),
                ))
            }
        };

        let id = timestamped_id("lyrics-");
        let style = normalize_style_prompt(style_prompt);
        if let Err(e) = backend
            .submit_lyrics_request(
                &id,
                &self.config.user_id,
                &lyrics,
                &voice_sample_id,
                style.as_deref(),
            )
            .await
        {
            return self.remote_fail(
                "submit_lyrics_request",
                "Failed to submit lyrics. Please try again.",
                e,
            );
        }

        self.notifications
            .success("Lyrics submitted! Generating your song...");
        self.apply(WorkflowEvent::LyricsSubmitted {
            request_id: id.clone(),
            lyrics,
        })?;
        Ok(id)
    }

    fn processing_request(&self) -> Result<(ProcessingRequest, Vec<Stage>)> {
        let state = self.machine.state();
        let voice_sample_id = state.voice_sample_id.clone().unwrap_or_default();
        match state.mode {
            Some(WorkflowMode::Cover) => Ok((
                ProcessingRequest::Cover {
                    voice_sample_id,
                    song_id: state.song_id.clone().unwrap_or_default(),
                },
                cover_stages(),
            )),
            Some(WorkflowMode::Generation) => Ok((
                ProcessingRequest::Generation {
                    request_id: state.lyrics_request_id.clone().unwrap_or_default(),
                    voice_sample_id,
                },
                generation_stages(),
            )),
            None => Err(CoverError::InvalidTransition(
                "No workflow mode selected".to_string(),
            )),
        }
    }

    /// Spawn the staged pipeline for the current step
    ///
    /// Progress is readable through [`Self::progress`] and
    /// [`Self::processing_events`] until [`Self::finish_processing`].
    pub fn start_processing(&mut self) -> Result<()> {
        self.require_step(Step::Processing, "start_processing")?;
        if self.active_run.is_some() {
            return self.fail(CoverError::InvalidTransition(
                "Processing is already running".to_string(),
            ));
        }

        let (request, stages) = match self.processing_request() {
            Ok(parts) => parts,
            Err(e) => return self.fail(e),
        };
        let simulator = StageSimulator::new(self.backend.clone(), stages)
            .with_time_scale(self.config.timing.time_scale);

        match simulator.start(request, CancellationToken::new()) {
            Ok(handle) => {
                info!(run_id = %handle.run_id(), "processing run spawned");
                self.active_run = Some(handle);
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    pub fn is_processing(&self) -> bool {
        self.active_run.is_some()
    }

    /// Progress of the active run
    pub fn progress(&self) -> Option<SharedProgress> {
        self.active_run.as_ref().map(ProcessingHandle::progress)
    }

    pub fn processing_events(&self) -> Option<Receiver<ProcessingEvent>> {
        self.active_run.as_ref().map(ProcessingHandle::events)
    }

    /// Stop the active run, if any
    pub fn cancel_processing(&mut self) {
        if let Some(handle) = self.active_run.take() {
            info!(run_id = %handle.run_id(), "cancelling processing run");
            handle.cancel();
        }
    }

    /// Wait for the active run and apply its outcome
    ///
    /// Returns `Ok(None)` when the run was cancelled. A failed finalize call
    /// leaves the wizard on the processing step.
    pub async fn finish_processing(&mut self) -> Result<Option<ProcessingResult>> {
        let handle = match self.active_run.take() {
            Some(handle) => handle,
            None => {
                return self.fail(CoverError::InvalidTransition(
                    "No processing run to finish".to_string(),
                ))
            }
        };
        let mode = self.machine.state().mode;

        match handle.wait().await {
            Ok(ProcessingOutcome::Completed(result)) => {
                self.apply(WorkflowEvent::ProcessingComplete {
                    cover_id: result.result_id.clone(),
                    final_mix: result.final_mix.clone(),
                })?;
                self.queries
                    .invalidate(&QueryKey::UserLibrary(self.config.user_id.clone()));
                self.notifications.success(match mode {
                    Some(WorkflowMode::Generation) => "Your song is ready!",
                    _ => "Your cover is ready!",
                });
                Ok(Some(result))
            }
            Ok(ProcessingOutcome::Cancelled) => Ok(None),
            Err(e) => {
                let (operation, message) = match mode {
                    Some(WorkflowMode::Generation) => {
                        ("complete_lyrics_request", "Failed to generate song")
                    }
                    _ => ("create_cover", "Failed to create cover"),
                };
                self.remote_fail(operation, message, e)
            }
        }
    }

    /// Start processing and wait for it
    pub async fn run_processing(&mut self) -> Result<Option<ProcessingResult>> {
        self.start_processing()?;
        self.finish_processing().await
    }

    /// Discard the wizard and go back to mode selection
    pub fn restart(&mut self) -> Result<Step> {
        self.cancel_processing();
        match self.machine.restart() {
            Ok(step) => Ok(step),
            Err(e) => self.fail(e),
        }
    }

    /// Switch the top-level view
    pub fn navigate(&mut self, view: View) -> Result<Step> {
        self.cancel_processing();
        self.apply(WorkflowEvent::Navigate(view))
    }

    pub async fn create_persona(
        &mut self,
        name: &str,
        voice_sample_id: Option<&str>,
    ) -> Result<VoicePersona> {
        let (name, voice_sample_id) = match validate_persona(name, voice_sample_id) {
            Ok(parts) => parts,
            Err(e) => return self.fail(e),
        };
        let backend = self.require_backend()?;

        let persona = VoicePersona {
            id: timestamped_id("persona_"),
            user_id: self.config.user_id.clone(),
            name,
            voice_sample_id,
        };
        if let Err(e) = backend
            .create_voice_persona(
                &persona.id,
                &persona.user_id,
                &persona.name,
                &persona.voice_sample_id,
            )
            .await
        {
            return self.remote_fail(
                "create_voice_persona",
                "Failed to create voice persona",
                e,
            );
        }

        self.queries
            .invalidate(&QueryKey::VoicePersonas(self.config.user_id.clone()));
        self.notifications
            .success("Voice persona created successfully!");
        Ok(persona)
    }

    /// Always fails; the backend has no delete call
    pub fn delete_persona(&mut self, persona_id: &str) -> Result<()> {
        self.remote_fail(
            "delete_voice_persona",
            "Delete functionality not yet available",
            CoverError::Unsupported(format!("Cannot delete persona {}", persona_id)),
        )
    }

    pub async fn personas(&self) -> Result<Arc<Vec<VoicePersona>>> {
        self.queries.voice_personas(&self.config.user_id).await
    }

    pub async fn library(&self) -> Result<Arc<Vec<Song>>> {
        self.queries.user_library(&self.config.user_id).await
    }

    pub fn set_format(&mut self, format: AudioFormat) {
        self.machine.set_format(format);
    }

    /// Fetch the finished result for saving
    pub async fn download(&mut self) -> Result<Download> {
        self.require_step(Step::Complete, "download")?;
        let final_mix = match self.machine.state().final_mix.clone() {
            Some(mix) => mix,
            None => {
                return self.fail(CoverError::BlobError("No final mix available".to_string()))
            }
        };

        match final_mix.bytes().await {
            Ok(bytes) => {
                self.notifications.success("Download started!");
                let format = self.machine.format();
                Ok(Download {
                    filename: self.machine.download_filename(),
                    mime_type: format.mime_type(),
                    bytes,
                })
            }
            Err(e) => {
                warn!(error = %e, "final mix download failed");
                self.notifications.error("Failed to download file");
                Err(e)
            }
        }
    }

    /// Fetch a library song for saving
    pub async fn download_song(&mut self, song: &Song, format: AudioFormat) -> Result<Download> {
        match song.audio_file.bytes().await {
            Ok(bytes) => Ok(Download {
                filename: song_download_filename(song, format),
                mime_type: format.mime_type(),
                bytes,
            }),
            Err(e) => {
                warn!(song_id = %song.id, error = %e, "song download failed");
                self.notifications.error("Failed to download file");
                Err(e)
            }
        }
    }

    /// Publish a library song with the given video settings
    ///
    /// Returns `Ok(None)` when `cancel` fires before the publish finishes.
    pub async fn publish_song(
        &mut self,
        song: &Song,
        draft: &PublishDraft,
        cancel: CancellationToken,
    ) -> Result<Option<PublishReceipt>> {
        if let Err(e) = draft.validate() {
            return self.fail(e);
        }

        info!(song_id = %song.id, privacy = %draft.privacy, "publishing song");
        let mut finished = false;
        let progress = publish_progress(cancel);
        futures::pin_mut!(progress);
        while let Some(pct) = progress.next().await {
            debug!(song_id = %song.id, percent = pct, "publish progress");
            finished = pct == 100;
        }
        if !finished {
            info!(song_id = %song.id, "publish cancelled");
            return Ok(None);
        }

        let receipt = PublishReceipt::new(song, draft);
        self.notifications.success(
            "YouTube upload initiated! Note: Full YouTube integration requires OAuth2 authentication setup.",
        );
        self.notifications.info(format!(
            "To upload manually, download your song and upload it to YouTube Studio. Audio URL: {}",
            receipt.audio_url
        ));
        Ok(Some(receipt))
    }

    /// Share text and link for a library song
    pub fn share_song(&mut self, song: &Song) -> Result<(SharePost, String)> {
        let post = SharePost::for_song(song);
        match post.dialog_url() {
            Ok(link) => {
                self.notifications.success("Opening Facebook share dialog...");
                Ok((post, link.to_string()))
            }
            Err(e) => {
                warn!(song_id = %song.id, error = %e, "share failed");
                self.notifications.error("Failed to share to Facebook");
                Err(e)
            }
        }
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn latest_notification(&self) -> Option<&Notification> {
        self.notifications.latest()
    }

    /// Take all pending notifications
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        self.cancel_processing();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InMemoryBackend, Operation};
    use crate::notifications::NotificationLevel;

    fn studio(backend: &InMemoryBackend) -> Studio {
        Studio::connected(StudioConfig::default(), Arc::new(backend.clone())).unwrap()
    }

    fn wav(name: &str) -> AudioUpload {
        AudioUpload::new(name, Some("audio/wav".into()), vec![7u8; 64])
    }

    #[tokio::test]
    async fn test_disconnected_actions_fail_fast() {
        let mut studio = Studio::new(StudioConfig::default()).unwrap();
        studio.select_mode(WorkflowMode::Cover).unwrap();

        let err = studio.submit_voice(wav("me.wav")).await.unwrap_err();
        assert!(matches!(err, CoverError::BackendUnavailable(_)));
        assert_eq!(studio.step(), Step::Voice);
        assert_eq!(
            studio.latest_notification().map(|n| n.message.as_str()),
            Some("Backend not ready")
        );
    }

    #[tokio::test]
    async fn test_invalid_upload_makes_no_backend_call() {
        let backend = InMemoryBackend::new();
        let mut studio = studio(&backend);
        studio.select_mode(WorkflowMode::Cover).unwrap();

        let upload = AudioUpload::new("notes.txt", Some("text/plain".into()), vec![1u8; 4]);
        assert!(studio.submit_voice(upload).await.is_err());
        assert_eq!(studio.step(), Step::Voice);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_step() {
        let backend = InMemoryBackend::new();
        backend.fail(Operation::UploadVoiceSample);
        let mut studio = studio(&backend);
        studio.select_mode(WorkflowMode::Generation).unwrap();

        assert!(studio.submit_voice(wav("me.wav")).await.is_err());
        assert_eq!(studio.step(), Step::Voice);
        let note = studio.latest_notification().unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
        assert_eq!(note.message, "Failed to upload voice sample");
    }

    #[tokio::test]
    async fn test_song_title_defaults_to_file_name() {
        let backend = InMemoryBackend::new();
        let mut studio = studio(&backend);
        studio.select_mode(WorkflowMode::Cover).unwrap();
        studio.submit_voice(wav("me.wav")).await.unwrap();

        studio
            .submit_song(wav("Bohemian Rhapsody.wav"), None, "  ")
            .await
            .unwrap();

        assert_eq!(studio.step(), Step::Processing);
        assert_eq!(studio.state().song_title.as_deref(), Some("Bohemian Rhapsody"));
        assert_eq!(studio.state().song_artist.as_deref(), Some("Unknown Artist"));
        let library = studio.library().await.unwrap();
        assert_eq!(library[0].mode_type, ModeType::Cover);
        assert_eq!(library[0].audio_file, library[0].instrumental_file);
    }

    #[tokio::test]
    async fn test_short_lyrics_rejected_locally() {
        let backend = InMemoryBackend::new();
        let mut studio = studio(&backend);
        studio.select_mode(WorkflowMode::Generation).unwrap();
        studio.submit_voice(wav("me.wav")).await.unwrap();

        let err = studio.submit_lyrics("too short", None).await.unwrap_err();
        assert!(matches!(err, CoverError::ValidationError(_)));
        assert_eq!(studio.step(), Step::Lyrics);
        assert_eq!(backend.call_count(Operation::SubmitLyricsRequest), 0);
    }

    #[tokio::test]
    async fn test_persona_delete_always_fails() {
        let backend = InMemoryBackend::new();
        let mut studio = studio(&backend);

        let err = studio.delete_persona("persona_1").unwrap_err();
        assert!(matches!(err, CoverError::Unsupported(_)));
        assert_eq!(
            studio.latest_notification().map(|n| n.message.as_str()),
            Some("Delete functionality not yet available")
        );
    }

    #[tokio::test]
    async fn test_create_persona_refreshes_list() {
        let backend = InMemoryBackend::new();
        let mut studio = studio(&backend);
        assert!(studio.personas().await.unwrap().is_empty());

        assert!(studio.create_persona(" ", Some("voice-1")).await.is_err());
        let persona = studio.create_persona("Studio Me", Some("voice-1")).await.unwrap();
        assert!(persona.id.starts_with("persona_"));

        let personas = studio.personas().await.unwrap();
        assert_eq!(personas.len(), 1);
        assert_eq!(personas[0].name, "Studio Me");
    }

    async fn uploaded_song(studio: &mut Studio) -> Song {
        studio.select_mode(WorkflowMode::Cover).unwrap();
        studio.submit_voice(wav("me.wav")).await.unwrap();
        studio
            .submit_song(wav("Hello.wav"), None, "Adele")
            .await
            .unwrap();
        studio.library().await.unwrap()[0].clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_song_reports_audio_url() {
        let backend = InMemoryBackend::new();
        let mut studio = studio(&backend);
        let song = uploaded_song(&mut studio).await;

        let draft = PublishDraft::for_song(&song);
        let started = tokio::time::Instant::now();
        let receipt = studio
            .publish_song(&song, &draft, CancellationToken::new())
            .await
            .unwrap()
            .expect("finished publish");

        assert!(started.elapsed() >= crate::library::share::PUBLISH_DURATION);
        assert_eq!(receipt.title, "Hello");
        assert_eq!(receipt.audio_url, song.audio_file.direct_url());
        let last = studio.latest_notification().unwrap();
        assert_eq!(last.level, NotificationLevel::Info);
        assert!(last.message.ends_with(&receipt.audio_url));
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_song_validation_and_cancel() {
        let backend = InMemoryBackend::new();
        let mut studio = studio(&backend);
        let song = uploaded_song(&mut studio).await;

        let untitled = PublishDraft::for_song(&song).with_title(" ");
        let err = studio
            .publish_song(&song, &untitled, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoverError::ValidationError(_)));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let notes = studio.notifications().len();
        let outcome = studio
            .publish_song(&song, &PublishDraft::for_song(&song), cancel)
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(studio.notifications().len(), notes);
    }

    #[tokio::test]
    async fn test_share_song_link() {
        let backend = InMemoryBackend::new();
        let mut studio = studio(&backend);
        let song = uploaded_song(&mut studio).await;

        let (post, link) = studio.share_song(&song).unwrap();
        assert_eq!(post.text, "Check out my cover: \"Hello\" by Adele");
        assert!(link.starts_with("https://www.facebook.com/dialog/share?"));
        assert_eq!(
            studio.latest_notification().map(|n| n.message.as_str()),
            Some("Opening Facebook share dialog...")
        );
    }

    #[tokio::test]
    async fn test_start_processing_outside_step_is_rejected() {
        let backend = InMemoryBackend::new();
        let mut studio = studio(&backend);
        assert!(matches!(
            studio.start_processing(),
            Err(CoverError::InvalidTransition(_))
        ));
        assert!(!studio.is_processing());
    }
}
