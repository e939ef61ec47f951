//! Read-through cache over the backend's library and persona queries
//!
//! Snapshots are handed out as `Arc`s and replaced on refetch, never edited.
//! The user library is always refetched on read; other queries are served
//! from cache until [`LibraryQueries::invalidate`] marks them stale.

pub mod share;

pub use share::{publish_progress, PrivacyStatus, PublishDraft, PublishReceipt, SharePost};

use crate::backend::{Backend, Cover, LyricsRequest, Song, VoicePersona};
use crate::workflow::AudioFormat;
use crate::{CoverError, Result};
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const LIBRARY_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const LYRICS_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Identifies one cached query
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum QueryKey {
    UserLibrary(String),
    VoicePersonas(String),
    Cover(String),
    LyricsRequest(String),
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::UserLibrary(user) => write!(f, "user_library/{}", user),
            QueryKey::VoicePersonas(user) => write!(f, "voice_personas/{}", user),
            QueryKey::Cover(id) => write!(f, "cover/{}", id),
            QueryKey::LyricsRequest(id) => write!(f, "lyrics_request/{}", id),
        }
    }
}

#[derive(Clone, Debug)]
enum Snapshot {
    Library(Arc<Vec<Song>>),
    Personas(Arc<Vec<VoicePersona>>),
    Cover(Option<Arc<Cover>>),
    LyricsRequest(Option<Arc<LyricsRequest>>),
}

#[derive(Clone, Debug)]
struct Entry {
    snapshot: Snapshot,
    stale: bool,
    fetched_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct LibraryQueries {
    backend: Option<Arc<dyn Backend>>,
    cache: Arc<RwLock<HashMap<QueryKey, Entry>>>,
    library_interval: Duration,
    lyrics_interval: Duration,
}

impl LibraryQueries {
    pub fn new(backend: Option<Arc<dyn Backend>>) -> Self {
        Self {
            backend,
            cache: Arc::new(RwLock::new(HashMap::new())),
            library_interval: LIBRARY_POLL_INTERVAL,
            lyrics_interval: LYRICS_POLL_INTERVAL,
        }
    }

    pub fn with_intervals(mut self, library: Duration, lyrics: Duration) -> Self {
        self.library_interval = library;
        self.lyrics_interval = lyrics;
        self
    }

    /// Swap the backend connection; cached snapshots are dropped
    pub fn set_backend(&mut self, backend: Option<Arc<dyn Backend>>) {
        self.backend = backend;
        self.cache.write().clear();
    }

    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    fn backend(&self) -> Result<Arc<dyn Backend>> {
        self.backend
            .clone()
            .ok_or_else(|| CoverError::BackendUnavailable("No backend connection".to_string()))
    }

    fn cached(&self, key: &QueryKey) -> Option<Snapshot> {
        self.cache
            .read()
            .get(key)
            .filter(|entry| !entry.stale)
            .map(|entry| entry.snapshot.clone())
    }

    fn store(&self, key: QueryKey, snapshot: Snapshot) {
        debug!(query = %key, "query refreshed");
        self.cache.write().insert(
            key,
            Entry {
                snapshot,
                stale: false,
                fetched_at: Utc::now(),
            },
        );
    }

    /// Mark `key` stale so the next read refetches
    pub fn invalidate(&self, key: &QueryKey) {
        if let Some(entry) = self.cache.write().get_mut(key) {
            debug!(query = %key, "query invalidated");
            entry.stale = true;
        }
    }

    /// Drop the entry for `key` entirely
    pub fn forget(&self, key: &QueryKey) -> bool {
        self.cache.write().remove(key).is_some()
    }

    /// Number of cached entries, stale or fresh
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn invalidate_all(&self) {
        for entry in self.cache.write().values_mut() {
            entry.stale = true;
        }
    }

    /// Check if `key` holds a fresh snapshot
    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.cached(key).is_some()
    }

    /// When `key` was last fetched
    pub fn fetched_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        self.cache.read().get(key).map(|entry| entry.fetched_at)
    }

    /// Fetch the user's songs; always goes to the backend
    pub async fn user_library(&self, user_id: &str) -> Result<Arc<Vec<Song>>> {
        let backend = self.backend()?;
        let songs = Arc::new(backend.get_user_library(user_id).await?);
        self.store(
            QueryKey::UserLibrary(user_id.to_string()),
            Snapshot::Library(Arc::clone(&songs)),
        );
        Ok(songs)
    }

    /// Last library snapshot, without fetching
    pub fn cached_library(&self, user_id: &str) -> Option<Arc<Vec<Song>>> {
        match self
            .cache
            .read()
            .get(&QueryKey::UserLibrary(user_id.to_string()))
            .map(|entry| &entry.snapshot)
        {
            Some(Snapshot::Library(songs)) => Some(Arc::clone(songs)),
            _ => None,
        }
    }

    pub async fn voice_personas(&self, user_id: &str) -> Result<Arc<Vec<VoicePersona>>> {
        let key = QueryKey::VoicePersonas(user_id.to_string());
        if let Some(Snapshot::Personas(personas)) = self.cached(&key) {
            return Ok(personas);
        }

        let backend = self.backend()?;
        let personas = Arc::new(backend.get_all_voice_personas(user_id).await?);
        self.store(key, Snapshot::Personas(Arc::clone(&personas)));
        Ok(personas)
    }

    pub async fn cover(&self, id: &str) -> Result<Option<Arc<Cover>>> {
        let key = QueryKey::Cover(id.to_string());
        if let Some(Snapshot::Cover(cover)) = self.cached(&key) {
            return Ok(cover);
        }

        let backend = self.backend()?;
        let cover = backend.get_cover(id).await?.map(Arc::new);
        self.store(key, Snapshot::Cover(cover.clone()));
        Ok(cover)
    }

    pub async fn lyrics_request(&self, id: &str) -> Result<Option<Arc<LyricsRequest>>> {
        let key = QueryKey::LyricsRequest(id.to_string());
        if let Some(Snapshot::LyricsRequest(request)) = self.cached(&key) {
            return Ok(request);
        }
        self.refetch_lyrics_request(id).await
    }

    async fn refetch_lyrics_request(&self, id: &str) -> Result<Option<Arc<LyricsRequest>>> {
        let backend = self.backend()?;
        let request = backend.get_lyrics_request(id).await?.map(Arc::new);
        self.store(
            QueryKey::LyricsRequest(id.to_string()),
            Snapshot::LyricsRequest(request.clone()),
        );
        Ok(request)
    }

    /// Library snapshots on a fixed cadence until `cancel` fires
    ///
    /// The first snapshot is fetched immediately. Fetch errors are yielded
    /// and polling continues.
    pub fn poll_library(
        &self,
        user_id: &str,
        cancel: CancellationToken,
    ) -> Result<impl Stream<Item = Result<Arc<Vec<Song>>>>> {
        self.backend()?;
        let queries = self.clone();
        let user_id = user_id.to_string();
        let interval = self.library_interval;

        Ok(async_stream::stream! {
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                let snapshot = queries.user_library(&user_id).await;
                if let Err(e) = &snapshot {
                    warn!(user_id = %user_id, error = %e, "library poll failed");
                }
                yield snapshot;

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        })
    }

    /// Follow a lyrics request while it is pending or processing
    ///
    /// Each poll yields the current request. The stream ends after the first
    /// terminal status, when the request does not exist, or on cancellation.
    /// The request's cache entry is dropped when the stream ends.
    pub fn watch_lyrics_request(
        &self,
        request_id: &str,
        cancel: CancellationToken,
    ) -> Result<impl Stream<Item = Result<Arc<LyricsRequest>>>> {
        self.backend()?;
        let queries = self.clone();
        let request_id = request_id.to_string();
        let interval = self.lyrics_interval;

        Ok(async_stream::stream! {
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                match queries.refetch_lyrics_request(&request_id).await {
                    Ok(Some(request)) => {
                        let in_flight = request.status.is_in_flight();
                        yield Ok(request);
                        if !in_flight {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!(request_id = %request_id, "lyrics request not found");
                        break;
                    }
                    Err(e) => {
                        warn!(request_id = %request_id, error = %e, "lyrics request poll failed");
                        yield Err(e);
                    }
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            queries.forget(&QueryKey::LyricsRequest(request_id.clone()));
        })
    }
}

impl fmt::Debug for LibraryQueries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryQueries")
            .field("connected", &self.backend.is_some())
            .field("cached", &self.cache.read().len())
            .field("library_interval", &self.library_interval)
            .field("lyrics_interval", &self.lyrics_interval)
            .finish()
    }
}

/// Name for downloading a library song
pub fn song_download_filename(song: &Song, format: AudioFormat) -> String {
    format!("{}-{}.{}", song.title, song.artist, format.extension())
}
