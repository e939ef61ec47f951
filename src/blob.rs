//! Handles to binary audio content
//!
//! An [`ExternalBlob`] is either raw bytes held in memory or a URL the bytes
//! can be fetched from. Backends report upload progress through an optional
//! observer attached with [`ExternalBlob::with_upload_progress`].

use crate::{CoverError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

const DATA_URL_PREFIX: &str = "data:application/octet-stream;base64,";

/// Observer invoked with an upload percentage (0-100)
pub type UploadProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Clone, PartialEq, Eq)]
enum BlobSource {
    Bytes(Arc<Vec<u8>>),
    Url(String),
}

/// Opaque reference to binary audio content
#[derive(Clone)]
pub struct ExternalBlob {
    source: BlobSource,
    on_progress: Option<UploadProgressFn>,
}

impl ExternalBlob {
    /// Wrap raw bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            source: BlobSource::Bytes(Arc::new(bytes.into())),
            on_progress: None,
        }
    }

    /// Reference content that lives at a URL
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            source: BlobSource::Url(url.into()),
            on_progress: None,
        }
    }

    /// Attach an upload-progress observer
    pub fn with_upload_progress<F>(mut self, observer: F) -> Self
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(observer));
        self
    }

    /// Report upload progress to the attached observer, if any
    pub fn report_upload_progress(&self, percentage: u8) {
        if let Some(observer) = &self.on_progress {
            observer(percentage.min(100));
        }
    }

    /// Whether an upload-progress observer is attached
    pub fn has_progress_observer(&self) -> bool {
        self.on_progress.is_some()
    }

    /// Length in bytes when the content is held in memory
    pub fn len(&self) -> Option<usize> {
        match &self.source {
            BlobSource::Bytes(bytes) => Some(bytes.len()),
            BlobSource::Url(_) => None,
        }
    }

    /// Whether the blob is known to hold no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Whether the blob references remote content
    pub fn is_remote(&self) -> bool {
        matches!(self.source, BlobSource::Url(_))
    }

    /// Retrieve the raw bytes, fetching them if the blob is URL-backed
    pub async fn bytes(&self) -> Result<Vec<u8>> {
        match &self.source {
            BlobSource::Bytes(bytes) => Ok(bytes.as_ref().clone()),
            BlobSource::Url(url) => {
                if let Some(encoded) = url.strip_prefix(DATA_URL_PREFIX) {
                    return STANDARD
                        .decode(encoded)
                        .map_err(|e| CoverError::BlobError(format!("Invalid data URL: {}", e)));
                }

                let response = reqwest::get(url.as_str())
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| CoverError::BlobError(format!("Failed to fetch {}: {}", url, e)))?;

                let body = response
                    .bytes()
                    .await
                    .map_err(|e| CoverError::BlobError(format!("Failed to read {}: {}", url, e)))?;

                Ok(body.to_vec())
            }
        }
    }

    /// A URL the content can be fetched from directly
    ///
    /// In-memory content is exposed as a base64 `data:` URL.
    pub fn direct_url(&self) -> String {
        match &self.source {
            BlobSource::Bytes(bytes) => format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(bytes.as_slice())),
            BlobSource::Url(url) => url.clone(),
        }
    }
}

impl PartialEq for ExternalBlob {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for ExternalBlob {}

impl fmt::Debug for ExternalBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            BlobSource::Bytes(bytes) => write!(f, "ExternalBlob(bytes, {} B)", bytes.len()),
            BlobSource::Url(url) => write!(f, "ExternalBlob(url, {})", url),
        }
    }
}

impl Serialize for ExternalBlob {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.direct_url())
    }
}

impl<'de> Deserialize<'de> for ExternalBlob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let url = String::deserialize(deserializer)?;
        match url.strip_prefix(DATA_URL_PREFIX) {
            Some(encoded) => STANDARD
                .decode(encoded)
                .map(ExternalBlob::from_bytes)
                .map_err(serde::de::Error::custom),
            None => Ok(ExternalBlob::from_url(url)),
        }
    }
}
