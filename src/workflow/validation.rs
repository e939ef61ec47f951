//! Local input checks run before anything is sent to the backend

use crate::{CoverError, Result};

/// Largest accepted voice sample (50 MiB)
pub const VOICE_MAX_BYTES: u64 = 50 * 1024 * 1024;

/// Largest accepted song upload (100 MiB)
pub const SONG_MAX_BYTES: u64 = 100 * 1024 * 1024;

pub const LYRICS_MIN_CHARS: usize = 20;
pub const LYRICS_MAX_CHARS: usize = 2000;

pub const ACCEPTED_MIME_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/wav",
    "audio/mp3",
    "audio/x-m4a",
    "audio/m4a",
];

pub const ACCEPTED_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a"];

pub const DEFAULT_ARTIST: &str = "Unknown Artist";

/// Suggested style prompt fragments
pub const STYLE_KEYWORDS: &[&str] = &[
    "808",
    "Auto-Tune",
    "deep bass",
    "male voice",
    "female voice",
    "reverb",
    "distortion",
    "trap",
    "R&B",
    "pop",
    "rock",
    "hip-hop",
    "electronic",
    "acoustic",
    "melodic",
    "aggressive",
    "smooth",
    "upbeat",
    "slow tempo",
    "fast tempo",
];

/// A user-selected audio file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioUpload {
    pub file_name: String,
    /// MIME type reported by the picker, if any
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl AudioUpload {
    pub fn new(file_name: impl Into<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Guess the MIME type from the file extension
    pub fn guess_mime_type(file_name: &str) -> Option<String> {
        let mime = match extension(file_name)?.to_ascii_lowercase().as_str() {
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "m4a" => "audio/x-m4a",
            _ => return None,
        };
        Some(mime.to_string())
    }
}

fn extension(file_name: &str) -> Option<&str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() || ext.contains('/') {
        return None;
    }
    Some(ext)
}

/// Check type and size of an audio upload
///
/// The type passes when either the MIME type or the file extension is
/// recognised.
pub fn validate_audio(upload: &AudioUpload, max_bytes: u64) -> Result<()> {
    let mime_ok = upload
        .mime_type
        .as_deref()
        .map(|mime| ACCEPTED_MIME_TYPES.contains(&mime))
        .unwrap_or(false);
    let ext_ok = extension(&upload.file_name)
        .map(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
        .unwrap_or(false);

    if !mime_ok && !ext_ok {
        return Err(CoverError::ValidationError(
            "Please upload an MP3, WAV, or M4A file".to_string(),
        ));
    }

    if upload.size() > max_bytes {
        return Err(CoverError::ValidationError(format!(
            "File size must be less than {}MB",
            max_bytes / (1024 * 1024)
        )));
    }

    Ok(())
}

/// File name with its last extension removed
pub fn default_title(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && !ext.contains('/') => stem.to_string(),
        _ => file_name.to_string(),
    }
}

/// Trim song details; blank title is rejected, blank artist defaulted
pub fn normalize_song_details(title: &str, artist: &str) -> Result<(String, String)> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CoverError::ValidationError(
            "Please fill in all fields".to_string(),
        ));
    }
    let artist = match artist.trim() {
        "" => DEFAULT_ARTIST,
        artist => artist,
    };
    Ok((title.to_string(), artist.to_string()))
}

/// Trim lyrics and check the length bounds (inclusive, in characters)
pub fn validate_lyrics(lyrics: &str, min_chars: usize, max_chars: usize) -> Result<String> {
    let trimmed = lyrics.trim();
    let len = trimmed.chars().count();

    if len < min_chars {
        return Err(CoverError::ValidationError(format!(
            "Please write at least {} characters (currently {})",
            min_chars, len
        )));
    }
    if len > max_chars {
        return Err(CoverError::ValidationError(format!(
            "Lyrics must be at most {} characters (currently {})",
            max_chars, len
        )));
    }
    Ok(trimmed.to_string())
}

/// A blank style prompt means no style
pub fn normalize_style_prompt(prompt: Option<&str>) -> Option<String> {
    prompt
        .filter(|p| !p.trim().is_empty())
        .map(str::to_string)
}

/// Add a suggested keyword to a style prompt
pub fn append_style_keyword(prompt: &str, keyword: &str) -> String {
    if prompt.trim().is_empty() {
        keyword.to_string()
    } else {
        format!("{} {}", prompt, keyword)
    }
}

/// Persona needs a non-blank name and a voice sample
pub fn validate_persona(name: &str, voice_sample_id: Option<&str>) -> Result<(String, String)> {
    let name = name.trim();
    match voice_sample_id.map(str::trim) {
        Some(sample) if !name.is_empty() && !sample.is_empty() => {
            Ok((name.to_string(), sample.to_string()))
        }
        _ => Err(CoverError::ValidationError(
            "Please provide a name and voice sample".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, mime: Option<&str>, size: usize) -> AudioUpload {
        AudioUpload::new(name, mime.map(str::to_string), vec![0u8; size])
    }

    #[test]
    fn test_accepts_by_mime_or_extension() {
        assert!(validate_audio(&upload("voice.bin", Some("audio/wav"), 10), VOICE_MAX_BYTES).is_ok());
        assert!(validate_audio(&upload("VOICE.M4A", None, 10), VOICE_MAX_BYTES).is_ok());
        assert!(validate_audio(&upload("clip.mp3", Some("application/octet-stream"), 10), VOICE_MAX_BYTES).is_ok());

        let err = validate_audio(&upload("notes.txt", Some("text/plain"), 10), VOICE_MAX_BYTES)
            .unwrap_err();
        assert_eq!(err.user_message(), "Please upload an MP3, WAV, or M4A file");
    }

    #[test]
    fn test_size_limit() {
        let max = 1024 * 1024;
        assert!(validate_audio(&upload("a.mp3", None, max as usize), max).is_ok());
        let err = validate_audio(&upload("a.mp3", None, max as usize + 1), max).unwrap_err();
        assert_eq!(err.user_message(), "File size must be less than 1MB");
    }

    #[test]
    fn test_default_title_strips_last_extension() {
        assert_eq!(default_title("My Song.mp3"), "My Song");
        assert_eq!(default_title("live.set.wav"), "live.set");
        assert_eq!(default_title("noext"), "noext");
    }

    #[test]
    fn test_song_details() {
        assert_eq!(
            normalize_song_details("  Title ", "   ").unwrap(),
            ("Title".to_string(), DEFAULT_ARTIST.to_string())
        );
        assert!(normalize_song_details("   ", "Artist").is_err());
    }

    #[test]
    fn test_lyrics_length_boundaries() {
        let at = |n: usize| "a".repeat(n);
        assert!(validate_lyrics(&at(19), LYRICS_MIN_CHARS, LYRICS_MAX_CHARS).is_err());
        assert!(validate_lyrics(&at(20), LYRICS_MIN_CHARS, LYRICS_MAX_CHARS).is_ok());
        assert!(validate_lyrics(&at(2000), LYRICS_MIN_CHARS, LYRICS_MAX_CHARS).is_ok());
        assert!(validate_lyrics(&at(2001), LYRICS_MIN_CHARS, LYRICS_MAX_CHARS).is_err());

        // Surrounding whitespace does not count
        let padded = format!("   {}   ", at(19));
        assert!(validate_lyrics(&padded, LYRICS_MIN_CHARS, LYRICS_MAX_CHARS).is_err());
    }

    #[test]
    fn test_style_prompt_helpers() {
        assert_eq!(normalize_style_prompt(Some("   ")), None);
        assert_eq!(normalize_style_prompt(None), None);
        assert_eq!(normalize_style_prompt(Some("trap")), Some("trap".to_string()));

        assert_eq!(append_style_keyword("", "808"), "808");
        assert_eq!(append_style_keyword("trap", "808"), "trap 808");
        assert_eq!(STYLE_KEYWORDS.len(), 20);
    }

    #[test]
    fn test_persona_requirements() {
        assert!(validate_persona("Me", Some("voice-1")).is_ok());
        assert!(validate_persona("  ", Some("voice-1")).is_err());
        assert!(validate_persona("Me", None).is_err());
    }
}
