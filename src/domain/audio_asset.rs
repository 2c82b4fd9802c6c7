use chrono::{DateTime, Utc};

use super::{JobId, StoragePath};

/// A fetchable audio resource resolved for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioAsset {
    pub job_id: JobId,
    pub path: StoragePath,
    /// The caller-supplied reference this asset was resolved from.
    pub source_reference: String,
    pub url: String,
    pub content_type: String,
    pub duration_seconds: Option<f64>,
    pub clipped: bool,
    /// Job-owned assets are intermediates the pipeline may delete; a
    /// caller's uploaded file is never owned.
    pub owned: bool,
    pub expires_at: DateTime<Utc>,
}

impl AudioAsset {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn extension(&self) -> &str {
        self.path
            .as_str()
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or("bin")
    }
}

/// Best-effort content type for a file extension.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" | "aac" => "audio/mp4",
        "mp4" => "video/mp4",
        "webm" => "audio/webm",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

pub fn extension_for_content_type(content_type: &str) -> &'static str {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    match mime.as_str() {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mp4" | "audio/x-m4a" | "audio/aac" => "m4a",
        "video/mp4" => "mp4",
        "audio/webm" | "video/webm" => "webm",
        "audio/ogg" | "application/ogg" => "ogg",
        "audio/flac" | "audio/x-flac" => "flac",
        _ => "bin",
    }
}
