use std::fmt;

use super::JobId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoragePath(String);

impl StoragePath {
    pub fn upload(upload_id: uuid::Uuid, filename: &str) -> Self {
        Self(format!("uploads/{}/{}", upload_id, sanitize_filename(filename)))
    }

    pub fn job_audio(job_id: &JobId, name: &str) -> Self {
        Self(format!("audio/{}/{}", job_id.as_uuid(), name))
    }

    pub fn transcript(job_id: &JobId, extension: &str) -> Self {
        Self(format!("transcripts/{}.{}", job_id.as_uuid(), extension))
    }

    pub fn from_raw(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
