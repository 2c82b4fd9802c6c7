use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    StoredFile,
    RemoteUrl,
    Platform,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::StoredFile => "stored_file",
            SourceKind::RemoteUrl => "remote_url",
            SourceKind::Platform => "platform",
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stored_file" => Ok(SourceKind::StoredFile),
            "remote_url" => Ok(SourceKind::RemoteUrl),
            "platform" => Ok(SourceKind::Platform),
            other => Err(format!("Invalid source kind: {}", other)),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the media comes from: a blob store path, an http(s) URL, or an
/// opaque hosted-platform reference such as a video page URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    pub reference: String,
}

impl SourceDescriptor {
    pub fn new(kind: SourceKind, reference: impl Into<String>) -> Self {
        Self {
            kind,
            reference: reference.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let reference = self.reference.trim();
        if reference.is_empty() {
            return Err("source reference is empty".to_string());
        }
        match self.kind {
            SourceKind::RemoteUrl | SourceKind::Platform
                if !(reference.starts_with("http://") || reference.starts_with("https://")) =>
            {
                Err(format!("source reference is not an http(s) URL: {}", reference))
            }
            SourceKind::StoredFile if reference.contains("..") => {
                Err(format!("invalid stored file reference: {}", reference))
            }
            _ => Ok(()),
        }
    }
}
