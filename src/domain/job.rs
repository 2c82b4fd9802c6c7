use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{IdentityKey, JobId, JobStatus, SourceDescriptor, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyMode {
    #[default]
    Standard,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Srt,
    Vtt,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Srt => "srt",
            OutputFormat::Vtt => "vtt",
            OutputFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text/plain; charset=utf-8",
            OutputFormat::Srt => "application/x-subrip",
            OutputFormat::Vtt => "text/vtt",
            OutputFormat::Json => "application/json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" | "text" => Ok(OutputFormat::Text),
            "srt" => Ok(OutputFormat::Srt),
            "vtt" => Ok(OutputFormat::Vtt),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Invalid output format: {}", other)),
        }
    }
}

/// Job type used for queue weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Preview,
    Standard,
    HighAccuracy,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Preview => "preview",
            JobKind::Standard => "standard",
            JobKind::HighAccuracy => "high_accuracy",
        }
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preview" => Ok(JobKind::Preview),
            "standard" => Ok(JobKind::Standard),
            "high_accuracy" => Ok(JobKind::HighAccuracy),
            other => Err(format!("Invalid job kind: {}", other)),
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,
    #[serde(default)]
    pub accuracy: AccuracyMode,
    /// Truncate the audio to this many seconds before transcription.
    #[serde(default)]
    pub max_seconds: Option<u32>,
    #[serde(default)]
    pub offset_seconds: u32,
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Text, OutputFormat::Json]
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            language: None,
            formats: default_formats(),
            accuracy: AccuracyMode::Standard,
            max_seconds: None,
            offset_seconds: 0,
        }
    }
}

impl JobOptions {
    pub fn kind(&self) -> JobKind {
        if self.max_seconds.is_some() {
            JobKind::Preview
        } else if self.accuracy == AccuracyMode::High {
            JobKind::HighAccuracy
        } else {
            JobKind::Standard
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub owner: IdentityKey,
    pub tier: Tier,
    pub source: SourceDescriptor,
    pub options: JobOptions,
    pub priority: i64,
    pub requested_minutes: f64,
    pub status: JobStatus,
    pub provider_id: Option<String>,
    pub warning: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(
        owner: IdentityKey,
        tier: Tier,
        source: SourceDescriptor,
        options: JobOptions,
        requested_minutes: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            owner,
            tier,
            source,
            options,
            priority: 0,
            requested_minutes,
            status: JobStatus::Submitted,
            provider_id: None,
            warning: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> JobKind {
        self.options.kind()
    }
}
