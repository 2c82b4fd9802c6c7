use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Submitted,
    Queued,
    Downloading,
    Transcribing,
    Refining,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::Queued => "QUEUED",
            JobStatus::Downloading => "DOWNLOADING",
            JobStatus::Transcribing => "TRANSCRIBING",
            JobStatus::Refining => "REFINING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// The single forward edge out of this state, if any.
    pub fn next(&self) -> Option<JobStatus> {
        match self {
            JobStatus::Submitted => Some(JobStatus::Queued),
            JobStatus::Queued => Some(JobStatus::Downloading),
            JobStatus::Downloading => Some(JobStatus::Transcribing),
            JobStatus::Transcribing => Some(JobStatus::Refining),
            JobStatus::Refining => Some(JobStatus::Completed),
            JobStatus::Completed | JobStatus::Failed => None,
        }
    }

    /// Allowed edges: one step forward along the pipeline, or to `Failed`
    /// from any non-terminal state.
    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == JobStatus::Failed || self.next() == Some(target)
    }

    pub fn public(&self) -> PublicStatus {
        match self {
            JobStatus::Submitted | JobStatus::Queued => PublicStatus::Pending,
            JobStatus::Downloading | JobStatus::Transcribing | JobStatus::Refining => {
                PublicStatus::Processing
            }
            JobStatus::Completed => PublicStatus::Completed,
            JobStatus::Failed => PublicStatus::Failed,
        }
    }

    /// Coarse progress percentage reported to pollers.
    pub fn progress(&self) -> u8 {
        match self {
            JobStatus::Submitted => 0,
            JobStatus::Queued => 5,
            JobStatus::Downloading => 20,
            JobStatus::Transcribing => 50,
            JobStatus::Refining => 85,
            JobStatus::Completed => 100,
            JobStatus::Failed => 100,
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBMITTED" => Ok(JobStatus::Submitted),
            "QUEUED" => Ok(JobStatus::Queued),
            "DOWNLOADING" => Ok(JobStatus::Downloading),
            "TRANSCRIBING" => Ok(JobStatus::Transcribing),
            "REFINING" => Ok(JobStatus::Refining),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Caller-facing status vocabulary. Internal states collapse into these so
/// clients never depend on pipeline details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PublicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicStatus::Pending => "pending",
            PublicStatus::Processing => "processing",
            PublicStatus::Completed => "completed",
            PublicStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PublicStatus::Completed | PublicStatus::Failed)
    }
}

impl fmt::Display for PublicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
