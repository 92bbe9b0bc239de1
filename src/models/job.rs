use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::vulnerability::Vulnerability;

/// Pipeline stages in the order the analysis API walks through them.
pub const PIPELINE_STAGES: [JobStatus; 6] = [
    JobStatus::Initializing,
    JobStatus::Fetching,
    JobStatus::Scanning,
    JobStatus::Processing,
    JobStatus::AiAnalysis,
    JobStatus::Completed,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Initializing,
    Fetching,
    Scanning,
    Processing,
    AiAnalysis,
    Completed,
    Error,
    /// Any status string the API sends that is not part of the known
    /// pipeline. Always non-terminal.
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Initializing => "initializing",
            JobStatus::Fetching => "fetching",
            JobStatus::Scanning => "scanning",
            JobStatus::Processing => "processing",
            JobStatus::AiAnalysis => "ai_analysis",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Other(raw) => raw,
        }
    }

    /// `completed` and `error` end a polling session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Position in [`PIPELINE_STAGES`], or `None` for `error` and
    /// unrecognised statuses.
    pub fn stage_index(&self) -> Option<usize> {
        PIPELINE_STAGES.iter().position(|stage| stage == self)
    }

    /// True when `self` sits strictly earlier in the pipeline than
    /// `previous`. Statuses outside the pipeline never count as a
    /// regression.
    pub fn regressed_from(&self, previous: &JobStatus) -> bool {
        match (self.stage_index(), previous.stage_index()) {
            (Some(current), Some(prev)) => current < prev,
            _ => false,
        }
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "initializing" => JobStatus::Initializing,
            "fetching" => JobStatus::Fetching,
            "scanning" => JobStatus::Scanning,
            "processing" => JobStatus::Processing,
            "ai_analysis" => JobStatus::AiAnalysis,
            "completed" => JobStatus::Completed,
            "error" => JobStatus::Error,
            _ => JobStatus::Other(raw),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A read-only view of an analysis job as returned by `GET /api/status/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    #[serde(default, deserialize_with = "percent")]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "count")]
    pub total_files: u32,
    #[serde(default, deserialize_with = "count")]
    pub files_analyzed: u32,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub vulnerabilities: Vec<Vulnerability>,
}

impl JobSnapshot {
    pub fn new(status: JobStatus, progress: u8) -> Self {
        Self {
            status,
            progress: progress.min(100),
            message: None,
            total_files: 0,
            files_analyzed: 0,
            vulnerabilities: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The message, if the API sent a non-blank one.
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

fn percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 100.0).round() as u8)
        .unwrap_or(0))
}

fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<u64>::deserialize(deserializer)?;
    Ok(value.map(|v| v.min(u32::MAX as u64) as u32).unwrap_or(0))
}
