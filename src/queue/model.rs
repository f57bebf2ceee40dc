//! The job record (§3): one row per submitted dubbing job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::JobInput;

pub const JOB_NAME: &str = "process-video";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "active" => JobState::Active,
            "completed" => JobState::Completed,
            "failed" => JobState::Failed,
            _ => JobState::Queued,
        }
    }
}

/// What `/upload` accepts, serialized into the `jobs.data` column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobData {
    pub source_path: String,
    pub original_filename: String,
    pub merge_mode: Option<String>,
    pub burn_subtitles: Option<bool>,
    pub enhance: Option<bool>,
}

impl JobData {
    pub fn into_input(self) -> JobInput {
        JobInput {
            source_path: self.source_path.into(),
            original_filename: self.original_filename,
            merge_mode: self.merge_mode.map(|m| m.parse().unwrap_or_default()),
            burn_subtitles: self.burn_subtitles,
            enhance: self.enhance,
        }
    }
}

/// Artifact paths a finished job reports back (§3 `result`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobResultData {
    pub audio: Option<String>,
    pub enhanced_audio: Option<String>,
    pub transcript: Option<String>,
    pub translated: Option<String>,
    pub tts: Option<String>,
    pub dubbed: Option<String>,
}

impl From<crate::pipeline::JobResult> for JobResultData {
    fn from(r: crate::pipeline::JobResult) -> Self {
        let path_str = |p: Option<std::path::PathBuf>| p.map(|p| p.display().to_string());
        Self {
            audio: path_str(r.audio),
            enhanced_audio: path_str(r.enhanced_audio),
            transcript: path_str(r.transcript),
            translated: path_str(r.translated),
            tts: path_str(r.tts),
            dubbed: path_str(r.dubbed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    pub data: JobData,
    pub state: JobState,
    pub progress: u8,
    pub result: Option<JobResultData>,
    pub failure: Option<String>,
    pub created_at: DateTime<Utc>,
}
