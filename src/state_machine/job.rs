use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AgemorphError;
use crate::inference::JobResponse;

/// Requested output age, or the provider's own default (an age sweep).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TargetAge {
    #[default]
    ProviderDefault,
    Years(u32),
}

impl fmt::Display for TargetAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAge::ProviderDefault => write!(f, "default"),
            TargetAge::Years(age) => write!(f, "{age}"),
        }
    }
}

impl FromStr for TargetAge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("default") {
            return Ok(TargetAge::ProviderDefault);
        }
        trimmed
            .parse::<u32>()
            .map(TargetAge::Years)
            .map_err(|_| format!("target age must be a non-negative number or \"default\", got {s:?}"))
    }
}

impl From<TargetAge> for String {
    fn from(age: TargetAge) -> Self {
        age.to_string()
    }
}

impl TryFrom<String> for TargetAge {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Parameters sent to the inference provider for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionSettings {
    /// Durable URL of the source image; set once the upload gate has run.
    pub asset_url: Option<String>,
    pub target_age: TargetAge,
}

impl SubmissionSettings {
    pub fn new(target_age: TargetAge) -> Self {
        Self {
            asset_url: None,
            target_age,
        }
    }

    pub fn with_asset_url(mut self, url: impl Into<String>) -> Self {
        self.asset_url = Some(url.into());
        self
    }

    /// Rejects a numeric target at or above `max_target_age`.
    pub fn validate_target(&self, max_target_age: u32) -> Result<(), AgemorphError> {
        match self.target_age {
            TargetAge::Years(age) if age >= max_target_age => Err(AgemorphError::Validation(
                format!("Please keep target age below {max_target_age} to avoid distortion"),
            )),
            _ => Ok(()),
        }
    }

    /// Full pre-flight check done before any job is requested.
    pub fn validate(&self, max_target_age: u32) -> Result<&str, AgemorphError> {
        let url = self
            .asset_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| AgemorphError::Validation("No image URL provided".to_string()))?;
        self.validate_target(max_target_age)?;
        Ok(url)
    }
}

/// Provider-issued identifier of one job attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status tag reported by the provider for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    /// Anything else the provider reports; treated as still running.
    Other(String),
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "starting" => JobStatus::Starting,
            "processing" => JobStatus::Processing,
            "succeeded" => JobStatus::Succeeded,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Other(raw.to_string()),
        }
    }

    /// Only an explicit success or failure ends polling.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Starting => write!(f, "starting"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Result of a single status poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusSnapshot {
    pub job: JobHandle,
    pub status: JobStatus,
    /// Artifact locator as the provider sent it; arrays are kept as JSON text.
    pub output: Option<String>,
    pub error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub predict_time: Option<f64>,
}

impl JobStatusSnapshot {
    pub fn from_response(job: &JobHandle, resp: JobResponse) -> Self {
        let output = resp.output.and_then(|value| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });
        Self {
            job: job.clone(),
            status: JobStatus::parse(&resp.status),
            output,
            error: resp.error,
            created_at: resp.created_at,
            completed_at: resp.completed_at,
            predict_time: resp.metrics.and_then(|m| m.predict_time),
        }
    }

    /// Resolves the locator into the artifact URL.
    ///
    /// The provider sends either a plain URL, a list of URLs (the first one
    /// wins), or a JSON-encoded string that needs one decode step. A locator
    /// that resolves to nothing yields `None`; the job still counts as
    /// succeeded.
    pub fn artifact_url(&self) -> Option<String> {
        let raw = self.output.as_deref()?.trim();
        let url = match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::String(url)) => Some(url),
            Ok(serde_json::Value::Array(items)) => items
                .into_iter()
                .find_map(|item| item.as_str().map(str::to_string)),
            Ok(_) => None,
            Err(_) if reqwest::Url::parse(raw).is_ok() => Some(raw.to_string()),
            Err(e) => {
                tracing::warn!(job_id = %self.job, error = %e, "Could not decode artifact locator");
                None
            }
        };
        url.filter(|u| !u.trim().is_empty())
    }
}

/// Final status of a finished chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Succeeded => write!(f, "succeeded"),
            OutcomeStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Durable record of one finished chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub id: String,
    pub status: OutcomeStatus,
    pub input_url: String,
    pub output_url: Option<String>,
    pub target_age: TargetAge,
    pub job_id: String,
    pub retries: u32,
    pub error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub predict_time: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl OutcomeRecord {
    pub fn new(
        status: OutcomeStatus,
        snapshot: &JobStatusSnapshot,
        settings: &SubmissionSettings,
        output_url: Option<String>,
        retries: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status,
            input_url: settings.asset_url.clone().unwrap_or_default(),
            output_url,
            target_age: settings.target_age,
            job_id: snapshot.job.to_string(),
            retries,
            error: snapshot.error.clone(),
            created_at: snapshot.created_at,
            completed_at: snapshot.completed_at,
            predict_time: snapshot.predict_time,
            recorded_at: Utc::now(),
        }
    }
}

/// Timing and bounds consumed by the workflow core.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Delay between status queries, and after a transport error.
    pub poll_interval: Duration,
    /// Delay before resubmitting a failed job.
    pub retry_delay: Duration,
    /// Automatic resubmissions allowed per chain.
    pub max_retries: u32,
    /// Exclusive upper bound for a numeric target age.
    pub max_target_age: u32,
    /// Wait after a fresh upload before the first submission.
    pub upload_settle: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(3000),
            retry_delay: Duration::from_millis(5000),
            max_retries: 3,
            max_target_age: 300,
            upload_settle: Duration::from_millis(2000),
        }
    }
}
