//! Wire types for the inference provider's prediction endpoints.
//!
//! Job creation posts a [`CreateJobRequest`] and receives a [`JobCreated`];
//! status lookups return a [`JobResponse`]. Unknown response fields are
//! ignored so provider additions do not break polling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state_machine::TargetAge;

/// Body of `POST /predictions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
    /// Model version to run. Omitted when the endpoint is already bound to a model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub input: JobInput,
}

/// Model input for an age-transformation job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInput {
    /// Durable URL of the source image.
    pub image: String,
    /// Sent as `"default"` or a decimal number string.
    pub target_age: TargetAge,
}

/// Response to a job creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreated {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response of `GET /predictions/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    #[serde(default)]
    pub id: String,
    pub status: String,
    /// Serialized locator of the produced artifact, present once the job succeeded.
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics: Option<JobMetrics>,
}

/// Timing information reported by the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobMetrics {
    #[serde(default)]
    pub predict_time: Option<f64>,
}
