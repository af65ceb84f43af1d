use thiserror::Error;

use crate::asset::AssetError;
use crate::inference::ProviderError;

/// Failure taxonomy of a transformation chain.
///
/// Only `Validation`, `UploadFailed`, `SubmissionFailed`, `Busy` and
/// `Cancelled` ever leave [`Orchestrator::start_attempt`](crate::orchestrator::Orchestrator::start_attempt)
/// as errors. `Transport` and `JobFailed` are absorbed by the poll loop and
/// the retry controller; `RetriesExhausted` is recorded as a failed outcome.
#[derive(Debug, Error)]
pub enum AgemorphError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Asset upload failed: {0}")]
    UploadFailed(#[from] AssetError),

    #[error("Job submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Transport error while polling job {job_id}: {source}")]
    Transport {
        job_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("Job {job_id} failed")]
    JobFailed { job_id: String },

    #[error("Job failed after {retries} resubmissions")]
    RetriesExhausted { retries: u32 },

    #[error("An attempt is already in progress")]
    Busy,

    #[error("Attempt was cancelled by a reset")]
    Cancelled,
}

impl AgemorphError {
    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            AgemorphError::Validation(msg) => msg.clone(),
            AgemorphError::UploadFailed(_) => {
                "Could not upload the image. Please try again.".to_string()
            }
            AgemorphError::SubmissionFailed(_) => {
                "Could not start the transformation. Please try again.".to_string()
            }
            AgemorphError::Busy => "A transformation is already running.".to_string(),
            AgemorphError::Cancelled => "The transformation was cancelled.".to_string(),
            other => other.to_string(),
        }
    }
}
