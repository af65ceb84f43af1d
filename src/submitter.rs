use std::sync::Arc;

use crate::error::AgemorphError;
use crate::inference::{CreateJobRequest, InferenceProvider, JobInput};
use crate::state_machine::{JobHandle, SubmissionSettings};

/// Validates settings and asks the provider for a new job.
pub struct JobSubmitter<P> {
    provider: Arc<P>,
    model_version: Option<String>,
    max_target_age: u32,
}

impl<P: InferenceProvider> JobSubmitter<P> {
    pub fn new(provider: Arc<P>, model_version: Option<String>, max_target_age: u32) -> Self {
        Self {
            provider,
            model_version,
            max_target_age,
        }
    }

    /// Submit one job. Invalid settings are rejected before any request is made.
    pub async fn submit(&self, settings: &SubmissionSettings) -> Result<JobHandle, AgemorphError> {
        let image = settings.validate(self.max_target_age)?;
        let req = CreateJobRequest {
            version: self.model_version.clone(),
            input: JobInput {
                image: image.to_string(),
                target_age: settings.target_age,
            },
        };

        let created = self
            .provider
            .create_job(&req)
            .await
            .map_err(|e| AgemorphError::SubmissionFailed(e.to_string()))?;

        if created.id.trim().is_empty() {
            return Err(AgemorphError::SubmissionFailed(
                "Invalid response: missing job ID".to_string(),
            ));
        }

        tracing::info!(job_id = %created.id, target_age = %settings.target_age, "Job submitted");
        Ok(JobHandle::new(created.id))
    }
}
