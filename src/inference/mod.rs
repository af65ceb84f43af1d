//! Inference provider seam: job creation and status lookup.

pub mod client;
pub mod error;
pub mod types;

use std::future::Future;

pub use client::InferenceClient;
pub use error::ProviderError;
pub use types::{CreateJobRequest, JobCreated, JobInput, JobMetrics, JobResponse};

/// Remote service that runs inference jobs asynchronously.
///
/// `create_job` starts a new job and returns its identifier; `get_job`
/// reports the job's current status independently of creation.
pub trait InferenceProvider: Send + Sync {
    fn create_job(
        &self,
        req: &CreateJobRequest,
    ) -> impl Future<Output = Result<JobCreated, ProviderError>> + Send;

    fn get_job(&self, id: &str) -> impl Future<Output = Result<JobResponse, ProviderError>> + Send;
}
