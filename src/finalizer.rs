use std::sync::Arc;

use crate::asset::{AssetCategory, AssetHost};
use crate::error::AgemorphError;
use crate::state_machine::{JobStatusSnapshot, OutcomeRecord, OutcomeStatus, SubmissionSettings};
use crate::store::OutcomeStore;

/// Builds and persists the single outcome record of a finished chain.
///
/// Persistence is best effort: a store failure is logged and the record is
/// still returned, so the caller's terminal state is never affected.
pub struct OutcomeFinalizer<S, H> {
    store: Arc<S>,
    archive: Option<Arc<H>>,
}

impl<S: OutcomeStore, H: AssetHost> OutcomeFinalizer<S, H> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            archive: None,
        }
    }

    /// Re-host successful artifacts under the processed category.
    pub fn with_archive(mut self, host: Arc<H>) -> Self {
        self.archive = Some(host);
        self
    }

    pub async fn finalize(
        &self,
        snapshot: &JobStatusSnapshot,
        outcome: OutcomeStatus,
        settings: &SubmissionSettings,
        retries: u32,
    ) -> OutcomeRecord {
        let output_url = match outcome {
            OutcomeStatus::Succeeded => match snapshot.artifact_url() {
                Some(url) => Some(self.archive_artifact(url).await),
                None => {
                    tracing::warn!(job_id = %snapshot.job, "Job succeeded without a usable artifact");
                    None
                }
            },
            OutcomeStatus::Failed => {
                let err = AgemorphError::RetriesExhausted { retries };
                tracing::warn!(job_id = %snapshot.job, error = %err, provider_error = ?snapshot.error, "Giving up on chain");
                None
            }
        };

        let record = OutcomeRecord::new(outcome, snapshot, settings, output_url, retries);
        match self.store.save_outcome(&record).await {
            Ok(()) => tracing::info!(record_id = %record.id, status = %record.status, "Outcome recorded"),
            Err(e) => tracing::error!(record_id = %record.id, error = %e, "Failed to persist outcome"),
        }
        record
    }

    async fn archive_artifact(&self, url: String) -> String {
        let Some(host) = &self.archive else {
            return url;
        };
        match host.upload(&url, AssetCategory::Processed).await {
            Ok(hosted) => {
                tracing::debug!(from = %url, to = %hosted.url, "Artifact archived");
                hosted.url
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "Could not archive artifact, keeping provider URL");
                url
            }
        }
    }
}
