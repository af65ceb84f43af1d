use std::sync::Arc;

use tokio::sync::watch;

use crate::asset::{AssetHost, UploadGate};
use crate::error::AgemorphError;
use crate::finalizer::OutcomeFinalizer;
use crate::inference::InferenceProvider;
use crate::poller::{PollResult, StatusPoller};
use crate::state_machine::{
    AttemptGuard, OutcomeRecord, SharedWorkflow, SubmissionSettings, TargetAge, WorkflowConfig,
    WorkflowState,
};
use crate::store::OutcomeStore;
use crate::submitter::JobSubmitter;

/// Drives one workflow instance: upload, submit, poll, retry, finalize.
///
/// Holds the only mutable [`Workflow`](crate::state_machine::Workflow). At
/// most one attempt runs at a time; `reset()` may be called from another
/// task and makes any pending continuation of the old attempt a no-op.
pub struct Orchestrator<H, P, S> {
    host: Arc<H>,
    provider: Arc<P>,
    gate: UploadGate<H>,
    submitter: JobSubmitter<P>,
    poller: StatusPoller<P>,
    finalizer: OutcomeFinalizer<S, H>,
    config: WorkflowConfig,
    workflow: SharedWorkflow,
}

impl<H, P, S> Orchestrator<H, P, S>
where
    H: AssetHost,
    P: InferenceProvider,
    S: OutcomeStore,
{
    pub fn new(host: Arc<H>, provider: Arc<P>, store: Arc<S>, config: WorkflowConfig) -> Self {
        Self {
            gate: UploadGate::new(host.clone()),
            submitter: JobSubmitter::new(provider.clone(), None, config.max_target_age),
            poller: StatusPoller::new(provider.clone(), config.poll_interval, config.max_retries),
            finalizer: OutcomeFinalizer::new(store),
            host,
            provider,
            config,
            workflow: SharedWorkflow::new(),
        }
    }

    /// Pin every submitted job to a model version.
    pub fn with_model_version(mut self, version: Option<String>) -> Self {
        self.submitter = JobSubmitter::new(self.provider.clone(), version, self.config.max_target_age);
        self
    }

    /// Re-host successful artifacts on the asset host before recording them.
    pub fn with_output_archive(mut self) -> Self {
        self.finalizer = self.finalizer.with_archive(self.host.clone());
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.workflow.subscribe()
    }

    pub fn state(&self) -> WorkflowState {
        self.workflow.state()
    }

    pub fn workflow(&self) -> &SharedWorkflow {
        &self.workflow
    }

    /// Return to `Idle`, keeping the hosted image for the next attempt.
    pub fn reset(&self) {
        tracing::info!("Workflow reset");
        self.workflow.reset();
    }

    /// Return to `Idle` and forget the hosted image.
    pub fn remove_image(&self) {
        tracing::info!("Image removed");
        self.workflow.reset();
        self.gate.forget();
    }

    /// Run one user-triggered chain to completion.
    ///
    /// Returns the persisted [`OutcomeRecord`] for success or exhausted
    /// retries. Validation errors leave the state untouched; upload and
    /// submission failures move it to `Error`. `Cancelled` means a reset
    /// superseded this attempt.
    pub async fn start_attempt(
        &self,
        source_ref: &str,
        target_age: TargetAge,
    ) -> Result<OutcomeRecord, AgemorphError> {
        if source_ref.trim().is_empty() {
            return Err(AgemorphError::Validation("No image URL provided".to_string()));
        }
        let settings = SubmissionSettings::new(target_age);
        settings.validate_target(self.config.max_target_age)?;

        let guard = self.workflow.begin()?;
        tracing::info!(attempt = guard.id(), %target_age, "Starting attempt");

        match self.run_chain(&guard, source_ref, settings).await {
            Ok(record) => Ok(record),
            Err(AgemorphError::Cancelled) => {
                tracing::info!(attempt = guard.id(), "Attempt cancelled");
                Err(AgemorphError::Cancelled)
            }
            Err(err) => {
                tracing::error!(attempt = guard.id(), error = %err, "Attempt failed");
                guard.apply(|wf| wf.transition(WorkflowState::Error))?;
                Err(err)
            }
        }
    }

    async fn run_chain(
        &self,
        guard: &AttemptGuard,
        source_ref: &str,
        settings: SubmissionSettings,
    ) -> Result<OutcomeRecord, AgemorphError> {
        if self.gate.cached_url(source_ref).is_none() {
            guard.apply(|wf| wf.transition(WorkflowState::UploadingAsset))?;
        }
        let asset = self.gate.ensure_hosted(source_ref).await?;
        guard.ensure_current()?;
        if asset.uploaded && !self.config.upload_settle.is_zero() {
            guard.pause(self.config.upload_settle).await?;
        }

        let settings = settings.with_asset_url(asset.url);
        guard.apply(|wf| {
            wf.settings = Some(settings.clone());
            wf.transition(WorkflowState::Submitting);
        })?;

        loop {
            let job = self.submitter.submit(&settings).await?;
            let reused = guard.apply(|wf| {
                if wf.jobs.contains(&job) {
                    return true;
                }
                wf.jobs.push(job.clone());
                wf.transition(WorkflowState::Polling);
                false
            })?;
            if reused {
                return Err(AgemorphError::SubmissionFailed(format!(
                    "provider reissued job ID {job}"
                )));
            }

            match self.poller.run(&job, guard).await? {
                PollResult::Resubmit { retry } => {
                    let reason = AgemorphError::JobFailed {
                        job_id: job.to_string(),
                    };
                    tracing::warn!(
                        attempt = guard.id(),
                        retry,
                        max_retries = self.config.max_retries,
                        delay_ms = self.config.retry_delay.as_millis() as u64,
                        error = %reason,
                        "Resubmitting job"
                    );
                    guard.pause(self.config.retry_delay).await?;
                }
                PollResult::Complete { outcome, snapshot } => {
                    let retries = guard.apply(|wf| {
                        wf.last_snapshot = None;
                        wf.retry_count
                    })?;
                    return Ok(self
                        .finalizer
                        .finalize(&snapshot, outcome, &settings, retries)
                        .await);
                }
            }
        }
    }
}
