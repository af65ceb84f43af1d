use std::sync::Arc;
use std::time::Duration;

use crate::error::AgemorphError;
use crate::inference::InferenceProvider;
use crate::state_machine::{
    AttemptGuard, JobHandle, JobStatusSnapshot, OutcomeStatus, StateMachine, Transition,
};

/// How polling of one job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollResult {
    /// The job failed and the retry budget allows resubmission number `retry`.
    Resubmit { retry: u32 },
    /// The chain is finished; `snapshot` is the final poll.
    Complete {
        outcome: OutcomeStatus,
        snapshot: JobStatusSnapshot,
    },
}

/// Polls one job until the state machine leaves `Continue`.
///
/// Queries never overlap: the next one is issued only after the previous
/// one resolved and the poll interval elapsed. Transport and parse errors
/// are retried on the same interval without spending the retry budget.
pub struct StatusPoller<P> {
    provider: Arc<P>,
    interval: Duration,
    max_retries: u32,
}

impl<P: InferenceProvider> StatusPoller<P> {
    pub fn new(provider: Arc<P>, interval: Duration, max_retries: u32) -> Self {
        Self {
            provider,
            interval,
            max_retries,
        }
    }

    /// One status query.
    pub async fn poll_once(&self, job: &JobHandle) -> Result<JobStatusSnapshot, AgemorphError> {
        let resp = self
            .provider
            .get_job(job.as_str())
            .await
            .map_err(|source| AgemorphError::Transport {
                job_id: job.to_string(),
                source,
            })?;
        Ok(JobStatusSnapshot::from_response(job, resp))
    }

    /// Poll `job` until it reaches a terminal status.
    ///
    /// Returns `Cancelled` as soon as the attempt is superseded.
    pub async fn run(&self, job: &JobHandle, guard: &AttemptGuard) -> Result<PollResult, AgemorphError> {
        let mut polls: u64 = 0;
        loop {
            polls += 1;
            match self.poll_once(job).await {
                Err(err) => {
                    guard.ensure_current()?;
                    tracing::warn!(attempt = guard.id(), job_id = %job, polls, error = %err, "Poll failed, retrying");
                }
                Ok(snapshot) => {
                    let transition =
                        guard.apply(|wf| StateMachine::next(wf, &snapshot, self.max_retries))?;
                    match transition {
                        Transition::Continue => {
                            tracing::debug!(attempt = guard.id(), job_id = %job, polls, status = %snapshot.status, "Job still running");
                        }
                        Transition::Resubmit { retry } => {
                            tracing::info!(attempt = guard.id(), job_id = %job, polls, "Job failed");
                            return Ok(PollResult::Resubmit { retry });
                        }
                        Transition::Complete(outcome) => {
                            tracing::info!(attempt = guard.id(), job_id = %job, polls, %outcome, "Job finished");
                            return Ok(PollResult::Complete { outcome, snapshot });
                        }
                    }
                }
            }
            guard.pause(self.interval).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{SharedWorkflow, Workflow, WorkflowState};
    use crate::test_utils::{ScriptedProvider, Step};

    const INTERVAL: Duration = Duration::from_millis(1000);

    fn polling(shared: &SharedWorkflow) -> AttemptGuard {
        let guard = shared.begin().unwrap();
        guard
            .apply(|wf: &mut Workflow| wf.transition(WorkflowState::Polling))
            .unwrap();
        guard
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_success() {
        let provider = Arc::new(ScriptedProvider::new().with_polls([
            Step::status("starting"),
            Step::status("processing"),
            Step::succeeded("\"https://cdn/out.gif\""),
        ]));
        let poller = StatusPoller::new(provider.clone(), INTERVAL, 3);
        let shared = SharedWorkflow::new();
        let guard = polling(&shared);

        let result = poller.run(&JobHandle::new("job-1"), &guard).await.unwrap();
        match result {
            PollResult::Complete { outcome, snapshot } => {
                assert_eq!(outcome, OutcomeStatus::Succeeded);
                assert_eq!(snapshot.artifact_url().as_deref(), Some("https://cdn/out.gif"));
            }
            other => panic!("expected Complete, got {other:?}"),
        }
        assert_eq!(provider.get_calls(), 3);
        assert_eq!(shared.state(), WorkflowState::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_are_spaced_by_interval() {
        let provider = Arc::new(ScriptedProvider::new().with_polls([
            Step::status("processing"),
            Step::status("processing"),
            Step::succeeded("\"u\""),
        ]));
        let poller = StatusPoller::new(provider, INTERVAL, 3);
        let shared = SharedWorkflow::new();
        let guard = polling(&shared);

        let started = tokio::time::Instant::now();
        poller.run(&JobHandle::new("job-1"), &guard).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= INTERVAL * 2 && elapsed < INTERVAL * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_keep_polling_state_and_budget() {
        let provider = Arc::new(ScriptedProvider::new().with_polls([
            Step::transport_error(),
            Step::transport_error(),
            Step::transport_error(),
            Step::status("processing"),
            Step::succeeded("\"u\""),
        ]));
        let poller = StatusPoller::new(provider.clone(), INTERVAL, 3);
        let shared = SharedWorkflow::new();
        let guard = polling(&shared);

        let result = poller.run(&JobHandle::new("job-1"), &guard).await.unwrap();
        assert!(matches!(
            result,
            PollResult::Complete { outcome: OutcomeStatus::Succeeded, .. }
        ));
        assert_eq!(provider.get_calls(), 5);
        shared.inspect(|wf| {
            assert_eq!(wf.retry_count, 0);
            assert_eq!(
                wf.state_history,
                vec![WorkflowState::Idle, WorkflowState::Polling]
            );
        });
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_asks_for_resubmission() {
        let provider = Arc::new(ScriptedProvider::new().with_polls([Step::status("failed")]));
        let poller = StatusPoller::new(provider, INTERVAL, 3);
        let shared = SharedWorkflow::new();
        let guard = polling(&shared);

        let result = poller.run(&JobHandle::new("job-1"), &guard).await.unwrap();
        assert_eq!(result, PollResult::Resubmit { retry: 1 });
        assert_eq!(shared.state(), WorkflowState::Submitting);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_stops_polling() {
        let provider = Arc::new(ScriptedProvider::new());
        let poller = StatusPoller::new(provider.clone(), INTERVAL, 3);
        let shared = SharedWorkflow::new();
        let guard = polling(&shared);

        let resetter = shared.clone();
        tokio::spawn(async move {
            tokio::time::sleep(INTERVAL * 3 + INTERVAL / 2).await;
            resetter.reset();
        });

        let err = poller.run(&JobHandle::new("job-1"), &guard).await.unwrap_err();
        assert!(matches!(err, AgemorphError::Cancelled));
        assert_eq!(provider.get_calls(), 4);
        assert_eq!(shared.state(), WorkflowState::Idle);
    }
}
