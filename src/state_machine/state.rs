use std::fmt;

use serde::{Deserialize, Serialize};

use super::job::{JobStatus, JobStatusSnapshot, OutcomeStatus};
use super::workflow::Workflow;

/// Lifecycle of one user-triggered attempt.
///
/// IDLE → UPLOADING_ASSET → SUBMITTING → POLLING → SUCCEEDED | FAILED,
/// with POLLING → SUBMITTING on a retried job failure and ERROR for
/// upload or submission failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorkflowState {
    #[default]
    Idle,
    UploadingAsset,
    Submitting,
    Polling,
    Succeeded,
    Failed,
    Error,
}

impl WorkflowState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowState::Succeeded | WorkflowState::Failed | WorkflowState::Error
        )
    }

    /// A new attempt may only start from `Idle` or a terminal state.
    pub fn accepts_new_attempt(self) -> bool {
        self == WorkflowState::Idle || self.is_terminal()
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Idle => write!(f, "IDLE"),
            WorkflowState::UploadingAsset => write!(f, "UPLOADING_ASSET"),
            WorkflowState::Submitting => write!(f, "SUBMITTING"),
            WorkflowState::Polling => write!(f, "POLLING"),
            WorkflowState::Succeeded => write!(f, "SUCCEEDED"),
            WorkflowState::Failed => write!(f, "FAILED"),
            WorkflowState::Error => write!(f, "ERROR"),
        }
    }
}

/// What the workflow does after classifying a poll result.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Job still running; poll the same handle again.
    Continue,
    /// Job failed with budget left; resubmit as retry number `retry`.
    Resubmit { retry: u32 },
    /// Chain is finished.
    Complete(OutcomeStatus),
}

/// Classifies poll results and applies the bounded retry policy.
pub struct StateMachine;

impl StateMachine {
    /// Apply one poll result to the workflow and return the next step.
    ///
    /// - Non-terminal statuses keep the workflow in `Polling`.
    /// - `succeeded` completes the chain.
    /// - `failed` resubmits while `retry_count < max_retries`, otherwise
    ///   completes the chain as failed.
    pub fn next(wf: &mut Workflow, snapshot: &JobStatusSnapshot, max_retries: u32) -> Transition {
        wf.last_snapshot = Some(snapshot.clone());

        let transition = match &snapshot.status {
            status if !status.is_terminal() => Transition::Continue,
            JobStatus::Succeeded => Transition::Complete(OutcomeStatus::Succeeded),
            _ => Self::handle_failure(wf, max_retries),
        };

        match &transition {
            Transition::Continue => wf.transition(WorkflowState::Polling),
            Transition::Resubmit { .. } => wf.transition(WorkflowState::Submitting),
            Transition::Complete(OutcomeStatus::Succeeded) => wf.transition(WorkflowState::Succeeded),
            Transition::Complete(OutcomeStatus::Failed) => wf.transition(WorkflowState::Failed),
        }

        transition
    }

    fn handle_failure(wf: &mut Workflow, max_retries: u32) -> Transition {
        if wf.retry_count < max_retries {
            wf.retry_count += 1;
            Transition::Resubmit {
                retry: wf.retry_count,
            }
        } else {
            Transition::Complete(OutcomeStatus::Failed)
        }
    }
}
