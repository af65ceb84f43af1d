//! The single mutable workflow state and the guard every continuation
//! must pass through before touching it.
//!
//! Each attempt gets a fresh [`AttemptId`] and [`CancellationToken`].
//! `reset()` bumps the id and cancels the token, so a continuation that
//! resumes afterwards finds its id stale and is discarded by
//! [`AttemptGuard::apply`] without mutating anything.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::job::{JobHandle, JobStatusSnapshot, SubmissionSettings};
use super::state::WorkflowState;
use crate::error::AgemorphError;

pub type AttemptId = u64;

/// Mutable state of one workflow instance.
#[derive(Debug, Default)]
pub struct Workflow {
    pub state: WorkflowState,
    pub state_history: Vec<WorkflowState>,
    pub attempt: AttemptId,
    pub retry_count: u32,
    /// Handles issued in the current chain, oldest first.
    pub jobs: Vec<JobHandle>,
    /// Settings reused verbatim by every resubmission of the chain.
    pub settings: Option<SubmissionSettings>,
    pub last_snapshot: Option<JobStatusSnapshot>,
    /// Set from `begin` until the attempt is reset or replaced.
    in_flight: bool,
    cancel: CancellationToken,
}

impl Workflow {
    pub fn current_job(&self) -> Option<&JobHandle> {
        self.jobs.last()
    }

    pub fn transition(&mut self, to: WorkflowState) {
        if self.state != to {
            self.state_history.push(self.state);
            self.state = to;
        }
    }

    /// True while an attempt has started and not reached a terminal state.
    pub fn is_busy(&self) -> bool {
        self.in_flight && !self.state.is_terminal()
    }

    fn begin(&mut self) -> Result<(AttemptId, CancellationToken), AgemorphError> {
        if self.is_busy() || !self.state.accepts_new_attempt() {
            return Err(AgemorphError::Busy);
        }
        self.clear();
        self.in_flight = true;
        Ok((self.attempt, self.cancel.clone()))
    }

    fn clear(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.attempt += 1;
        self.state = WorkflowState::Idle;
        self.state_history.clear();
        self.retry_count = 0;
        self.jobs.clear();
        self.settings = None;
        self.last_snapshot = None;
        self.in_flight = false;
    }
}

/// Shared handle to a [`Workflow`] plus its state broadcast channel.
#[derive(Clone)]
pub struct SharedWorkflow {
    inner: Arc<Mutex<Workflow>>,
    state_tx: Arc<watch::Sender<WorkflowState>>,
}

impl Default for SharedWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedWorkflow {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(WorkflowState::Idle);
        Self {
            inner: Arc::new(Mutex::new(Workflow::default())),
            state_tx: Arc::new(state_tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state_tx.subscribe()
    }

    /// Read the workflow without mutating it.
    pub fn inspect<R>(&self, f: impl FnOnce(&Workflow) -> R) -> R {
        f(&self.inner.lock())
    }

    pub fn state(&self) -> WorkflowState {
        self.inner.lock().state
    }

    /// Start a new attempt, or fail with `Busy` if one is in flight.
    pub fn begin(&self) -> Result<AttemptGuard, AgemorphError> {
        let mut wf = self.inner.lock();
        let (attempt, cancel) = wf.begin()?;
        self.state_tx.send_replace(wf.state);
        Ok(AttemptGuard {
            attempt,
            cancel,
            shared: self.clone(),
        })
    }

    /// Abandon the current attempt and return to `Idle`.
    pub fn reset(&self) {
        let mut wf = self.inner.lock();
        wf.clear();
        self.state_tx.send_replace(wf.state);
    }
}

/// Ticket held by the task driving one attempt.
pub struct AttemptGuard {
    attempt: AttemptId,
    cancel: CancellationToken,
    shared: SharedWorkflow,
}

impl AttemptGuard {
    pub fn id(&self) -> AttemptId {
        self.attempt
    }

    /// Run `f` against the workflow if this attempt is still current.
    pub fn apply<R>(&self, f: impl FnOnce(&mut Workflow) -> R) -> Result<R, AgemorphError> {
        let mut wf = self.shared.inner.lock();
        if wf.attempt != self.attempt {
            tracing::debug!(attempt = self.attempt, current = wf.attempt, "Discarding stale continuation");
            return Err(AgemorphError::Cancelled);
        }
        let before = wf.state;
        let out = f(&mut wf);
        if wf.state != before {
            tracing::debug!(attempt = self.attempt, from = %before, to = %wf.state, "Workflow transition");
            self.shared.state_tx.send_replace(wf.state);
        }
        Ok(out)
    }

    pub fn ensure_current(&self) -> Result<(), AgemorphError> {
        self.apply(|_| ())
    }

    /// Sleep for `delay`, waking early with `Cancelled` on reset.
    pub async fn pause(&self, delay: Duration) -> Result<(), AgemorphError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(AgemorphError::Cancelled),
            _ = tokio::time::sleep(delay) => self.ensure_current(),
        }
    }
}
