mod job;
mod state;
mod workflow;

pub use job::{
    JobHandle, JobStatus, JobStatusSnapshot, OutcomeRecord, OutcomeStatus, SubmissionSettings,
    TargetAge, WorkflowConfig,
};
pub use state::{StateMachine, Transition, WorkflowState};
pub use workflow::{AttemptGuard, AttemptId, SharedWorkflow, Workflow};
