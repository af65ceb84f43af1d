//! Orchestration of asynchronous age-transformation jobs.
//!
//! A chain hosts the source image once, submits a job to the inference
//! provider, polls it to a terminal status, resubmits failed jobs up to a
//! bound, and persists exactly one [`OutcomeRecord`](state_machine::OutcomeRecord).
//! [`Orchestrator`](orchestrator::Orchestrator) is the entry point.

pub mod asset;
pub mod cli;
pub mod config;
pub mod error;
pub mod finalizer;
pub mod inference;
pub mod logging;
pub mod orchestrator;
pub mod poller;
pub mod state_machine;
pub mod store;
pub mod submitter;
pub mod ui;

#[cfg(test)]
mod test_utils;

pub use error::AgemorphError;
pub use orchestrator::Orchestrator;
