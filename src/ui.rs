//! Terminal rendering of workflow progress: spinner plus colored result.
//!
//! Uses `indicatif` for the spinner and `console` for styling.
//! [`AttemptProgress`] follows the state published by the orchestrator.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::AgemorphError;
use crate::state_machine::{OutcomeRecord, OutcomeStatus, WorkflowState};

/// Spinner message for a workflow state.
pub fn state_message(state: WorkflowState) -> &'static str {
    match state {
        WorkflowState::Idle => "Ready to create an age transformation",
        WorkflowState::UploadingAsset => "Uploading image...",
        WorkflowState::Submitting | WorkflowState::Polling => "Transforming image...",
        WorkflowState::Succeeded => "Image transformed",
        WorkflowState::Failed => "Processing failed",
        WorkflowState::Error => "Something went wrong",
    }
}

/// Visual progress for one attempt.
pub struct AttemptProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl AttemptProgress {
    pub fn start(source: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Starting: {source}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    pub fn update_state(&self, state: WorkflowState) {
        self.pb.set_message(state_message(state));
    }

    /// Stop the spinner and print the final result.
    pub fn complete(&self, result: &Result<OutcomeRecord, AgemorphError>) {
        self.pb.finish_and_clear();
        match result {
            Ok(record) => match (record.status, &record.output_url) {
                (OutcomeStatus::Succeeded, Some(url)) => {
                    println!("  {} Image transformed successfully", self.green.apply_to("✓"));
                    println!("    {url}");
                }
                (OutcomeStatus::Succeeded, None) => {
                    println!("  {} Job succeeded but no GIF was found", self.yellow.apply_to("!"));
                }
                (OutcomeStatus::Failed, _) => {
                    println!(
                        "  {} Processing failed after {} retries. Please try again.",
                        self.red.apply_to("✗"),
                        record.retries
                    );
                }
            },
            Err(AgemorphError::Cancelled) => {
                println!("  {} Cancelled", self.yellow.apply_to("↺"));
            }
            Err(err) => {
                println!("  {} {}", self.red.apply_to("✗"), err.user_message());
            }
        }
    }

    pub fn print_record(&self, record: &OutcomeRecord) {
        let style = match record.status {
            OutcomeStatus::Succeeded => &self.green,
            OutcomeStatus::Failed => &self.red,
        };
        println!();
        println!("{}", style.apply_to("─── Outcome Record ───"));
        println!("{}", serde_json::to_string_pretty(record).unwrap_or_default());
    }
}
