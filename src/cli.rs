//! Command-line interface based on clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::state_machine::TargetAge;

/// agemorph: submit a face image for age transformation and wait for the result.
#[derive(Debug, Parser)]
#[command(name = "agemorph", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./agemorph.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Maximum automatic resubmissions after a failed job.
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload an image, run the transformation and wait for the outcome.
    Run {
        /// Source image reference (an upload-widget URL or any fetchable URL).
        source: String,

        /// Output age, or "default" for the provider's age sweep.
        #[arg(long, default_value = "default")]
        target_age: TargetAge,

        /// Print the outcome record as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the effective configuration.
    Config,
}
