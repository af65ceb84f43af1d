use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use agemorph::asset::HttpAssetHost;
use agemorph::cli::{Cli, Command};
use agemorph::config::AgemorphConfig;
use agemorph::inference::InferenceClient;
use agemorph::state_machine::{OutcomeStatus, TargetAge};
use agemorph::store::JsonlStore;
use agemorph::ui::AttemptProgress;
use agemorph::{AgemorphError, Orchestrator, logging};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => AgemorphConfig::load_from(path)?,
        None => AgemorphConfig::load()?,
    };
    if let Some(max_retries) = cli.max_retries {
        config.max_retries = max_retries;
    }

    match cli.command {
        Command::Config => {
            println!("{}", toml::to_string_pretty(&config.redacted())?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            source,
            target_age,
            json,
        } => run(config, source, target_age, json).await,
    }
}

async fn run(config: AgemorphConfig, source: String, target_age: TargetAge, json: bool) -> Result<ExitCode> {
    let host = Arc::new(
        HttpAssetHost::new(
            config.asset_host_token.clone(),
            config.asset_host_url.clone(),
            config.original_folder.clone(),
            config.processed_folder.clone(),
        )
        .context("failed to build asset host client")?,
    );
    let provider = Arc::new(
        InferenceClient::new(config.provider_token.clone(), config.provider_url.clone())
            .context("failed to build inference client")?,
    );
    let store = Arc::new(JsonlStore::new(config.store_path.clone()));

    let mut orchestrator = Orchestrator::new(host, provider, store, config.workflow())
        .with_model_version(config.model_version());
    if config.archive_output {
        orchestrator = orchestrator.with_output_archive();
    }
    let orchestrator = Arc::new(orchestrator);

    let progress = AttemptProgress::start(&source);
    let mut states = orchestrator.subscribe();
    let mut attempt = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.start_attempt(&source, target_age).await })
    };

    let result = loop {
        tokio::select! {
            joined = &mut attempt => break joined.context("attempt task panicked")?,
            changed = states.changed() => match changed {
                Ok(()) => progress.update_state(*states.borrow_and_update()),
                Err(_) => break (&mut attempt).await.context("attempt task panicked")?,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, discarding current attempt");
                orchestrator.remove_image();
            }
        }
    };

    progress.complete(&result);
    match result {
        Ok(record) => {
            if json {
                progress.print_record(&record);
            }
            Ok(match record.status {
                OutcomeStatus::Succeeded => ExitCode::SUCCESS,
                OutcomeStatus::Failed => ExitCode::FAILURE,
            })
        }
        Err(AgemorphError::Cancelled) => Ok(ExitCode::from(130)),
        Err(_) => Ok(ExitCode::FAILURE),
    }
}
