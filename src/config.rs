//! Configuration loaded from `agemorph.toml`.
//!
//! Every key is optional; missing values fall back to defaults. The
//! `AGEMORPH_PROVIDER_TOKEN` and `AGEMORPH_ASSET_HOST_TOKEN` environment
//! variables take precedence over the tokens in the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::state_machine::WorkflowConfig;

pub const DEFAULT_CONFIG_FILE: &str = "agemorph.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgemorphConfig {
    /// Base URL of the inference provider's prediction API.
    pub provider_url: String,
    pub provider_token: String,
    /// Model version sent with every job; omitted when empty.
    pub model_version: String,

    /// Base URL of the asset host.
    pub asset_host_url: String,
    pub asset_host_token: String,
    pub original_folder: String,
    pub processed_folder: String,

    /// JSON Lines file receiving outcome records.
    pub store_path: PathBuf,

    pub poll_interval_ms: u64,
    pub retry_delay_ms: u64,
    pub max_retries: u32,
    /// Numeric target ages must be strictly below this value.
    pub max_target_age: u32,
    pub upload_settle_ms: u64,
    /// Copy successful artifacts to `processed_folder`.
    pub archive_output: bool,
}

impl Default for AgemorphConfig {
    fn default() -> Self {
        Self {
            provider_url: "https://api.replicate.com/v1".to_string(),
            provider_token: String::new(),
            model_version: String::new(),
            asset_host_url: "http://localhost:3000/api/assets".to_string(),
            asset_host_token: String::new(),
            original_folder: "age_transformation_original".to_string(),
            processed_folder: "age_transformation_enhanced".to_string(),
            store_path: PathBuf::from("agemorph-outcomes.jsonl"),
            poll_interval_ms: 3000,
            retry_delay_ms: 5000,
            max_retries: 3,
            max_target_age: 300,
            upload_settle_ms: 2000,
            archive_output: false,
        }
    }
}

impl AgemorphConfig {
    /// Load `agemorph.toml` from the current directory, or defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<AgemorphConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("AGEMORPH_PROVIDER_TOKEN")
            && !token.is_empty()
        {
            self.provider_token = token;
        }
        if let Ok(token) = std::env::var("AGEMORPH_ASSET_HOST_TOKEN")
            && !token.is_empty()
        {
            self.asset_host_token = token;
        }
    }

    pub fn model_version(&self) -> Option<String> {
        Some(self.model_version.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Typed view handed to the workflow core.
    pub fn workflow(&self) -> WorkflowConfig {
        WorkflowConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_retries: self.max_retries,
            max_target_age: self.max_target_age,
            upload_settle: Duration::from_millis(self.upload_settle_ms),
        }
    }

    /// Copy with tokens masked, for display.
    pub fn redacted(&self) -> Self {
        fn mask(token: &str) -> String {
            if token.is_empty() {
                String::new()
            } else {
                "****".to_string()
            }
        }
        Self {
            provider_token: mask(&self.provider_token),
            asset_host_token: mask(&self.asset_host_token),
            ..self.clone()
        }
    }
}
