//! Persistence seam for finished outcome records.
//!
//! [`JsonlStore`] appends one JSON document per line to a local file, which
//! keeps every record ever written and needs no external service.

use std::future::Future;
use std::path::PathBuf;

use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::state_machine::OutcomeRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Accepts finished outcome records for later retrieval.
pub trait OutcomeStore: Send + Sync {
    fn save_outcome(
        &self,
        record: &OutcomeRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Append-only JSON Lines file of outcome records.
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read back every record in write order. A missing file is empty.
    pub async fn load_all(&self) -> Result<Vec<OutcomeRecord>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::from))
            .collect()
    }
}

impl OutcomeStore for JsonlStore {
    async fn save_outcome(&self, record: &OutcomeRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
