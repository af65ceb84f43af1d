//! In-memory fakes of the three collaborators, scripted per test.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;

use crate::asset::{AssetCategory, AssetError, AssetHost, HostedAsset};
use crate::inference::{CreateJobRequest, InferenceProvider, JobCreated, JobResponse, ProviderError};
use crate::state_machine::OutcomeRecord;
use crate::store::{OutcomeStore, StoreError};

/// One scripted answer to `get_job`.
#[derive(Debug, Clone)]
pub enum Step {
    Status {
        status: String,
        output: Option<String>,
    },
    TransportError,
    /// Resolve `step` only after `delay`.
    Slow(Duration, Box<Step>),
}

impl Step {
    pub fn status(status: &str) -> Self {
        Step::Status {
            status: status.to_string(),
            output: None,
        }
    }

    pub fn succeeded(output: &str) -> Self {
        Step::Status {
            status: "succeeded".to_string(),
            output: Some(output.to_string()),
        }
    }

    pub fn transport_error() -> Self {
        Step::TransportError
    }

    pub fn slow(delay: Duration, step: Step) -> Self {
        Step::Slow(delay, Box::new(step))
    }
}

/// Provider that issues `job-1`, `job-2`, ... and answers polls from a
/// script, falling back to `processing` once the script runs out.
#[derive(Default)]
pub struct ScriptedProvider {
    polls: Mutex<VecDeque<Step>>,
    created: Mutex<Vec<CreateJobRequest>>,
    polled_ids: Mutex<Vec<String>>,
    fail_creation_from: Option<usize>,
    blank_ids: bool,
    constant_id: bool,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_polls(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.polls = Mutex::new(steps.into_iter().collect());
        self
    }

    pub fn failing_creation(self) -> Self {
        self.failing_creation_from(0)
    }

    /// Creation calls with zero-based index `>= n` fail.
    pub fn failing_creation_from(mut self, n: usize) -> Self {
        self.fail_creation_from = Some(n);
        self
    }

    pub fn with_blank_ids(mut self) -> Self {
        self.blank_ids = true;
        self
    }

    /// Every creation returns the same id.
    pub fn with_constant_id(mut self) -> Self {
        self.constant_id = true;
        self
    }

    pub fn create_calls(&self) -> usize {
        self.created.lock().len()
    }

    pub fn created_requests(&self) -> Vec<CreateJobRequest> {
        self.created.lock().clone()
    }

    pub fn get_calls(&self) -> usize {
        self.polled_ids.lock().len()
    }

    pub fn polled_ids(&self) -> Vec<String> {
        self.polled_ids.lock().clone()
    }
}

impl InferenceProvider for ScriptedProvider {
    async fn create_job(&self, req: &CreateJobRequest) -> Result<JobCreated, ProviderError> {
        let index = {
            let mut created = self.created.lock();
            created.push(req.clone());
            created.len() - 1
        };
        if self.fail_creation_from.is_some_and(|n| index >= n) {
            return Err(ProviderError::ApiError {
                status: 500,
                message: "creation refused".into(),
            });
        }
        let id = if self.blank_ids {
            String::new()
        } else if self.constant_id {
            "job-1".to_string()
        } else {
            format!("job-{}", index + 1)
        };
        Ok(JobCreated {
            id,
            status: Some("starting".into()),
        })
    }

    async fn get_job(&self, id: &str) -> Result<JobResponse, ProviderError> {
        self.polled_ids.lock().push(id.to_string());
        let mut step = self
            .polls
            .lock()
            .pop_front()
            .unwrap_or_else(|| Step::status("processing"));

        while let Step::Slow(delay, inner) = step {
            tokio::time::sleep(delay).await;
            step = *inner;
        }

        match step {
            Step::Status { status, output } => Ok(JobResponse {
                id: id.to_string(),
                status,
                output: output.map(serde_json::Value::String),
                error: None,
                created_at: None,
                completed_at: None,
                metrics: None,
            }),
            Step::TransportError => Err(ProviderError::ParseError("connection reset".into())),
            Step::Slow(..) => unreachable!("slow steps are unwrapped above"),
        }
    }
}

/// Asset host that counts uploads.
pub struct FakeAssetHost {
    url: Option<String>,
    fail_processed: bool,
    numbered: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, AssetCategory)>>,
}

impl FakeAssetHost {
    pub fn ok(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            fail_processed: false,
            numbered: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            url: None,
            fail_processed: true,
            numbered: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Originals succeed, processed uploads are rejected.
    pub fn failing_processed(url: &str) -> Self {
        Self {
            fail_processed: true,
            ..Self::ok(url)
        }
    }

    /// Every source upload takes `delay` before answering.
    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Source uploads answer `{url}?n={k}` for the k-th upload.
    pub fn numbered(mut self) -> Self {
        self.numbered = true;
        self
    }

    /// Number of uploads of source images.
    pub fn uploads(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(_, c)| *c == AssetCategory::Original)
            .count()
    }

    pub fn calls(&self) -> Vec<(String, AssetCategory)> {
        self.calls.lock().clone()
    }
}

impl AssetHost for FakeAssetHost {
    async fn upload(
        &self,
        source_ref: &str,
        category: AssetCategory,
    ) -> Result<HostedAsset, AssetError> {
        self.calls.lock().push((source_ref.to_string(), category));
        let nth = self.uploads();
        if category == AssetCategory::Original
            && let Some(delay) = self.delay
        {
            tokio::time::sleep(delay).await;
        }
        match (category, &self.url) {
            (AssetCategory::Original, Some(url)) if self.numbered => Ok(HostedAsset {
                url: format!("{url}?n={nth}"),
            }),
            (AssetCategory::Original, Some(url)) => Ok(HostedAsset { url: url.clone() }),
            (AssetCategory::Processed, Some(_)) if !self.fail_processed => Ok(HostedAsset {
                url: format!("https://archive.example/{}", source_ref.rsplit('/').next().unwrap_or("")),
            }),
            _ => Err(AssetError::Rejected {
                status: 503,
                message: "host unavailable".into(),
            }),
        }
    }
}

/// Store that keeps records in memory, optionally failing every write.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<OutcomeRecord>>,
    failing: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn records(&self) -> Vec<OutcomeRecord> {
        self.records.lock().clone()
    }
}

impl OutcomeStore for MemoryStore {
    async fn save_outcome(&self, record: &OutcomeRecord) -> Result<(), StoreError> {
        if self.failing {
            return Err(StoreError::Io(std::io::Error::other("store offline")));
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}
