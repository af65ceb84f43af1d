use std::time::Duration;

use reqwest::{Client, Response};

use super::InferenceProvider;
use super::error::ProviderError;
use super::types::{CreateJobRequest, JobCreated, JobResponse};

/// HTTP client for the inference provider's prediction API.
pub struct InferenceClient {
    api_token: String,
    client: Client,
    base_url: String,
}

impl InferenceClient {
    /// Create a client for `base_url` (e.g. `https://api.example.com/v1`).
    pub fn new(api_token: String, base_url: String) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            api_token,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn check(response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

impl InferenceProvider for InferenceClient {
    async fn create_job(&self, req: &CreateJobRequest) -> Result<JobCreated, ProviderError> {
        let response = self
            .client
            .post(format!("{}/predictions", self.base_url))
            .bearer_auth(&self.api_token)
            .json(req)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Self::decode(response).await
    }

    async fn get_job(&self, id: &str) -> Result<JobResponse, ProviderError> {
        let response = self
            .client
            .get(format!("{}/predictions/{id}", self.base_url))
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Self::decode(response).await
    }
}
