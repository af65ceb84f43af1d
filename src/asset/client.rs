use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use super::error::AssetError;
use super::{AssetCategory, AssetHost, HostedAsset};

/// Body of `POST /upload`.
#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    source: &'a str,
    category: AssetCategory,
    folder: &'a str,
}

/// HTTP asset host that fetches a source URL and stores it in a folder.
pub struct HttpAssetHost {
    api_token: String,
    client: Client,
    base_url: String,
    original_folder: String,
    processed_folder: String,
}

impl HttpAssetHost {
    pub fn new(
        api_token: String,
        base_url: String,
        original_folder: String,
        processed_folder: String,
    ) -> Result<Self, AssetError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            api_token,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            original_folder,
            processed_folder,
        })
    }

    fn folder(&self, category: AssetCategory) -> &str {
        match category {
            AssetCategory::Original => &self.original_folder,
            AssetCategory::Processed => &self.processed_folder,
        }
    }
}

impl AssetHost for HttpAssetHost {
    async fn upload(
        &self,
        source_ref: &str,
        category: AssetCategory,
    ) -> Result<HostedAsset, AssetError> {
        let body = UploadRequest {
            source: source_ref,
            category,
            folder: self.folder(category),
        };
        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AssetError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        let hosted: HostedAsset =
            serde_json::from_slice(&bytes).map_err(|e| AssetError::ParseError(e.to_string()))?;
        if hosted.url.trim().is_empty() {
            return Err(AssetError::MissingUrl);
        }
        Ok(hosted)
    }
}
