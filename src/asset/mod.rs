//! Asset host seam: turns an ephemeral source reference into a durable URL.

pub mod client;
pub mod error;
pub mod gate;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

pub use client::HttpAssetHost;
pub use error::AssetError;
pub use gate::{EnsuredAsset, UploadGate};

/// Which collection an uploaded asset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    /// The user's source image.
    Original,
    /// An artifact produced by the inference provider.
    Processed,
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetCategory::Original => write!(f, "original"),
            AssetCategory::Processed => write!(f, "processed"),
        }
    }
}

/// Response of a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostedAsset {
    #[serde(default)]
    pub url: String,
}

/// Remote host that stores assets durably.
pub trait AssetHost: Send + Sync {
    fn upload(
        &self,
        source_ref: &str,
        category: AssetCategory,
    ) -> impl Future<Output = Result<HostedAsset, AssetError>> + Send;
}
