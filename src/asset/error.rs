use thiserror::Error;

/// Errors returned by an [`AssetHost`](super::AssetHost).
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset host returned status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("asset host response did not contain a URL")]
    MissingUrl,

    #[error("failed to parse asset host response: {0}")]
    ParseError(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}
