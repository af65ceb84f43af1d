//! Error types for the inference provider client.

use thiserror::Error;

/// Errors that can occur while talking to the inference provider.
///
/// - [`ApiError`](ProviderError::ApiError): non-2xx HTTP status
/// - [`NetworkError`](ProviderError::NetworkError): DNS, refused connection, timeout
/// - [`ParseError`](ProviderError::ParseError): body did not match the expected shape
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("failed to parse provider response: {0}")]
    ParseError(String),
}
