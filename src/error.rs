//! Error types shared across the overlay core

use thiserror::Error;

/// Failure reading or writing the durable store document
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access store file: {0}")]
    Io(#[from] std::io::Error),
    #[error("store document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure talking to the external stats service
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("stats service answered with HTTP {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else if e.is_decode() {
            FetchError::Malformed(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// An inbound window message that failed schema validation
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message is not a valid window message: {0}")]
    Schema(#[from] serde_json::Error),
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),
}
