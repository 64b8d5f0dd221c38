use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failures raised by the weather, store and image endpoints.
#[derive(Debug, Error)]
pub enum WxError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server responded with status {0}")]
    Status(StatusCode),

    /// The body was not the JSON shape we expect.
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The lookup answered with a zero-length array.
    #[error("forecast lookup returned no locations")]
    EmptyResult,

    #[error("invalid url `{0}`")]
    InvalidUrl(String),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
