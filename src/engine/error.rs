// src/engine/error.rs

use thiserror::Error;

/// Errors surfaced by the engine.
///
/// Only a handful of operations return these: loading the fingerprint
/// database, building the HTTP client and single-shot fetches. Failures of
/// individual probes inside a batch are logged and absorbed.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fingerprint database error: {0}")]
    Database(#[from] serde_json::Error),

    #[error("Too many redirects while fetching {0}")]
    TooManyRedirects(String),
}
