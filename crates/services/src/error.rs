//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use quiz_core::{ConfigError, SessionError};

/// Errors emitted by a `ReportSink`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SinkError {
    #[error("report sink unavailable: {0}")]
    Unavailable(String),
    #[error("report rejected by sink: {0}")]
    Rejected(String),
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// Errors emitted by `SessionDriver`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DriverError {
    #[error("session is not complete; no report to submit")]
    NotComplete,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Errors emitted while loading engine settings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}
