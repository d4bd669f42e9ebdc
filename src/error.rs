use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::phase::Phase;

/// Rejected session configuration. Raised by `start` before any state changes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidConfigError {
    #[error("{phase} duration must be a positive number of seconds, got {secs}")]
    NonPositiveDuration { phase: Phase, secs: f64 },
    #[error("target cycle count must be positive")]
    ZeroCycles,
}

/// Failure to produce a tone or haptic pulse. Never surfaces past the emitter.
#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("feedback device unavailable: {0}")]
    Unavailable(String),
    #[error("feedback output failed: {0}")]
    Io(#[from] io::Error),
}

/// Failure to install the log subscriber.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("could not open log file {}: {reason}", .path.display())]
    LogFile { path: PathBuf, reason: String },
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialised,
}

/// Failure while exporting session history.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not read session history: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("could not write csv: {0}")]
    Csv(#[from] csv::Error),
}
