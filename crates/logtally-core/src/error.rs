use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;

/// The analysis request itself is unusable; raised before any line is read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Invalid time window: start {start} is after end {end}")]
    InvertedWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Invalid time window: {hours} hour(s) before {end} is out of range")]
    WindowOutOfRange { end: NaiveDateTime, hours: u32 },
}

/// A single service's input could not be read. Fatal for that service only.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open log for service '{service}': {source}")]
    Open {
        service: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read log for service '{service}' after {lines} line(s): {source}")]
    Read {
        service: String,
        lines: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker for service '{service}' did not complete: {reason}")]
    Worker { service: String, reason: String },
}

impl SourceError {
    pub fn service(&self) -> &str {
        match self {
            SourceError::Open { service, .. }
            | SourceError::Read { service, .. }
            | SourceError::Worker { service, .. } => service,
        }
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to read log directory {path:?}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
