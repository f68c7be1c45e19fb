//! Error types raised by the scoring model.

use thiserror::Error;

/// Errors raised by flight lookup, aggregation, and ingestion.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("manoeuvre {name:?} not found in flight")]
    ManoeuvreNotFound { name: String },
    #[error("manoeuvre index {index} out of range (flight has {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("version {version} not found in manoeuvre {manoeuvre}")]
    MissingScore { version: String, manoeuvre: String },
    #[error("manoeuvre {manoeuvre} already has a snapshot for version {version}")]
    DuplicateVersion { manoeuvre: String, version: String },
    #[error("unknown missing-data policy {0:?} (expected raise, zero or nan)")]
    InvalidPolicy(String),
    #[error("unknown score group {0:?} (expected intra, inter, positioning, total or all)")]
    InvalidGroup(String),
    #[error("score table shape mismatch: {0}")]
    TableShape(String),
    #[error("flight document is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("flight could not be written as JSON: {0}")]
    Serialize(#[source] serde_json::Error),
}
