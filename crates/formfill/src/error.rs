use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormfillError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] crate::workflow::WorkflowError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid alias entry '{canonical}': {reason}")]
    InvalidAlias { canonical: String, reason: String },
}

/// Errors rejected before any run is created.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Form URL must not be empty")]
    EmptyFormUrl,

    #[error("Donor document not found: {0}")]
    DonorDocumentNotFound(PathBuf),

    #[error("Confidence threshold {0} is outside [0.0, 1.0]")]
    ThresholdOutOfRange(f64),

    #[error("Adapter timeout must be greater than zero")]
    ZeroTimeout,
}

pub type Result<T> = std::result::Result<T, FormfillError>;
