use thiserror::Error;

use crate::donor::AggregateError;
use crate::registry::Stage;

/// Errors that terminate a run, each tied to the stage that produced it.
/// Structured adapter failures and transport trouble surface through the
/// same taxonomy; the orchestrator never retries either.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Form download failed: {0}")]
    DownloadFailed(String),

    #[error("Form field extraction failed: {0}")]
    FieldExtractionFailed(String),

    #[error("Donor data extraction failed: {0}")]
    DonorExtractionFailed(#[from] AggregateError),

    #[error("Field mapping failed: {0}")]
    MappingFailed(String),

    #[error("Form filling failed: {0}")]
    FillFailed(String),

    #[error("{stage} adapter unreachable: {message}")]
    Transport { stage: Stage, message: String },
}

impl WorkflowError {
    /// The stage this error originated from.
    pub fn stage(&self) -> Stage {
        match self {
            WorkflowError::DownloadFailed(_) => Stage::Downloading,
            WorkflowError::FieldExtractionFailed(_) => Stage::ExtractingFormFields,
            WorkflowError::DonorExtractionFailed(_) => Stage::ExtractingDonorData,
            WorkflowError::MappingFailed(_) => Stage::MappingFields,
            WorkflowError::FillFailed(_) => Stage::FillingForm,
            WorkflowError::Transport { stage, .. } => *stage,
        }
    }
}
