//! Donor documents and extraction-outcome aggregation.
//!
//! Each donor document is submitted to the data extractor independently;
//! `aggregate` merges the per-document outcomes into one record with a
//! deterministic override order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

/// Merged donor data: semantic key to scalar/list value.
///
/// A `BTreeMap` keeps iteration (and therefore mapping) deterministic for
/// identical inputs.
pub type DonorDataRecord = BTreeMap<String, Value>;

/// A supporting document supplying personal data (ID, license, prior form).
#[derive(Debug, Clone)]
pub struct DonorDocument {
    pub path: PathBuf,
    /// MIME type of the document (e.g., "application/pdf"), passed to the
    /// extractor as a hint.
    pub mime_type: Option<String>,
}

impl DonorDocument {
    /// Creates a document, detecting the MIME type from the path.
    pub fn new(path: PathBuf) -> Self {
        let mime_type = Self::detect_mime_type(&path);
        Self { path, mime_type }
    }

    /// Creates a document with an explicit MIME type.
    pub fn with_mime_type(path: PathBuf, mime_type: String) -> Self {
        Self {
            path,
            mime_type: Some(mime_type),
        }
    }

    /// Detects MIME type from file path using the mime_guess crate.
    /// Returns `None` for unknown extensions.
    fn detect_mime_type(path: &Path) -> Option<String> {
        mime_guess::from_path(path).first().map(|m| m.to_string())
    }
}

/// Outcome of one document's extraction: either the extracted key/value
/// map or the failure reason, tied to its source document.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub document: DonorDocument,
    pub outcome: Result<DonorDataRecord, String>,
}

impl ExtractionOutcome {
    pub fn success(document: DonorDocument, data: DonorDataRecord) -> Self {
        Self {
            document,
            outcome: Ok(data),
        }
    }

    pub fn failure(document: DonorDocument, reason: impl Into<String>) -> Self {
        Self {
            document,
            outcome: Err(reason.into()),
        }
    }
}

/// One failed document inside an all-failed aggregation.
#[derive(Debug, Clone)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("All {count} donor documents failed extraction")]
    AllDocumentsFailed {
        count: usize,
        failures: Vec<DocumentFailure>,
    },
}

/// Merges per-document extraction outcomes into one donor record.
///
/// Merge order follows the supplied document order; colliding keys resolve
/// last-write-wins. Failed documents are skipped with a warning unless
/// every supplied document failed, which is a hard error distinct from an
/// empty record. Zero outcomes yield an empty record.
pub fn aggregate(outcomes: Vec<ExtractionOutcome>) -> Result<DonorDataRecord, AggregateError> {
    let count = outcomes.len();
    let mut merged = DonorDataRecord::new();
    let mut failures = Vec::new();

    for item in outcomes {
        match item.outcome {
            Ok(data) => {
                merged.extend(data);
            }
            Err(reason) => {
                log::warn!(
                    "Donor extraction failed for {}: {}",
                    item.document.path.display(),
                    reason
                );
                failures.push(DocumentFailure {
                    path: item.document.path,
                    reason,
                });
            }
        }
    }

    if count > 0 && failures.len() == count {
        return Err(AggregateError::AllDocumentsFailed { count, failures });
    }

    Ok(merged)
}
