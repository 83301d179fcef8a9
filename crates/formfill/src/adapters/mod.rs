//! Contracts for the external collaborators a run depends on.
//!
//! Form download, AI-backed field/data extraction, and PDF writing are
//! performed outside this crate. The orchestrator consumes them through
//! these traits and treats every call as fallible.

pub mod stubs;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::donor::{DonorDataRecord, DonorDocument};

/// Inferred type of a fillable form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Text,
    Checkbox,
    Date,
    Number,
    Radio,
    Dropdown,
    MultiSelect,
}

/// A named fillable slot in the target PDF form, as reported by the
/// form-field extractor. Field names are unique within one form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFieldDescriptor {
    /// Field identifier.
    pub name: String,
    /// Inferred data type.
    pub kind: FieldKind,
    /// Human-readable purpose.
    #[serde(default)]
    pub description: String,
    /// Page the field appears on, when the extractor reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Nearby text fragments the extractor saw around the field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_clues: Vec<String>,
}

impl FormFieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            page: None,
            context_clues: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Result of a successful form download.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadedForm {
    pub path: PathBuf,
}

/// Result of a successful form-field extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    pub fields: Vec<FormFieldDescriptor>,
    /// Analysis provider that produced the fields.
    pub provider: String,
}

/// Result of a successful donor-document extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    pub data: DonorDataRecord,
    pub provider: String,
}

/// Result of a successful form fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilledForm {
    pub path: PathBuf,
    pub filename: String,
}

/// Failure modes an adapter can report.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The collaborator answered with a structured failure.
    #[error("{0}")]
    Failed(String),

    /// The collaborator could not be reached at all.
    #[error("adapter unreachable: {0}")]
    Unreachable(String),
}

#[async_trait]
pub trait PdfDownloader: Send + Sync {
    async fn download(
        &self,
        url: &str,
        filename: Option<&str>,
    ) -> Result<DownloadedForm, AdapterError>;
}

#[async_trait]
pub trait FormFieldExtractor: Send + Sync {
    async fn extract_fields(
        &self,
        pdf_path: &Path,
        provider: Option<&str>,
    ) -> Result<ExtractedFields, AdapterError>;
}

#[async_trait]
pub trait DocumentDataExtractor: Send + Sync {
    async fn extract_data(
        &self,
        document: &DonorDocument,
        provider: Option<&str>,
    ) -> Result<ExtractedData, AdapterError>;
}

#[async_trait]
pub trait PdfFiller: Send + Sync {
    async fn fill(
        &self,
        form_path: &Path,
        form_data: &DonorDataRecord,
        output_filename: Option<&str>,
    ) -> Result<FilledForm, AdapterError>;
}

/// The four collaborators a run needs, bundled for injection.
#[derive(Clone)]
pub struct AdapterSet {
    pub downloader: Arc<dyn PdfDownloader>,
    pub field_extractor: Arc<dyn FormFieldExtractor>,
    pub data_extractor: Arc<dyn DocumentDataExtractor>,
    pub filler: Arc<dyn PdfFiller>,
}
