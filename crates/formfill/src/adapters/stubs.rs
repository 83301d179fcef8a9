//! Scripted in-memory adapter implementations.
//!
//! Used by the orchestrator and service tests; each stub resolves to a
//! pre-configured outcome so failure and timeout paths can be exercised
//! without real collaborators.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::donor::{DonorDataRecord, DonorDocument};

use super::{
    AdapterError, DocumentDataExtractor, DownloadedForm, ExtractedData, ExtractedFields,
    FilledForm, FormFieldDescriptor, FormFieldExtractor, PdfDownloader, PdfFiller,
};

/// How a stub call resolves.
#[derive(Debug, Clone)]
pub enum StubBehavior<T> {
    Succeed(T),
    Fail(String),
    Unreachable(String),
    /// Sleeps far past any reasonable adapter timeout.
    Hang,
}

impl<T: Clone + Send + Sync> StubBehavior<T> {
    async fn resolve(&self) -> Result<T, AdapterError> {
        match self {
            StubBehavior::Succeed(value) => Ok(value.clone()),
            StubBehavior::Fail(message) => Err(AdapterError::Failed(message.clone())),
            StubBehavior::Unreachable(message) => Err(AdapterError::Unreachable(message.clone())),
            StubBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(AdapterError::Unreachable("stub hang elapsed".to_string()))
            }
        }
    }
}

pub struct StubDownloader {
    pub behavior: StubBehavior<DownloadedForm>,
}

impl StubDownloader {
    pub fn succeeding(path: impl Into<PathBuf>) -> Self {
        Self {
            behavior: StubBehavior::Succeed(DownloadedForm { path: path.into() }),
        }
    }
}

#[async_trait]
impl PdfDownloader for StubDownloader {
    async fn download(
        &self,
        _url: &str,
        _filename: Option<&str>,
    ) -> Result<DownloadedForm, AdapterError> {
        self.behavior.resolve().await
    }
}

pub struct StubFieldExtractor {
    pub behavior: StubBehavior<ExtractedFields>,
}

impl StubFieldExtractor {
    pub fn succeeding(fields: Vec<FormFieldDescriptor>) -> Self {
        Self {
            behavior: StubBehavior::Succeed(ExtractedFields {
                fields,
                provider: "stub".to_string(),
            }),
        }
    }
}

#[async_trait]
impl FormFieldExtractor for StubFieldExtractor {
    async fn extract_fields(
        &self,
        _pdf_path: &Path,
        _provider: Option<&str>,
    ) -> Result<ExtractedFields, AdapterError> {
        self.behavior.resolve().await
    }
}

/// Data extractor with per-path outcomes and a fallback default.
pub struct StubDataExtractor {
    outcomes: HashMap<PathBuf, StubBehavior<ExtractedData>>,
    default: StubBehavior<ExtractedData>,
}

impl StubDataExtractor {
    pub fn new(default: StubBehavior<ExtractedData>) -> Self {
        Self {
            outcomes: HashMap::new(),
            default,
        }
    }

    /// Default-succeeding extractor returning an empty record for every
    /// document.
    pub fn succeeding() -> Self {
        Self::new(StubBehavior::Succeed(ExtractedData {
            data: DonorDataRecord::new(),
            provider: "stub".to_string(),
        }))
    }

    pub fn with_outcome(
        mut self,
        path: impl Into<PathBuf>,
        behavior: StubBehavior<ExtractedData>,
    ) -> Self {
        self.outcomes.insert(path.into(), behavior);
        self
    }

    pub fn with_data(self, path: impl Into<PathBuf>, data: DonorDataRecord) -> Self {
        self.with_outcome(
            path,
            StubBehavior::Succeed(ExtractedData {
                data,
                provider: "stub".to_string(),
            }),
        )
    }

    pub fn with_failure(self, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        self.with_outcome(path, StubBehavior::Fail(message.into()))
    }
}

#[async_trait]
impl DocumentDataExtractor for StubDataExtractor {
    async fn extract_data(
        &self,
        document: &DonorDocument,
        _provider: Option<&str>,
    ) -> Result<ExtractedData, AdapterError> {
        let behavior = self.outcomes.get(&document.path).unwrap_or(&self.default);
        behavior.resolve().await
    }
}

/// Filler stub that records the data it was asked to commit.
pub struct StubFiller {
    pub behavior: StubBehavior<FilledForm>,
    filled_with: Mutex<Option<DonorDataRecord>>,
}

impl StubFiller {
    pub fn new(behavior: StubBehavior<FilledForm>) -> Self {
        Self {
            behavior,
            filled_with: Mutex::new(None),
        }
    }

    pub fn succeeding(path: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self::new(StubBehavior::Succeed(FilledForm {
            path: path.into(),
            filename: filename.into(),
        }))
    }

    /// The form data from the most recent fill call, if any.
    pub fn last_filled_with(&self) -> Option<DonorDataRecord> {
        self.filled_with.lock().ok().and_then(|g| g.clone())
    }
}

#[async_trait]
impl PdfFiller for StubFiller {
    async fn fill(
        &self,
        _form_path: &Path,
        form_data: &DonorDataRecord,
        _output_filename: Option<&str>,
    ) -> Result<FilledForm, AdapterError> {
        if let Ok(mut guard) = self.filled_with.lock() {
            *guard = Some(form_data.clone());
        }
        self.behavior.resolve().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_succeed_behavior() {
        let stub = StubDownloader::succeeding("/tmp/form.pdf");
        let form = stub.download("https://example.com/form.pdf", None).await;
        assert_eq!(form.unwrap().path, PathBuf::from("/tmp/form.pdf"));
    }

    #[tokio::test]
    async fn test_fail_behavior() {
        let stub = StubDownloader {
            behavior: StubBehavior::Fail("404".to_string()),
        };
        let err = stub
            .download("https://example.com/form.pdf", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Failed(m) if m == "404"));
    }

    #[tokio::test]
    async fn test_per_path_outcomes() {
        let mut data = DonorDataRecord::new();
        data.insert("city".to_string(), serde_json::json!("Oakland"));

        let stub = StubDataExtractor::succeeding()
            .with_data("/tmp/a.pdf", data)
            .with_failure("/tmp/b.pdf", "unreadable");

        let a = DonorDocument::new(PathBuf::from("/tmp/a.pdf"));
        let b = DonorDocument::new(PathBuf::from("/tmp/b.pdf"));
        let c = DonorDocument::new(PathBuf::from("/tmp/c.pdf"));

        assert!(stub.extract_data(&a, None).await.is_ok());
        assert!(stub.extract_data(&b, None).await.is_err());
        // Unknown paths use the default behavior.
        assert!(stub.extract_data(&c, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_filler_records_data() {
        let stub = StubFiller::succeeding("/tmp/out.pdf", "out.pdf");
        let mut data = DonorDataRecord::new();
        data.insert("first_name".to_string(), serde_json::json!("Jane"));

        stub.fill(Path::new("/tmp/form.pdf"), &data, None)
            .await
            .unwrap();

        let recorded = stub.last_filled_with().unwrap();
        assert_eq!(recorded.get("first_name"), Some(&serde_json::json!("Jane")));
    }
}
