use std::time::Duration;

use crate::config::Config;
use crate::donor::DonorDocument;
use crate::error::ValidationError;

/// Default confidence threshold below which mappings are dropped.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Default bound on any single adapter call.
pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-run options, overridable per request.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Analysis provider hint passed to the extractors.
    pub analysis_provider: Option<String>,
    /// Confidence threshold for retained mappings.
    pub confidence_threshold: f64,
    /// Suppress already-produced artifacts from a failure response.
    pub skip_output_on_error: bool,
    /// Bound on any single adapter call.
    pub adapter_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            analysis_provider: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            skip_output_on_error: false,
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
        }
    }
}

impl RunOptions {
    /// Service-level defaults derived from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            analysis_provider: config.analysis_provider.clone(),
            confidence_threshold: config.confidence_threshold,
            skip_output_on_error: false,
            adapter_timeout: Duration::from_secs(config.adapter_timeout_secs),
        }
    }
}

/// One end-to-end form-plus-donor-set request.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub form_url: String,
    pub donor_documents: Vec<DonorDocument>,
    pub options: RunOptions,
}

impl RunRequest {
    pub fn new(
        form_url: impl Into<String>,
        donor_documents: Vec<DonorDocument>,
        options: RunOptions,
    ) -> Self {
        Self {
            form_url: form_url.into(),
            donor_documents,
            options,
        }
    }

    /// Rejects malformed requests before any run is created.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.form_url.trim().is_empty() {
            return Err(ValidationError::EmptyFormUrl);
        }
        if !(0.0..=1.0).contains(&self.options.confidence_threshold) {
            return Err(ValidationError::ThresholdOutOfRange(
                self.options.confidence_threshold,
            ));
        }
        if self.options.adapter_timeout.is_zero() {
            return Err(ValidationError::ZeroTimeout);
        }
        for document in &self.donor_documents {
            if !document.path.is_file() {
                return Err(ValidationError::DonorDocumentNotFound(
                    document.path.clone(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_defaults() {
        let options = RunOptions::default();
        assert_eq!(options.confidence_threshold, 0.7);
        assert_eq!(options.adapter_timeout, Duration::from_secs(60));
        assert!(!options.skip_output_on_error);
        assert!(options.analysis_provider.is_none());
    }

    #[test]
    fn test_empty_url_rejected() {
        let request = RunRequest::new("  ", vec![], RunOptions::default());
        assert!(matches!(
            request.validate(),
            Err(ValidationError::EmptyFormUrl)
        ));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut options = RunOptions::default();
        options.confidence_threshold = 1.5;
        let request = RunRequest::new("https://example.com/form.pdf", vec![], options);
        assert!(matches!(
            request.validate(),
            Err(ValidationError::ThresholdOutOfRange(_))
        ));
    }

    #[test]
    fn test_missing_donor_document_rejected() {
        let request = RunRequest::new(
            "https://example.com/form.pdf",
            vec![DonorDocument::new(PathBuf::from(
                "/nonexistent/donor.pdf",
            ))],
            RunOptions::default(),
        );
        assert!(matches!(
            request.validate(),
            Err(ValidationError::DonorDocumentNotFound(_))
        ));
    }

    #[test]
    fn test_valid_request_passes() {
        let mut file = tempfile::NamedTempFile::with_suffix(".pdf").unwrap();
        writeln!(file, "donor").unwrap();

        let request = RunRequest::new(
            "https://example.com/form.pdf",
            vec![DonorDocument::new(file.path().to_path_buf())],
            RunOptions::default(),
        );
        assert!(request.validate().is_ok());
    }
}
