use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::time::timeout;
use tracing::{debug, info_span, Instrument};

use crate::adapters::{
    AdapterError, AdapterSet, DownloadedForm, ExtractedFields, FilledForm, FormFieldDescriptor,
};
use crate::donor::{aggregate, DonorDataRecord, DonorDocument, ExtractionOutcome};
use crate::mapper::{FieldMapper, MappingResult};
use crate::registry::{
    RunProgressBroadcaster, RunProgressEvent, RunStatus, RunStore, Stage, WorkflowResult,
};

use super::error::WorkflowError;
use super::options::{RunOptions, RunRequest};

/// Sequences the five stages of a run against the external adapters.
///
/// Stages run strictly in order; each completed stage writes its output
/// into the injected run store before the next starts, so a failed run
/// still exposes everything produced up to the failing stage. The
/// orchestrator never retries an adapter.
pub struct Orchestrator {
    adapters: AdapterSet,
    mapper: FieldMapper,
    store: Arc<RunStore>,
    progress: RunProgressBroadcaster,
}

impl Orchestrator {
    pub fn new(
        adapters: AdapterSet,
        mapper: FieldMapper,
        store: Arc<RunStore>,
        progress: RunProgressBroadcaster,
    ) -> Self {
        Self {
            adapters,
            mapper,
            store,
            progress,
        }
    }

    /// Runs the pipeline for an already-registered run and stores the
    /// terminal result for status polling.
    pub async fn run(&self, run_id: &str, request: &RunRequest) -> WorkflowResult {
        let span = info_span!("run", run_id = %run_id, form_url = %request.form_url);
        let outcome = self.execute(run_id, request).instrument(span).await;

        let result = match outcome {
            Ok(()) => {
                self.store.update_status(run_id, RunStatus::Success);
                self.progress.send(RunProgressEvent::completed(run_id));
                let outputs = self.store.outputs(run_id).unwrap_or_default();
                WorkflowResult::success(run_id, &outputs)
            }
            Err(error) => {
                let message = error.to_string();
                let stage = error.stage();
                self.store.fail(run_id, &message, stage);
                self.progress
                    .send(RunProgressEvent::failed(run_id, &message));

                // Suppressed artifacts stay in the store for inspection.
                let outputs = if request.options.skip_output_on_error {
                    None
                } else {
                    self.store.outputs(run_id)
                };
                WorkflowResult::failure(run_id, &message, stage, outputs.as_ref())
            }
        };

        self.store.store_result(run_id, result.clone());
        result
    }

    async fn execute(&self, run_id: &str, request: &RunRequest) -> Result<(), WorkflowError> {
        let options = &request.options;

        // Stage 1: download the form
        self.enter_stage(run_id, Stage::Downloading, "Downloading form...");
        let form = self.stage_download(&request.form_url, options).await?;
        self.store.record_form_path(run_id, form.path.clone());

        // Stage 2: extract form fields
        self.enter_stage(
            run_id,
            Stage::ExtractingFormFields,
            "Extracting form fields...",
        );
        let extracted = self.stage_extract_fields(&form, options).await?;
        debug!(
            field_count = extracted.fields.len(),
            provider = %extracted.provider,
            "Form fields extracted"
        );
        self.store.record_form_fields(
            run_id,
            extracted.fields.clone(),
            extracted.provider.clone(),
        );

        // Stage 3: extract donor data from all documents concurrently
        self.enter_stage(
            run_id,
            Stage::ExtractingDonorData,
            "Extracting donor data...",
        );
        let donor_data = self
            .stage_extract_donor_data(&request.donor_documents, options)
            .await?;
        self.store.record_donor_data(run_id, donor_data.clone());

        // Stage 4: map donor data onto the form fields
        self.enter_stage(run_id, Stage::MappingFields, "Mapping fields...");
        let mappings = self.stage_map(&extracted.fields, &donor_data, options)?;
        debug!(mapped = mappings.len(), "Fields mapped");
        self.store.record_mappings(run_id, mappings.clone());

        // Stage 5: fill the form
        self.enter_stage(run_id, Stage::FillingForm, "Filling form...");
        let filled = self.stage_fill(&form, &mappings, options).await?;
        self.store.record_filled_form(run_id, filled);

        Ok(())
    }

    fn enter_stage(&self, run_id: &str, stage: Stage, message: &str) {
        self.progress
            .send(RunProgressEvent::stage(run_id, stage, message));
    }

    /// Bounds an adapter call with the run's timeout. Structured failures
    /// map onto the stage's error; unreachable adapters and lapsed
    /// timeouts surface as transport errors.
    async fn bounded<T, F, E>(
        &self,
        stage: Stage,
        options: &RunOptions,
        call: F,
        on_failure: E,
    ) -> Result<T, WorkflowError>
    where
        F: Future<Output = Result<T, AdapterError>>,
        E: FnOnce(String) -> WorkflowError,
    {
        match timeout(options.adapter_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(AdapterError::Failed(message))) => Err(on_failure(message)),
            Ok(Err(AdapterError::Unreachable(message))) => {
                Err(WorkflowError::Transport { stage, message })
            }
            Err(_) => Err(WorkflowError::Transport {
                stage,
                message: format!("no response within {:?}", options.adapter_timeout),
            }),
        }
    }

    async fn stage_download(
        &self,
        url: &str,
        options: &RunOptions,
    ) -> Result<DownloadedForm, WorkflowError> {
        self.bounded(
            Stage::Downloading,
            options,
            self.adapters.downloader.download(url, None),
            WorkflowError::DownloadFailed,
        )
        .await
    }

    async fn stage_extract_fields(
        &self,
        form: &DownloadedForm,
        options: &RunOptions,
    ) -> Result<ExtractedFields, WorkflowError> {
        self.bounded(
            Stage::ExtractingFormFields,
            options,
            self.adapters
                .field_extractor
                .extract_fields(&form.path, options.analysis_provider.as_deref()),
            WorkflowError::FieldExtractionFailed,
        )
        .await
    }

    /// Submits every donor document concurrently and waits for all
    /// outcomes; a single failed or timed-out document counts against the
    /// all-fail rule rather than aborting the stage.
    async fn stage_extract_donor_data(
        &self,
        documents: &[DonorDocument],
        options: &RunOptions,
    ) -> Result<DonorDataRecord, WorkflowError> {
        let provider = options.analysis_provider.as_deref();
        let outcomes = join_all(documents.iter().map(|document| async move {
            match timeout(
                options.adapter_timeout,
                self.adapters.data_extractor.extract_data(document, provider),
            )
            .await
            {
                Ok(Ok(extracted)) => ExtractionOutcome::success(document.clone(), extracted.data),
                Ok(Err(error)) => ExtractionOutcome::failure(document.clone(), error.to_string()),
                Err(_) => ExtractionOutcome::failure(
                    document.clone(),
                    format!("no response within {:?}", options.adapter_timeout),
                ),
            }
        }))
        .await;

        aggregate(outcomes).map_err(WorkflowError::from)
    }

    fn stage_map(
        &self,
        fields: &[FormFieldDescriptor],
        donor_data: &DonorDataRecord,
        options: &RunOptions,
    ) -> Result<Vec<MappingResult>, WorkflowError> {
        let mappings = self
            .mapper
            .map(fields, donor_data, options.confidence_threshold);

        // Field names are unique within a form by extractor contract; a
        // duplicate here would break the result-set invariant.
        let mut seen = HashSet::new();
        for mapping in &mappings {
            if !seen.insert(mapping.field_name.as_str()) {
                return Err(WorkflowError::MappingFailed(format!(
                    "duplicate field name '{}' in mapping results",
                    mapping.field_name
                )));
            }
        }

        Ok(mappings)
    }

    async fn stage_fill(
        &self,
        form: &DownloadedForm,
        mappings: &[MappingResult],
        options: &RunOptions,
    ) -> Result<FilledForm, WorkflowError> {
        let form_data: DonorDataRecord = mappings
            .iter()
            .map(|m| (m.field_name.clone(), m.value.clone()))
            .collect();
        let output_filename = default_output_filename(&form.path);

        self.bounded(
            Stage::FillingForm,
            options,
            self.adapters
                .filler
                .fill(&form.path, &form_data, output_filename.as_deref()),
            WorkflowError::FillFailed,
        )
        .await
    }
}

/// `filled_<form file name>`, when the form path has a file name.
fn default_output_filename(form_path: &Path) -> Option<String> {
    form_path
        .file_name()
        .map(|name| format!("filled_{}", name.to_string_lossy()))
}
