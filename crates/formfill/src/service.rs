//! Caller-facing surface: start a run, poll its status, clear it.
//!
//! The service owns the shared run store, the progress broadcaster, and
//! the orchestrator; a UI or HTTP layer drives it and serializes the
//! response types directly.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

use crate::adapters::AdapterSet;
use crate::config::Config;
use crate::donor::DonorDocument;
use crate::error::ValidationError;
use crate::mapper::FieldMapper;
use crate::registry::{
    RunProgressBroadcaster, RunProgressEvent, RunRecord, RunStore, WorkflowResult,
};
use crate::workflow::{Orchestrator, RunOptions, RunRequest};

/// Status view returned to pollers: the registry record plus, once the
/// run is terminal, the full workflow result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatusView {
    #[serde(flatten)]
    pub record: RunRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<WorkflowResult>,
}

pub struct FormFillService {
    orchestrator: Arc<Orchestrator>,
    store: Arc<RunStore>,
    progress: RunProgressBroadcaster,
    defaults: RunOptions,
}

impl FormFillService {
    /// Builds the service from configuration and the adapter set.
    pub fn new(config: &Config, adapters: AdapterSet) -> Self {
        Self::build(
            adapters,
            FieldMapper::new(config.alias_table()),
            RunOptions::from_config(config),
        )
    }

    /// Service with built-in defaults, for callers without a config file.
    pub fn with_defaults(adapters: AdapterSet) -> Self {
        Self::build(adapters, FieldMapper::default(), RunOptions::default())
    }

    fn build(adapters: AdapterSet, mapper: FieldMapper, defaults: RunOptions) -> Self {
        let store = Arc::new(RunStore::new());
        let progress = RunProgressBroadcaster::default();
        let orchestrator = Arc::new(Orchestrator::new(
            adapters,
            mapper,
            Arc::clone(&store),
            progress.clone(),
        ));

        Self {
            orchestrator,
            store,
            progress,
            defaults,
        }
    }

    /// Default options for this service; callers override them per request.
    pub fn default_options(&self) -> RunOptions {
        self.defaults.clone()
    }

    /// Validates and starts a run, returning its id immediately. The run
    /// executes on its own task and proceeds to a terminal state; poll
    /// `status` for the outcome. Validation failures never create a run.
    pub fn start(
        &self,
        form_url: &str,
        donor_paths: Vec<PathBuf>,
        options: RunOptions,
    ) -> Result<String, ValidationError> {
        let documents = donor_paths.into_iter().map(DonorDocument::new).collect();
        let request = RunRequest::new(form_url, documents, options);
        request.validate()?;

        let run_id = self.store.create();
        info!(
            run_id = %run_id,
            form_url = %request.form_url,
            documents = request.donor_documents.len(),
            "Run started"
        );

        let orchestrator = Arc::clone(&self.orchestrator);
        let task_run_id = run_id.clone();
        tokio::spawn(async move {
            orchestrator.run(&task_run_id, &request).await;
        });

        Ok(run_id)
    }

    /// Current state of a run; carries the full result once terminal.
    pub fn status(&self, run_id: &str) -> Option<RunStatusView> {
        let record = self.store.get(run_id)?;
        let result = self.store.result(run_id);
        Some(RunStatusView { record, result })
    }

    /// Records for all known runs, newest first.
    pub fn runs(&self) -> Vec<RunRecord> {
        self.store.get_all()
    }

    /// Counts of runs by status: (running, succeeded, failed).
    pub fn counts(&self) -> (usize, usize, usize) {
        self.store.counts()
    }

    /// Removes a run's bookkeeping (record, cached stage outputs, terminal
    /// result) as one unit. Does not interrupt an in-flight run.
    pub fn clear(&self, run_id: &str) -> bool {
        self.store.clear(run_id)
    }

    /// Subscribes to run progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<RunProgressEvent> {
        self.progress.subscribe()
    }
}
