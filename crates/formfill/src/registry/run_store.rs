//! In-memory run registry and per-stage output cache.
//!
//! The store is an explicit object injected into the orchestrator rather
//! than ambient global state, so it can later be swapped for a persistent
//! backend. Each run owns a disjoint entry; concurrent runs never contend
//! for the same key.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adapters::{FilledForm, FormFieldDescriptor};
use crate::donor::DonorDataRecord;
use crate::mapper::{unmapped_fields, MappingResult};

use super::events::{RunStatus, Stage};

// ─── RunRecord ──────────────────────────────────────────────────────────────

/// Registry view of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    /// Opaque unique run identifier.
    pub run_id: String,
    /// Current status.
    pub status: RunStatus,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal status (absent while running).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stage the failure originated from (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
}

impl RunRecord {
    fn new(run_id: String) -> Self {
        Self {
            run_id,
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
            failed_stage: None,
        }
    }

    /// Returns true if this run is finished (success or failure).
    pub fn is_finished(&self) -> bool {
        matches!(self.status, RunStatus::Success | RunStatus::Failure)
    }
}

// ─── StageOutputs ───────────────────────────────────────────────────────────

/// Cached outputs of each completed stage of one run. Written by the
/// orchestrator as stages complete; immutable snapshots from its
/// viewpoint.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOutputs {
    /// Downloaded form path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_path: Option<PathBuf>,
    /// Extracted form fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_fields: Option<Vec<FormFieldDescriptor>>,
    /// Analysis provider that produced the fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_provider: Option<String>,
    /// Aggregated donor data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donor_data: Option<DonorDataRecord>,
    /// Retained field mappings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mappings: Option<Vec<MappingResult>>,
    /// Filled output form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_form: Option<FilledForm>,
}

// ─── WorkflowResult ─────────────────────────────────────────────────────────

/// Aggregate outcome of a run, assembled from cached stage outputs plus
/// derived counts. On failure the artifact fields carry whatever completed
/// stages produced, unless the run suppressed them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    pub run_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_fields: Option<Vec<FormFieldDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donor_data: Option<DonorDataRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mappings: Option<Vec<MappingResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_form: Option<FilledForm>,
    pub field_count: usize,
    pub mapped_field_count: usize,
    pub unmapped_field_count: usize,
    pub donor_field_count: usize,
}

impl WorkflowResult {
    /// Assembles a success result from cached stage outputs.
    pub fn success(run_id: &str, outputs: &StageOutputs) -> Self {
        Self::assemble(run_id, true, None, None, Some(outputs))
    }

    /// Assembles a failure result. `outputs` is `None` when the run
    /// suppressed already-produced artifacts.
    pub fn failure(
        run_id: &str,
        error: &str,
        failed_stage: Stage,
        outputs: Option<&StageOutputs>,
    ) -> Self {
        Self::assemble(
            run_id,
            false,
            Some(error.to_string()),
            Some(failed_stage),
            outputs,
        )
    }

    fn assemble(
        run_id: &str,
        success: bool,
        error: Option<String>,
        failed_stage: Option<Stage>,
        outputs: Option<&StageOutputs>,
    ) -> Self {
        let form_path = outputs.and_then(|o| o.form_path.clone());
        let form_fields = outputs.and_then(|o| o.form_fields.clone());
        let donor_data = outputs.and_then(|o| o.donor_data.clone());
        let mappings = outputs.and_then(|o| o.mappings.clone());
        let filled_form = outputs.and_then(|o| o.filled_form.clone());

        let field_count = form_fields.as_ref().map(Vec::len).unwrap_or(0);
        let mapped_field_count = mappings.as_ref().map(Vec::len).unwrap_or(0);
        let unmapped_field_count = match (&form_fields, &mappings) {
            (Some(fields), Some(mappings)) => unmapped_fields(fields, mappings).len(),
            (Some(fields), None) => fields.len(),
            _ => 0,
        };
        let donor_field_count = donor_data.as_ref().map(DonorDataRecord::len).unwrap_or(0);

        Self {
            run_id: run_id.to_string(),
            success,
            error,
            failed_stage,
            form_path,
            form_fields,
            donor_data,
            mappings,
            filled_form,
            field_count,
            mapped_field_count,
            unmapped_field_count,
            donor_field_count,
        }
    }
}

// ─── RunStore ───────────────────────────────────────────────────────────────

struct RunEntry {
    record: RunRecord,
    outputs: StageOutputs,
    result: Option<WorkflowResult>,
}

/// Registry of runs: status records, the per-stage output cache, and the
/// terminal result, all removed together by `clear`.
pub struct RunStore {
    runs: RwLock<HashMap<String, RunEntry>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
        }
    }

    fn read_runs(&self) -> RwLockReadGuard<'_, HashMap<String, RunEntry>> {
        match self.runs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Run store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_runs(&self) -> RwLockWriteGuard<'_, HashMap<String, RunEntry>> {
        match self.runs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Run store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn with_entry_mut(&self, run_id: &str, apply: impl FnOnce(&mut RunEntry)) {
        let mut runs = self.write_runs();
        match runs.get_mut(run_id) {
            Some(entry) => apply(entry),
            None => log::warn!("Run store update for unknown run {}", run_id),
        }
    }

    /// Registers a new running run and returns its id.
    pub fn create(&self) -> String {
        let run_id = uuid::Uuid::new_v4().to_string();
        let entry = RunEntry {
            record: RunRecord::new(run_id.clone()),
            outputs: StageOutputs::default(),
            result: None,
        };
        self.write_runs().insert(run_id.clone(), entry);
        run_id
    }

    /// Returns the registry record for a run.
    pub fn get(&self, run_id: &str) -> Option<RunRecord> {
        self.read_runs().get(run_id).map(|e| e.record.clone())
    }

    /// Returns all records sorted by start time (newest first).
    pub fn get_all(&self) -> Vec<RunRecord> {
        let runs = self.read_runs();
        let mut records: Vec<RunRecord> = runs.values().map(|e| e.record.clone()).collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        records
    }

    /// Returns the count of runs by status.
    pub fn counts(&self) -> (usize, usize, usize) {
        let runs = self.read_runs();
        let mut running = 0;
        let mut succeeded = 0;
        let mut failed = 0;

        for entry in runs.values() {
            match entry.record.status {
                RunStatus::Running => running += 1,
                RunStatus::Success => succeeded += 1,
                RunStatus::Failure => failed += 1,
            }
        }

        (running, succeeded, failed)
    }

    /// Updates a run's status. A run transitions to a terminal status
    /// exactly once; later updates are ignored with a warning and
    /// `completed_at` is never mutated after that transition.
    pub fn update_status(&self, run_id: &str, status: RunStatus) {
        self.with_entry_mut(run_id, |entry| {
            if entry.record.is_finished() {
                log::warn!(
                    "Ignoring status update for finished run {}: {:?}",
                    run_id,
                    status
                );
                return;
            }
            entry.record.status = status;
            if entry.record.is_finished() {
                entry.record.completed_at = Some(Utc::now());
            }
        });
    }

    /// Marks a run failed with its error message and originating stage.
    pub fn fail(&self, run_id: &str, error: &str, failed_stage: Stage) {
        self.with_entry_mut(run_id, |entry| {
            if entry.record.is_finished() {
                log::warn!("Ignoring failure update for finished run {}", run_id);
                return;
            }
            entry.record.error = Some(error.to_string());
            entry.record.failed_stage = Some(failed_stage);
            entry.record.status = RunStatus::Failure;
            entry.record.completed_at = Some(Utc::now());
        });
    }

    // ─── Stage output cache ─────────────────────────────────────────────

    pub fn record_form_path(&self, run_id: &str, path: PathBuf) {
        self.with_entry_mut(run_id, |entry| entry.outputs.form_path = Some(path));
    }

    pub fn record_form_fields(
        &self,
        run_id: &str,
        fields: Vec<FormFieldDescriptor>,
        provider: String,
    ) {
        self.with_entry_mut(run_id, |entry| {
            entry.outputs.form_fields = Some(fields);
            entry.outputs.extraction_provider = Some(provider);
        });
    }

    pub fn record_donor_data(&self, run_id: &str, data: DonorDataRecord) {
        self.with_entry_mut(run_id, |entry| entry.outputs.donor_data = Some(data));
    }

    pub fn record_mappings(&self, run_id: &str, mappings: Vec<MappingResult>) {
        self.with_entry_mut(run_id, |entry| entry.outputs.mappings = Some(mappings));
    }

    pub fn record_filled_form(&self, run_id: &str, filled: FilledForm) {
        self.with_entry_mut(run_id, |entry| entry.outputs.filled_form = Some(filled));
    }

    /// Snapshot of a run's cached stage outputs.
    pub fn outputs(&self, run_id: &str) -> Option<StageOutputs> {
        self.read_runs().get(run_id).map(|e| e.outputs.clone())
    }

    // ─── Terminal result ────────────────────────────────────────────────

    /// Stores the assembled terminal result for status polling.
    pub fn store_result(&self, run_id: &str, result: WorkflowResult) {
        self.with_entry_mut(run_id, |entry| entry.result = Some(result));
    }

    /// Returns the terminal result, once the run has one.
    pub fn result(&self, run_id: &str) -> Option<WorkflowResult> {
        self.read_runs().get(run_id).and_then(|e| e.result.clone())
    }

    /// Removes the registry entry, the cached stage outputs, and the
    /// terminal result for a run as a single unit. Returns whether the run
    /// existed. Does not interrupt an in-flight run.
    pub fn clear(&self, run_id: &str) -> bool {
        self.write_runs().remove(run_id).is_some()
    }
}

impl Default for RunStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_unique_running_ids() {
        let store = RunStore::new();
        let a = store.create();
        let b = store.create();

        assert_ne!(a, b);
        let record = store.get(&a).unwrap();
        assert_eq!(record.status, RunStatus::Running);
        assert!(record.completed_at.is_none());
    }

    #[test]
    fn test_terminal_transition_happens_once() {
        let store = RunStore::new();
        let id = store.create();

        store.update_status(&id, RunStatus::Success);
        let first = store.get(&id).unwrap();
        assert!(first.completed_at.is_some());

        // A second terminal update is ignored and completed_at is stable.
        store.update_status(&id, RunStatus::Failure);
        let second = store.get(&id).unwrap();
        assert_eq!(second.status, RunStatus::Success);
        assert_eq!(second.completed_at, first.completed_at);
    }

    #[test]
    fn test_fail_records_error_and_stage() {
        let store = RunStore::new();
        let id = store.create();

        store.fail(&id, "download failed", Stage::Downloading);

        let record = store.get(&id).unwrap();
        assert_eq!(record.status, RunStatus::Failure);
        assert_eq!(record.error.as_deref(), Some("download failed"));
        assert_eq!(record.failed_stage, Some(Stage::Downloading));
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn test_stage_outputs_round_trip() {
        let store = RunStore::new();
        let id = store.create();

        store.record_form_path(&id, PathBuf::from("/tmp/form.pdf"));

        let outputs = store.outputs(&id).unwrap();
        assert_eq!(outputs.form_path, Some(PathBuf::from("/tmp/form.pdf")));
        assert!(outputs.form_fields.is_none());
    }

    #[test]
    fn test_clear_removes_everything_at_once() {
        let store = RunStore::new();
        let id = store.create();
        store.record_form_path(&id, PathBuf::from("/tmp/form.pdf"));
        store.update_status(&id, RunStatus::Success);
        store.store_result(&id, WorkflowResult::success(&id, &StageOutputs::default()));

        assert!(store.clear(&id));
        assert!(store.get(&id).is_none());
        assert!(store.outputs(&id).is_none());
        assert!(store.result(&id).is_none());

        // Clearing again reports the run as unknown.
        assert!(!store.clear(&id));
    }

    #[test]
    fn test_updates_for_unknown_runs_are_ignored() {
        let store = RunStore::new();
        store.update_status("nonexistent", RunStatus::Success);
        store.record_form_path("nonexistent", PathBuf::from("/tmp/x.pdf"));
        assert!(store.get("nonexistent").is_none());
    }

    #[test]
    fn test_counts() {
        let store = RunStore::new();
        let a = store.create();
        let b = store.create();
        let _c = store.create();

        store.update_status(&a, RunStatus::Success);
        store.fail(&b, "boom", Stage::FillingForm);

        assert_eq!(store.counts(), (1, 1, 1));
    }

    #[test]
    fn test_result_assembly_counts() {
        let outputs = StageOutputs {
            form_path: Some(PathBuf::from("/tmp/form.pdf")),
            form_fields: Some(vec![
                crate::adapters::FormFieldDescriptor::new(
                    "first_name",
                    crate::adapters::FieldKind::Text,
                ),
                crate::adapters::FormFieldDescriptor::new(
                    "qqq",
                    crate::adapters::FieldKind::Text,
                ),
            ]),
            extraction_provider: Some("stub".to_string()),
            donor_data: Some(
                [("firstName".to_string(), serde_json::json!("Jane"))]
                    .into_iter()
                    .collect(),
            ),
            mappings: Some(vec![MappingResult {
                field_name: "first_name".to_string(),
                value: serde_json::json!("Jane"),
                confidence: 0.9,
                source_key: "firstName".to_string(),
            }]),
            filled_form: None,
        };

        let result = WorkflowResult::success("run-1", &outputs);
        assert_eq!(result.field_count, 2);
        assert_eq!(result.mapped_field_count, 1);
        assert_eq!(result.unmapped_field_count, 1);
        assert_eq!(result.donor_field_count, 1);
    }

    #[test]
    fn test_failure_result_with_suppressed_outputs() {
        let result =
            WorkflowResult::failure("run-1", "boom", Stage::ExtractingFormFields, None);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(result.failed_stage, Some(Stage::ExtractingFormFields));
        assert!(result.form_path.is_none());
        assert_eq!(result.field_count, 0);
    }
}
