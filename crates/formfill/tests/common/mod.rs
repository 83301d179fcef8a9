//! Test harness for isolated service execution.
//!
//! Provides stub adapter wiring, donor-file scratch helpers, and a
//! polling helper that waits for a run to reach a terminal state.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use formfill::adapters::stubs::{
    StubDataExtractor, StubDownloader, StubFieldExtractor, StubFiller,
};
use formfill::{
    AdapterSet, DonorDataRecord, FieldKind, FormFieldDescriptor, FormFillService, RunStatusView,
};

/// Initializes tracing for tests; safe to call repeatedly.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_log::LogTracer::init();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

pub fn text_field(name: &str) -> FormFieldDescriptor {
    FormFieldDescriptor::new(name, FieldKind::Text)
}

pub fn donor_record(pairs: &[(&str, &str)]) -> DonorDataRecord {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::json!(v)))
        .collect()
}

/// Writes a small donor file into `dir` and returns its path.
pub fn create_donor_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("create donor file");
    writeln!(file, "donor document contents").expect("write donor file");
    path
}

pub fn adapter_set(
    downloader: StubDownloader,
    field_extractor: StubFieldExtractor,
    data_extractor: StubDataExtractor,
    filler: StubFiller,
) -> AdapterSet {
    AdapterSet {
        downloader: Arc::new(downloader),
        field_extractor: Arc::new(field_extractor),
        data_extractor: Arc::new(data_extractor),
        filler: Arc::new(filler),
    }
}

/// Stub set where every stage succeeds, parameterized by the fields the
/// extractor reports and the per-document donor data.
pub fn succeeding_adapters(
    fields: Vec<FormFieldDescriptor>,
    donor_data: Vec<(PathBuf, DonorDataRecord)>,
) -> AdapterSet {
    let mut data_extractor = StubDataExtractor::succeeding();
    for (path, data) in donor_data {
        data_extractor = data_extractor.with_data(path, data);
    }

    adapter_set(
        StubDownloader::succeeding("/tmp/form.pdf"),
        StubFieldExtractor::succeeding(fields),
        data_extractor,
        StubFiller::succeeding("/tmp/filled_form.pdf", "filled_form.pdf"),
    )
}

/// Polls a run until it reaches a terminal state with a stored result.
pub async fn wait_for_terminal(service: &FormFillService, run_id: &str) -> RunStatusView {
    for _ in 0..500 {
        if let Some(view) = service.status(run_id) {
            if view.record.is_finished() && view.result.is_some() {
                return view;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("run {} did not reach a terminal state", run_id);
}
