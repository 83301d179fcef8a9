pub mod adapters;
pub mod config;
pub mod donor;
pub mod error;
pub mod mapper;
pub mod registry;
pub mod service;
pub mod workflow;

pub use adapters::{
    AdapterError, AdapterSet, DocumentDataExtractor, DownloadedForm, ExtractedData,
    ExtractedFields, FieldKind, FilledForm, FormFieldDescriptor, FormFieldExtractor,
    PdfDownloader, PdfFiller,
};
pub use config::{load_config, Config};
pub use donor::{aggregate, AggregateError, DonorDataRecord, DonorDocument, ExtractionOutcome};
pub use error::{ConfigError, FormfillError, Result, ValidationError};
pub use mapper::{unmapped_fields, unused_donor_keys, AliasTable, FieldMapper, MappingResult};
pub use registry::{
    RunProgressBroadcaster, RunProgressEvent, RunRecord, RunStatus, RunStore, Stage,
    StageOutputs, WorkflowResult,
};
pub use service::{FormFillService, RunStatusView};
pub use workflow::{Orchestrator, RunOptions, RunRequest, WorkflowError};
