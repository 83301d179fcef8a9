pub mod events;
pub mod run_store;

pub use events::{RunProgressBroadcaster, RunProgressEvent, RunStatus, Stage};
pub use run_store::{RunRecord, RunStore, StageOutputs, WorkflowResult};
