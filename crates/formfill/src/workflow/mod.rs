pub mod error;
pub mod options;
pub mod runner;

pub use error::WorkflowError;
pub use options::{
    RunOptions, RunRequest, DEFAULT_ADAPTER_TIMEOUT, DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use runner::Orchestrator;
