//! Run progress broadcasting for status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Stage of a form-fill run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Downloading,
    ExtractingFormFields,
    ExtractingDonorData,
    MappingFields,
    FillingForm,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Downloading => write!(f, "Downloading form"),
            Stage::ExtractingFormFields => write!(f, "Extracting form fields"),
            Stage::ExtractingDonorData => write!(f, "Extracting donor data"),
            Stage::MappingFields => write!(f, "Mapping fields"),
            Stage::FillingForm => write!(f, "Filling form"),
        }
    }
}

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Failure,
}

/// Progress event emitted as a run advances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunProgressEvent {
    /// Run this event belongs to.
    pub run_id: String,
    /// Stage being entered; absent on terminal events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Overall run status.
    pub status: RunStatus,
    /// Human-readable message describing current activity.
    pub message: String,
    /// Timestamp of this event.
    pub timestamp: DateTime<Utc>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunProgressEvent {
    /// Creates a stage-entry event.
    pub fn stage(run_id: &str, stage: Stage, message: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            stage: Some(stage),
            status: RunStatus::Running,
            message: message.to_string(),
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Creates a completion event.
    pub fn completed(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            stage: None,
            status: RunStatus::Success,
            message: "Run completed successfully".to_string(),
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Creates a failure event.
    pub fn failed(run_id: &str, error: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            stage: None,
            status: RunStatus::Failure,
            message: "Run failed".to_string(),
            timestamp: Utc::now(),
            error: Some(error.to_string()),
        }
    }
}

/// Broadcasts run progress events for streaming.
#[derive(Clone)]
pub struct RunProgressBroadcaster {
    sender: Arc<broadcast::Sender<RunProgressEvent>>,
}

impl RunProgressBroadcaster {
    /// Creates a broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends an event to all subscribers.
    pub fn send(&self, event: RunProgressEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<RunProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for RunProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcaster_send_receive() {
        let broadcaster = RunProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        broadcaster.send(RunProgressEvent::stage(
            "run-1",
            Stage::Downloading,
            "Downloading form...",
        ));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.run_id, "run-1");
        assert_eq!(received.stage, Some(Stage::Downloading));
        assert_eq!(received.status, RunStatus::Running);
    }

    #[test]
    fn test_terminal_events() {
        let broadcaster = RunProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        broadcaster.send(RunProgressEvent::completed("run-1"));
        broadcaster.send(RunProgressEvent::failed("run-2", "download failed"));

        let ok = rx.try_recv().unwrap();
        assert_eq!(ok.status, RunStatus::Success);
        assert!(ok.stage.is_none());

        let failed = rx.try_recv().unwrap();
        assert_eq!(failed.status, RunStatus::Failure);
        assert_eq!(failed.error.as_deref(), Some("download failed"));
    }

    #[test]
    fn test_send_without_receivers_is_fine() {
        let broadcaster = RunProgressBroadcaster::new(10);
        broadcaster.send(RunProgressEvent::completed("run-1"));
    }
}
