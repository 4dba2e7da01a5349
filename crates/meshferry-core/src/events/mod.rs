//! Job events emitted by the pipeline while a job runs.
//!
//! A job produces a stream of progress and status events followed by exactly
//! one [`JobEventKind::Finished`] event carrying the terminal [`JobOutcome`].

pub mod outcome;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use outcome::{FailureKind, JobOutcome};

use crate::types::JobId;

/// Wrapper for job events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    /// The job this event belongs to.
    pub job_id: JobId,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub kind: JobEventKind,
}

/// Job event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEventKind {
    /// Progress checkpoint (0–100, monotonic).
    Progress {
        /// Percent complete.
        percent: u8,
    },
    /// Human-readable status line.
    Status {
        /// The status message.
        message: String,
    },
    /// Terminal outcome.
    Finished {
        /// The outcome.
        outcome: JobOutcome,
    },
}

impl JobEvent {
    /// Create an event stamped with the current time.
    pub fn new(job_id: JobId, kind: JobEventKind) -> Self {
        Self {
            job_id,
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Whether this is the terminal event.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, JobEventKind::Finished { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = JobEvent::new(JobId::new(), JobEventKind::Progress { percent: 15 });
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["kind"]["type"], "progress");
        assert_eq!(json["kind"]["percent"], 15);
        assert!(!event.is_terminal());
    }
}
