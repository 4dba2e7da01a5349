//! Job event reporting.

use meshferry_core::events::{JobEvent, JobEventKind, JobOutcome};
use meshferry_core::types::JobId;
use tokio::sync::mpsc;
use tracing::info;

/// Streams a job's events to its handle.
///
/// Progress never goes backwards: a lower percentage than the last one
/// reported is dropped. A closed receiver is not an error; the job keeps
/// running and only the events are lost.
#[derive(Debug)]
pub struct JobReporter {
    job_id: JobId,
    tx: mpsc::UnboundedSender<JobEvent>,
    percent: Option<u8>,
}

impl JobReporter {
    pub fn new(job_id: JobId, tx: mpsc::UnboundedSender<JobEvent>) -> Self {
        Self {
            job_id,
            tx,
            percent: None,
        }
    }

    /// A reporter plus the receiving end of its events.
    pub fn channel(job_id: JobId) -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(job_id, tx), rx)
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Last reported percentage.
    pub fn percent(&self) -> Option<u8> {
        self.percent
    }

    /// Report a progress checkpoint.
    pub fn progress(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.percent.is_some_and(|last| percent <= last) {
            return;
        }
        self.percent = Some(percent);
        self.emit(JobEventKind::Progress { percent });
    }

    /// Report a human-readable status line.
    pub fn status(&self, message: impl Into<String>) {
        let message = message.into();
        info!(job_id = %self.job_id, "{message}");
        self.emit(JobEventKind::Status { message });
    }

    /// Report the terminal outcome.
    pub fn finish(&self, outcome: JobOutcome) {
        self.emit(JobEventKind::Finished { outcome });
    }

    fn emit(&self, kind: JobEventKind) {
        let _ = self.tx.send(JobEvent::new(self.job_id, kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic() {
        let (mut reporter, mut rx) = JobReporter::channel(JobId::new());
        reporter.progress(0);
        reporter.progress(15);
        reporter.progress(5);
        reporter.progress(15);
        reporter.progress(60);

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let JobEventKind::Progress { percent } = event.kind {
                seen.push(percent);
            }
        }
        assert_eq!(seen, vec![0, 15, 60]);
        assert_eq!(reporter.percent(), Some(60));
    }

    #[test]
    fn test_closed_receiver_is_ignored() {
        let (mut reporter, rx) = JobReporter::channel(JobId::new());
        drop(rx);
        reporter.progress(50);
        reporter.status("still running");
    }
}
