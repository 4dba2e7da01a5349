//! Single-slot job runner.

use std::sync::Arc;

use meshferry_core::error::AppError;
use meshferry_core::events::{JobEvent, JobOutcome};
use meshferry_core::types::{ImportJob, JobId};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::info;

use crate::orchestrator::PipelineOrchestrator;
use crate::reporter::JobReporter;

/// A submitted job: its event stream and its completion.
#[derive(Debug)]
pub struct JobHandle {
    job_id: JobId,
    events: mpsc::UnboundedReceiver<JobEvent>,
    task: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Next event, or `None` once the job is done and all events are read.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        self.events.recv().await
    }

    /// Wait for the terminal outcome.
    pub async fn wait(self) -> Result<JobOutcome, AppError> {
        self.task
            .await
            .map_err(|e| AppError::internal(format!("Job task failed: {e}")))
    }
}

/// Runs one job at a time on a background task.
#[derive(Clone)]
pub struct PipelineRunner {
    orchestrator: Arc<PipelineOrchestrator>,
    slot: Arc<Semaphore>,
}

impl PipelineRunner {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self {
            orchestrator,
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// Whether a job is running.
    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }

    /// Start `job`. Fails with [`meshferry_core::error::ErrorKind::Busy`]
    /// while another job is running.
    pub fn submit(&self, job: ImportJob) -> Result<JobHandle, AppError> {
        job.validate()?;
        let permit = self
            .slot
            .clone()
            .try_acquire_owned()
            .map_err(|_| AppError::busy("A job is already running"))?;

        let job_id = job.id;
        let (mut reporter, events) = JobReporter::channel(job_id);
        let orchestrator = Arc::clone(&self.orchestrator);

        info!(%job_id, input = %job.input_file.display(), "Job submitted");
        let task = tokio::spawn(async move {
            let _permit = permit;
            orchestrator.run(job, &mut reporter).await
        });

        Ok(JobHandle { job_id, events, task })
    }
}
