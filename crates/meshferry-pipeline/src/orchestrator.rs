//! End-to-end job orchestration.
//!
//! validate → locate Blender → convert → discover → connect → reconcile →
//! close → interpret. Each stage boundary reports a progress checkpoint and
//! a status line; the job ends with exactly one [`JobOutcome`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use meshferry_blender::{ConversionRequest, ConversionResult};
use meshferry_core::config::AppConfig;
use meshferry_core::events::JobOutcome;
use meshferry_core::types::ImportJob;
use meshferry_import::{
    ImportCommand, ImportOptions, ImportReconciler, ReconcileError, ReconcileReport, WorkspaceConnector,
    WorkspaceError,
};
use meshferry_remote::{DiscoveredNode, NodeDiscovery};
use tracing::{debug, error, info, instrument, warn};

use crate::converter::MeshConverter;
use crate::error::JobError;
use crate::reporter::JobReporter;

/// Progress checkpoints.
mod checkpoint {
    pub const VALIDATE: u8 = 0;
    pub const TOOL_CHECK: u8 = 5;
    pub const CONVERTING: u8 = 15;
    pub const CONVERTED: u8 = 60;
    pub const DISCOVERING: u8 = 70;
    pub const CONNECTED: u8 = 75;
    pub const IMPORTING: u8 = 80;
    pub const IMPORTED: u8 = 95;
    pub const DONE: u8 = 100;
}

/// Orchestrator knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Blender run deadline.
    pub conversion_timeout: Duration,
    /// Blender stdout lines echoed as status.
    pub log_tail_lines: usize,
    /// Parent of per-job temp directories.
    pub temp_root: PathBuf,
    /// How long to look for an editor.
    pub discovery_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            conversion_timeout: config.blender.timeout(),
            log_tail_lines: config.blender.log_tail_lines,
            temp_root: config.blender.effective_temp_root(),
            discovery_timeout: config.remote.discovery_timeout(),
        }
    }
}

/// Success before interpretation: final message plus optional warning.
struct Delivered {
    message: String,
    warning: Option<String>,
}

/// Runs one job end to end.
pub struct PipelineOrchestrator {
    converter: Arc<dyn MeshConverter>,
    discovery: NodeDiscovery,
    connector: Arc<dyn WorkspaceConnector>,
    reconciler: ImportReconciler,
    settings: PipelineSettings,
}

impl PipelineOrchestrator {
    pub fn new(
        converter: Arc<dyn MeshConverter>,
        discovery: NodeDiscovery,
        connector: Arc<dyn WorkspaceConnector>,
        reconciler: ImportReconciler,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            converter,
            discovery,
            connector,
            reconciler,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run `job` to its terminal outcome. Never fails; failures become
    /// [`JobOutcome::Failed`].
    #[instrument(skip(self, job, reporter), fields(job_id = %job.id, input = %job.input_file.display()))]
    pub async fn run(&self, job: ImportJob, reporter: &mut JobReporter) -> JobOutcome {
        let work_dir = self.settings.temp_root.join(job.id.to_string());

        let outcome = match self.execute(&job, &work_dir, reporter).await {
            Ok(Delivered { message, warning }) => {
                reporter.progress(checkpoint::DONE);
                if let Some(warning) = &warning {
                    warn!(%warning, "Job finished without confirmation");
                }
                info!("{message}");
                JobOutcome::Succeeded { message, warning }
            }
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "Job failed");
                reporter.status(format!("Error: {e}"));
                JobOutcome::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        };

        remove_work_dir(&work_dir).await;
        reporter.finish(outcome.clone());
        outcome
    }

    async fn execute(&self, job: &ImportJob, work_dir: &Path, reporter: &mut JobReporter) -> Result<Delivered, JobError> {
        reporter.progress(checkpoint::VALIDATE);
        reporter.status(format!("Validating {}", job.input_file.display()));
        job.validate().map_err(|e| JobError::InvalidJob(e.message))?;
        let asset_name = job
            .asset_name()
            .ok_or_else(|| JobError::InvalidJob("cannot derive an asset name".to_string()))?;
        if !tokio::fs::metadata(&job.input_file)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return Err(JobError::InputNotFound {
                path: job.input_file.clone(),
            });
        }
        if !job.has_gltf_extension() {
            reporter.status("Warning: input does not have a .glb or .gltf extension");
        }

        reporter.progress(checkpoint::TOOL_CHECK);
        reporter.status("Checking for Blender");
        let installation = self
            .converter
            .locate_tool()
            .map_err(|e| JobError::ToolNotFound(e.to_string()))?;
        reporter.status(format!("Found Blender at {}", installation.executable.display()));

        reporter.progress(checkpoint::CONVERTING);
        reporter.status(format!(
            "Converting {} to FBX (decimate ratio {})",
            job.input_file.display(),
            job.decimate_ratio
        ));
        let converted = self.convert(job, work_dir).await?;
        for line in converted.stdout_tail(self.settings.log_tail_lines) {
            reporter.status(format!("[Blender] {line}"));
        }
        reporter.status(format!("FBX written: {:.2} MB", converted.output_megabytes()));
        reporter.progress(checkpoint::CONVERTED);

        reporter.progress(checkpoint::DISCOVERING);
        reporter.status(format!(
            "Looking for a running Unreal Editor (up to {}s)",
            self.settings.discovery_timeout.as_secs()
        ));
        let node = self.first_node().await?;
        reporter.status(format!("Found editor {}", node.label()));

        let command = ImportCommand::new(
            &converted.output,
            job.target_folder.clone(),
            asset_name.clone(),
            ImportOptions::from(&job.flags),
        );

        let mut session = self.connector.connect(&node).await?;
        reporter.progress(checkpoint::CONNECTED);
        reporter.status(format!("Connected to {}", node.node_id));

        reporter.progress(checkpoint::IMPORTING);
        reporter.status(format!("Importing {asset_name} into {}", job.target_folder));
        let reconciled = self.reconciler.reconcile(session.as_mut(), &command).await;
        if let Err(e) = session.close().await {
            warn!(node_id = %node.node_id, error = %e, "Failed to close editor session");
        }

        let mut delivered = self.interpret(reconciled, &command, reporter)?;
        reporter.progress(checkpoint::IMPORTED);

        if job.output_dir.is_some() {
            reporter.status(format!("FBX saved to {}", converted.output.display()));
        }
        if delivered.warning.is_none() {
            delivered.message = format!("{} ({:.2} MB FBX)", delivered.message, converted.output_megabytes());
        }
        Ok(delivered)
    }

    async fn convert(&self, job: &ImportJob, work_dir: &Path) -> Result<ConversionResult, JobError> {
        let output_dir = job.output_dir.clone().unwrap_or_else(|| work_dir.to_path_buf());
        let request = ConversionRequest {
            input: job.input_file.clone(),
            output: output_dir.join(job.fbx_file_name()),
            work_dir: work_dir.to_path_buf(),
            decimate_ratio: job.decimate_ratio,
            merge_children: job.flags.merge_child_meshes,
            timeout: self.settings.conversion_timeout,
        };
        debug!(output = %request.output.display(), "Starting conversion");
        Ok(self.converter.convert(&request).await?)
    }

    async fn first_node(&self) -> Result<DiscoveredNode, JobError> {
        let timeout = self.settings.discovery_timeout;
        self.discovery
            .discover(timeout)
            .await
            .into_iter()
            .next()
            .ok_or(JobError::DiscoveryTimeout { timeout })
    }

    /// Turn the reconciliation result into a delivery or a job error.
    fn interpret(
        &self,
        reconciled: Result<ReconcileReport, ReconcileError>,
        command: &ImportCommand,
        reporter: &JobReporter,
    ) -> Result<Delivered, JobError> {
        match reconciled {
            Ok(report) => {
                for line in &report.log {
                    reporter.status(format!("[Editor] {line}"));
                }
                Ok(Delivered {
                    message: format!(
                        "Imported {} into {} ({:?})",
                        command.asset_name, command.destination_folder, report.decision
                    ),
                    warning: None,
                })
            }
            Err(ReconcileError {
                step,
                source: WorkspaceError::ConnectionLostAfterSend { warning },
            }) if step.import_sent() => {
                reporter.status(format!("[Editor] {warning}"));
                Ok(Delivered {
                    message: format!(
                        "Import of {} into {} was sent; connection lost during {step}",
                        command.asset_name, command.destination_folder
                    ),
                    warning: Some(warning),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

async fn remove_work_dir(work_dir: &Path) {
    match tokio::fs::remove_dir_all(work_dir).await {
        Ok(()) => debug!(path = %work_dir.display(), "Removed job temp directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %work_dir.display(), error = %e, "Failed to remove job temp directory"),
    }
}
