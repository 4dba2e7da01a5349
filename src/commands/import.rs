//! `meshferry import`: full conversion and delivery job.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use meshferry_core::config::AppConfig;
use meshferry_core::error::AppError;
use meshferry_core::events::{JobEventKind, JobOutcome};
use meshferry_core::types::{ContentPath, ImportJob};
use meshferry_pipeline::PipelineRunner;
use meshferry_remote::MulticastTransport;

use crate::output::{self, OutputFormat};

/// Arguments for the import command
#[derive(Debug, Args)]
pub struct ImportArgs {
    /// glTF binary (.glb) or glTF (.gltf) file
    pub file: PathBuf,

    /// Destination content folder, e.g. /Game/Props
    #[arg(short, long)]
    pub target: Option<String>,

    /// Decimation ratio (1.0 keeps every triangle)
    #[arg(short, long)]
    pub decimate: Option<f64>,

    /// Keep child meshes of group nodes separate
    #[arg(long)]
    pub no_merge_children: bool,

    /// Skip material import
    #[arg(long)]
    pub no_materials: bool,

    /// Skip texture import
    #[arg(long)]
    pub no_textures: bool,

    /// Use complex geometry as simple collision
    #[arg(long)]
    pub complex_collision: bool,

    /// Import meshes separately instead of combining them
    #[arg(long)]
    pub no_combine: bool,

    /// Keep the intermediate FBX in this directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Seconds to wait for a running editor
    #[arg(long)]
    pub discovery_timeout: Option<u64>,
}

impl ImportArgs {
    /// Job defaults from `config`, overridden by the command line.
    fn to_job(&self, config: &AppConfig) -> Result<ImportJob, AppError> {
        let mut job = ImportJob::from_config(&self.file, &config.import)?;

        if let Some(target) = &self.target {
            job.target_folder =
                ContentPath::parse(target).map_err(|e| AppError::validation(e.to_string()))?;
        }
        if let Some(ratio) = self.decimate {
            job.decimate_ratio = super::check_ratio(ratio)?;
        }
        if self.output_dir.is_some() {
            job.output_dir = self.output_dir.clone();
        }

        let flags = &mut job.flags;
        flags.merge_child_meshes &= !self.no_merge_children;
        flags.import_materials &= !self.no_materials;
        flags.import_textures &= !self.no_textures;
        flags.combine_meshes &= !self.no_combine;
        flags.complex_as_simple_collision |= self.complex_collision;

        job.validate()?;
        Ok(job)
    }
}

/// Execute the import command
pub async fn execute(args: &ImportArgs, mut config: AppConfig, format: OutputFormat) -> Result<(), AppError> {
    if let Some(seconds) = args.discovery_timeout {
        config.remote.discovery_timeout_seconds = seconds.max(1);
    }
    let job = args.to_job(&config)?;

    let transport = Arc::new(MulticastTransport::start(config.remote.clone()).await?);
    let runner = PipelineRunner::new(Arc::new(super::build_orchestrator(&config, transport.clone())));

    let mut handle = runner.submit(job)?;
    while let Some(event) = handle.next_event().await {
        match format {
            OutputFormat::Json => output::print_json_line(&event),
            OutputFormat::Pretty => match &event.kind {
                JobEventKind::Status { message } => output::print_timestamped(event.timestamp, message),
                JobEventKind::Progress { percent } => {
                    output::print_timestamped(event.timestamp, &format!("{percent:>3}%"))
                }
                JobEventKind::Finished { .. } => {}
            },
        }
    }
    let outcome = handle.wait().await;
    transport.shutdown().await;

    match outcome? {
        JobOutcome::Succeeded { message, warning } => {
            if format == OutputFormat::Pretty {
                output::print_success(&message);
                if let Some(warning) = warning {
                    output::print_warning(&warning);
                }
            }
            Ok(())
        }
        JobOutcome::Failed { kind, message } => Err(AppError::new(kind.error_kind(), format!("{kind}: {message}"))),
    }
}
