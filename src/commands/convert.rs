//! `meshferry convert`: run the Blender stage only.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use meshferry_blender::{BlenderConverter, ConversionRequest, MeshReport};
use meshferry_core::config::AppConfig;
use meshferry_core::error::AppError;
use meshferry_core::types::JobId;

use crate::output::{self, OutputFormat};

/// Arguments for the convert command
#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// glTF binary (.glb) or glTF (.gltf) file
    pub file: PathBuf,

    /// FBX file to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// Decimation ratio (1.0 keeps every triangle)
    #[arg(short, long)]
    pub decimate: Option<f64>,

    /// Keep child meshes of group nodes separate
    #[arg(long)]
    pub no_merge_children: bool,
}

#[derive(Debug, Serialize)]
struct ConvertSummary {
    output: PathBuf,
    bytes: u64,
    elapsed_ms: u64,
    report: MeshReport,
}

/// Execute the convert command
pub async fn execute(args: &ConvertArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let ratio = super::check_ratio(args.decimate.unwrap_or(config.import.decimate_ratio))?;
    let work_dir = config
        .blender
        .effective_temp_root()
        .join(format!("convert-{}", JobId::new().short()));

    let request = ConversionRequest {
        input: args.file.clone(),
        output: args.output.clone(),
        work_dir: work_dir.clone(),
        decimate_ratio: ratio,
        merge_children: config.import.merge_children && !args.no_merge_children,
        timeout: config.blender.timeout(),
    };

    let converter = BlenderConverter::from_config(&config.blender);
    let result = converter.convert(&request).await;

    if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
        tracing::debug!(path = %work_dir.display(), error = %e, "Work directory not removed");
    }
    let result = result?;

    match format {
        OutputFormat::Json => output::print_json(&ConvertSummary {
            output: result.output.clone(),
            bytes: result.output_bytes,
            elapsed_ms: result.elapsed.as_millis() as u64,
            report: result.report.clone(),
        }),
        OutputFormat::Pretty => {
            for line in result.stdout_tail(config.blender.log_tail_lines) {
                println!("[Blender] {line}");
            }
            output::print_success(&format!("Wrote {}", result.output.display()));
            output::print_kv("Size", &format!("{:.2} MB", result.output_megabytes()));
            output::print_kv("Elapsed", &format!("{:.1}s", result.elapsed.as_secs_f64()));
            if let Some(groups) = result.report.groups_merged {
                output::print_kv("Groups merged", &groups.to_string());
            }
            if let Some(meshes) = result.report.meshes_remaining {
                output::print_kv("Meshes", &meshes.to_string());
            }
            if result.report.decimation_skipped == Some(true) {
                output::print_kv("Decimation", "skipped");
            }
        }
    }
    Ok(())
}
