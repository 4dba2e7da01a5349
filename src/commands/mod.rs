//! CLI command definitions and dispatch.

pub mod config;
pub mod convert;
pub mod import;
pub mod locate;
pub mod nodes;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use meshferry_blender::BlenderConverter;
use meshferry_core::config::AppConfig;
use meshferry_core::error::AppError;
use meshferry_import::{ImportReconciler, RemoteWorkspaceConnector};
use meshferry_pipeline::{PipelineOrchestrator, PipelineSettings};
use meshferry_remote::{CommandChannel, MulticastTransport, NodeDiscovery};

use crate::output::OutputFormat;

/// Default configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "MESHFERRY_CONFIG";

/// meshferry: convert glTF models with Blender and import them into Unreal
#[derive(Debug, Parser)]
#[command(name = "meshferry", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file [env: MESHFERRY_CONFIG] [default: config/default.toml]
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert a glTF file and import it into a running editor
    Import(import::ImportArgs),
    /// Convert a glTF file to FBX only
    Convert(convert::ConvertArgs),
    /// List running editors
    Nodes(nodes::NodesArgs),
    /// Show which Blender would be used
    Locate,
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Configuration file: `--config`, then `MESHFERRY_CONFIG`, then the default.
    pub fn config_path(&self) -> String {
        self.config
            .clone()
            .or_else(|| std::env::var(CONFIG_PATH_VAR).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig, config_path: &str) -> Result<(), AppError> {
        match &self.command {
            Commands::Import(args) => import::execute(args, config, self.format).await,
            Commands::Convert(args) => convert::execute(args, &config, self.format).await,
            Commands::Nodes(args) => nodes::execute(args, &config, self.format).await,
            Commands::Locate => locate::execute(&config, self.format),
            Commands::Config(args) => config::execute(args, &config, config_path, self.format).await,
        }
    }
}

/// Wire the live pipeline over a started multicast transport.
pub fn build_orchestrator(config: &AppConfig, transport: Arc<MulticastTransport>) -> PipelineOrchestrator {
    let discovery = NodeDiscovery::new(transport.clone(), config.remote.poll_interval());
    let channel = CommandChannel::new(transport, config.remote.command_timeout());

    PipelineOrchestrator::new(
        Arc::new(BlenderConverter::from_config(&config.blender)),
        discovery,
        Arc::new(RemoteWorkspaceConnector::new(channel)),
        ImportReconciler::from_config(&config.import),
        PipelineSettings::from_config(config),
    )
}

/// Reject decimation ratios outside `0.0..=1.0`.
pub fn check_ratio(ratio: f64) -> Result<f64, AppError> {
    if (0.0..=1.0).contains(&ratio) {
        Ok(ratio)
    } else {
        Err(AppError::validation(format!(
            "decimate ratio {ratio} is outside 0.0..=1.0"
        )))
    }
}
