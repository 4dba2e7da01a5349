//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use meshferry_core::config::AppConfig;
use meshferry_core::error::AppError;

use crate::output::{self, OutputFormat};

const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Write the default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = super::DEFAULT_CONFIG_PATH)]
        output: String,
    },
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => match format {
            OutputFormat::Json => output::print_json(config),
            OutputFormat::Pretty => println!("{config:#?}"),
        },
        ConfigCommand::Validate => {
            output::print_success(&format!("Configuration '{config_path}' is valid"));
            output::print_kv("Blender", &describe_blender(config));
            output::print_kv(
                "Discovery",
                &format!(
                    "{}:{} ({}s)",
                    config.remote.multicast_group,
                    config.remote.multicast_port,
                    config.remote.discovery_timeout_seconds
                ),
            );
            output::print_kv("Command endpoint", &config.remote.command_endpoint().to_string());
            output::print_kv("Content folder", &config.import.content_folder);
        }
        ConfigCommand::Generate { output: out_path } => {
            if let Some(parent) = std::path::Path::new(out_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(out_path, DEFAULT_CONFIG).await?;
            output::print_success(&format!("Default config written to '{out_path}'"));
        }
    }

    Ok(())
}

fn describe_blender(config: &AppConfig) -> String {
    match &config.blender.executable {
        Some(path) => path.display().to_string(),
        None => "auto-detect".to_string(),
    }
}
