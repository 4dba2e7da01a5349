//! meshferry: glTF to FBX with headless Blender, delivered to a live Unreal
//! Editor.
//!
//! Entry point: parses the command line, loads configuration, initializes
//! logging and dispatches the subcommand.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use meshferry_core::config::AppConfig;

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config_path();

    let config = match AppConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            output::print_error(&format!("Failed to load configuration '{config_path}': {e}"));
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = cli.execute(config, &config_path).await {
        output::print_error(&e.to_string());
        if let Some(hint) = e.kind.hint() {
            output::print_kv("Hint", hint);
        }
        std::process::exit(1);
    }
}

/// Initialize tracing on stderr so command output on stdout stays clean.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .init();
        }
        "compact" => {
            fmt()
                .compact()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .init();
        }
    }
}
