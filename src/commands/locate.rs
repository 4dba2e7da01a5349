//! `meshferry locate`: show the Blender installation in use.

use meshferry_blender::BlenderConverter;
use meshferry_core::config::AppConfig;
use meshferry_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Execute the locate command
pub fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let installation = BlenderConverter::from_config(&config.blender).locate()?;

    match format {
        OutputFormat::Json => output::print_json(&installation),
        OutputFormat::Pretty => {
            output::print_success("Blender found");
            output::print_kv("Executable", &installation.executable.display().to_string());
            output::print_kv(
                "Version",
                installation.version.as_deref().unwrap_or("unknown"),
            );
            output::print_kv("Found via", &format!("{:?}", installation.method));
        }
    }
    Ok(())
}
