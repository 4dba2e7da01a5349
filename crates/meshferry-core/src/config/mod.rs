//! Application configuration schemas.
//!
//! All configuration structs are deserialized from an optional TOML file via
//! the `config` crate, layered under `MESHFERRY__`-prefixed environment
//! variables. Every section carries serde defaults so an empty file (or no
//! file at all) yields a usable configuration.

pub mod blender;
pub mod import;
pub mod logging;
pub mod remote;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::blender::BlenderConfig;
pub use self::import::ImportConfig;
pub use self::logging::LoggingConfig;
pub use self::remote::RemoteConfig;

use crate::error::AppError;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "MESHFERRY";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    /// Logging settings.
    #[validate(nested)]
    pub logging: LoggingConfig,
    /// Headless Blender settings.
    #[validate(nested)]
    pub blender: BlenderConfig,
    /// Editor remote-execution settings.
    #[validate(nested)]
    pub remote: RemoteConfig,
    /// Default import job settings.
    #[validate(nested)]
    pub import: ImportConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file and the environment.
    ///
    /// The file is optional; `MESHFERRY__<SECTION>__<KEY>` variables override
    /// file values. The merged result is validated before being returned.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let app: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        app.validate()?;
        tracing::debug!(path, "Configuration loaded");
        Ok(app)
    }
}
