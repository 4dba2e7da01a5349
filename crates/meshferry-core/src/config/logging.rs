//! `[logging]` section.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

const FORMATS: &[&str] = &["pretty", "compact", "json"];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset. Accepts a bare level or an
    /// `EnvFilter` directive such as `meshferry_remote=debug,info`.
    #[validate(length(min = 1))]
    pub level: String,
    #[validate(custom(function = "validate_format"))]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn validate_format(format: &str) -> Result<(), ValidationError> {
    if FORMATS.contains(&format) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_log_format"))
    }
}
