//! Headless Blender configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Configuration for the Blender conversion stage.
///
/// If `executable` is not set, the tool locator searches the `BLENDER_PATH`
/// override variable, platform install directories, `PATH`, and the Steam
/// distribution in that order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BlenderConfig {
    /// Explicit Blender executable. Takes the place of `BLENDER_PATH`.
    pub executable: Option<PathBuf>,

    /// Timeout in seconds for a single Blender invocation.
    #[validate(range(min = 10, max = 7200))]
    pub timeout_seconds: u64,

    /// Minimum FBX size (bytes) to consider the conversion successful.
    #[validate(range(min = 1))]
    pub min_output_bytes: u64,

    /// Number of trailing Blender stdout lines surfaced as status lines.
    #[validate(range(max = 200))]
    pub log_tail_lines: usize,

    /// Root directory for temporary job working directories.
    pub temp_root: Option<PathBuf>,
}

impl Default for BlenderConfig {
    fn default() -> Self {
        Self {
            executable: None,
            timeout_seconds: 300,
            min_output_bytes: 1,
            log_tail_lines: 10,
            temp_root: None,
        }
    }
}

impl BlenderConfig {
    /// Subprocess deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Resolve the effective temp root directory.
    pub fn effective_temp_root(&self) -> PathBuf {
        self.temp_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("meshferry"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BlenderConfig::default();
        assert!(config.executable.is_none());
        assert_eq!(config.timeout(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_below_range_rejected() {
        let config = BlenderConfig {
            timeout_seconds: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_effective_temp_root_prefers_explicit() {
        let config = BlenderConfig {
            temp_root: Some(PathBuf::from("/scratch/mf")),
            ..Default::default()
        };
        assert_eq!(config.effective_temp_root(), PathBuf::from("/scratch/mf"));
    }
}
