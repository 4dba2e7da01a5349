//! Default import job settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::types::ContentPath;

/// Defaults applied to import jobs created by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ImportConfig {
    /// Target content folder in the editor project.
    #[validate(custom(function = "validate_content_folder"))]
    pub content_folder: String,
    /// Decimation ratio passed to the headless mesh script.
    #[validate(range(min = 0.0, max = 1.0))]
    pub decimate_ratio: f64,
    /// Merge child meshes of each grouping node.
    pub merge_children: bool,
    /// Import materials.
    pub import_materials: bool,
    /// Import textures.
    pub import_textures: bool,
    /// Combine meshes into a single asset.
    pub combine_meshes: bool,
    /// Use complex geometry as simple collision.
    pub complex_collision: bool,
    /// Persistent directory for the intermediate FBX. Temporary when unset.
    pub output_dir: Option<PathBuf>,
    /// Name prefix of staging folders created during fresh imports.
    #[validate(length(min = 1, max = 64))]
    pub staging_prefix: String,
    /// Folder under the target that receives imported materials.
    #[validate(length(min = 1, max = 64))]
    pub materials_folder: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            content_folder: "/Game/Imports".to_string(),
            decimate_ratio: 1.0,
            merge_children: true,
            import_materials: true,
            import_textures: true,
            combine_meshes: true,
            complex_collision: false,
            output_dir: None,
            staging_prefix: "__meshferry_staging_".to_string(),
            materials_folder: "Materials".to_string(),
        }
    }
}

fn validate_content_folder(value: &str) -> Result<(), ValidationError> {
    ContentPath::parse(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("content_path"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ImportConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.merge_children);
        assert!(!config.complex_collision);
    }

    #[test]
    fn test_backslash_folder_rejected() {
        let config = ImportConfig {
            content_folder: "\\Game\\Imports".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_staging_prefix_rejected() {
        let config = ImportConfig {
            staging_prefix: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
