//! Import job description.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::content_path::ContentPath;
use super::id::JobId;
use crate::config::ImportConfig;
use crate::error::AppError;

/// Import toggles forwarded to the conversion stage and the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFlags {
    /// Merge child meshes of each grouping node during conversion.
    pub merge_child_meshes: bool,
    /// Import materials and move them into the materials folder.
    pub import_materials: bool,
    /// Import textures.
    pub import_textures: bool,
    /// Use complex geometry as simple collision on imported meshes.
    pub complex_as_simple_collision: bool,
    /// Combine meshes into a single static mesh.
    pub combine_meshes: bool,
}

impl Default for ImportFlags {
    fn default() -> Self {
        Self {
            merge_child_meshes: true,
            import_materials: true,
            import_textures: true,
            complex_as_simple_collision: false,
            combine_meshes: true,
        }
    }
}

impl From<&ImportConfig> for ImportFlags {
    fn from(config: &ImportConfig) -> Self {
        Self {
            merge_child_meshes: config.merge_children,
            import_materials: config.import_materials,
            import_textures: config.import_textures,
            complex_as_simple_collision: config.complex_collision,
            combine_meshes: config.combine_meshes,
        }
    }
}

/// One end-to-end conversion and import request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    /// Job identifier.
    pub id: JobId,
    /// Source `.glb`/`.gltf` file.
    pub input_file: PathBuf,
    /// Decimation ratio in `0.0..=1.0`; `1.0` keeps the mesh untouched.
    pub decimate_ratio: f64,
    /// Import toggles.
    pub flags: ImportFlags,
    /// Destination folder in the editor project.
    pub target_folder: ContentPath,
    /// Persistent location for the intermediate FBX.
    pub output_dir: Option<PathBuf>,
}

impl ImportJob {
    /// Create a job with the defaults from `config`.
    pub fn from_config(input_file: impl Into<PathBuf>, config: &ImportConfig) -> Result<Self, AppError> {
        let target_folder = ContentPath::parse(&config.content_folder)
            .map_err(|e| AppError::validation(e.to_string()))?;
        let job = Self {
            id: JobId::new(),
            input_file: input_file.into(),
            decimate_ratio: config.decimate_ratio,
            flags: ImportFlags::from(config),
            target_folder,
            output_dir: config.output_dir.clone(),
        };
        job.validate()?;
        Ok(job)
    }

    /// Check field invariants.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(0.0..=1.0).contains(&self.decimate_ratio) {
            return Err(AppError::validation(format!(
                "decimate ratio {} is outside 0.0..=1.0",
                self.decimate_ratio
            )));
        }
        if self.input_file.as_os_str().is_empty() {
            return Err(AppError::validation("input file path is empty"));
        }
        if self.asset_name().is_none() {
            return Err(AppError::validation(format!(
                "cannot derive an asset name from '{}'",
                self.input_file.display()
            )));
        }
        Ok(())
    }

    /// Asset name: the input file stem.
    pub fn asset_name(&self) -> Option<String> {
        self.input_file
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// File name of the intermediate FBX.
    pub fn fbx_file_name(&self) -> String {
        format!("{}.fbx", self.asset_name().unwrap_or_else(|| self.id.short()))
    }

    /// Whether the input file has a glTF extension.
    pub fn has_gltf_extension(&self) -> bool {
        has_gltf_extension(&self.input_file)
    }
}

fn has_gltf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("glb") || e.eq_ignore_ascii_case("gltf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_applies_defaults() {
        let job = ImportJob::from_config("/tmp/Chair.glb", &ImportConfig::default()).expect("job");
        assert_eq!(job.target_folder.as_str(), "/Game/Imports");
        assert_eq!(job.asset_name().as_deref(), Some("Chair"));
        assert_eq!(job.fbx_file_name(), "Chair.fbx");
        assert!(job.flags.merge_child_meshes);
        assert!(job.has_gltf_extension());
    }

    #[test]
    fn test_ratio_out_of_range_rejected() {
        let mut job = ImportJob::from_config("/tmp/Chair.glb", &ImportConfig::default()).expect("job");
        job.decimate_ratio = -0.1;
        assert!(job.validate().is_err());
        job.decimate_ratio = f64::NAN;
        assert!(job.validate().is_err());
    }

    #[test]
    fn test_extension_check_is_case_insensitive() {
        assert!(has_gltf_extension(Path::new("a/B.GLB")));
        assert!(has_gltf_extension(Path::new("a/B.gltf")));
        assert!(!has_gltf_extension(Path::new("a/B.obj")));
    }
}
