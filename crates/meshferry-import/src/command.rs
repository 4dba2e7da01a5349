//! The structured import payload.

use std::path::Path;

use meshferry_core::types::{ContentPath, ImportFlags};
use serde::{Deserialize, Serialize};

/// Importer options forwarded to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Import textures.
    pub import_textures: bool,
    /// Import materials.
    pub import_materials: bool,
    /// Combine meshes into one static mesh.
    pub combine_meshes: bool,
    /// Use complex geometry as simple collision.
    pub complex_as_simple_collision: bool,
}

impl From<&ImportFlags> for ImportOptions {
    fn from(flags: &ImportFlags) -> Self {
        Self {
            import_textures: flags.import_textures,
            import_materials: flags.import_materials,
            combine_meshes: flags.combine_meshes,
            complex_as_simple_collision: flags.complex_as_simple_collision,
        }
    }
}

/// One import: which file, where to, under what name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCommand {
    /// FBX on the editor's machine, forward-slash separated.
    pub source_file: String,
    /// Destination folder.
    pub destination_folder: ContentPath,
    /// Destination asset name.
    pub asset_name: String,
    /// Importer options.
    pub options: ImportOptions,
}

impl ImportCommand {
    /// Build a command for `fbx`, normalizing the path to forward slashes.
    pub fn new(
        fbx: &Path,
        destination_folder: ContentPath,
        asset_name: impl Into<String>,
        options: ImportOptions,
    ) -> Self {
        Self {
            source_file: normalize_source_path(&fbx.to_string_lossy()),
            destination_folder,
            asset_name: asset_name.into(),
            options,
        }
    }

    /// Final path of the main asset.
    pub fn asset_path(&self) -> Option<ContentPath> {
        self.destination_folder.join(&self.asset_name).ok()
    }

    /// The same import aimed at another folder.
    pub fn retarget(&self, folder: ContentPath) -> Self {
        Self {
            destination_folder: folder,
            ..self.clone()
        }
    }
}

/// Replace backslashes with forward slashes.
pub fn normalize_source_path(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ImportOptions {
        ImportOptions::from(&ImportFlags::default())
    }

    #[test]
    fn test_windows_path_is_normalized() {
        assert_eq!(
            normalize_source_path(r"C:\Users\artist\Temp\Chair.fbx"),
            "C:/Users/artist/Temp/Chair.fbx"
        );
    }

    #[test]
    fn test_asset_path_and_retarget() {
        let folder = ContentPath::parse("/Game/Imports").expect("path");
        let command = ImportCommand::new(Path::new("/tmp/Chair.fbx"), folder, "Chair", options());
        assert_eq!(command.asset_path().expect("asset").as_str(), "/Game/Imports/Chair");

        let staged = command.retarget(ContentPath::parse("/Game/Imports/__stage").expect("path"));
        assert_eq!(staged.asset_name, "Chair");
        assert_eq!(staged.destination_folder.as_str(), "/Game/Imports/__stage");
        assert_eq!(staged.source_file, "/tmp/Chair.fbx");
    }
}
