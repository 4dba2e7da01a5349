//! The editor workspace capability.

use std::fmt;

use async_trait::async_trait;
use meshferry_core::types::ContentPath;
use meshferry_remote::DiscoveredNode;
use serde::{Deserialize, Serialize};

use crate::command::ImportCommand;
use crate::error::WorkspaceError;

/// Asset class as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetClass {
    /// `StaticMesh`.
    StaticMesh,
    /// `SkeletalMesh`.
    SkeletalMesh,
    /// `Material`.
    Material,
    /// `MaterialInstanceConstant`.
    MaterialInstance,
    /// `Texture2D` and other texture classes.
    Texture,
    /// Anything else.
    Other(String),
}

impl AssetClass {
    /// Whether collision settings apply.
    pub fn is_mesh(&self) -> bool {
        matches!(self, Self::StaticMesh)
    }

    /// Whether the asset belongs in the materials folder.
    pub fn is_material(&self) -> bool {
        matches!(self, Self::Material | Self::MaterialInstance)
    }

    /// Host class name.
    pub fn class_name(&self) -> &str {
        match self {
            Self::StaticMesh => "StaticMesh",
            Self::SkeletalMesh => "SkeletalMesh",
            Self::Material => "Material",
            Self::MaterialInstance => "MaterialInstanceConstant",
            Self::Texture => "Texture2D",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for AssetClass {
    fn from(name: String) -> Self {
        match name.as_str() {
            "StaticMesh" => Self::StaticMesh,
            "SkeletalMesh" => Self::SkeletalMesh,
            "Material" => Self::Material,
            "MaterialInstanceConstant" | "MaterialInstance" => Self::MaterialInstance,
            n if n.starts_with("Texture") => Self::Texture,
            _ => Self::Other(name),
        }
    }
}

impl From<AssetClass> for String {
    fn from(class: AssetClass) -> Self {
        class.class_name().to_string()
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// An asset in the content workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Package path, without the object suffix.
    pub path: ContentPath,
    /// Asset class.
    pub class: AssetClass,
}

/// Collision complexity for static meshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionMode {
    /// Project default.
    Default,
    /// Use complex geometry as simple collision.
    ComplexAsSimple,
}

/// Operations the reconciler needs from the editor.
///
/// Folder removal is split in two: [`Workspace::delete_folder`] drops the
/// folder from the virtual asset index, [`Workspace::remove_backing_storage`]
/// deletes its directory on disk. Both must run for a folder to be gone.
#[async_trait]
pub trait Workspace: Send {
    /// Direct subfolders, from the index and from backing storage.
    async fn list_folders(&mut self, folder: &ContentPath) -> Result<Vec<ContentPath>, WorkspaceError>;

    /// Assets under `folder`.
    async fn list_assets(&mut self, folder: &ContentPath, recursive: bool) -> Result<Vec<AssetInfo>, WorkspaceError>;

    /// Whether an asset exists at `path`.
    async fn asset_exists(&mut self, path: &ContentPath) -> Result<bool, WorkspaceError>;

    /// Run an import. Returns the imported asset paths.
    async fn import(&mut self, command: &ImportCommand) -> Result<Vec<ContentPath>, WorkspaceError>;

    /// Move an asset. The destination must not exist.
    async fn rename_asset(&mut self, from: &ContentPath, to: &ContentPath) -> Result<(), WorkspaceError>;

    /// Delete an asset.
    async fn delete_asset(&mut self, path: &ContentPath) -> Result<(), WorkspaceError>;

    /// Remove a folder and its contents from the index.
    async fn delete_folder(&mut self, path: &ContentPath) -> Result<(), WorkspaceError>;

    /// Delete a folder's directory on disk. Missing directories are fine.
    async fn remove_backing_storage(&mut self, path: &ContentPath) -> Result<(), WorkspaceError>;

    /// Create a folder if missing.
    async fn make_folder(&mut self, path: &ContentPath) -> Result<(), WorkspaceError>;

    /// Set and save the collision mode of a static mesh.
    async fn set_collision(&mut self, path: &ContentPath, mode: CollisionMode) -> Result<(), WorkspaceError>;

    /// Force garbage collection so deleted assets release their paths.
    async fn collect_garbage(&mut self) -> Result<(), WorkspaceError>;
}

/// A workspace bound to an exclusive editor session.
#[async_trait]
pub trait WorkspaceSession: Workspace {
    /// End the session.
    async fn close(self: Box<Self>) -> Result<(), WorkspaceError>;
}

/// Opens workspace sessions on discovered nodes.
#[async_trait]
pub trait WorkspaceConnector: Send + Sync {
    /// Open an exclusive session on `node`.
    async fn connect(&self, node: &DiscoveredNode) -> Result<Box<dyn WorkspaceSession>, WorkspaceError>;
}
