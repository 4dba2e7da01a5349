//! In-memory model of the editor's content workspace.
//!
//! Models the host behaviors reconciliation has to cope with: a virtual
//! index that is separate from backing storage, deleted assets that keep
//! their path reserved until garbage collection, and auto-renaming of newly
//! created assets.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use meshferry_core::types::ContentPath;
use meshferry_remote::DiscoveredNode;
use meshferry_remote::channel::CONNECTION_LOST_WARNING;

use crate::command::ImportCommand;
use crate::error::WorkspaceError;
use crate::workspace::{
    AssetClass, AssetInfo, CollisionMode, Workspace, WorkspaceConnector, WorkspaceSession,
};

/// How the modeled host renames newly created meshes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SuffixQuirk {
    /// Keep the requested name.
    #[default]
    None,
    /// Append `_1`.
    Underscore,
    /// Append `1`.
    Bare,
}

impl SuffixQuirk {
    fn apply(self, name: &str) -> String {
        match self {
            Self::None => name.to_string(),
            Self::Underscore => format!("{name}_1"),
            Self::Bare => format!("{name}1"),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    assets: BTreeMap<ContentPath, AssetClass>,
    folders: BTreeSet<ContentPath>,
    backing: BTreeSet<ContentPath>,
    pending_gc: BTreeSet<ContentPath>,
    collisions: BTreeMap<ContentPath, CollisionMode>,
    quirk: SuffixQuirk,
    materials: Vec<String>,
    textures: Vec<String>,
    failing: HashSet<String>,
    dropping: HashSet<String>,
    operations: Vec<String>,
    created_folders: Vec<ContentPath>,
    connects: usize,
    closed: bool,
}

impl State {
    fn begin(&mut self, op: &str, detail: impl std::fmt::Display) -> Result<(), WorkspaceError> {
        self.operations.push(format!("{op} {detail}"));
        if self.failing.contains(op) {
            return Err(WorkspaceError::Rejected {
                operation: op.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn finish<T>(&self, op: &str, value: T) -> Result<T, WorkspaceError> {
        if self.dropping.contains(op) {
            return Err(WorkspaceError::ConnectionLostAfterSend {
                warning: CONNECTION_LOST_WARNING.to_string(),
            });
        }
        Ok(value)
    }

    fn ensure_folder(&mut self, folder: &ContentPath) {
        let mut current = Some(folder.clone());
        while let Some(path) = current {
            current = path.parent();
            if self.folders.insert(path.clone()) {
                self.created_folders.push(path.clone());
            }
            self.backing.insert(path);
        }
    }

    fn is_reserved(&self, path: &ContentPath) -> bool {
        self.assets.contains_key(path) || self.pending_gc.contains(path)
    }

    /// Create or replace an asset. New assets may be renamed by the host.
    fn create(&mut self, folder: &ContentPath, name: &str, class: AssetClass, quirk: SuffixQuirk) -> Option<ContentPath> {
        let requested = folder.join(name).ok()?;
        if self.assets.contains_key(&requested) {
            self.assets.insert(requested.clone(), class);
            return Some(requested);
        }
        let mut candidate = folder.join(&quirk.apply(name)).ok()?;
        let mut n = 1;
        while self.is_reserved(&candidate) {
            n += 1;
            candidate = folder.join(&format!("{name}_{n}")).ok()?;
        }
        self.assets.insert(candidate.clone(), class);
        Some(candidate)
    }

    fn drop_asset(&mut self, path: &ContentPath) {
        if self.assets.remove(path).is_some() {
            self.pending_gc.insert(path.clone());
        }
        self.collisions.remove(path);
    }
}

fn is_under(path: &ContentPath, folder: &ContentPath) -> bool {
    path == folder
        || path
            .as_str()
            .strip_prefix(folder.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Shared, cloneable in-memory workspace.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkspace {
    state: Arc<Mutex<State>>,
}

impl InMemoryWorkspace {
    /// An empty workspace.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rename newly imported meshes the way some hosts do.
    pub fn with_suffix_quirk(self, quirk: SuffixQuirk) -> Self {
        self.state().quirk = quirk;
        self
    }

    /// Materials produced by each import that requests them.
    pub fn with_import_materials<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().materials = names.into_iter().map(Into::into).collect();
        self
    }

    /// Textures produced by each import that requests them.
    pub fn with_import_textures<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().textures = names.into_iter().map(Into::into).collect();
        self
    }

    /// Make every call of `operation` fail.
    pub fn fail_on(&self, operation: &str) {
        self.state().failing.insert(operation.to_string());
    }

    /// Make every call of `operation` run, then lose the connection.
    pub fn drop_connection_on(&self, operation: &str) {
        self.state().dropping.insert(operation.to_string());
    }

    /// Add an existing asset.
    pub fn seed_asset(&self, path: &ContentPath, class: AssetClass) {
        let mut state = self.state();
        if let Some(parent) = path.parent() {
            state.ensure_folder(&parent);
        }
        state.assets.insert(path.clone(), class);
    }

    /// Add a folder present in the index and on disk.
    pub fn seed_folder(&self, path: &ContentPath) {
        self.state().ensure_folder(path);
    }

    /// Add a directory present on disk only.
    pub fn seed_backing_only(&self, path: &ContentPath) {
        self.state().backing.insert(path.clone());
    }

    /// Every asset, sorted by path.
    pub fn assets(&self) -> Vec<AssetInfo> {
        self.state()
            .assets
            .iter()
            .map(|(path, class)| AssetInfo {
                path: path.clone(),
                class: class.clone(),
            })
            .collect()
    }

    /// Whether an asset exists.
    pub fn contains_asset(&self, path: &ContentPath) -> bool {
        self.state().assets.contains_key(path)
    }

    /// Whether the folder exists in the index or on disk.
    pub fn has_folder(&self, path: &ContentPath) -> bool {
        let state = self.state();
        state.folders.contains(path) || state.backing.contains(path)
    }

    /// Collision mode set on a mesh.
    pub fn collision(&self, path: &ContentPath) -> Option<CollisionMode> {
        self.state().collisions.get(path).copied()
    }

    /// Operation log, one `"<op> <detail>"` entry per call.
    pub fn operations(&self) -> Vec<String> {
        self.state().operations.clone()
    }

    /// Number of calls of `operation`.
    pub fn count(&self, operation: &str) -> usize {
        let prefix = format!("{operation} ");
        self.state()
            .operations
            .iter()
            .filter(|entry| entry.starts_with(&prefix))
            .count()
    }

    /// Every folder ever created, in creation order.
    pub fn created_folders(&self) -> Vec<ContentPath> {
        self.state().created_folders.clone()
    }

    /// Sessions opened through [`WorkspaceConnector`].
    pub fn connects(&self) -> usize {
        self.state().connects
    }

    /// Whether the last session was closed.
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

#[async_trait]
impl Workspace for InMemoryWorkspace {
    async fn list_folders(&mut self, folder: &ContentPath) -> Result<Vec<ContentPath>, WorkspaceError> {
        let mut state = self.state();
        state.begin("list_folders", folder)?;
        let children: BTreeSet<ContentPath> = state
            .folders
            .iter()
            .chain(state.backing.iter())
            .filter(|path| path.is_child_of(folder))
            .cloned()
            .collect();
        state.finish("list_folders", children.into_iter().collect())
    }

    async fn list_assets(&mut self, folder: &ContentPath, recursive: bool) -> Result<Vec<AssetInfo>, WorkspaceError> {
        let mut state = self.state();
        state.begin("list_assets", folder)?;
        let assets = state
            .assets
            .iter()
            .filter(|(path, _)| {
                if recursive {
                    is_under(path, folder) && *path != folder
                } else {
                    path.is_child_of(folder)
                }
            })
            .map(|(path, class)| AssetInfo {
                path: path.clone(),
                class: class.clone(),
            })
            .collect();
        state.finish("list_assets", assets)
    }

    async fn asset_exists(&mut self, path: &ContentPath) -> Result<bool, WorkspaceError> {
        let mut state = self.state();
        state.begin("asset_exists", path)?;
        let exists = state.assets.contains_key(path);
        state.finish("asset_exists", exists)
    }

    async fn import(&mut self, command: &ImportCommand) -> Result<Vec<ContentPath>, WorkspaceError> {
        let mut state = self.state();
        state.begin("import", &command.destination_folder)?;
        let folder = command.destination_folder.clone();
        state.ensure_folder(&folder);

        let quirk = state.quirk;
        let mut imported = Vec::new();
        imported.extend(state.create(&folder, &command.asset_name, AssetClass::StaticMesh, quirk));
        if command.options.import_materials {
            for name in state.materials.clone() {
                imported.extend(state.create(&folder, &name, AssetClass::Material, SuffixQuirk::None));
            }
        }
        if command.options.import_textures {
            for name in state.textures.clone() {
                imported.extend(state.create(&folder, &name, AssetClass::Texture, SuffixQuirk::None));
            }
        }
        if imported.is_empty() {
            return Err(WorkspaceError::Rejected {
                operation: "import".to_string(),
                message: format!("invalid asset name '{}'", command.asset_name),
            });
        }
        state.finish("import", imported)
    }

    async fn rename_asset(&mut self, from: &ContentPath, to: &ContentPath) -> Result<(), WorkspaceError> {
        let mut state = self.state();
        state.begin("rename_asset", format!("{from} -> {to}"))?;
        if state.is_reserved(to) {
            return Err(WorkspaceError::Rejected {
                operation: "rename_asset".to_string(),
                message: format!("destination {to} is in use"),
            });
        }
        let Some(class) = state.assets.remove(from) else {
            return Err(WorkspaceError::Rejected {
                operation: "rename_asset".to_string(),
                message: format!("no asset at {from}"),
            });
        };
        if let Some(parent) = to.parent() {
            state.ensure_folder(&parent);
        }
        state.assets.insert(to.clone(), class);
        if let Some(mode) = state.collisions.remove(from) {
            state.collisions.insert(to.clone(), mode);
        }
        state.finish("rename_asset", ())
    }

    async fn delete_asset(&mut self, path: &ContentPath) -> Result<(), WorkspaceError> {
        let mut state = self.state();
        state.begin("delete_asset", path)?;
        if !state.assets.contains_key(path) {
            return Err(WorkspaceError::Rejected {
                operation: "delete_asset".to_string(),
                message: format!("no asset at {path}"),
            });
        }
        state.drop_asset(path);
        state.finish("delete_asset", ())
    }

    async fn delete_folder(&mut self, path: &ContentPath) -> Result<(), WorkspaceError> {
        let mut state = self.state();
        state.begin("delete_folder", path)?;
        let doomed: Vec<ContentPath> = state
            .assets
            .keys()
            .filter(|asset| is_under(asset, path))
            .cloned()
            .collect();
        for asset in &doomed {
            state.drop_asset(asset);
        }
        state.folders.retain(|folder| !is_under(folder, path));
        state.finish("delete_folder", ())
    }

    async fn remove_backing_storage(&mut self, path: &ContentPath) -> Result<(), WorkspaceError> {
        let mut state = self.state();
        state.begin("remove_backing_storage", path)?;
        state.backing.retain(|folder| !is_under(folder, path));
        state.finish("remove_backing_storage", ())
    }

    async fn make_folder(&mut self, path: &ContentPath) -> Result<(), WorkspaceError> {
        let mut state = self.state();
        state.begin("make_folder", path)?;
        state.ensure_folder(path);
        state.finish("make_folder", ())
    }

    async fn set_collision(&mut self, path: &ContentPath, mode: CollisionMode) -> Result<(), WorkspaceError> {
        let mut state = self.state();
        state.begin("set_collision", path)?;
        if !matches!(state.assets.get(path), Some(AssetClass::StaticMesh)) {
            return Err(WorkspaceError::Rejected {
                operation: "set_collision".to_string(),
                message: format!("{path} is not a static mesh"),
            });
        }
        state.collisions.insert(path.clone(), mode);
        state.finish("set_collision", ())
    }

    async fn collect_garbage(&mut self) -> Result<(), WorkspaceError> {
        let mut state = self.state();
        state.begin("collect_garbage", "")?;
        state.pending_gc.clear();
        state.finish("collect_garbage", ())
    }
}

#[async_trait]
impl WorkspaceSession for InMemoryWorkspace {
    async fn close(self: Box<Self>) -> Result<(), WorkspaceError> {
        self.state().closed = true;
        Ok(())
    }
}

#[async_trait]
impl WorkspaceConnector for InMemoryWorkspace {
    async fn connect(&self, _node: &DiscoveredNode) -> Result<Box<dyn WorkspaceSession>, WorkspaceError> {
        {
            let mut state = self.state();
            state.connects += 1;
            state.closed = false;
        }
        Ok(Box::new(self.clone()))
    }
}
