//! Import reconciliation state machine.
//!
//! `CleaningStale -> Deciding -> {FreshImporting | Reimporting} ->
//! PostProcessing -> Done`. Every step runs against the [`Workspace`]
//! capability; the first failing step tags the error. There is no rollback,
//! except that a fresh import always removes its own staging folder.

use meshferry_core::config::ImportConfig;
use meshferry_core::types::ContentPath;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::ImportCommand;
use crate::error::{ReconcileError, ReconcileStep, WorkspaceError};
use crate::workspace::{AssetInfo, CollisionMode, Workspace};

/// Default staging folder prefix.
pub const DEFAULT_STAGING_PREFIX: &str = "__meshferry_staging_";

/// Default materials subfolder.
pub const DEFAULT_MATERIALS_FOLDER: &str = "Materials";

/// How the asset is brought in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportDecision {
    /// No asset at the final path: import through a staging folder.
    FreshImport,
    /// Asset exists: import directly over it.
    Reimport,
}

/// What a reconciliation did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Fresh import or reimport.
    pub decision: ImportDecision,
    /// Final paths of the imported assets.
    pub final_assets: Vec<ContentPath>,
    /// Leftover staging folders removed.
    pub stale_folders_removed: Vec<ContentPath>,
    /// Meshes whose collision mode was set.
    pub collision_updated: Vec<ContentPath>,
    /// Materials moved into the materials folder.
    pub materials_moved: Vec<ContentPath>,
    /// Human-readable progress lines.
    pub log: Vec<String>,
}

impl ReconcileReport {
    fn new(decision: ImportDecision) -> Self {
        Self {
            decision,
            final_assets: Vec::new(),
            stale_folders_removed: Vec::new(),
            collision_updated: Vec::new(),
            materials_moved: Vec::new(),
            log: Vec::new(),
        }
    }
}

/// Runs the import state machine.
#[derive(Debug, Clone)]
pub struct ImportReconciler {
    staging_prefix: String,
    materials_folder: String,
}

impl Default for ImportReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_STAGING_PREFIX, DEFAULT_MATERIALS_FOLDER)
    }
}

impl ImportReconciler {
    /// Create a reconciler with a staging prefix and materials folder name.
    pub fn new(staging_prefix: impl Into<String>, materials_folder: impl Into<String>) -> Self {
        Self {
            staging_prefix: staging_prefix.into(),
            materials_folder: materials_folder.into(),
        }
    }

    /// Staging prefix and materials folder from `config`.
    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(config.staging_prefix.clone(), config.materials_folder.clone())
    }

    /// Whether `name` is a staging folder name.
    pub fn is_staging_name(&self, name: &str) -> bool {
        name.strip_prefix(self.staging_prefix.as_str())
            .is_some_and(|suffix| !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_alphanumeric()))
    }

    /// Reconcile one import.
    pub async fn reconcile<W: Workspace + ?Sized>(
        &self,
        ws: &mut W,
        command: &ImportCommand,
    ) -> Result<ReconcileReport, ReconcileError> {
        let target = &command.destination_folder;
        let asset_path = target.join(&command.asset_name).map_err(|e| ReconcileError {
            step: ReconcileStep::Decide,
            source: WorkspaceError::Rejected {
                operation: "asset_path".to_string(),
                message: e.to_string(),
            },
        })?;

        let stale = self
            .clean_stale(ws, target)
            .await
            .map_err(ReconcileError::at(ReconcileStep::CleanStale))?;

        let decision = if ws
            .asset_exists(&asset_path)
            .await
            .map_err(ReconcileError::at(ReconcileStep::Decide))?
        {
            ImportDecision::Reimport
        } else {
            ImportDecision::FreshImport
        };

        let mut report = ReconcileReport::new(decision);
        for folder in &stale {
            report.log.push(format!("Removed leftover staging folder {folder}"));
        }
        report.stale_folders_removed = stale;
        info!(asset = %asset_path, ?decision, "Import decision");

        let imported = match decision {
            ImportDecision::Reimport => {
                report.log.push(format!("Reimporting over {asset_path}"));
                self.reimport(ws, command, &asset_path).await?
            }
            ImportDecision::FreshImport => {
                report.log.push(format!("Fresh import into {target}"));
                self.fresh_import(ws, command, &mut report).await?
            }
        };
        report.final_assets = imported.iter().map(|a| a.path.clone()).collect();

        if command.options.complex_as_simple_collision {
            for asset in imported.iter().filter(|a| a.class.is_mesh()) {
                ws.set_collision(&asset.path, CollisionMode::ComplexAsSimple)
                    .await
                    .map_err(ReconcileError::at(ReconcileStep::Collision))?;
                report.log.push(format!("Set complex-as-simple collision on {}", asset.path));
                report.collision_updated.push(asset.path.clone());
            }
        }

        if command.options.import_materials {
            self.relocate_materials(ws, target, &mut report)
                .await
                .map_err(ReconcileError::at(ReconcileStep::Materials))?;
        }

        report.log.push(format!(
            "Imported {} asset(s) into {target}",
            report.final_assets.len()
        ));
        Ok(report)
    }

    /// Remove every staging folder under `target`, index first, then disk.
    async fn clean_stale<W: Workspace + ?Sized>(
        &self,
        ws: &mut W,
        target: &ContentPath,
    ) -> Result<Vec<ContentPath>, WorkspaceError> {
        let mut removed = Vec::new();
        for folder in ws.list_folders(target).await? {
            if !self.is_staging_name(folder.name()) {
                continue;
            }
            debug!(folder = %folder, "Removing leftover staging folder");
            ws.delete_folder(&folder).await?;
            ws.remove_backing_storage(&folder).await?;
            removed.push(folder);
        }
        Ok(removed)
    }

    async fn reimport<W: Workspace + ?Sized>(
        &self,
        ws: &mut W,
        command: &ImportCommand,
        asset_path: &ContentPath,
    ) -> Result<Vec<AssetInfo>, ReconcileError> {
        let imported = ws
            .import(command)
            .await
            .map_err(ReconcileError::at(ReconcileStep::Reimport))?;

        let listed = ws
            .list_assets(&command.destination_folder, false)
            .await
            .map_err(ReconcileError::at(ReconcileStep::Reimport))?;

        Ok(listed
            .into_iter()
            .filter(|a| {
                if imported.is_empty() {
                    &a.path == asset_path
                } else {
                    imported.contains(&a.path)
                }
            })
            .collect())
    }

    /// Import into a fresh staging folder, move assets to their final
    /// names, then remove the staging folder. The staging folder is removed
    /// on failure too.
    async fn fresh_import<W: Workspace + ?Sized>(
        &self,
        ws: &mut W,
        command: &ImportCommand,
        report: &mut ReconcileReport,
    ) -> Result<Vec<AssetInfo>, ReconcileError> {
        let target = &command.destination_folder;
        let staging = self.staging_folder(target)?;
        debug!(staging = %staging, "Staging import");

        let moved = match self.stage_and_move(ws, command, &staging, report).await {
            Ok(moved) => moved,
            Err(e) => {
                if let Err(cleanup) = remove_folder(ws, &staging).await {
                    warn!(staging = %staging, error = %cleanup, "Failed to remove staging folder after error");
                }
                return Err(e);
            }
        };

        remove_folder(ws, &staging)
            .await
            .map_err(ReconcileError::at(ReconcileStep::RemoveStaging))?;
        report.log.push(format!("Removed staging folder {staging}"));
        Ok(moved)
    }

    async fn stage_and_move<W: Workspace + ?Sized>(
        &self,
        ws: &mut W,
        command: &ImportCommand,
        staging: &ContentPath,
        report: &mut ReconcileReport,
    ) -> Result<Vec<AssetInfo>, ReconcileError> {
        let target = &command.destination_folder;

        ws.import(&command.retarget(staging.clone()))
            .await
            .map_err(ReconcileError::at(ReconcileStep::StageImport))?;

        let staged = ws
            .list_assets(staging, false)
            .await
            .map_err(ReconcileError::at(ReconcileStep::StageImport))?;

        let mut finals = Vec::with_capacity(staged.len());
        for asset in staged {
            let name = strip_host_suffix(asset.path.name(), &command.asset_name);
            let destination = target.join(name).map_err(|e| ReconcileError {
                step: ReconcileStep::MoveFromStaging,
                source: WorkspaceError::Rejected {
                    operation: "rename_asset".to_string(),
                    message: e.to_string(),
                },
            })?;

            replace_with(ws, &asset.path, &destination)
                .await
                .map_err(ReconcileError::at(ReconcileStep::MoveFromStaging))?;

            if asset.path.name() != destination.name() {
                report.log.push(format!(
                    "Renamed {} to {} (host-appended suffix)",
                    asset.path.name(),
                    destination.name()
                ));
            }
            finals.push(AssetInfo {
                path: destination,
                class: asset.class,
            });
        }
        Ok(finals)
    }

    /// Move material-class assets directly under `target` into the
    /// materials folder.
    async fn relocate_materials<W: Workspace + ?Sized>(
        &self,
        ws: &mut W,
        target: &ContentPath,
        report: &mut ReconcileReport,
    ) -> Result<(), WorkspaceError> {
        let materials: Vec<AssetInfo> = ws
            .list_assets(target, false)
            .await?
            .into_iter()
            .filter(|a| a.class.is_material())
            .collect();
        if materials.is_empty() {
            debug!(target = %target, "No materials to relocate");
            return Ok(());
        }

        let folder = target
            .join(&self.materials_folder)
            .map_err(|e| WorkspaceError::Rejected {
                operation: "make_folder".to_string(),
                message: e.to_string(),
            })?;
        ws.make_folder(&folder).await?;

        for material in materials {
            let destination = folder
                .join(material.path.name())
                .map_err(|e| WorkspaceError::Rejected {
                    operation: "rename_asset".to_string(),
                    message: e.to_string(),
                })?;
            replace_with(ws, &material.path, &destination).await?;
            for asset in report.final_assets.iter_mut().filter(|a| **a == material.path) {
                *asset = destination.clone();
            }
            report.log.push(format!("Moved material {} to {folder}", material.path.name()));
            report.materials_moved.push(destination);
        }
        Ok(())
    }

    fn staging_folder(&self, target: &ContentPath) -> Result<ContentPath, ReconcileError> {
        let suffix = &Uuid::new_v4().simple().to_string()[..8];
        target
            .join(&format!("{}{suffix}", self.staging_prefix))
            .map_err(|e| ReconcileError {
                step: ReconcileStep::StageImport,
                source: WorkspaceError::Rejected {
                    operation: "make_folder".to_string(),
                    message: e.to_string(),
                },
            })
    }
}

/// Move `from` to `to`, deleting an existing asset at `to` and forcing a
/// garbage collection first so the path is free.
async fn replace_with<W: Workspace + ?Sized>(ws: &mut W, from: &ContentPath, to: &ContentPath) -> Result<(), WorkspaceError> {
    if from == to {
        return Ok(());
    }
    if ws.asset_exists(to).await? {
        debug!(path = %to, "Replacing existing asset");
        ws.delete_asset(to).await?;
        ws.collect_garbage().await?;
    }
    ws.rename_asset(from, to).await
}

async fn remove_folder<W: Workspace + ?Sized>(ws: &mut W, folder: &ContentPath) -> Result<(), WorkspaceError> {
    ws.delete_folder(folder).await?;
    ws.remove_backing_storage(folder).await
}

/// Undo a host-appended numeric suffix (`Name_1`, `Name1`) when the rest of
/// the name is exactly `intended`.
pub fn strip_host_suffix<'a>(name: &'a str, intended: &'a str) -> &'a str {
    let Some(rest) = name.strip_prefix(intended) else {
        return name;
    };
    let digits = rest.strip_prefix('_').unwrap_or(rest);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        intended
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_host_suffix() {
        assert_eq!(strip_host_suffix("Chair_1", "Chair"), "Chair");
        assert_eq!(strip_host_suffix("Chair12", "Chair"), "Chair");
        assert_eq!(strip_host_suffix("Chair", "Chair"), "Chair");
        assert_eq!(strip_host_suffix("Chair_", "Chair"), "Chair_");
        assert_eq!(strip_host_suffix("Chair_Leg", "Chair"), "Chair_Leg");
        assert_eq!(strip_host_suffix("Chair_Leg_1", "Chair"), "Chair_Leg_1");
        assert_eq!(strip_host_suffix("M_Wood_1", "Chair"), "M_Wood_1");
    }

    #[test]
    fn test_staging_names() {
        let reconciler = ImportReconciler::default();
        assert!(reconciler.is_staging_name("__meshferry_staging_a1b2c3d4"));
        assert!(!reconciler.is_staging_name("__meshferry_staging_"));
        assert!(!reconciler.is_staging_name("Materials"));
        assert!(!reconciler.is_staging_name("__meshferry_staging_a/b"));
    }

    #[test]
    fn test_staging_folder_is_prefix_plus_eight_hex() {
        let reconciler = ImportReconciler::default();
        let target = ContentPath::parse("/Game/Imports").expect("path");
        let staging = reconciler.staging_folder(&target).expect("staging");
        assert!(staging.is_child_of(&target));
        let suffix = staging
            .name()
            .strip_prefix(DEFAULT_STAGING_PREFIX)
            .expect("prefix");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
