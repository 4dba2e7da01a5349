//! Reconciliation behavior against the in-memory workspace.

use std::path::Path;

use meshferry_core::types::ContentPath;
use meshferry_import::{
    AssetClass, CollisionMode, ImportCommand, ImportDecision, ImportOptions, ImportReconciler,
    InMemoryWorkspace, ReconcileStep, SuffixQuirk, WorkspaceError,
};

const PREFIX: &str = "__meshferry_staging_";

fn path(value: &str) -> ContentPath {
    ContentPath::parse(value).expect("path")
}

fn options() -> ImportOptions {
    ImportOptions {
        import_textures: true,
        import_materials: true,
        combine_meshes: true,
        complex_as_simple_collision: false,
    }
}

fn chair_command(options: ImportOptions) -> ImportCommand {
    ImportCommand::new(
        Path::new("/tmp/job/Chair.fbx"),
        path("/Game/Props"),
        "Chair",
        options,
    )
}

fn staging_folders_created(ws: &InMemoryWorkspace) -> Vec<ContentPath> {
    ws.created_folders()
        .into_iter()
        .filter(|folder| folder.name().starts_with(PREFIX))
        .collect()
}

fn asset_paths(ws: &InMemoryWorkspace) -> Vec<String> {
    ws.assets().into_iter().map(|a| a.path.to_string()).collect()
}

#[tokio::test]
async fn test_fresh_import_goes_through_staging_and_cleans_up() {
    let mut ws = InMemoryWorkspace::new();
    let reconciler = ImportReconciler::default();

    let report = reconciler
        .reconcile(&mut ws, &chair_command(options()))
        .await
        .expect("reconcile");

    assert_eq!(report.decision, ImportDecision::FreshImport);
    assert_eq!(report.final_assets, vec![path("/Game/Props/Chair")]);
    assert_eq!(asset_paths(&ws), vec!["/Game/Props/Chair"]);

    let staged = staging_folders_created(&ws);
    assert_eq!(staged.len(), 1);
    assert!(!ws.has_folder(&staged[0]));
}

#[tokio::test]
async fn test_existing_asset_takes_reimport_path_without_staging() {
    let mut ws = InMemoryWorkspace::new().with_suffix_quirk(SuffixQuirk::Underscore);
    ws.seed_asset(&path("/Game/Props/Chair"), AssetClass::StaticMesh);
    let reconciler = ImportReconciler::default();

    let report = reconciler
        .reconcile(&mut ws, &chair_command(options()))
        .await
        .expect("reconcile");

    assert_eq!(report.decision, ImportDecision::Reimport);
    assert!(staging_folders_created(&ws).is_empty());
    assert_eq!(ws.count("rename_asset"), 0);
    assert_eq!(asset_paths(&ws), vec!["/Game/Props/Chair"]);
}

#[tokio::test]
async fn test_reimport_is_idempotent() {
    let mut ws = InMemoryWorkspace::new()
        .with_suffix_quirk(SuffixQuirk::Bare)
        .with_import_materials(["M_Wood", "MI_Varnish"]);
    let reconciler = ImportReconciler::default();
    let command = chair_command(options());

    let first = reconciler.reconcile(&mut ws, &command).await.expect("first");
    let after_first = asset_paths(&ws);
    let second = reconciler.reconcile(&mut ws, &command).await.expect("second");

    assert_eq!(first.decision, ImportDecision::FreshImport);
    assert_eq!(second.decision, ImportDecision::Reimport);
    assert_eq!(asset_paths(&ws), after_first);
    assert_eq!(
        after_first,
        vec![
            "/Game/Props/Chair",
            "/Game/Props/Materials/MI_Varnish",
            "/Game/Props/Materials/M_Wood",
        ]
    );
}

#[tokio::test]
async fn test_host_suffix_is_stripped_on_move() {
    for quirk in [SuffixQuirk::Underscore, SuffixQuirk::Bare] {
        let mut ws = InMemoryWorkspace::new().with_suffix_quirk(quirk);
        let report = ImportReconciler::default()
            .reconcile(&mut ws, &chair_command(options()))
            .await
            .expect("reconcile");

        assert_eq!(report.final_assets, vec![path("/Game/Props/Chair")]);
        assert!(ws.contains_asset(&path("/Game/Props/Chair")));
        assert!(report.log.iter().any(|line| line.contains("host-appended suffix")));
    }
}

#[tokio::test]
async fn test_leftover_staging_folders_are_swept_first() {
    let mut ws = InMemoryWorkspace::new();
    let leftover = path(&format!("/Game/Props/{PREFIX}deadbeef"));
    let disk_only = path(&format!("/Game/Props/{PREFIX}0badf00d"));
    ws.seed_asset(&leftover.join("Chair_1").expect("join"), AssetClass::StaticMesh);
    ws.seed_backing_only(&disk_only);
    ws.seed_folder(&path("/Game/Props/Keep"));

    let report = ImportReconciler::default()
        .reconcile(&mut ws, &chair_command(options()))
        .await
        .expect("reconcile");

    assert_eq!(report.stale_folders_removed, vec![disk_only.clone(), leftover.clone()]);
    assert!(!ws.has_folder(&leftover));
    assert!(!ws.has_folder(&disk_only));
    assert!(ws.has_folder(&path("/Game/Props/Keep")));

    let ops = ws.operations();
    let first_import = ops.iter().position(|op| op.starts_with("import ")).expect("import");
    let last_sweep = ops
        .iter()
        .rposition(|op| op == &format!("remove_backing_storage {leftover}"))
        .expect("sweep");
    assert!(last_sweep < first_import);
}

#[tokio::test]
async fn test_sweep_runs_even_when_asset_exists() {
    let mut ws = InMemoryWorkspace::new();
    ws.seed_asset(&path("/Game/Props/Chair"), AssetClass::StaticMesh);
    ws.seed_folder(&path(&format!("/Game/Props/{PREFIX}abc123")));

    let report = ImportReconciler::default()
        .reconcile(&mut ws, &chair_command(options()))
        .await
        .expect("reconcile");

    assert_eq!(report.decision, ImportDecision::Reimport);
    assert_eq!(report.stale_folders_removed.len(), 1);
}

#[tokio::test]
async fn test_failed_move_still_removes_staging() {
    let mut ws = InMemoryWorkspace::new();
    ws.fail_on("rename_asset");

    let err = ImportReconciler::default()
        .reconcile(&mut ws, &chair_command(options()))
        .await
        .expect_err("must fail");

    assert_eq!(err.step, ReconcileStep::MoveFromStaging);
    let staged = staging_folders_created(&ws);
    assert_eq!(staged.len(), 1);
    assert!(!ws.has_folder(&staged[0]));
}

#[tokio::test]
async fn test_failed_stale_sweep_is_tagged() {
    let mut ws = InMemoryWorkspace::new();
    ws.seed_folder(&path(&format!("/Game/Props/{PREFIX}abc123")));
    ws.fail_on("remove_backing_storage");

    let err = ImportReconciler::default()
        .reconcile(&mut ws, &chair_command(options()))
        .await
        .expect_err("must fail");

    assert_eq!(err.step, ReconcileStep::CleanStale);
    assert_eq!(ws.count("import"), 0);
}

#[tokio::test]
async fn test_replacing_material_deletes_and_collects_before_move() {
    let mut ws = InMemoryWorkspace::new().with_import_materials(["M_Wood"]);
    ws.seed_asset(&path("/Game/Props/Materials/M_Wood"), AssetClass::Material);

    let report = ImportReconciler::default()
        .reconcile(&mut ws, &chair_command(options()))
        .await
        .expect("reconcile");

    assert_eq!(report.materials_moved, vec![path("/Game/Props/Materials/M_Wood")]);
    let ops = ws.operations();
    let delete = ops
        .iter()
        .position(|op| op == "delete_asset /Game/Props/Materials/M_Wood")
        .expect("delete");
    let rename = ops
        .iter()
        .position(|op| op == "rename_asset /Game/Props/M_Wood -> /Game/Props/Materials/M_Wood")
        .expect("rename");
    assert!(ops[delete..rename].iter().any(|op| op.starts_with("collect_garbage")));
}

#[tokio::test]
async fn test_materials_skipped_when_none_imported() {
    let mut ws = InMemoryWorkspace::new();

    let report = ImportReconciler::default()
        .reconcile(&mut ws, &chair_command(options()))
        .await
        .expect("reconcile");

    assert!(report.materials_moved.is_empty());
    assert!(!ws.has_folder(&path("/Game/Props/Materials")));
}

#[tokio::test]
async fn test_collision_applies_to_meshes_only() {
    let mut ws = InMemoryWorkspace::new().with_import_materials(["M_Wood"]);
    let command = chair_command(ImportOptions {
        complex_as_simple_collision: true,
        ..options()
    });

    let report = ImportReconciler::default()
        .reconcile(&mut ws, &command)
        .await
        .expect("reconcile");

    assert_eq!(report.collision_updated, vec![path("/Game/Props/Chair")]);
    assert_eq!(
        ws.collision(&path("/Game/Props/Chair")),
        Some(CollisionMode::ComplexAsSimple)
    );
}

#[tokio::test]
async fn test_connection_loss_surfaces_from_workspace() {
    let mut ws = InMemoryWorkspace::new();
    ws.drop_connection_on("import");

    let err = ImportReconciler::default()
        .reconcile(&mut ws, &chair_command(options()))
        .await
        .expect_err("stops");

    assert!(matches!(err.source, WorkspaceError::ConnectionLostAfterSend { .. }));
}
