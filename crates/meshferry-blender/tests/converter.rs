//! Process supervision tests against a shell-script stand-in for Blender.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use meshferry_blender::{BlenderConverter, ConversionError, ConversionRequest, SearchContext};

/// Write an executable fake `blender` whose body runs after argv parsing.
/// `$out` holds the `--output` argument.
fn fake_blender(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("blender");
    let script = format!(
        "#!/bin/sh\nout=\"\"\nfor arg in \"$@\"; do\n  if [ \"$prev\" = \"--output\" ]; then out=\"$arg\"; fi\n  prev=\"$arg\"\ndone\necho \"$@\" > \"{}\"\n{body}\n",
        dir.join("argv.txt").display()
    );
    std::fs::write(&path, script).expect("write fake blender");
    let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod");
    path
}

fn converter(executable: PathBuf) -> BlenderConverter {
    BlenderConverter::new(
        SearchContext {
            explicit: Some(executable),
            ..Default::default()
        },
        1,
    )
}

fn request(dir: &Path, timeout: Duration) -> ConversionRequest {
    let input = dir.join("Chair.glb");
    std::fs::write(&input, b"glTF").expect("write input");
    ConversionRequest {
        input,
        output: dir.join("out").join("Chair.fbx"),
        work_dir: dir.join("job"),
        decimate_ratio: 0.5,
        merge_children: true,
        timeout,
    }
}

#[tokio::test]
async fn test_successful_conversion_parses_report() {
    let temp = tempfile::tempdir().expect("tempdir");
    let blender = fake_blender(
        temp.path(),
        "echo 'Import finished'\necho 'meshferry: groups_merged=2'\necho 'meshferry: meshes_remaining=4'\necho 'meshferry: decimation=applied'\nprintf 'FBXDATA' > \"$out\"",
    );
    let req = request(temp.path(), Duration::from_secs(30));

    let result = converter(blender).convert(&req).await.expect("conversion");

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.output_bytes, 7);
    assert_eq!(result.report.groups_merged, Some(2));
    assert_eq!(result.report.meshes_remaining, Some(4));
    assert_eq!(result.report.decimation_skipped, Some(false));
    assert_eq!(result.stdout_tail(1), ["meshferry: decimation=applied"]);
    assert!(req.work_dir.join("mesh_process.py").is_file());

    let argv = std::fs::read_to_string(temp.path().join("argv.txt")).expect("argv");
    assert!(argv.starts_with("--background --python-exit-code 1 --python "));
    assert!(argv.contains("-- --input "));
    assert!(argv.contains("--decimate 0.5"));
    assert!(argv.trim_end().ends_with("--merge-children"));
}

#[tokio::test]
async fn test_nonzero_exit_reports_stderr_tail() {
    let temp = tempfile::tempdir().expect("tempdir");
    let blender = fake_blender(
        temp.path(),
        "i=0\nwhile [ $i -lt 30 ]; do echo \"err line $i\" >&2; i=$((i+1)); done\nexit 3",
    );
    let req = request(temp.path(), Duration::from_secs(30));

    let err = converter(blender).convert(&req).await.expect_err("must fail");
    match err {
        ConversionError::Failed { exit_code, stderr_tail } => {
            assert_eq!(exit_code, 3);
            let lines: Vec<_> = stderr_tail.lines().collect();
            assert_eq!(lines.len(), 20);
            assert_eq!(lines.first(), Some(&"err line 10"));
            assert_eq!(lines.last(), Some(&"err line 29"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_clean_exit_without_output_is_not_success() {
    let temp = tempfile::tempdir().expect("tempdir");
    let blender = fake_blender(temp.path(), "echo 'nothing exported'\nexit 0");
    let req = request(temp.path(), Duration::from_secs(30));

    let err = converter(blender).convert(&req).await.expect_err("must fail");
    assert!(matches!(err, ConversionError::ProducedNoOutput { .. }));
}

#[tokio::test]
async fn test_stale_output_from_earlier_run_is_not_success() {
    let temp = tempfile::tempdir().expect("tempdir");
    let blender = fake_blender(temp.path(), "echo 'did nothing'\nexit 0");
    let req = request(temp.path(), Duration::from_secs(30));
    std::fs::create_dir_all(req.output.parent().expect("parent")).expect("mkdir");
    std::fs::write(&req.output, b"FBX FROM A PREVIOUS RUN").expect("write stale output");

    let err = converter(blender).convert(&req).await.expect_err("must fail");
    assert!(matches!(err, ConversionError::ProducedNoOutput { .. }));
    assert!(!req.output.exists());
}

#[tokio::test]
async fn test_script_exception_fails_with_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    // Mirrors Blender: a script exception exits with the --python-exit-code value, else 0.
    let blender = fake_blender(
        temp.path(),
        "code=0\nprev=\"\"\nfor arg in \"$@\"; do\n  if [ \"$prev\" = \"--python-exit-code\" ]; then code=\"$arg\"; fi\n  prev=\"$arg\"\ndone\necho 'Traceback (most recent call last):' >&2\necho 'RuntimeError: glTF import failed' >&2\nexit $code",
    );
    let req = request(temp.path(), Duration::from_secs(30));

    let err = converter(blender).convert(&req).await.expect_err("must fail");
    match err {
        ConversionError::Failed { exit_code, stderr_tail } => {
            assert_eq!(exit_code, 1);
            assert!(stderr_tail.contains("glTF import failed"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_output_is_not_success() {
    let temp = tempfile::tempdir().expect("tempdir");
    let blender = fake_blender(temp.path(), ": > \"$out\"");
    let req = request(temp.path(), Duration::from_secs(30));

    let err = converter(blender).convert(&req).await.expect_err("must fail");
    match err {
        ConversionError::ProducedNoOutput { reason, .. } => assert!(reason.contains("empty")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_kills_process() {
    let temp = tempfile::tempdir().expect("tempdir");
    let blender = fake_blender(temp.path(), "exec sleep 30");
    let req = request(temp.path(), Duration::from_millis(500));

    let start = std::time::Instant::now();
    let err = converter(blender).convert(&req).await.expect_err("must time out");
    assert!(matches!(err, ConversionError::Timeout { .. }));
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_missing_input_is_reported() {
    let temp = tempfile::tempdir().expect("tempdir");
    let blender = fake_blender(temp.path(), "exit 0");
    let mut req = request(temp.path(), Duration::from_secs(30));
    req.input = temp.path().join("missing.glb");

    let err = converter(blender).convert(&req).await.expect_err("must fail");
    assert!(matches!(err, ConversionError::InputNotFound { .. }));
    assert!(!temp.path().join("argv.txt").exists());
}
