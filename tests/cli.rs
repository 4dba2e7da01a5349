//! Command-line behavior of the `meshferry` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

struct TestCli {
    temp: TempDir,
}

impl TestCli {
    fn new() -> Self {
        Self {
            temp: tempfile::tempdir().expect("tempdir"),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    fn write_config(&self, body: &str) -> PathBuf {
        let path = self.path("meshferry.toml");
        std::fs::write(&path, body).expect("write config");
        path
    }

    fn run(&self, config: &Path, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_meshferry"))
            .arg("--config")
            .arg(config)
            .args(args)
            .env_remove("BLENDER_PATH")
            .env_remove("MESHFERRY_CONFIG")
            .env("RUST_LOG", "off")
            .current_dir(self.temp.path())
            .output()
            .expect("run meshferry")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_generated_config_validates() {
    let cli = TestCli::new();
    let generated = cli.path("out/generated.toml");
    let missing = cli.path("absent.toml");

    let output = cli.run(&missing, &["config", "generate", "--output", generated.to_str().expect("utf8")]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(generated.is_file());

    let output = cli.run(&generated, &["config", "validate"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("is valid"));
    assert!(stdout(&output).contains("/Game/Imports"));
}

#[test]
fn test_invalid_config_exits_nonzero() {
    let cli = TestCli::new();
    let config = cli.write_config("[import]\ndecimate_ratio = 1.5\n");

    let output = cli.run(&config, &["config", "validate"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to load configuration"));
}

#[test]
fn test_locate_reports_configured_executable() {
    let cli = TestCli::new();
    let blender = cli.path("blender-bin");
    std::fs::write(&blender, b"#!/bin/sh\n").expect("write");
    let config = cli.write_config(&format!(
        "[blender]\nexecutable = {:?}\n",
        blender.to_str().expect("utf8")
    ));

    let output = cli.run(&config, &["--format", "json", "locate"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let found: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json");
    assert_eq!(found["executable"], blender.to_str().expect("utf8"));
    assert_eq!(found["method"], "explicit_config");
}

#[test]
fn test_convert_rejects_bad_ratio_before_running_blender() {
    let cli = TestCli::new();
    let config = cli.write_config("");

    let output = cli.run(
        &config,
        &["convert", "model.glb", "--output", "model.fbx", "--decimate", "2.5"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("decimate ratio"));
}
