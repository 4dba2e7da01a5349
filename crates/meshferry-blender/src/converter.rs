//! Headless Blender process supervision.
//!
//! Each conversion materializes the bundled mesh script into the job's
//! working directory, runs Blender in background mode with piped output,
//! races completion against the deadline and validates the produced FBX.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use meshferry_core::config::BlenderConfig;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ConversionError, LocateError};
use crate::locator::{BlenderDiscovery, BlenderInstallation, SearchContext};
use crate::report::{self, MeshReport};

/// The bundled scene processing script.
const MESH_SCRIPT: &str = include_str!("../scripts/mesh_process.py");

/// File name the script is written under in the working directory.
pub const SCRIPT_FILE_NAME: &str = "mesh_process.py";

/// Number of stderr lines kept in [`ConversionError::Failed`].
const STDERR_TAIL_LINES: usize = 20;

/// Parameters for one conversion.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Source `.glb`/`.gltf` file.
    pub input: PathBuf,
    /// Destination FBX file.
    pub output: PathBuf,
    /// Directory the script is materialized into.
    pub work_dir: PathBuf,
    /// Decimation ratio; `>= 1.0` skips decimation.
    pub decimate_ratio: f64,
    /// Merge child meshes of each grouping node.
    pub merge_children: bool,
    /// Deadline for the Blender process.
    pub timeout: Duration,
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    /// Process exit code.
    pub exit_code: i32,
    /// Captured stdout lines.
    pub stdout_lines: Vec<String>,
    /// Captured stderr lines.
    pub stderr_lines: Vec<String>,
    /// The produced FBX.
    pub output: PathBuf,
    /// Size of the produced FBX in bytes.
    pub output_bytes: u64,
    /// Statistics reported by the mesh script.
    pub report: MeshReport,
    /// Wall-clock duration of the Blender run.
    pub elapsed: Duration,
}

impl ConversionResult {
    /// Last `n` stdout lines.
    pub fn stdout_tail(&self, n: usize) -> &[String] {
        report::tail(&self.stdout_lines, n)
    }

    /// Output size in megabytes.
    pub fn output_megabytes(&self) -> f64 {
        self.output_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Drives headless Blender conversions.
#[derive(Debug, Clone)]
pub struct BlenderConverter {
    search: SearchContext,
    min_output_bytes: u64,
}

impl BlenderConverter {
    /// Create a converter over an explicit search context.
    pub fn new(search: SearchContext, min_output_bytes: u64) -> Self {
        Self {
            search,
            min_output_bytes: min_output_bytes.max(1),
        }
    }

    /// Create a converter from configuration and the process environment.
    pub fn from_config(config: &BlenderConfig) -> Self {
        Self::new(
            SearchContext::from_process_env(config.executable.clone()),
            config.min_output_bytes,
        )
    }

    /// Locate the Blender installation this converter would use.
    pub fn locate(&self) -> Result<BlenderInstallation, LocateError> {
        BlenderDiscovery::locate(&self.search)
    }

    /// Run one conversion.
    #[instrument(skip(self, request), fields(input = %request.input.display()))]
    pub async fn convert(&self, request: &ConversionRequest) -> Result<ConversionResult, ConversionError> {
        let installation = self.locate()?;

        if !tokio::fs::try_exists(&request.input).await.unwrap_or(false) {
            return Err(ConversionError::InputNotFound {
                path: request.input.clone(),
            });
        }

        tokio::fs::create_dir_all(&request.work_dir).await?;
        if let Some(parent) = request.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // A file left by an earlier run must not pass as this run's output.
        match tokio::fs::remove_file(&request.output).await {
            Ok(()) => debug!(path = %request.output.display(), "Removed previous output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let script_path = request.work_dir.join(SCRIPT_FILE_NAME);
        tokio::fs::write(&script_path, MESH_SCRIPT).await?;

        let outcome = self
            .run_blender(&installation.executable, &script_path, request)
            .await?;

        let output_bytes = self.validate_output(&request.output).await?;
        let report = MeshReport::parse(outcome.stdout_lines.iter().map(String::as_str));

        info!(
            output = %request.output.display(),
            output_bytes,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Blender conversion completed"
        );

        Ok(ConversionResult {
            exit_code: outcome.exit_code,
            stdout_lines: outcome.stdout_lines,
            stderr_lines: outcome.stderr_lines,
            output: request.output.clone(),
            output_bytes,
            report,
            elapsed: outcome.elapsed,
        })
    }

    /// Spawn Blender and wait for it within the request deadline.
    async fn run_blender(
        &self,
        executable: &Path,
        script_path: &Path,
        request: &ConversionRequest,
    ) -> Result<ProcessOutcome, ConversionError> {
        let mut cmd = Command::new(executable);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd.args(build_args(script_path, request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            blender = %executable.display(),
            script = %script_path.display(),
            timeout_s = request.timeout.as_secs(),
            "Spawning Blender process"
        );

        let start = Instant::now();
        let mut child = cmd.spawn()?;

        let stdout_task = drain_lines(child.stdout.take());
        let stderr_task = drain_lines(child.stderr.take());

        tokio::select! {
            result = child.wait() => {
                let status = result?;
                let elapsed = start.elapsed();
                let stdout_lines = stdout_task.await.unwrap_or_default();
                let stderr_lines = stderr_task.await.unwrap_or_default();

                for line in &stdout_lines {
                    debug!(line = %line, "Blender stdout");
                }

                if status.success() {
                    Ok(ProcessOutcome {
                        exit_code: status.code().unwrap_or(0),
                        stdout_lines,
                        stderr_lines,
                        elapsed,
                    })
                } else {
                    let exit_code = status.code().unwrap_or(-1);
                    // Blender's Python tracebacks go to stdout when stderr is quiet.
                    let source = if stderr_lines.is_empty() { &stdout_lines } else { &stderr_lines };
                    let stderr_tail = report::tail(source, STDERR_TAIL_LINES).join("\n");
                    error!(
                        exit_code,
                        elapsed_ms = elapsed.as_millis() as u64,
                        stderr = %stderr_tail,
                        "Blender failed"
                    );
                    Err(ConversionError::Failed { exit_code, stderr_tail })
                }
            }
            _ = tokio::time::sleep(request.timeout) => {
                error!(
                    timeout_s = request.timeout.as_secs(),
                    "Blender process timed out, killing"
                );
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill Blender process");
                }
                stdout_task.abort();
                stderr_task.abort();
                Err(ConversionError::Timeout { timeout: request.timeout })
            }
        }
    }

    /// Validate that the FBX exists and meets the minimum size.
    async fn validate_output(&self, output: &Path) -> Result<u64, ConversionError> {
        let metadata = match tokio::fs::metadata(output).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConversionError::ProducedNoOutput {
                    path: output.to_path_buf(),
                    reason: "output file was not created".to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.len() < self.min_output_bytes {
            return Err(ConversionError::ProducedNoOutput {
                path: output.to_path_buf(),
                reason: format!("output file is empty ({} bytes)", metadata.len()),
            });
        }

        Ok(metadata.len())
    }
}

struct ProcessOutcome {
    exit_code: i32,
    stdout_lines: Vec<String>,
    stderr_lines: Vec<String>,
    elapsed: Duration,
}

/// Blender argv: `--background --python-exit-code 1 --python <script> --
/// --input <in> --output <out> --decimate <ratio> [--merge-children]`.
///
/// Without `--python-exit-code` Blender exits 0 after a script exception.
pub fn build_args(script_path: &Path, request: &ConversionRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--background".into(),
        "--python-exit-code".into(),
        "1".into(),
        "--python".into(),
        script_path.as_os_str().to_owned(),
        "--".into(),
        "--input".into(),
        request.input.as_os_str().to_owned(),
        "--output".into(),
        request.output.as_os_str().to_owned(),
        "--decimate".into(),
        request.decimate_ratio.to_string().into(),
    ];
    if request.merge_children {
        args.push("--merge-children".into());
    }
    args
}

/// Read a pipe to completion as lossy UTF-8 lines.
fn drain_lines<R>(reader: Option<R>) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = Vec::new();
        let Some(reader) = reader else {
            return lines;
        };
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    lines.push(line.trim_end_matches(['\r', '\n']).to_string());
                }
                Err(e) => {
                    debug!(error = %e, "Stopped reading Blender output");
                    break;
                }
            }
        }
        lines
    })
}
