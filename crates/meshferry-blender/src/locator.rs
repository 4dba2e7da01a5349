//! Blender installation discovery.
//!
//! Searches, in order:
//! 1. An explicit override (`blender.executable`, then `BLENDER_PATH`)
//! 2. Platform install directories, newest version first
//! 3. The system `PATH`
//! 4. The Steam distribution
//!
//! The search is a pure function of a [`SearchContext`], which captures the
//! environment up front so discovery can be exercised against a temp
//! directory in tests.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::LocateError;

/// Environment variable holding an explicit Blender executable path.
pub const BLENDER_PATH_VAR: &str = "BLENDER_PATH";

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "blender.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "blender";

/// How the Blender installation was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    /// Configured via `blender.executable`.
    ExplicitConfig,
    /// The `BLENDER_PATH` environment variable.
    EnvironmentVariable,
    /// A versioned platform install directory.
    InstallDirectory,
    /// The system `PATH`.
    SystemPath,
    /// The Steam distribution.
    Steam,
}

/// A discovered Blender installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlenderInstallation {
    /// Full path to the Blender executable.
    pub executable: PathBuf,
    /// Version parsed from the install directory name, when known.
    pub version: Option<String>,
    /// How the installation was discovered.
    pub method: DiscoveryMethod,
}

/// A directory holding versioned installs, e.g. `Blender 4.2/blender.exe`.
#[derive(Debug, Clone)]
pub struct InstallPattern {
    /// Directory scanned for install folders.
    pub parent: PathBuf,
    /// Required folder name prefix (ASCII case-insensitive).
    pub prefix: String,
    /// Required folder name suffix, e.g. `.app`.
    pub suffix: String,
    /// Executable path relative to the install folder.
    pub executable: PathBuf,
}

/// Captured inputs for a discovery run.
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    /// `blender.executable` from configuration.
    pub explicit: Option<PathBuf>,
    /// Value of `BLENDER_PATH`.
    pub env_override: Option<PathBuf>,
    /// Value of `PATH`.
    pub path_var: Option<OsString>,
    /// Versioned install directories to scan.
    pub install_patterns: Vec<InstallPattern>,
    /// Fixed Steam executable locations.
    pub steam_paths: Vec<PathBuf>,
}

impl SearchContext {
    /// Capture the current process environment and platform defaults.
    pub fn from_process_env(explicit: Option<PathBuf>) -> Self {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self {
            explicit,
            env_override: std::env::var_os(BLENDER_PATH_VAR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            path_var: std::env::var_os("PATH"),
            install_patterns: platform_install_patterns(),
            steam_paths: platform_steam_paths(home.as_deref()),
        }
    }

    fn searched(&self) -> Vec<String> {
        let mut searched = Vec::new();
        if let Some(path) = &self.explicit {
            searched.push(format!("config ({})", path.display()));
        }
        if let Some(path) = &self.env_override {
            searched.push(format!("{BLENDER_PATH_VAR} ({})", path.display()));
        }
        for pattern in &self.install_patterns {
            searched.push(pattern.parent.display().to_string());
        }
        searched.push("PATH".to_string());
        for path in &self.steam_paths {
            searched.push(path.display().to_string());
        }
        searched
    }
}

/// Blender installation discovery engine.
pub struct BlenderDiscovery;

impl BlenderDiscovery {
    /// Locate Blender. The first match in search order wins.
    pub fn locate(ctx: &SearchContext) -> Result<BlenderInstallation, LocateError> {
        debug!("Searching for Blender installation");

        let overrides = [
            (&ctx.explicit, DiscoveryMethod::ExplicitConfig),
            (&ctx.env_override, DiscoveryMethod::EnvironmentVariable),
        ];
        for (candidate, method) in overrides {
            let Some(path) = candidate else { continue };
            if path.is_file() {
                return Ok(found(path.clone(), None, method));
            }
            warn!(path = %path.display(), ?method, "Blender override does not point to a file, ignoring");
        }

        for pattern in &ctx.install_patterns {
            if let Some((executable, version)) = newest_install(pattern) {
                return Ok(found(executable, Some(version), DiscoveryMethod::InstallDirectory));
            }
        }

        if let Some(path_var) = &ctx.path_var {
            for dir in std::env::split_paths(path_var) {
                let candidate = dir.join(EXECUTABLE_NAME);
                if candidate.is_file() {
                    return Ok(found(candidate, None, DiscoveryMethod::SystemPath));
                }
            }
        }

        for candidate in &ctx.steam_paths {
            if candidate.is_file() {
                return Ok(found(candidate.clone(), None, DiscoveryMethod::Steam));
            }
        }

        Err(LocateError::NotFound {
            searched: ctx.searched(),
        })
    }
}

fn found(executable: PathBuf, version: Option<String>, method: DiscoveryMethod) -> BlenderInstallation {
    info!(
        path = %executable.display(),
        version = ?version,
        ?method,
        "Found Blender"
    );
    BlenderInstallation {
        executable,
        version,
        method,
    }
}

/// Pick the install folder with the highest numeric version that has an
/// executable.
fn newest_install(pattern: &InstallPattern) -> Option<(PathBuf, String)> {
    let entries = std::fs::read_dir(&pattern.parent).ok()?;
    let prefix = pattern.prefix.to_ascii_lowercase();
    let suffix = pattern.suffix.to_ascii_lowercase();

    let mut candidates: Vec<(Vec<u64>, String, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            let lower = name.to_ascii_lowercase();
            if lower.len() < prefix.len() + suffix.len()
                || !lower.starts_with(&prefix)
                || !lower.ends_with(&suffix)
            {
                return None;
            }
            let version_text = &name[prefix.len()..name.len() - suffix.len()];
            let (components, label) = parse_version(version_text);
            let executable = entry.path().join(&pattern.executable);
            executable.is_file().then_some((components, label, executable))
        })
        .collect();

    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    candidates
        .into_iter()
        .next()
        .map(|(_, label, executable)| (executable, label))
}

/// Extract the first dotted numeric run, e.g. `"-4.2.1-linux-x64"` ->
/// `([4, 2, 1], "4.2.1")`.
fn parse_version(text: &str) -> (Vec<u64>, String) {
    let start = text.find(|c: char| c.is_ascii_digit());
    let Some(start) = start else {
        return (Vec::new(), String::new());
    };
    let run: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let label = run.trim_end_matches('.').to_string();
    let components = label
        .split('.')
        .filter_map(|part| part.parse::<u64>().ok())
        .collect();
    (components, label)
}

fn platform_install_patterns() -> Vec<InstallPattern> {
    let mut patterns = Vec::new();

    #[cfg(windows)]
    {
        let program_files = std::env::var_os("ProgramFiles")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Program Files"));
        patterns.push(InstallPattern {
            parent: program_files.join("Blender Foundation"),
            prefix: "Blender".to_string(),
            suffix: String::new(),
            executable: PathBuf::from("blender.exe"),
        });
    }

    #[cfg(target_os = "macos")]
    {
        patterns.push(InstallPattern {
            parent: PathBuf::from("/Applications"),
            prefix: "Blender".to_string(),
            suffix: ".app".to_string(),
            executable: Path::new("Contents").join("MacOS").join("Blender"),
        });
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        patterns.push(InstallPattern {
            parent: PathBuf::from("/opt"),
            prefix: "blender".to_string(),
            suffix: String::new(),
            executable: PathBuf::from("blender"),
        });
    }

    patterns
}

fn platform_steam_paths(home: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    #[cfg(windows)]
    {
        let _ = home;
        paths.push(PathBuf::from(
            r"C:\Program Files (x86)\Steam\steamapps\common\Blender\blender.exe",
        ));
    }

    #[cfg(target_os = "macos")]
    if let Some(home) = home {
        paths.push(
            home.join("Library/Application Support/Steam/steamapps/common/Blender")
                .join("Blender.app/Contents/MacOS/Blender"),
        );
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    if let Some(home) = home {
        paths.push(home.join(".steam/steam/steamapps/common/Blender/blender"));
        paths.push(home.join(".local/share/Steam/steamapps/common/Blender/blender"));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, b"#!/bin/sh\n").expect("write");
    }

    #[test]
    fn test_explicit_config_wins_over_env() {
        let temp = tempfile::tempdir().expect("tempdir");
        let explicit = temp.path().join("custom/blender");
        let env = temp.path().join("env/blender");
        touch(&explicit);
        touch(&env);

        let ctx = SearchContext {
            explicit: Some(explicit.clone()),
            env_override: Some(env),
            ..Default::default()
        };
        let found = BlenderDiscovery::locate(&ctx).expect("found");
        assert_eq!(found.executable, explicit);
        assert_eq!(found.method, DiscoveryMethod::ExplicitConfig);
    }

    #[test]
    fn test_missing_override_falls_through_to_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let bin = temp.path().join("bin");
        touch(&bin.join(EXECUTABLE_NAME));

        let ctx = SearchContext {
            env_override: Some(temp.path().join("nope/blender")),
            path_var: Some(std::env::join_paths([temp.path().join("empty"), bin.clone()]).expect("join")),
            ..Default::default()
        };
        let found = BlenderDiscovery::locate(&ctx).expect("found");
        assert_eq!(found.executable, bin.join(EXECUTABLE_NAME));
        assert_eq!(found.method, DiscoveryMethod::SystemPath);
    }

    #[test]
    fn test_newest_install_directory_wins() {
        let temp = tempfile::tempdir().expect("tempdir");
        for version in ["Blender 3.6", "Blender 4.10", "Blender 4.2", "Blender Launcher"] {
            touch(&temp.path().join(version).join("blender.exe"));
        }
        // Newer version without an executable is skipped.
        std::fs::create_dir_all(temp.path().join("Blender 5.0")).expect("mkdir");

        let ctx = SearchContext {
            install_patterns: vec![InstallPattern {
                parent: temp.path().to_path_buf(),
                prefix: "Blender".to_string(),
                suffix: String::new(),
                executable: PathBuf::from("blender.exe"),
            }],
            ..Default::default()
        };
        let found = BlenderDiscovery::locate(&ctx).expect("found");
        assert_eq!(found.executable, temp.path().join("Blender 4.10").join("blender.exe"));
        assert_eq!(found.version.as_deref(), Some("4.10"));
        assert_eq!(found.method, DiscoveryMethod::InstallDirectory);
    }

    #[test]
    fn test_install_directory_precedes_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(&temp.path().join("opt/blender-4.1.0-linux-x64/blender"));
        touch(&temp.path().join("bin").join(EXECUTABLE_NAME));

        let ctx = SearchContext {
            install_patterns: vec![InstallPattern {
                parent: temp.path().join("opt"),
                prefix: "blender".to_string(),
                suffix: String::new(),
                executable: PathBuf::from("blender"),
            }],
            path_var: Some(temp.path().join("bin").into_os_string()),
            ..Default::default()
        };
        let found = BlenderDiscovery::locate(&ctx).expect("found");
        assert_eq!(found.method, DiscoveryMethod::InstallDirectory);
        assert_eq!(found.version.as_deref(), Some("4.1.0"));
    }

    #[test]
    fn test_steam_is_last_resort() {
        let temp = tempfile::tempdir().expect("tempdir");
        let steam = temp.path().join("steamapps/common/Blender/blender");
        touch(&steam);

        let ctx = SearchContext {
            path_var: Some(temp.path().join("empty").into_os_string()),
            steam_paths: vec![steam.clone()],
            ..Default::default()
        };
        let found = BlenderDiscovery::locate(&ctx).expect("found");
        assert_eq!(found.executable, steam);
        assert_eq!(found.method, DiscoveryMethod::Steam);
    }

    #[test]
    fn test_not_found_lists_searched_locations() {
        let ctx = SearchContext {
            env_override: Some(PathBuf::from("/definitely/not/here/blender")),
            ..Default::default()
        };
        let err = BlenderDiscovery::locate(&ctx).expect_err("not found");
        let LocateError::NotFound { searched } = &err;
        assert!(searched.iter().any(|s| s.starts_with(BLENDER_PATH_VAR)));
        assert!(err.to_string().contains("BLENDER_PATH"));
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version(" 4.2"), (vec![4, 2], "4.2".to_string()));
        assert_eq!(parse_version("-4.2.1-linux-x64"), (vec![4, 2, 1], "4.2.1".to_string()));
        assert_eq!(parse_version(" Launcher"), (Vec::new(), String::new()));
    }
}
