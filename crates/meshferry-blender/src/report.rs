//! Machine-readable report lines printed by the mesh script.
//!
//! The script prints `meshferry: <key>=<value>` lines on stdout. Unknown keys
//! and malformed values are ignored.

use serde::{Deserialize, Serialize};

const REPORT_PREFIX: &str = "meshferry:";

/// Scene statistics reported by the mesh script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshReport {
    /// Number of grouping nodes whose mesh children were merged.
    pub groups_merged: Option<u32>,
    /// Mesh objects left in the scene before export.
    pub meshes_remaining: Option<u32>,
    /// Whether decimation was skipped (ratio >= 1.0).
    pub decimation_skipped: Option<bool>,
}

impl MeshReport {
    /// Parse report lines out of captured stdout.
    pub fn parse<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut report = Self::default();
        for line in lines {
            let Some(rest) = line.trim().strip_prefix(REPORT_PREFIX) else {
                continue;
            };
            let Some((key, value)) = rest.trim().split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "groups_merged" => report.groups_merged = value.parse().ok(),
                "meshes_remaining" => report.meshes_remaining = value.parse().ok(),
                "decimation" => {
                    report.decimation_skipped = match value {
                        "skipped" => Some(true),
                        "applied" => Some(false),
                        _ => None,
                    }
                }
                _ => {}
            }
        }
        report
    }
}

/// Last `n` lines of `lines`, oldest first.
pub fn tail(lines: &[String], n: usize) -> &[String] {
    &lines[lines.len().saturating_sub(n)..]
}
