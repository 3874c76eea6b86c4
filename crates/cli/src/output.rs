//! Files written by `uhimon analyze`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uhimon_analysis::AnalysisResult;

pub const LST_PNG: &str = "lst.png";
pub const NDVI_PNG: &str = "ndvi.png";
pub const SUMMARY_JSON: &str = "summary.json";

/// Write both overlays and the JSON summary into `dir`, creating it if
/// needed. Returns the paths written.
pub fn write_outputs(dir: &Path, result: &AnalysisResult) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let summary =
        serde_json::to_vec_pretty(result).context("Failed to serialize analysis summary")?;
    let files = [
        (LST_PNG, result.lst.png.as_slice()),
        (NDVI_PNG, result.ndvi.png.as_slice()),
        (SUMMARY_JSON, summary.as_slice()),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, bytes) in files {
        let path = dir.join(name);
        fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
