use anyhow::{Context, Result};
use facemarks_vision::FaceLandmarks;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Landmarks found in one input image.
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub path: PathBuf,
    pub elapsed_ms: u128,
    pub faces: Vec<FaceLandmarks>,
}

pub fn save_report(reports: &[ImageReport], path: &Path) -> Result<()> {
    let data = serde_json::to_string_pretty(reports)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data).with_context(|| format!("writing report {}", path.display()))
}
