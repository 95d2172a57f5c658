use anyhow::{Context, Result};
use directories::ProjectDirs;
use facemarks_vision::{CornerParams, DetectionSettings, Profiles};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

static DIRS: Lazy<Option<ProjectDirs>> = Lazy::new(|| ProjectDirs::from("", "", "facemarks"));

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| match option_env!("FACEMARKS_CONFIG_PATH") {
    Some(path) => PathBuf::from(path),
    None => DIRS
        .as_ref()
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("facemarks.toml")),
});

pub static DEFAULT_FACE_MODEL: Lazy<PathBuf> = Lazy::new(|| {
    let name = "face_detection_yunet_2023mar.onnx";
    DIRS.as_ref()
        .map(|d| d.data_dir().join(name))
        .unwrap_or_else(|| PathBuf::from(name))
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// YuNet ONNX model.
    pub face_model: PathBuf,
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub min_face_size: u32,
    /// Draw feature boxes and raw candidates on annotated output.
    pub debug: bool,
    pub corners: CornerParams,
    pub features: Profiles,
}

impl Default for Config {
    fn default() -> Self {
        let detection = DetectionSettings::default();
        Self {
            face_model: DEFAULT_FACE_MODEL.clone(),
            score_threshold: detection.score_threshold,
            nms_threshold: detection.nms_threshold,
            min_face_size: detection.min_face_size,
            debug: false,
            corners: CornerParams::default(),
            features: Profiles::default(),
        }
    }
}

impl Config {
    pub fn detection(&self) -> DetectionSettings {
        DetectionSettings {
            score_threshold: self.score_threshold,
            nms_threshold: self.nms_threshold,
            min_face_size: self.min_face_size,
        }
    }

    /// Reject tables the locator cannot work with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.score_threshold),
            "score_threshold must be within [0, 1] (got {})",
            self.score_threshold
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.nms_threshold),
            "nms_threshold must be within [0, 1] (got {})",
            self.nms_threshold
        );
        self.corners.validate().context("invalid corner settings")?;
        self.features.validate().context("invalid feature profiles")?;
        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
