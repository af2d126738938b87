use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use common::SerdeFormat;
use landmarks::{CameraConfig, CutConfig, RegionConfig, TieBreak, DEFAULT_MAX_CONCURRENT_CUTS};
use serde::{Deserialize, Serialize};

/// Bucket names in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Buckets {
    pub streetview_images: String,
    pub saliency_maps: String,
    pub cropped_images: String,
    pub transparent_cropped_images: String,
}

impl Default for Buckets {
    fn default() -> Self {
        Self {
            streetview_images: "streetview-images".to_string(),
            saliency_maps: "saliency-maps".to_string(),
            cropped_images: "cropped-images".to_string(),
            transparent_cropped_images: "transparent-cropped-images".to_string(),
        }
    }
}

/// Concurrent tasks allowed per task kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSlots {
    pub mask: usize,
    pub score: usize,
    pub crop: usize,
    pub crop_from_saliency: usize,
}

impl Default for WorkerSlots {
    fn default() -> Self {
        Self {
            mask: 2,
            score: 2,
            crop: 2,
            crop_from_saliency: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub log_dir: PathBuf,
    /// Root directory of the filesystem object store.
    pub storage_root: PathBuf,
    /// JSON file backing the landmark store. In-memory only when unset.
    pub landmark_db: Option<PathBuf>,
    pub buckets: Buckets,
    pub camera: CameraConfig,
    /// Camera position tags, one image per tag and execution point.
    pub positions: Vec<String>,
    pub workers: WorkerSlots,
    pub max_concurrent_cuts: usize,
    pub region: RegionConfig,
    pub cut: CutConfig,
    pub tie_break: TieBreak,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            storage_root: PathBuf::from("data"),
            landmark_db: Some(PathBuf::from("data/landmarks.json")),
            buckets: Buckets::default(),
            camera: CameraConfig::default(),
            positions: ["north", "east", "south", "west"]
                .into_iter()
                .map(String::from)
                .collect(),
            workers: WorkerSlots::default(),
            max_concurrent_cuts: DEFAULT_MAX_CONCURRENT_CUTS,
            region: RegionConfig::default(),
            cut: CutConfig::default(),
            tie_break: TieBreak::default(),
        }
    }
}

impl Config {
    /// Load from a `.yaml`, `.yml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self> {
        let file_name = path.to_string_lossy();
        let format = SerdeFormat::from_file_name(&file_name)?;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text, format)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse config text. An empty document yields the defaults.
    pub fn parse(text: &str, format: SerdeFormat) -> Result<Self> {
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            common::deserialize(text, format)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.positions.is_empty(), "at least one position is required");
        ensure!(
            self.camera.field_of_view_degrees > 0.0 && self.camera.field_of_view_degrees <= 360.0,
            "camera.field_of_view_degrees must be in (0, 360], got {}",
            self.camera.field_of_view_degrees
        );
        ensure!(
            (0.0..1.0).contains(&self.region.min_area_fraction),
            "region.min_area_fraction must be in [0, 1), got {}",
            self.region.min_area_fraction
        );
        ensure!(
            (0.0..1.0).contains(&self.region.foreground_distance_ratio),
            "region.foreground_distance_ratio must be in [0, 1), got {}",
            self.region.foreground_distance_ratio
        );
        ensure!(self.cut.gmm_components > 0, "cut.gmm_components must be > 0");
        ensure!(
            self.cut.gamma > 0.0 && self.cut.gamma.is_finite(),
            "cut.gamma must be positive, got {}",
            self.cut.gamma
        );
        ensure!(self.max_concurrent_cuts > 0, "max_concurrent_cuts must be > 0");
        let slots = &self.workers;
        ensure!(
            slots.mask > 0 && slots.score > 0 && slots.crop > 0 && slots.crop_from_saliency > 0,
            "worker slots must be > 0"
        );
        Ok(())
    }
}
