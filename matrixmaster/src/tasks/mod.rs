//! Task flows over stored images, saliency maps and landmarks.
//!
//! Each flow is one unit of work: landmark changes are collected while the
//! flow runs and committed together at the end, so a failing flow leaves the
//! landmark store untouched.

mod crop;
mod crop_from_saliency;
mod mask;
mod score;

#[cfg(test)]
mod tests;

use std::io::Cursor;
use std::sync::Arc;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, RgbImage};
use landmarks::{BearingResolver, ForegroundCutter, RegionExtractor, SaliencyMap};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::config::Config;
use crate::landmark::TaskInput;
use crate::reporter::FailureCode;
use crate::store::{LandmarkStore, ObjectStore};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum TaskKind {
    #[serde(rename = "DERIVE_RECTS_FROM_MASK")]
    #[strum(serialize = "DERIVE_RECTS_FROM_MASK")]
    Mask,
    #[serde(rename = "SCORE_VISUAL_SALIENCY")]
    #[strum(serialize = "SCORE_VISUAL_SALIENCY")]
    Score,
    #[serde(rename = "CROP_LANDMARKS")]
    #[strum(serialize = "CROP_LANDMARKS")]
    Crop,
    #[serde(rename = "CROP_FROM_SALIENCY")]
    #[strum(serialize = "CROP_FROM_SALIENCY")]
    CropFromSaliency,
}

impl TaskKind {
    pub fn failure_code(self) -> FailureCode {
        match self {
            TaskKind::Crop => FailureCode::CropError,
            TaskKind::Mask | TaskKind::Score | TaskKind::CropFromSaliency => {
                FailureCode::MatrixMasterError
            }
        }
    }
}

/// Shared, read-only state of every flow.
pub struct TaskContext {
    config: Config,
    objects: Arc<dyn ObjectStore>,
    landmarks: Arc<dyn LandmarkStore>,
    extractor: RegionExtractor,
    cutter: ForegroundCutter,
    resolver: BearingResolver,
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TaskContext {
    pub fn new(
        config: Config,
        objects: Arc<dyn ObjectStore>,
        landmarks: Arc<dyn LandmarkStore>,
    ) -> Result<Self> {
        config.validate()?;
        let extractor = RegionExtractor::new(config.region.clone());
        let cutter = ForegroundCutter::new(config.cut.clone());
        let resolver = BearingResolver::new(config.camera, config.tie_break);
        Ok(Self {
            config,
            objects,
            landmarks,
            extractor,
            cutter,
            resolver,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn image_key(ep_id: &str, position: &str) -> String {
        format!("{ep_id}_{position}.jpg")
    }

    pub fn saliency_key(hit_id: &str, position: &str) -> String {
        format!("{hit_id}_{position}.json")
    }

    pub fn crop_key(landmark_id: Uuid) -> String {
        format!("{landmark_id}.png")
    }

    fn has_image(&self, ep_id: &str, position: &str) -> Result<bool> {
        let bucket = &self.config.buckets.streetview_images;
        Ok(self.objects.exists(bucket, &Self::image_key(ep_id, position))?)
    }

    fn has_saliency(&self, hit_id: &str, position: &str) -> Result<bool> {
        let bucket = &self.config.buckets.saliency_maps;
        Ok(self.objects.exists(bucket, &Self::saliency_key(hit_id, position))?)
    }

    fn load_saliency(&self, hit_id: &str, position: &str) -> Result<SaliencyMap> {
        let key = Self::saliency_key(hit_id, position);
        let bytes = self.objects.get(&self.config.buckets.saliency_maps, &key)?;
        SaliencyMap::from_json_slice(&bytes)
            .with_context(|| format!("Failed to parse saliency map {key}"))
    }

    fn load_image(&self, ep_id: &str, position: &str) -> Result<RgbImage> {
        let key = Self::image_key(ep_id, position);
        let bytes = self.objects.get(&self.config.buckets.streetview_images, &key)?;
        let image = image::load_from_memory(&bytes)
            .with_context(|| format!("Failed to decode image {key}"))?;
        Ok(image.to_rgb8())
    }
}

/// PNG ready to be stored.
struct EncodedCrop {
    bucket: String,
    key: String,
    bytes: Vec<u8>,
}

impl EncodedCrop {
    fn new(bucket: &str, landmark_id: Uuid, image: DynamicImage) -> Result<Self> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .context("Failed to encode crop")?;
        Ok(Self {
            bucket: bucket.to_string(),
            key: TaskContext::crop_key(landmark_id),
            bytes,
        })
    }

    fn store(self, objects: &dyn ObjectStore) -> Result<()> {
        objects
            .put(&self.bucket, &self.key, self.bytes, "image/png")
            .with_context(|| format!("Failed to store crop {}/{}", self.bucket, self.key))
    }
}

/// Run one flow to completion on the calling thread.
pub fn run_task(context: &TaskContext, kind: TaskKind, input: &TaskInput) -> Result<()> {
    tracing::info!(%kind, ep_id = %input.ep_id, hit_id = %input.hit_id, "task started");
    let outcome = match kind {
        TaskKind::Mask => mask::run(context, input),
        TaskKind::Score => score::run(context, input),
        TaskKind::Crop => crop::run(context, input),
        TaskKind::CropFromSaliency => crop_from_saliency::run(context, input),
    };
    outcome.with_context(|| format!("{kind} failed for ep {} hit {}", input.ep_id, input.hit_id))?;
    tracing::info!(%kind, ep_id = %input.ep_id, hit_id = %input.hit_id, "task complete");
    Ok(())
}
