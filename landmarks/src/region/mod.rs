//! Candidate region extraction from a saliency map.
//!
//! Pipeline: Otsu binarization, opening, sure-background dilation, distance
//! transform for sure-foreground, 8-connected seed labeling, watershed, and a
//! minimum-area filter. Each stage lives in its own module and can be called
//! on its own.

pub mod distance;
pub mod labeling;
pub mod morphology;
pub mod threshold;
pub mod watershed;


use common::Buffer2;
use serde::{Deserialize, Serialize};

use crate::bbox::{Aabb, BoundingBox};
use crate::error::{Error, Result};
use crate::saliency::SaliencyMap;

pub use labeling::{Connectivity, LabelMap};

/// Marker label of the flooded background basin.
pub const BACKGROUND_LABEL: u32 = 1;

/// Overwrites a rectangle of the saliency grid before thresholding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedPatch {
    pub rect: BoundingBox,
    pub value: u8,
}

impl ForcedPatch {
    /// Rows 300..400, columns 20..200 at full saliency.
    pub fn legacy() -> Self {
        Self {
            rect: BoundingBox {
                x1: 20,
                y1: 300,
                x2: 200,
                y2: 400,
            },
            value: 255,
        }
    }

    /// Write the patch into `grid`, clipped to its extent.
    pub fn apply(&self, grid: &mut Buffer2<u8>) {
        let Some(rect) = self.rect.clip(grid.width(), grid.height()) else {
            return;
        };
        for y in rect.y1..rect.y2 {
            grid.row_mut(y)[rect.x1..rect.x2].fill(self.value);
        }
    }
}

/// Region extraction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Iterations of the 3x3 opening applied to the binarized map.
    pub open_iterations: usize,
    /// Iterations of the 3x3 dilation producing the sure-background mask.
    pub background_dilate_iterations: usize,
    /// Fraction of the maximum distance a pixel needs to be sure foreground.
    pub foreground_distance_ratio: f64,
    /// Regions smaller than this fraction of the image are dropped.
    pub min_area_fraction: f64,
    /// Connectivity used to label sure-foreground seeds.
    pub connectivity: Connectivity,
    /// Debug override written into the grid before thresholding.
    pub forced_patch: Option<ForcedPatch>,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            open_iterations: 2,
            background_dilate_iterations: 3,
            foreground_distance_ratio: 0.5,
            min_area_fraction: 0.02,
            connectivity: Connectivity::Eight,
            forced_patch: None,
        }
    }
}

impl RegionConfig {
    /// # Panics
    ///
    /// Panics if a ratio is outside `[0, 1)`.
    pub fn validate(&self) {
        assert!(
            (0.0..1.0).contains(&self.foreground_distance_ratio),
            "foreground_distance_ratio must be in [0, 1), got {}",
            self.foreground_distance_ratio
        );
        assert!(
            (0.0..1.0).contains(&self.min_area_fraction),
            "min_area_fraction must be in [0, 1), got {}",
            self.min_area_fraction
        );
    }
}

/// A surviving region together with its pixel mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMask {
    pub label: u32,
    pub rect: BoundingBox,
    pub area: usize,
    pub mask: Buffer2<bool>,
}

#[derive(Debug, Clone, Copy, Default)]
struct RegionStats {
    area: usize,
    bounds: Aabb,
}

#[derive(Debug, Clone)]
pub struct RegionExtractor {
    config: RegionConfig,
}

impl Default for RegionExtractor {
    fn default() -> Self {
        Self::new(RegionConfig::default())
    }
}

impl RegionExtractor {
    pub fn new(config: RegionConfig) -> Self {
        config.validate();
        Self { config }
    }

    pub fn config(&self) -> &RegionConfig {
        &self.config
    }

    /// Bounding boxes of all regions that pass the area filter, ascending by
    /// watershed label.
    pub fn extract_regions(&self, saliency: &SaliencyMap) -> Result<Vec<BoundingBox>> {
        let (_, regions) = self.segment(saliency)?;
        Ok(regions.into_iter().map(|(_, rect, _)| rect).collect())
    }

    /// Same as [`Self::extract_regions`], with each region's pixel mask.
    pub fn extract_region_masks(&self, saliency: &SaliencyMap) -> Result<Vec<RegionMask>> {
        let (labels, regions) = self.segment(saliency)?;
        Ok(regions
            .into_iter()
            .map(|(label, rect, area)| RegionMask {
                label,
                rect,
                area,
                mask: labels.map(|&l| l == label),
            })
            .collect())
    }

    /// Watershed label map plus `(label, rect, area)` of surviving regions.
    fn segment(&self, saliency: &SaliencyMap) -> Result<(Buffer2<u32>, Vec<(u32, BoundingBox, usize)>)> {
        let config = &self.config;

        let gray = match &config.forced_patch {
            Some(patch) => {
                let mut grid = saliency.grid().clone();
                patch.apply(&mut grid);
                grid
            }
            None => saliency.grid().clone(),
        };

        let level = threshold::otsu_level(&gray);
        let binary = threshold::binarize(&gray, level);
        if !binary.iter().any(|&b| b) {
            return Err(Error::NoSalientRegion);
        }

        // Opening may clear every pixel; that leaves no seeds and no regions.
        let cleaned = morphology::open(&binary, config.open_iterations);

        let sure_bg = morphology::dilate(&cleaned, config.background_dilate_iterations);
        let sure_fg = self.sure_foreground(&cleaned);
        let unknown = sure_bg.zip_map(&sure_fg, |&bg, &fg| bg && !fg);

        let mut labels = markers(&sure_fg, &unknown, config.connectivity);
        watershed::watershed(&gray, &mut labels);

        let regions = self.collect_regions(&labels);
        tracing::debug!(
            level,
            foreground = binary.count_where(|&b| b),
            cleaned = cleaned.count_where(|&b| b),
            regions = regions.len(),
            "extracted saliency regions"
        );
        Ok((labels, regions))
    }

    fn sure_foreground(&self, cleaned: &Buffer2<bool>) -> Buffer2<bool> {
        let distances = distance::distance_transform(cleaned);
        let max = distances.iter().copied().fold(0.0f64, f64::max);
        if max.is_infinite() {
            // No background anywhere: the whole cleaned mask is foreground.
            return cleaned.clone();
        }
        let cutoff = self.config.foreground_distance_ratio * max;
        distances.map(|&d| d > cutoff)
    }

    fn collect_regions(&self, labels: &Buffer2<u32>) -> Vec<(u32, BoundingBox, usize)> {
        let max_label = labels.iter().copied().max().unwrap_or(0) as usize;
        let mut stats = vec![RegionStats::default(); max_label + 1];
        for (y, row) in labels.rows().enumerate() {
            for (x, &label) in row.iter().enumerate() {
                let entry = &mut stats[label as usize];
                entry.area += 1;
                entry.bounds.include(x, y);
            }
        }

        let min_area = self.config.min_area_fraction * labels.len() as f64;
        stats
            .iter()
            .enumerate()
            .skip(BACKGROUND_LABEL as usize + 1)
            .filter(|(_, s)| s.area > 0 && s.area as f64 >= min_area)
            .filter_map(|(label, s)| {
                s.bounds
                    .to_bounding_box()
                    .map(|rect| (label as u32, rect, s.area))
            })
            .collect()
    }
}

/// Watershed markers: seed components get labels `2..`, unknown pixels 0,
/// everything else [`BACKGROUND_LABEL`].
pub fn markers(
    sure_fg: &Buffer2<bool>,
    unknown: &Buffer2<bool>,
    connectivity: Connectivity,
) -> Buffer2<u32> {
    let seeds = LabelMap::from_mask(sure_fg, connectivity).into_labels();
    seeds.zip_map(unknown, |&label, &unknown| {
        if unknown {
            0
        } else {
            label + BACKGROUND_LABEL
        }
    })
}
