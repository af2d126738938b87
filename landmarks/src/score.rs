//! Share of total saliency captured by a rectangle.

use crate::bbox::BoundingBox;
use crate::saliency::SaliencyMap;

/// `sum(rect) / sum(map)`, or 0 for a map without any saliency.
///
/// `rect` is clipped to the map, so the result is always in `[0, 1]`.
pub fn score_rect(saliency: &SaliencyMap, rect: &BoundingBox) -> f64 {
    let total = saliency.total();
    if total == 0 {
        return 0.0;
    }
    saliency.region_sum(rect) as f64 / total as f64
}

/// Stateless scorer over a borrowed saliency map.
///
/// Caches the map total so that many rectangles over the same map are cheap.
#[derive(Debug, Clone, Copy)]
pub struct SaliencyScorer<'a> {
    saliency: &'a SaliencyMap,
    total: u64,
}

impl<'a> SaliencyScorer<'a> {
    pub fn new(saliency: &'a SaliencyMap) -> Self {
        Self {
            saliency,
            total: saliency.total(),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn score(&self, rect: &BoundingBox) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.saliency.region_sum(rect) as f64 / self.total as f64
    }
}
