//! Bearing to candidate region resolution.
//!
//! A panorama of width `W` spans `field_of_view_degrees` horizontally with
//! bearing 0 at its center column. A bearing picks a column, and the
//! candidate whose horizontal span strictly contains that column wins. When
//! several do, the tie-break picks the one closest to the vertical middle.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{Error, Result};
use crate::region::RegionExtractor;
use crate::saliency::SaliencyMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Horizontal angle covered by the full image width.
    pub field_of_view_degrees: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            field_of_view_degrees: 90.0,
        }
    }
}

impl CameraConfig {
    /// # Panics
    ///
    /// Panics if the field of view is not in `(0, 360]`.
    pub fn validate(&self) {
        assert!(
            self.field_of_view_degrees > 0.0 && self.field_of_view_degrees <= 360.0,
            "field_of_view_degrees must be in (0, 360], got {}",
            self.field_of_view_degrees
        );
    }
}

/// Key used to choose among candidates that all span the bearing column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Distance of `(y1 + y2) / 2` from the image's vertical middle.
    #[default]
    VerticalCenter,
    /// Distance of the box height `y2 - y1` from half the image height.
    /// Historical behavior, kept for comparison runs.
    BoxHeight,
}

impl TieBreak {
    fn key(self, rect: &BoundingBox, image_height: usize) -> f64 {
        let middle = image_height as f64 / 2.0;
        match self {
            TieBreak::VerticalCenter => (rect.vertical_center() - middle).abs(),
            TieBreak::BoxHeight => (rect.height() as f64 - middle).abs(),
        }
    }
}

/// Bring a finite bearing into `[-180, 180]`. Values already in range are
/// returned unchanged, others wrap into `(-180, 180]`.
pub fn normalize_bearing(degrees: f64) -> Option<f64> {
    if !degrees.is_finite() {
        return None;
    }
    if (-180.0..=180.0).contains(&degrees) {
        return Some(degrees);
    }
    let wrapped = degrees.rem_euclid(360.0);
    Some(if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    })
}

#[derive(Debug, Clone, Default)]
pub struct BearingResolver {
    camera: CameraConfig,
    tie_break: TieBreak,
}

impl BearingResolver {
    pub fn new(camera: CameraConfig, tie_break: TieBreak) -> Self {
        camera.validate();
        Self { camera, tie_break }
    }

    pub fn camera(&self) -> &CameraConfig {
        &self.camera
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Pixel column of `bearing` in an image `image_width` wide.
    ///
    /// `None` for an empty image or a non-finite bearing.
    pub fn longitude(&self, image_width: usize, bearing: f64) -> Option<usize> {
        let bearing = normalize_bearing(bearing)?;
        if image_width == 0 {
            return None;
        }
        let fov = self.camera.field_of_view_degrees;
        let pixels_per_degree = image_width as f64 / fov;
        let adjusted = bearing + fov / 2.0;
        let column = (adjusted * pixels_per_degree).round();
        Some(column.clamp(0.0, (image_width - 1) as f64) as usize)
    }

    /// Candidate spanning the bearing column, closest to the vertical middle
    /// by the configured tie-break. Earlier candidates win exact ties.
    pub fn resolve(
        &self,
        candidates: &[BoundingBox],
        image_width: usize,
        image_height: usize,
        bearing: f64,
    ) -> Option<BoundingBox> {
        let longitude = self.longitude(image_width, bearing)? as f64;

        let mut best: Option<(f64, BoundingBox)> = None;
        for rect in candidates.iter().filter(|r| r.spans_column(longitude)) {
            let key = self.tie_break.key(rect, image_height);
            if best.map_or(true, |(best_key, _)| key < best_key) {
                best = Some((key, *rect));
            }
        }

        tracing::trace!(
            bearing,
            longitude,
            candidates = candidates.len(),
            found = best.is_some(),
            "resolved bearing"
        );
        best.map(|(_, rect)| rect)
    }
}

/// Extract regions from `saliency` and resolve `bearing` against them.
///
/// A map without any salient region has nothing at any bearing and yields
/// `Ok(None)`.
pub fn search_at_bearing(
    extractor: &RegionExtractor,
    resolver: &BearingResolver,
    saliency: &SaliencyMap,
    bearing: f64,
) -> Result<Option<BoundingBox>> {
    let candidates = match extractor.extract_regions(saliency) {
        Ok(candidates) => candidates,
        Err(Error::NoSalientRegion) => return Ok(None),
        Err(e) => return Err(e),
    };
    Ok(resolver.resolve(&candidates, saliency.width(), saliency.height(), bearing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::block_saliency;

    fn panorama() -> BearingResolver {
        BearingResolver::new(
            CameraConfig {
                field_of_view_degrees: 360.0,
            },
            TieBreak::VerticalCenter,
        )
    }

    fn rect(x1: usize, y1: usize, x2: usize, y2: usize) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2).unwrap()
    }

    #[test]
    fn test_longitude_of_panorama() {
        let resolver = panorama();
        assert_eq!(resolver.longitude(3600, 0.0), Some(1800));
        assert_eq!(resolver.longitude(3600, -180.0), Some(0));
        assert_eq!(resolver.longitude(3600, 179.99), Some(3599));
        assert_eq!(resolver.longitude(3600, 180.0), Some(3599));
        assert_eq!(resolver.longitude(3600, 90.0), Some(2700));
    }

    #[test]
    fn test_longitude_narrow_field_of_view_clamps() {
        let resolver = BearingResolver::default();
        assert_eq!(resolver.camera().field_of_view_degrees, 90.0);
        assert_eq!(resolver.longitude(900, 0.0), Some(450));
        assert_eq!(resolver.longitude(900, -45.0), Some(0));
        assert_eq!(resolver.longitude(900, -120.0), Some(0));
        assert_eq!(resolver.longitude(900, 120.0), Some(899));
    }

    #[test]
    fn test_longitude_rejects_non_finite() {
        let resolver = panorama();
        assert_eq!(resolver.longitude(3600, f64::NAN), None);
        assert_eq!(resolver.longitude(3600, f64::INFINITY), None);
        assert_eq!(resolver.longitude(0, 0.0), None);
    }

    #[test]
    fn test_normalize_bearing() {
        assert_eq!(normalize_bearing(45.0), Some(45.0));
        assert_eq!(normalize_bearing(-180.0), Some(-180.0));
        assert_eq!(normalize_bearing(190.0), Some(-170.0));
        assert_eq!(normalize_bearing(540.0), Some(180.0));
        assert_eq!(normalize_bearing(-200.0), Some(160.0));
        assert_eq!(normalize_bearing(f64::NAN), None);
    }

    #[test]
    fn test_resolve_prefers_vertical_center() {
        let resolver = panorama();
        let candidates = [rect(1700, 0, 1900, 10), rect(1700, 40, 1900, 60)];
        assert_eq!(
            resolver.resolve(&candidates, 3600, 100, 0.0),
            Some(candidates[1])
        );
    }

    #[test]
    fn test_resolve_box_height_tie_break() {
        let resolver = BearingResolver::new(
            CameraConfig {
                field_of_view_degrees: 360.0,
            },
            TieBreak::BoxHeight,
        );
        // Heights 20 and 48: the taller box is closer to half the height.
        let candidates = [rect(1700, 40, 1900, 60), rect(1700, 0, 1900, 48)];
        assert_eq!(
            resolver.resolve(&candidates, 3600, 100, 0.0),
            Some(candidates[1])
        );
    }

    #[test]
    fn test_resolve_requires_strict_containment() {
        let resolver = panorama();
        let candidates = [rect(1800, 40, 1900, 60), rect(1700, 40, 1800, 60)];
        assert_eq!(resolver.resolve(&candidates, 3600, 100, 0.0), None);
        assert_eq!(resolver.resolve(&[], 3600, 100, 0.0), None);
    }

    #[test]
    fn test_resolve_exact_tie_keeps_first() {
        let resolver = panorama();
        let candidates = [rect(1700, 40, 1850, 60), rect(1750, 45, 1900, 55)];
        assert_eq!(
            resolver.resolve(&candidates, 3600, 100, 0.0),
            Some(candidates[0])
        );
    }

    #[test]
    fn test_search_at_bearing() {
        let extractor = RegionExtractor::default();
        let resolver = BearingResolver::default();
        let map = block_saliency(100, 100, &[(40, 10, 70, 30, 200)]);

        assert_eq!(
            search_at_bearing(&extractor, &resolver, &map, 0.0).unwrap(),
            Some(rect(40, 10, 70, 30))
        );
        assert_eq!(
            search_at_bearing(&extractor, &resolver, &map, -40.0).unwrap(),
            None
        );
    }

    #[test]
    fn test_search_blank_map_finds_nothing() {
        let map = block_saliency(50, 50, &[]);
        let result = search_at_bearing(
            &RegionExtractor::default(),
            &BearingResolver::default(),
            &map,
            0.0,
        );
        assert_eq!(result.unwrap(), None);
    }
}
