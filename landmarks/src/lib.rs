//! Saliency-driven landmark candidates.
//!
//! [`RegionExtractor`] turns a [`SaliencyMap`] into candidate boxes,
//! [`ForegroundCutter`] isolates the object inside a region, [`score`] rates a
//! box by its share of the image's saliency and [`BearingResolver`] picks the
//! candidate lying at a compass bearing.

pub mod bbox;
pub mod bearing;
pub mod candidate;
pub mod cut;
pub mod error;
pub mod pipeline;
pub mod region;
pub mod saliency;
pub mod score;

#[cfg(test)]
pub(crate) mod test_utils;

pub use bbox::{Aabb, BoundingBox};
pub use bearing::{normalize_bearing, search_at_bearing, BearingResolver, CameraConfig, TieBreak};
pub use candidate::Candidate;
pub use cut::{CutConfig, CutHint, CutLabel, CutResult, ForegroundCutter, TRANSPARENT_SENTINEL};
pub use error::{Error, Result};
pub use pipeline::{crop_candidates, mask_candidates, score_candidate, DEFAULT_MAX_CONCURRENT_CUTS};
pub use region::{Connectivity, ForcedPatch, RegionConfig, RegionExtractor, RegionMask};
pub use saliency::SaliencyMap;
pub use score::{score_rect, SaliencyScorer};
