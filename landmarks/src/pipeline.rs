//! Flows chaining extraction, cutting and scoring over one saliency map.

use common::parallel::try_par_map_limited;
use image::RgbImage;

use crate::candidate::Candidate;
use crate::cut::{CutHint, ForegroundCutter};
use crate::error::Result;
use crate::region::RegionExtractor;
use crate::saliency::SaliencyMap;
use crate::score::SaliencyScorer;

/// Regions cut at the same time by [`crop_candidates`] unless told otherwise.
pub const DEFAULT_MAX_CONCURRENT_CUTS: usize = 4;

/// One unscored candidate per extracted region.
pub fn mask_candidates(
    saliency: &SaliencyMap,
    position: &str,
    extractor: &RegionExtractor,
) -> Result<Vec<Candidate>> {
    let candidates: Vec<Candidate> = extractor
        .extract_regions(saliency)?
        .into_iter()
        .map(|rect| Candidate::new(rect, position))
        .collect();
    tracing::debug!(position, count = candidates.len(), "mask candidates");
    Ok(candidates)
}

/// Set the saliency score of `candidate` from its rect.
pub fn score_candidate(saliency: &SaliencyMap, candidate: &mut Candidate) {
    candidate.score = Some(SaliencyScorer::new(saliency).score(&candidate.rect));
}

/// Cut every extracted region out of `image` and score it.
///
/// Regions are cut in parallel, at most `max_concurrent` at a time. The
/// output keeps the extractor's region order.
pub fn crop_candidates(
    image: &RgbImage,
    saliency: &SaliencyMap,
    position: &str,
    extractor: &RegionExtractor,
    cutter: &ForegroundCutter,
    max_concurrent: usize,
) -> Result<Vec<Candidate>> {
    saliency.ensure_dimensions(image.width() as usize, image.height() as usize)?;

    let regions = extractor.extract_region_masks(saliency)?;
    let scorer = SaliencyScorer::new(saliency);

    let candidates = try_par_map_limited(&regions, max_concurrent.max(1), |region| {
        let cut = cutter.cut(image, &CutHint::from_region(&region.mask))?;
        let score = scorer.score(&cut.rect);
        Ok::<_, crate::error::Error>(Candidate::from_cut(cut, position).with_score(score))
    })?;

    tracing::debug!(position, count = candidates.len(), "crop candidates");
    Ok(candidates)
}
