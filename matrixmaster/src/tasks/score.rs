use anyhow::{Context, Result};
use landmarks::{score_rect, BoundingBox, Error as LandmarkError, SaliencyMap};

use super::TaskContext;
use crate::landmark::TaskInput;
use crate::store::LandmarkChange;

/// Score every landmark of each position that has a street-view image.
///
/// A landmark without a rect gets one resolved from its relative bearing
/// when possible. Landmarks still without a rect score 0.
pub(super) fn run(context: &TaskContext, input: &TaskInput) -> Result<()> {
    let mut changes = Vec::new();

    for position in &context.config.positions {
        if !context.has_image(&input.ep_id, position)? {
            tracing::debug!(ep_id = %input.ep_id, position, "no image, skipping");
            continue;
        }
        let landmarks = context.landmarks.landmarks_for(&input.hit_id, position)?;
        if landmarks.is_empty() {
            continue;
        }

        let saliency = context.load_saliency(&input.hit_id, position)?;
        let image = context.load_image(&input.ep_id, position)?;
        saliency
            .ensure_dimensions(image.width() as usize, image.height() as usize)
            .with_context(|| format!("Image and saliency map disagree for {position}"))?;

        let mut candidates: Option<Vec<BoundingBox>> = None;
        for mut landmark in landmarks {
            if landmark.rect.is_none() {
                if let Some(bearing) = landmark.relative_bearing {
                    if candidates.is_none() {
                        candidates = Some(extract_candidates(context, &saliency)?);
                    }
                    let candidates = candidates.as_deref().unwrap_or_default();
                    landmark.rect = context.resolver.resolve(
                        candidates,
                        saliency.width(),
                        saliency.height(),
                        bearing,
                    );
                }
            }

            let score = landmark
                .rect
                .map_or(0.0, |rect| score_rect(&saliency, &rect));
            tracing::trace!(landmark_id = %landmark.landmark_id, score, "scored landmark");
            changes.push(LandmarkChange::Update(landmark.with_score(score)));
        }
    }

    context.landmarks.commit(changes)?;
    Ok(())
}

/// Regions of `saliency`. A map without salient regions has none.
fn extract_candidates(context: &TaskContext, saliency: &SaliencyMap) -> Result<Vec<BoundingBox>> {
    match context.extractor.extract_regions(saliency) {
        Ok(candidates) => Ok(candidates),
        Err(LandmarkError::NoSalientRegion) => Ok(Vec::new()),
        Err(e) => Err(e).context("Failed to extract regions"),
    }
}
