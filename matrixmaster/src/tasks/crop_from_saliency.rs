use anyhow::{Context, Result};
use image::DynamicImage;
use landmarks::crop_candidates;

use super::{EncodedCrop, TaskContext};
use crate::landmark::{Landmark, TaskInput};
use crate::store::LandmarkChange;

/// Cut each salient region of every position with both an image and a
/// saliency map, store both crops and insert a scored landmark per region.
pub(super) fn run(context: &TaskContext, input: &TaskInput) -> Result<()> {
    let buckets = &context.config.buckets;
    let mut changes = Vec::new();
    let mut crops = Vec::new();

    for position in &context.config.positions {
        if !context.has_image(&input.ep_id, position)?
            || !context.has_saliency(&input.hit_id, position)?
        {
            tracing::debug!(ep_id = %input.ep_id, position, "missing image or saliency map");
            continue;
        }
        let saliency = context.load_saliency(&input.hit_id, position)?;
        let image = context.load_image(&input.ep_id, position)?;

        let candidates = crop_candidates(
            &image,
            &saliency,
            position,
            &context.extractor,
            &context.cutter,
            context.config.max_concurrent_cuts,
        )
        .with_context(|| format!("Failed to crop regions for {position}"))?;

        for candidate in candidates {
            let mut landmark = Landmark::new(&input.hit_id, position).with_rect(candidate.rect);
            landmark.visual_saliency_score = candidate.score;

            if let Some(opaque) = candidate.opaque_crop {
                crops.push(EncodedCrop::new(
                    &buckets.cropped_images,
                    landmark.landmark_id,
                    DynamicImage::ImageRgb8(opaque),
                )?);
            }
            if let Some(alpha) = candidate.alpha_crop {
                crops.push(EncodedCrop::new(
                    &buckets.transparent_cropped_images,
                    landmark.landmark_id,
                    DynamicImage::ImageRgba8(alpha),
                )?);
            }
            changes.push(LandmarkChange::Insert(landmark));
        }
    }

    tracing::debug!(hit_id = %input.hit_id, inserted = changes.len(), "saliency crops");
    for crop in crops {
        crop.store(context.objects.as_ref())?;
    }
    context.landmarks.commit(changes)?;
    Ok(())
}
