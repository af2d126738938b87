use anyhow::{Context, Result};
use image::DynamicImage;
use landmarks::CutHint;

use super::{EncodedCrop, TaskContext};
use crate::landmark::TaskInput;

/// Cut every landmark that has a rect and store its transparent crop.
/// Positions without a street-view image are skipped.
pub(super) fn run(context: &TaskContext, input: &TaskInput) -> Result<()> {
    let bucket = &context.config.buckets.transparent_cropped_images;
    let mut crops = Vec::new();

    for position in &context.config.positions {
        let landmarks: Vec<_> = context
            .landmarks
            .landmarks_for(&input.hit_id, position)?
            .into_iter()
            .filter_map(|landmark| landmark.rect.map(|rect| (landmark.landmark_id, rect)))
            .collect();
        if landmarks.is_empty() || !context.has_image(&input.ep_id, position)? {
            continue;
        }

        let image = context.load_image(&input.ep_id, position)?;
        let (width, height) = (image.width() as usize, image.height() as usize);
        for (landmark_id, rect) in landmarks {
            let cut = CutHint::from_rect(width, height, &rect)
                .and_then(|hint| context.cutter.cut(&image, &hint))
                .with_context(|| format!("Failed to cut landmark {landmark_id}"))?;
            crops.push(EncodedCrop::new(
                bucket,
                landmark_id,
                DynamicImage::ImageRgba8(cut.alpha_crop),
            )?);
        }
    }

    tracing::debug!(hit_id = %input.hit_id, crops = crops.len(), "landmark crops");
    for crop in crops {
        crop.store(context.objects.as_ref())?;
    }
    Ok(())
}
