use anyhow::{Context, Result};
use landmarks::mask_candidates;

use super::TaskContext;
use crate::landmark::{Landmark, TaskInput};
use crate::store::LandmarkChange;

/// Insert one landmark per salient box of every position with a saliency map.
pub(super) fn run(context: &TaskContext, input: &TaskInput) -> Result<()> {
    let mut changes = Vec::new();

    for position in &context.config.positions {
        if !context.has_saliency(&input.hit_id, position)? {
            tracing::debug!(hit_id = %input.hit_id, position, "no saliency map, skipping");
            continue;
        }
        let saliency = context.load_saliency(&input.hit_id, position)?;
        let candidates = mask_candidates(&saliency, position, &context.extractor)
            .with_context(|| format!("Failed to extract regions for {position}"))?;

        changes.extend(candidates.into_iter().map(|candidate| {
            LandmarkChange::Insert(Landmark::new(&input.hit_id, position).with_rect(candidate.rect))
        }));
    }

    tracing::debug!(hit_id = %input.hit_id, inserted = changes.len(), "mask landmarks");
    context.landmarks.commit(changes)?;
    Ok(())
}
