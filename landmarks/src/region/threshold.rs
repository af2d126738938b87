//! Automatic binarization by maximizing between-class variance.

use common::Buffer2;

/// Threshold level `t` that best separates `values <= t` from `values > t`.
///
/// Ties keep the lowest level. A grid with a single populated level has no
/// split and yields 0, so a constant non-zero grid is all foreground and an
/// all-zero grid has none.
pub fn otsu_level(grid: &Buffer2<u8>) -> u8 {
    let mut histogram = [0u64; 256];
    for &v in grid.iter() {
        histogram[v as usize] += 1;
    }

    let total = grid.len() as f64;
    if total == 0.0 {
        return 0;
    }
    let total_mean: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum::<f64>()
        / total;

    let mut best_level = 0u8;
    let mut best_variance = 0.0f64;
    let mut below_weight = 0.0f64;
    let mut below_moment = 0.0f64;

    for (level, &count) in histogram.iter().enumerate() {
        below_weight += count as f64 / total;
        below_moment += level as f64 * count as f64 / total;

        let above_weight = 1.0 - below_weight;
        if below_weight < common::EPSILON || above_weight < common::EPSILON {
            continue;
        }

        let below_mean = below_moment / below_weight;
        let above_mean = (total_mean - below_moment) / above_weight;
        let diff = below_mean - above_mean;
        let variance = below_weight * above_weight * diff * diff;

        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    if best_variance == 0.0 {
        return 0;
    }
    best_level
}

/// Pixels strictly above `level` become foreground.
pub fn binarize(grid: &Buffer2<u8>, level: u8) -> Buffer2<bool> {
    grid.map(|&v| v > level)
}
