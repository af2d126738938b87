//! Synthetic inputs shared by unit tests.

use common::Buffer2;
use image::{Rgb, RgbImage};

use crate::saliency::SaliencyMap;

/// Saliency map that is zero except for `(x1, y1, x2, y2, value)` blocks.
pub(crate) fn block_saliency(
    width: usize,
    height: usize,
    blocks: &[(usize, usize, usize, usize, u8)],
) -> SaliencyMap {
    let mut grid = Buffer2::new_filled(width, height, 0u8);
    for &(x1, y1, x2, y2, value) in blocks {
        for y in y1..y2 {
            grid.row_mut(y)[x1..x2].fill(value);
        }
    }
    SaliencyMap::from_grid(grid).unwrap()
}

/// Mask from rows of `#` (set) and `.` (clear).
pub(crate) fn mask_from_strings(rows: &[&str]) -> Buffer2<bool> {
    let width = rows[0].len();
    let pixels: Vec<bool> = rows
        .iter()
        .flat_map(|row| {
            assert_eq!(row.len(), width, "ragged mask row");
            row.chars().map(|c| c == '#')
        })
        .collect();
    Buffer2::new(width, rows.len(), pixels)
}

/// Dark image with bright rectangles `(x1, y1, x2, y2, color)`.
pub(crate) fn block_image(
    width: u32,
    height: u32,
    background: [u8; 3],
    blocks: &[(u32, u32, u32, u32, [u8; 3])],
) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, Rgb(background));
    for &(x1, y1, x2, y2, color) in blocks {
        for y in y1..y2 {
            for x in x1..x2 {
                image.put_pixel(x, y, Rgb(color));
            }
        }
    }
    image
}
