//! Binary erosion and dilation with a square structuring element.
//!
//! A 3x3 square applied `n` times is the same as one (2n+1)x(2n+1) square, so
//! both operations run as a separable window of radius `n`: a horizontal pass
//! over each row followed by a vertical pass over each column. Pixels outside
//! the grid are ignored, which means the border neither erodes nor grows
//! anything.

use common::parallel::par_for_each_row;
use common::Buffer2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    /// Keep a pixel only if the whole window is set.
    All,
    /// Set a pixel if anything in the window is set.
    Any,
}

impl Window {
    #[inline]
    fn keep(self, count: u32, window_len: usize) -> bool {
        match self {
            Window::All => count as usize == window_len,
            Window::Any => count > 0,
        }
    }
}

/// Dilate `mask` by a 3x3 square, `iterations` times.
pub fn dilate(mask: &Buffer2<bool>, iterations: usize) -> Buffer2<bool> {
    square_window(mask, iterations, Window::Any)
}

/// Erode `mask` by a 3x3 square, `iterations` times.
pub fn erode(mask: &Buffer2<bool>, iterations: usize) -> Buffer2<bool> {
    square_window(mask, iterations, Window::All)
}

/// Morphological opening: erosion followed by dilation.
pub fn open(mask: &Buffer2<bool>, iterations: usize) -> Buffer2<bool> {
    dilate(&erode(mask, iterations), iterations)
}

fn square_window(mask: &Buffer2<bool>, radius: usize, window: Window) -> Buffer2<bool> {
    if radius == 0 || mask.is_empty() {
        return mask.clone();
    }
    let horizontal = horizontal_pass(mask, radius, window);
    vertical_pass(&horizontal, radius, window)
}

fn horizontal_pass(mask: &Buffer2<bool>, radius: usize, window: Window) -> Buffer2<bool> {
    let width = mask.width();
    let mut output = Buffer2::new_filled(width, mask.height(), false);

    par_for_each_row(&mut output, |y, out_row| {
        let mut prefix = Vec::with_capacity(width + 1);
        prefix.push(0u32);
        let mut running = 0u32;
        for &set in mask.row(y) {
            running += set as u32;
            prefix.push(running);
        }

        for (x, out) in out_row.iter_mut().enumerate() {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius + 1).min(width);
            *out = window.keep(prefix[hi] - prefix[lo], hi - lo);
        }
    });

    output
}

fn vertical_pass(mask: &Buffer2<bool>, radius: usize, window: Window) -> Buffer2<bool> {
    let width = mask.width();
    let height = mask.height();

    // Column prefix counts, row y holds the count of rows 0..y.
    let mut prefix = Buffer2::new_filled(width, height + 1, 0u32);
    for y in 0..height {
        for x in 0..width {
            prefix[(x, y + 1)] = prefix[(x, y)] + mask[(x, y)] as u32;
        }
    }

    let mut output = Buffer2::new_filled(width, height, false);
    par_for_each_row(&mut output, |y, out_row| {
        let lo = y.saturating_sub(radius);
        let hi = (y + radius + 1).min(height);
        let top = prefix.row(lo);
        let bottom = prefix.row(hi);
        for (x, out) in out_row.iter_mut().enumerate() {
            *out = window.keep(bottom[x] - top[x], hi - lo);
        }
    });

    output
}
