//! Rectangles in pixel coordinates.
//!
//! [`BoundingBox`] is the public rectangle with half-open bounds
//! (`x1..x2`, `y1..y2`), so `x2 - x1` is the pixel width and slicing a grid by
//! the box covers every pixel that produced it. [`Aabb`] is the inclusive
//! accumulator used while scanning masks and label maps.

use common::Buffer2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Axis-aligned pixel rectangle, `0 <= x1 < x2 <= W`, `0 <= y1 < y2 <= H`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: usize,
    pub y1: usize,
    pub x2: usize,
    pub y2: usize,
}

impl BoundingBox {
    /// Create a box, rejecting empty or inverted extents.
    pub fn new(x1: usize, y1: usize, x2: usize, y2: usize) -> Result<Self> {
        if x1 < x2 && y1 < y2 {
            Ok(Self { x1, y1, x2, y2 })
        } else {
            Err(Error::InvalidBoundingBox { x1, y1, x2, y2 })
        }
    }

    /// Check that the box is non-empty and fits inside a `width`x`height` grid.
    pub fn validate_within(&self, width: usize, height: usize) -> Result<Self> {
        let bbox = Self::new(self.x1, self.y1, self.x2, self.y2)?;
        if bbox.x2 > width || bbox.y2 > height {
            return Err(Error::InvalidBoundingBox {
                x1: self.x1,
                y1: self.y1,
                x2: self.x2,
                y2: self.y2,
            });
        }
        Ok(bbox)
    }

    /// Box covering a whole `width`x`height` grid.
    pub fn full(width: usize, height: usize) -> Result<Self> {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub const fn width(&self) -> usize {
        self.x2 - self.x1
    }

    #[inline]
    pub const fn height(&self) -> usize {
        self.y2 - self.y1
    }

    #[inline]
    pub const fn area(&self) -> usize {
        self.width() * self.height()
    }

    /// True when column `x` lies strictly between the horizontal edges.
    #[inline]
    pub fn spans_column(&self, x: f64) -> bool {
        (self.x1 as f64) < x && x < (self.x2 as f64)
    }

    /// Vertical midpoint `(y1 + y2) / 2`.
    #[inline]
    pub fn vertical_center(&self) -> f64 {
        (self.y1 + self.y2) as f64 / 2.0
    }

    /// Intersection with a `width`x`height` grid, `None` when nothing overlaps.
    pub fn clip(&self, width: usize, height: usize) -> Option<Self> {
        let x2 = self.x2.min(width);
        let y2 = self.y2.min(height);
        Self::new(self.x1, self.y1, x2, y2).ok()
    }

    /// Tight box around every element of `grid` matching `predicate`.
    pub fn of_grid<T, F>(grid: &Buffer2<T>, mut predicate: F) -> Option<Self>
    where
        F: FnMut(&T) -> bool,
    {
        let mut aabb = Aabb::empty();
        for (y, row) in grid.rows().enumerate() {
            for (x, value) in row.iter().enumerate() {
                if predicate(value) {
                    aabb.include(x, y);
                }
            }
        }
        aabb.to_bounding_box()
    }
}

/// Inclusive bounds accumulated pixel by pixel.
///
/// A pixel at (x, y) is inside if `x_min <= x <= x_max` and
/// `y_min <= y <= y_max`. The empty box has inverted bounds so the first
/// included pixel sets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aabb {
    pub x_min: usize,
    pub x_max: usize,
    pub y_min: usize,
    pub y_max: usize,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    #[inline]
    pub const fn empty() -> Self {
        Self {
            x_min: usize::MAX,
            x_max: 0,
            y_min: usize::MAX,
            y_max: 0,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.x_min > self.x_max || self.y_min > self.y_max
    }

    #[inline]
    pub fn include(&mut self, x: usize, y: usize) {
        self.x_min = self.x_min.min(x);
        self.x_max = self.x_max.max(x);
        self.y_min = self.y_min.min(y);
        self.y_max = self.y_max.max(y);
    }

    /// Convert to the half-open public box. `None` if nothing was included.
    #[inline]
    pub fn to_bounding_box(&self) -> Option<BoundingBox> {
        if self.is_empty() {
            return None;
        }
        Some(BoundingBox {
            x1: self.x_min,
            y1: self.y_min,
            x2: self.x_max + 1,
            y2: self.y_max + 1,
        })
    }
}
