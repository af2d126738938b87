//! Per-pixel saliency grid.

use common::Buffer2;
use serde::Deserialize;

use crate::bbox::BoundingBox;
use crate::error::{ensure_dimensions, Error, Result};

/// Dense HxW grid of 8-bit importance values, one per image pixel.
///
/// Immutable once built. Derived working copies (for example with a forced
/// debug patch) are made by the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaliencyMap {
    grid: Buffer2<u8>,
}

#[derive(Debug, Deserialize)]
struct SaliencyDocument {
    #[serde(rename = "saliencyMatrix")]
    saliency_matrix: Vec<Vec<f64>>,
}

impl SaliencyMap {
    pub fn new(width: usize, height: usize, values: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidSaliencyMatrix {
                reason: format!("empty grid {width}x{height}"),
            });
        }
        if values.len() != width * height {
            return Err(Error::InvalidSaliencyMatrix {
                reason: format!(
                    "{} values do not fill a {width}x{height} grid",
                    values.len()
                ),
            });
        }
        Ok(Self {
            grid: Buffer2::new(width, height, values),
        })
    }

    pub fn from_grid(grid: Buffer2<u8>) -> Result<Self> {
        let (width, height) = (grid.width(), grid.height());
        Self::new(width, height, grid.into_vec())
    }

    /// Build from row vectors. All rows must have the same, non-zero length.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.as_ref().len());
        let mut values = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != width {
                return Err(Error::InvalidSaliencyMatrix {
                    reason: format!("row {y} has {} values, expected {width}", row.len()),
                });
            }
            values.extend_from_slice(row);
        }
        Self::new(width, height, values)
    }

    /// Parse a `{"saliencyMatrix": [[...], ...]}` document.
    ///
    /// Values outside [0, 255] are clamped and fractions truncated.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: SaliencyDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let document: SaliencyDocument = serde_json::from_slice(bytes)?;
        Self::from_document(document)
    }

    fn from_document(document: SaliencyDocument) -> Result<Self> {
        let rows: Vec<Vec<u8>> = document
            .saliency_matrix
            .iter()
            .map(|row| row.iter().map(|&v| to_saliency_value(v)).collect())
            .collect::<Result<_>>()?;
        Self::from_rows(&rows)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.grid.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.grid.height()
    }

    #[inline]
    pub fn grid(&self) -> &Buffer2<u8> {
        &self.grid
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.grid[(x, y)]
    }

    /// Sum of all saliency values.
    pub fn total(&self) -> u64 {
        self.grid.iter().map(|&v| u64::from(v)).sum()
    }

    /// Sum of saliency inside `rect`, clipped to the grid.
    pub fn region_sum(&self, rect: &BoundingBox) -> u64 {
        let Some(rect) = rect.clip(self.width(), self.height()) else {
            return 0;
        };
        (rect.y1..rect.y2)
            .map(|y| {
                self.grid.row(y)[rect.x1..rect.x2]
                    .iter()
                    .map(|&v| u64::from(v))
                    .sum::<u64>()
            })
            .sum()
    }

    /// Fail with `DimensionMismatch` unless the map is `width`x`height`.
    pub fn ensure_dimensions(&self, width: usize, height: usize) -> Result<()> {
        ensure_dimensions(width, height, self.width(), self.height())
    }
}

fn to_saliency_value(value: f64) -> Result<u8> {
    if !value.is_finite() {
        return Err(Error::InvalidSaliencyMatrix {
            reason: format!("non-finite value {value}"),
        });
    }
    Ok(value.clamp(0.0, 255.0) as u8)
}
