use image::{RgbImage, RgbaImage};

use crate::bbox::BoundingBox;
use crate::cut::CutResult;

/// A candidate landmark found in one camera position's image.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub rect: BoundingBox,
    pub opaque_crop: Option<RgbImage>,
    pub alpha_crop: Option<RgbaImage>,
    /// Share of the image's saliency inside `rect`, once scored.
    pub score: Option<f64>,
    /// Camera position tag of the source image.
    pub position: String,
}

impl Candidate {
    pub fn new(rect: BoundingBox, position: impl Into<String>) -> Self {
        Self {
            rect,
            opaque_crop: None,
            alpha_crop: None,
            score: None,
            position: position.into(),
        }
    }

    pub fn from_cut(cut: CutResult, position: impl Into<String>) -> Self {
        Self {
            rect: cut.rect,
            opaque_crop: Some(cut.opaque_crop),
            alpha_crop: Some(cut.alpha_crop),
            score: None,
            position: position.into(),
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}
