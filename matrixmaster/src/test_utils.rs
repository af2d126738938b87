//! Collaborators and fixtures for flow tests.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use parking_lot::Mutex;

use crate::reporter::{FailureCode, TaskReporter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Success(String),
    Failure(String, FailureCode),
}

impl Outcome {
    pub(crate) fn token(&self) -> &str {
        match self {
            Outcome::Success(token) | Outcome::Failure(token, _) => token,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    outcomes: Mutex<Vec<Outcome>>,
}

impl RecordingReporter {
    pub(crate) fn outcomes(&self) -> Vec<Outcome> {
        self.outcomes.lock().clone()
    }
}

impl TaskReporter for RecordingReporter {
    fn send_success(&self, token: &str) {
        self.outcomes.lock().push(Outcome::Success(token.to_string()));
    }

    fn send_failure(&self, token: &str, code: FailureCode, _message: &str) {
        self.outcomes
            .lock()
            .push(Outcome::Failure(token.to_string(), code));
    }
}

/// `{"saliencyMatrix": ..}` document, zero except for `(x1, y1, x2, y2, value)` blocks.
pub(crate) fn saliency_json(
    width: usize,
    height: usize,
    blocks: &[(usize, usize, usize, usize, u8)],
) -> String {
    let rows: Vec<Vec<u8>> = (0..height)
        .map(|y| {
            (0..width)
                .map(|x| {
                    blocks
                        .iter()
                        .find(|&&(x1, y1, x2, y2, _)| (x1..x2).contains(&x) && (y1..y2).contains(&y))
                        .map_or(0, |&(.., value)| value)
                })
                .collect()
        })
        .collect();
    serde_json::json!({ "saliencyMatrix": rows }).to_string()
}

/// PNG bytes of a flat image with colored rectangles. Decoders sniff the
/// format from the content, so these stand in for the stored JPEGs.
pub(crate) fn block_png(
    width: u32,
    height: u32,
    background: [u8; 3],
    blocks: &[(u32, u32, u32, u32, [u8; 3])],
) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        blocks
            .iter()
            .find(|&&(x1, y1, x2, y2, _)| (x1..x2).contains(&x) && (y1..y2).contains(&y))
            .map_or(Rgb(background), |&(.., color)| Rgb(color))
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}
