use thiserror::Error;

/// Structural failures of the landmark pipeline.
///
/// All of these are detected by inspecting inputs before the numeric
/// transforms run. None of them is retried inside the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("saliency map contains no salient region")]
    NoSalientRegion,

    #[error("region mask has no non-zero entries")]
    EmptyRegionMask,

    #[error("invalid bounding box: ({x1}, {y1}) - ({x2}, {y2})")]
    InvalidBoundingBox {
        x1: usize,
        y1: usize,
        x2: usize,
        y2: usize,
    },

    #[error(
        "dimension mismatch: expected {expected_width}x{expected_height}, got {width}x{height}"
    )]
    DimensionMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    #[error("invalid saliency matrix: {reason}")]
    InvalidSaliencyMatrix { reason: String },

    #[error("failed to parse saliency JSON: {0}")]
    SaliencyJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn ensure_dimensions(
    expected_width: usize,
    expected_height: usize,
    width: usize,
    height: usize,
) -> Result<()> {
    if expected_width == width && expected_height == height {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            expected_width,
            expected_height,
            width,
            height,
        })
    }
}
