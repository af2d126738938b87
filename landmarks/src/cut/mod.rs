//! Mask-seeded foreground extraction.
//!
//! An iterative graph cut: colour models for the background and foreground
//! classes are fitted as Gaussian mixtures, every pixel is linked to the
//! terminals by its negative log-likelihood under each model and to its eight
//! neighbours by a contrast-sensitive smoothness weight, and a minimum cut
//! relabels the probable pixels. The models are refitted from the new labels
//! and the cut repeated.

pub mod gmm;
pub mod max_flow;


use common::Buffer2;
use glam::DVec3;
use image::{imageops, Rgb, RgbImage, Rgba, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{ensure_dimensions, Error, Result};
use gmm::Gmm;
use max_flow::FlowGraph;

/// RGBA written over pixels outside the cut: fully transparent red.
pub const TRANSPARENT_SENTINEL: Rgba<u8> = Rgba([255, 0, 0, 0]);

/// Per-pixel class of a cut hint or result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CutLabel {
    #[default]
    Background = 0,
    Foreground = 1,
    ProbableBackground = 2,
    ProbableForeground = 3,
}

impl CutLabel {
    /// Foreground or probable foreground.
    #[inline]
    pub fn is_foreground(self) -> bool {
        matches!(self, CutLabel::Foreground | CutLabel::ProbableForeground)
    }

    #[inline]
    pub fn is_probable(self) -> bool {
        matches!(
            self,
            CutLabel::ProbableBackground | CutLabel::ProbableForeground
        )
    }

    /// Raw hint value. Values above 3 count as probable foreground.
    pub fn from_value(value: u8) -> Self {
        match value {
            0 => CutLabel::Background,
            1 => CutLabel::Foreground,
            2 => CutLabel::ProbableBackground,
            _ => CutLabel::ProbableForeground,
        }
    }
}

/// Segmentation hint for [`ForegroundCutter::cut`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutHint {
    labels: Buffer2<CutLabel>,
}

impl CutHint {
    pub fn new(labels: Buffer2<CutLabel>) -> Self {
        Self { labels }
    }

    /// Hint from raw mask values, see [`CutLabel::from_value`].
    pub fn from_values(values: &Buffer2<u8>) -> Self {
        Self::new(values.map(|&v| CutLabel::from_value(v)))
    }

    /// Region pixels are probable foreground, the rest background.
    pub fn from_region(mask: &Buffer2<bool>) -> Self {
        Self::new(mask.map(|&inside| {
            if inside {
                CutLabel::ProbableForeground
            } else {
                CutLabel::Background
            }
        }))
    }

    /// Pixels inside `rect` are probable foreground, the rest background.
    pub fn from_rect(width: usize, height: usize, rect: &BoundingBox) -> Result<Self> {
        let rect = rect.validate_within(width, height)?;
        let mut labels = Buffer2::new_filled(width, height, CutLabel::Background);
        for y in rect.y1..rect.y2 {
            labels.row_mut(y)[rect.x1..rect.x2].fill(CutLabel::ProbableForeground);
        }
        Ok(Self::new(labels))
    }

    #[inline]
    pub fn labels(&self) -> &Buffer2<CutLabel> {
        &self.labels
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.labels.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.labels.height()
    }

    /// Tight box around every non-background hint entry.
    pub fn bounding_box(&self) -> Result<BoundingBox> {
        BoundingBox::of_grid(&self.labels, |&label| label != CutLabel::Background)
            .ok_or(Error::EmptyRegionMask)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutConfig {
    /// Refit-and-cut rounds.
    pub iterations: usize,
    /// Gaussian components per colour model.
    pub gmm_components: usize,
    /// Smoothness weight between neighbouring pixels.
    pub gamma: f64,
}

impl Default for CutConfig {
    fn default() -> Self {
        Self {
            iterations: 5,
            gmm_components: 5,
            gamma: 50.0,
        }
    }
}

impl CutConfig {
    /// # Panics
    ///
    /// Panics if `gmm_components` is zero or `gamma` is not positive.
    pub fn validate(&self) {
        assert!(self.gmm_components > 0, "gmm_components must be > 0");
        assert!(
            self.gamma > 0.0 && self.gamma.is_finite(),
            "gamma must be positive, got {}",
            self.gamma
        );
    }
}

/// Crops of one cut region.
#[derive(Debug, Clone)]
pub struct CutResult {
    /// Source pixels inside `rect`.
    pub opaque_crop: RgbImage,
    /// Same extent, with pixels outside the cut set to [`TRANSPARENT_SENTINEL`].
    pub alpha_crop: RgbaImage,
    /// Bounding box of the hint.
    pub rect: BoundingBox,
    /// Full-size binary segmentation.
    pub segmentation: Buffer2<bool>,
}

#[derive(Debug, Clone)]
pub struct ForegroundCutter {
    config: CutConfig,
}

impl Default for ForegroundCutter {
    fn default() -> Self {
        Self::new(CutConfig::default())
    }
}

impl ForegroundCutter {
    pub fn new(config: CutConfig) -> Self {
        config.validate();
        Self { config }
    }

    pub fn config(&self) -> &CutConfig {
        &self.config
    }

    /// Cut `image` with `hint` and crop both renditions to the hint's box.
    pub fn cut(&self, image: &RgbImage, hint: &CutHint) -> Result<CutResult> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        ensure_dimensions(width, height, hint.width(), hint.height())?;
        let rect = hint.bounding_box()?;

        let labels = self.segment(image, hint);
        let segmentation = labels.map(|label| label.is_foreground());

        let mut matted = RgbaImage::new(image.width(), image.height());
        for ((matted, source), &inside) in matted
            .pixels_mut()
            .zip(image.pixels())
            .zip(segmentation.iter())
        {
            *matted = if inside {
                let Rgb([r, g, b]) = *source;
                Rgba([r, g, b, 255])
            } else {
                TRANSPARENT_SENTINEL
            };
        }

        let (x, y) = (rect.x1 as u32, rect.y1 as u32);
        let (w, h) = (rect.width() as u32, rect.height() as u32);
        let opaque_crop = imageops::crop_imm(image, x, y, w, h).to_image();
        let alpha_crop = imageops::crop_imm(&matted, x, y, w, h).to_image();

        tracing::debug!(
            ?rect,
            foreground = segmentation.count_where(|&b| b),
            "foreground cut complete"
        );

        Ok(CutResult {
            opaque_crop,
            alpha_crop,
            rect,
            segmentation,
        })
    }

    /// Refined per-pixel labels. Fixed labels of the hint never change.
    ///
    /// # Panics
    ///
    /// Panics if `image` and `hint` differ in size.
    pub fn segment(&self, image: &RgbImage, hint: &CutHint) -> Buffer2<CutLabel> {
        let width = image.width() as usize;
        let height = image.height() as usize;
        assert!(
            width == hint.width() && height == hint.height(),
            "image and hint size mismatch"
        );

        let colors: Vec<DVec3> = image
            .pixels()
            .map(|Rgb([r, g, b])| DVec3::new(*r as f64, *g as f64, *b as f64))
            .collect();
        let colors = Buffer2::new(width, height, colors);
        let mut labels = hint.labels().clone();

        let has_background = labels.iter().any(|l| !l.is_foreground());
        let has_foreground = labels.iter().any(|l| l.is_foreground());
        if !has_background || !has_foreground {
            tracing::debug!("cut hint covers a single class, keeping it as is");
            return labels;
        }
        if !labels.iter().any(|l| l.is_probable()) {
            return labels;
        }

        let k = self.config.gmm_components;
        let (mut background, mut foreground) = initial_models(&colors, &labels, k);
        let smoothness = Smoothness::new(&colors, self.config.gamma);
        let lambda = 9.0 * self.config.gamma;

        for iteration in 0..self.config.iterations {
            let assignments: Vec<usize> = colors
                .par_iter()
                .zip(labels.par_iter())
                .map(|(&color, label)| {
                    let model = if label.is_foreground() {
                        &foreground
                    } else {
                        &background
                    };
                    model.most_likely_component(color)
                })
                .collect();
            background = fit_class(&colors, &labels, &assignments, k, false);
            foreground = fit_class(&colors, &labels, &assignments, k, true);

            let mut graph = FlowGraph::new(colors.len());
            for (node, (&color, &label)) in colors.iter().zip(labels.iter()).enumerate() {
                let (from_source, to_sink) = match label {
                    CutLabel::Background => (0.0, lambda),
                    CutLabel::Foreground => (lambda, 0.0),
                    _ => (
                        neg_log(background.probability(color)),
                        neg_log(foreground.probability(color)),
                    ),
                };
                let shared = from_source.min(to_sink);
                graph.add_terminal_weights(node, from_source - shared, to_sink - shared);
            }
            smoothness.add_edges(&mut graph, &colors);

            let flow = graph.max_flow();
            let source_side = graph.source_side();

            let mut changed = 0usize;
            for (label, &is_source) in labels.iter_mut().zip(&source_side) {
                if !label.is_probable() {
                    continue;
                }
                let next = if is_source {
                    CutLabel::ProbableForeground
                } else {
                    CutLabel::ProbableBackground
                };
                if *label != next {
                    changed += 1;
                    *label = next;
                }
            }
            tracing::trace!(iteration, flow, changed, "graph cut iteration");
        }

        labels
    }
}

fn neg_log(probability: f64) -> f64 {
    -probability.max(f64::MIN_POSITIVE).ln()
}

fn class_samples(
    colors: &Buffer2<DVec3>,
    labels: &Buffer2<CutLabel>,
    foreground: bool,
) -> Vec<DVec3> {
    colors
        .iter()
        .zip(labels.iter())
        .filter(|(_, label)| label.is_foreground() == foreground)
        .map(|(&color, _)| color)
        .collect()
}

fn initial_models(colors: &Buffer2<DVec3>, labels: &Buffer2<CutLabel>, k: usize) -> (Gmm, Gmm) {
    let fit = |foreground: bool| {
        let samples = class_samples(colors, labels, foreground);
        let assignments = gmm::kmeans(&samples, k);
        Gmm::fit(&samples, &assignments, k)
    };
    (fit(false), fit(true))
}

fn fit_class(
    colors: &Buffer2<DVec3>,
    labels: &Buffer2<CutLabel>,
    assignments: &[usize],
    k: usize,
    foreground: bool,
) -> Gmm {
    let (samples, components): (Vec<DVec3>, Vec<usize>) = colors
        .iter()
        .zip(labels.iter())
        .zip(assignments)
        .filter(|((_, label), _)| label.is_foreground() == foreground)
        .map(|((&color, _), &component)| (color, component))
        .unzip();
    Gmm::fit(&samples, &components, k)
}

/// Contrast-sensitive neighbour weights `gamma * exp(-beta * |dc|^2) / dist`.
#[derive(Debug, Clone, Copy)]
struct Smoothness {
    beta: f64,
    gamma: f64,
}

/// Left, up-left, up and up-right: each unordered 8-neighbour pair once.
const NEIGHBOR_OFFSETS: [(isize, isize); 4] = [(-1, 0), (-1, -1), (0, -1), (1, -1)];

impl Smoothness {
    fn new(colors: &Buffer2<DVec3>, gamma: f64) -> Self {
        let (width, height) = (colors.width(), colors.height());
        let mut sum = 0.0;
        let mut pairs = 0usize;
        for y in 0..height {
            for x in 0..width {
                for (nx, ny) in neighbors(x, y, width) {
                    sum += colors[(x, y)].distance_squared(colors[(nx, ny)]);
                    pairs += 1;
                }
            }
        }
        let beta = if sum <= f64::EPSILON || pairs == 0 {
            0.0
        } else {
            1.0 / (2.0 * sum / pairs as f64)
        };
        Self { beta, gamma }
    }

    fn weight(&self, a: DVec3, b: DVec3, diagonal: bool) -> f64 {
        let w = self.gamma * (-self.beta * a.distance_squared(b)).exp();
        if diagonal {
            w / std::f64::consts::SQRT_2
        } else {
            w
        }
    }

    fn add_edges(&self, graph: &mut FlowGraph, colors: &Buffer2<DVec3>) {
        let width = colors.width();
        for y in 0..colors.height() {
            for x in 0..width {
                let color = colors[(x, y)];
                for (nx, ny) in neighbors(x, y, width) {
                    let diagonal = nx != x && ny != y;
                    let w = self.weight(color, colors[(nx, ny)], diagonal);
                    graph.add_edge(y * width + x, ny * width + nx, w, w);
                }
            }
        }
    }
}

fn neighbors(x: usize, y: usize, width: usize) -> impl Iterator<Item = (usize, usize)> {
    NEIGHBOR_OFFSETS.into_iter().filter_map(move |(dx, dy)| {
        let nx = x.checked_add_signed(dx)?;
        let ny = y.checked_add_signed(dy)?;
        (nx < width).then_some((nx, ny))
    })
}
