//! Full-covariance Gaussian mixture over RGB colors.

use glam::{DMat3, DVec3};

/// Added to the covariance diagonal when it is singular.
const SINGULAR_REGULARIZATION: f64 = 0.01;
const KMEANS_ITERATIONS: usize = 10;

#[derive(Debug, Clone, Copy)]
struct Component {
    weight: f64,
    mean: DVec3,
    inverse: DMat3,
    norm: f64,
}

impl Component {
    const EMPTY: Self = Self {
        weight: 0.0,
        mean: DVec3::ZERO,
        inverse: DMat3::ZERO,
        norm: 0.0,
    };

    /// Unweighted density, without the constant `(2 pi)^(-3/2)` factor.
    #[inline]
    fn density(&self, color: DVec3) -> f64 {
        if self.weight <= 0.0 {
            return 0.0;
        }
        let d = color - self.mean;
        self.norm * (-0.5 * d.dot(self.inverse * d)).exp()
    }
}

#[derive(Debug, Clone)]
pub struct Gmm {
    components: Vec<Component>,
}

impl Gmm {
    /// Fit one Gaussian per component index from `samples` and the matching
    /// `assignments`. Components without samples get zero weight.
    ///
    /// # Panics
    ///
    /// Panics if `samples` and `assignments` differ in length or an
    /// assignment is out of range.
    pub fn fit(samples: &[DVec3], assignments: &[usize], num_components: usize) -> Self {
        assert_eq!(samples.len(), assignments.len(), "length mismatch");

        let mut counts = vec![0usize; num_components];
        let mut sums = vec![DVec3::ZERO; num_components];
        let mut products = vec![DMat3::ZERO; num_components];
        for (&color, &component) in samples.iter().zip(assignments) {
            counts[component] += 1;
            sums[component] += color;
            products[component] += outer(color, color);
        }

        let total = samples.len() as f64;
        let components = (0..num_components)
            .map(|i| {
                if counts[i] == 0 {
                    return Component::EMPTY;
                }
                let n = counts[i] as f64;
                let mean = sums[i] / n;
                let mut covariance = products[i] * (1.0 / n) - outer(mean, mean);
                let mut det = covariance.determinant();
                if det <= f64::EPSILON {
                    covariance += DMat3::from_diagonal(DVec3::splat(SINGULAR_REGULARIZATION));
                    det = covariance.determinant();
                }
                Component {
                    weight: n / total,
                    mean,
                    inverse: covariance.inverse(),
                    norm: 1.0 / det.sqrt(),
                }
            })
            .collect();

        Self { components }
    }

    /// Mixture likelihood of `color`.
    pub fn probability(&self, color: DVec3) -> f64 {
        self.components
            .iter()
            .map(|c| c.weight * c.density(color))
            .sum()
    }

    /// Index of the component with the highest density at `color`.
    pub fn most_likely_component(&self, color: DVec3) -> usize {
        let mut best = 0;
        let mut best_density = f64::NEG_INFINITY;
        for (i, component) in self.components.iter().enumerate() {
            let density = component.density(color);
            if density > best_density {
                best = i;
                best_density = density;
            }
        }
        best
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }
}

#[inline]
fn outer(a: DVec3, b: DVec3) -> DMat3 {
    DMat3::from_cols(a * b.x, a * b.y, a * b.z)
}

/// Deterministic k-means clustering of `samples` into at most `k` clusters.
///
/// Centers start at the first sample and then at the sample farthest from
/// every chosen center. Returns the cluster index of every sample.
pub fn kmeans(samples: &[DVec3], k: usize) -> Vec<usize> {
    let k = k.min(samples.len());
    if k == 0 {
        return vec![0; samples.len()];
    }

    let mut centers = vec![samples[0]];
    let mut nearest: Vec<f64> = samples
        .iter()
        .map(|s| s.distance_squared(samples[0]))
        .collect();
    while centers.len() < k {
        let (farthest, &distance) = nearest
            .iter()
            .enumerate()
            .fold((0, &f64::NEG_INFINITY), |best, item| {
                if *item.1 > *best.1 {
                    item
                } else {
                    best
                }
            });
        if distance <= 0.0 {
            break;
        }
        let center = samples[farthest];
        centers.push(center);
        for (n, s) in nearest.iter_mut().zip(samples) {
            *n = n.min(s.distance_squared(center));
        }
    }

    let mut assignments = vec![0usize; samples.len()];
    for _ in 0..KMEANS_ITERATIONS {
        let mut changed = false;
        for (assignment, &sample) in assignments.iter_mut().zip(samples) {
            let closest = closest_center(&centers, sample);
            if closest != *assignment {
                *assignment = closest;
                changed = true;
            }
        }

        let mut sums = vec![DVec3::ZERO; centers.len()];
        let mut counts = vec![0usize; centers.len()];
        for (&assignment, &sample) in assignments.iter().zip(samples) {
            sums[assignment] += sample;
            counts[assignment] += 1;
        }
        for ((center, sum), count) in centers.iter_mut().zip(sums).zip(counts) {
            if count > 0 {
                *center = sum / count as f64;
            }
        }

        if !changed {
            break;
        }
    }
    assignments
}

fn closest_center(centers: &[DVec3], sample: DVec3) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, center) in centers.iter().enumerate() {
        let distance = sample.distance_squared(*center);
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}
