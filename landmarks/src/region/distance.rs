//! Exact Euclidean distance transform.
//!
//! Separable lower-envelope algorithm (Felzenszwalb & Huttenlocher): squared
//! distances are computed along columns, then along rows, and the square root
//! is taken at the end. Background pixels are the `false` entries; positions
//! outside the grid do not count as background.

use common::parallel::par_for_each_row;
use common::Buffer2;
use rayon::prelude::*;

/// Distance from every pixel to the nearest `false` pixel of `mask`.
///
/// Background pixels get 0. When `mask` has no background at all, every
/// pixel is `f64::INFINITY`.
pub fn distance_transform(mask: &Buffer2<bool>) -> Buffer2<f64> {
    let width = mask.width();
    let height = mask.height();
    if mask.is_empty() {
        return Buffer2::new_filled(width, height, 0.0);
    }

    let columns: Vec<Vec<f64>> = (0..width)
        .into_par_iter()
        .map(|x| {
            let seeds: Vec<f64> = (0..height)
                .map(|y| if mask[(x, y)] { f64::INFINITY } else { 0.0 })
                .collect();
            let mut squared = vec![0.0; height];
            squared_distance_1d(&seeds, &mut squared);
            squared
        })
        .collect();

    let mut distances = Buffer2::new_filled(width, height, 0.0f64);
    par_for_each_row(&mut distances, |y, row| {
        let seeds: Vec<f64> = columns.iter().map(|column| column[y]).collect();
        squared_distance_1d(&seeds, row);
        for value in row.iter_mut() {
            *value = value.sqrt();
        }
    });

    distances
}

/// Lower envelope of the parabolas rooted at every finite entry of `f`.
///
/// `out[q] = min_p (q - p)^2 + f[p]`, or infinity if `f` has no finite entry.
fn squared_distance_1d(f: &[f64], out: &mut [f64]) {
    debug_assert_eq!(f.len(), out.len());

    // Parabola roots and the position where each one starts to dominate.
    let mut roots: Vec<usize> = Vec::new();
    let mut starts: Vec<f64> = Vec::new();

    for q in 0..f.len() {
        if !f[q].is_finite() {
            continue;
        }
        let mut start = f64::NEG_INFINITY;
        while let Some(&p) = roots.last() {
            start = intersection(f, p, q);
            if start <= starts[starts.len() - 1] {
                roots.pop();
                starts.pop();
                start = f64::NEG_INFINITY;
            } else {
                break;
            }
        }
        roots.push(q);
        starts.push(start);
    }

    if roots.is_empty() {
        out.fill(f64::INFINITY);
        return;
    }

    let mut k = 0;
    for (q, value) in out.iter_mut().enumerate() {
        let qf = q as f64;
        while k + 1 < roots.len() && starts[k + 1] < qf {
            k += 1;
        }
        let p = roots[k];
        let d = qf - p as f64;
        *value = d * d + f[p];
    }
}

#[inline]
fn intersection(f: &[f64], p: usize, q: usize) -> f64 {
    let (pf, qf) = (p as f64, q as f64);
    ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * (qf - pf))
}
