//! Connected component labeling over row runs.
//!
//! Every row is cut into runs of set pixels. A run that touches a run of the
//! row above joins its component, otherwise it opens a provisional one.
//! Provisional components are merged with a disjoint-set forest and finally
//! renumbered `1..=n` in raster order of each component's first pixel.

use common::Buffer2;
use serde::{Deserialize, Serialize};

/// Which neighbors of a pixel belong to the same component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Edge neighbors only.
    Four,
    /// Edge and corner neighbors.
    #[default]
    Eight,
}

impl Connectivity {
    /// Extra columns on each side within which runs on adjacent rows touch.
    #[inline]
    fn reach(self) -> usize {
        match self {
            Connectivity::Four => 0,
            Connectivity::Eight => 1,
        }
    }
}

/// Columns `start..end` of one row, and the provisional component owning them.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    component: usize,
}

impl Span {
    /// True when columns `start..end` of the next row touch this span
    /// within `reach` columns.
    #[inline]
    fn touches(&self, start: usize, end: usize, reach: usize) -> bool {
        self.start < end + reach && start < self.end + reach
    }
}

/// Label grid from connected component analysis. 0 is background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    labels: Buffer2<u32>,
    num_labels: usize,
}

impl LabelMap {
    pub fn from_mask(mask: &Buffer2<bool>, connectivity: Connectivity) -> Self {
        let mut labels = Buffer2::new_filled(mask.width(), mask.height(), 0u32);
        let reach = connectivity.reach();
        let mut forest = DisjointSets::default();
        let mut above: Vec<Span> = Vec::new();
        let mut current: Vec<Span> = Vec::new();

        for (y, row) in mask.rows().enumerate() {
            current.clear();
            for (start, end) in row_spans(row) {
                let mut component = None;
                for other in above.iter().filter(|other| other.touches(start, end, reach)) {
                    match component {
                        None => component = Some(other.component),
                        Some(own) => forest.join(own, other.component),
                    }
                }
                let span = Span {
                    start,
                    end,
                    component: component.unwrap_or_else(|| forest.add()),
                };
                current.push(span);
            }

            // Provisional ids are stored off by one so 0 stays background.
            let out = labels.row_mut(y);
            for span in &current {
                out[span.start..span.end].fill(span.component as u32 + 1);
            }
            std::mem::swap(&mut above, &mut current);
        }

        let final_ids = forest.renumber();
        for label in labels.pixels_mut().iter_mut().filter(|l| **l != 0) {
            *label = final_ids[*label as usize - 1];
        }
        let num_labels = final_ids.iter().copied().max().unwrap_or(0) as usize;

        Self { labels, num_labels }
    }

    /// Number of components, excluding background.
    #[inline]
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    #[inline]
    pub fn labels(&self) -> &Buffer2<u32> {
        &self.labels
    }

    #[inline]
    pub fn into_labels(self) -> Buffer2<u32> {
        self.labels
    }
}

/// `(start, end)` of each run of set pixels in `row`, left to right.
fn row_spans(row: &[bool]) -> impl Iterator<Item = (usize, usize)> + '_ {
    let mut x = 0;
    std::iter::from_fn(move || {
        let start = x + row[x..].iter().position(|&set| set)?;
        let end = row[start..]
            .iter()
            .position(|&set| !set)
            .map_or(row.len(), |len| start + len);
        x = end;
        Some((start, end))
    })
}

/// Disjoint-set forest whose roots are always the smallest member, so a
/// component is named after its earliest provisional id.
#[derive(Debug, Default)]
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn add(&mut self) -> usize {
        self.parent.push(self.parent.len());
        self.parent.len() - 1
    }

    fn root(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            // Path halving.
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    fn join(&mut self, a: usize, b: usize) {
        let (a, b) = (self.root(a), self.root(b));
        if a != b {
            self.parent[a.max(b)] = a.min(b);
        }
    }

    /// Final label `1..=n` of every provisional id, numbered by first root
    /// occurrence.
    fn renumber(&mut self) -> Vec<u32> {
        let mut ids = vec![0u32; self.parent.len()];
        let mut next = 0u32;
        for node in 0..self.parent.len() {
            let root = self.root(node);
            if root == node {
                next += 1;
                ids[node] = next;
            } else {
                ids[node] = ids[root];
            }
        }
        ids
    }
}
