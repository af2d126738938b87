//! Marker-controlled watershed by priority flooding.
//!
//! Seeds are the non-zero entries of the marker grid. Unassigned pixels (0)
//! are claimed by whichever seed reaches them over the smallest intensity
//! step: a pixel queued with priority `|gray[a] - gray[b]|` by neighbor `a`
//! takes `a`'s label the first time it is popped. Equal priorities are served
//! first-in first-out and the initial seeds are queued in raster order, so
//! the result is fully determined by the input.
//!
//! Meeting basins are not separated by a boundary line: every reachable
//! pixel ends up in exactly one basin. Pixels that no seed can reach keep 0.

use std::collections::VecDeque;

use common::Buffer2;

/// Flood `markers` over `gray` using 4-connectivity.
///
/// # Panics
///
/// Panics if `gray` and `markers` have different shapes.
pub fn watershed(gray: &Buffer2<u8>, markers: &mut Buffer2<u32>) {
    assert!(gray.same_shape(markers), "shape mismatch");
    let width = gray.width();
    let height = gray.height();

    let mut queue = BucketQueue::new();
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let label = markers[idx];
            if label == 0 {
                continue;
            }
            push_unassigned_neighbors(gray, markers, &mut queue, x, y, label);
        }
    }

    while let Some(entry) = queue.pop() {
        if markers[entry.index] != 0 {
            continue;
        }
        markers[entry.index] = entry.label;
        let (x, y) = (entry.index % width, entry.index / width);
        push_unassigned_neighbors(gray, markers, &mut queue, x, y, entry.label);
    }
}

fn push_unassigned_neighbors(
    gray: &Buffer2<u8>,
    markers: &Buffer2<u32>,
    queue: &mut BucketQueue,
    x: usize,
    y: usize,
    label: u32,
) {
    let width = gray.width();
    let height = gray.height();
    let value = gray[(x, y)];

    let mut visit = |nx: usize, ny: usize| {
        let index = ny * width + nx;
        if markers[index] == 0 {
            queue.push(value.abs_diff(gray[index]), Entry { index, label });
        }
    };

    if x > 0 {
        visit(x - 1, y);
    }
    if x + 1 < width {
        visit(x + 1, y);
    }
    if y > 0 {
        visit(x, y - 1);
    }
    if y + 1 < height {
        visit(x, y + 1);
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    index: usize,
    label: u32,
}

/// 256 FIFO buckets, one per intensity step.
#[derive(Debug)]
struct BucketQueue {
    buckets: Vec<VecDeque<Entry>>,
    lowest: usize,
    len: usize,
}

impl BucketQueue {
    fn new() -> Self {
        Self {
            buckets: (0..256).map(|_| VecDeque::new()).collect(),
            lowest: 0,
            len: 0,
        }
    }

    #[inline]
    fn push(&mut self, priority: u8, entry: Entry) {
        let priority = priority as usize;
        self.buckets[priority].push_back(entry);
        self.lowest = self.lowest.min(priority);
        self.len += 1;
    }

    fn pop(&mut self) -> Option<Entry> {
        if self.len == 0 {
            return None;
        }
        while self.buckets[self.lowest].is_empty() {
            self.lowest += 1;
        }
        self.len -= 1;
        self.buckets[self.lowest].pop_front()
    }
}
