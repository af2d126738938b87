//! s-t maximum flow with Dinic's algorithm.
//!
//! Edges are stored in pairs so that `e ^ 1` is the reverse of `e`. Blocking
//! flows are found with an explicit path stack instead of recursion, since
//! paths in a pixel grid can be as long as the image has pixels.

use std::collections::VecDeque;

/// Residual capacities at or below this are treated as saturated.
const CAPACITY_EPSILON: f64 = 1e-9;
const UNREACHED: u32 = u32::MAX;

#[derive(Debug, Clone)]
pub struct FlowGraph {
    source: usize,
    sink: usize,
    to: Vec<u32>,
    capacity: Vec<f64>,
    adjacency: Vec<Vec<u32>>,
    level: Vec<u32>,
    cursor: Vec<usize>,
}

impl FlowGraph {
    /// Graph with `num_nodes` inner nodes plus a source and a sink.
    pub fn new(num_nodes: usize) -> Self {
        let total = num_nodes + 2;
        Self {
            source: num_nodes,
            sink: num_nodes + 1,
            to: Vec::new(),
            capacity: Vec::new(),
            adjacency: vec![Vec::new(); total],
            level: vec![UNREACHED; total],
            cursor: vec![0; total],
        }
    }

    #[inline]
    pub fn source(&self) -> usize {
        self.source
    }

    #[inline]
    pub fn sink(&self) -> usize {
        self.sink
    }

    /// Add an edge `a -> b` with `forward` capacity and `backward` capacity
    /// on `b -> a`.
    pub fn add_edge(&mut self, a: usize, b: usize, forward: f64, backward: f64) {
        let e = self.to.len() as u32;
        self.to.push(b as u32);
        self.capacity.push(forward);
        self.adjacency[a].push(e);
        self.to.push(a as u32);
        self.capacity.push(backward);
        self.adjacency[b].push(e + 1);
    }

    /// Terminal links of `node`: capacity from the source and to the sink.
    pub fn add_terminal_weights(&mut self, node: usize, from_source: f64, to_sink: f64) {
        if from_source > 0.0 {
            self.add_edge(self.source, node, from_source, 0.0);
        }
        if to_sink > 0.0 {
            self.add_edge(node, self.sink, to_sink, 0.0);
        }
    }

    /// Push the maximum flow and return its value.
    pub fn max_flow(&mut self) -> f64 {
        let mut total = 0.0;
        while self.build_levels() {
            self.cursor.fill(0);
            total += self.blocking_flow();
        }
        total
    }

    /// Inner nodes on the source side of the minimum cut. Valid after
    /// [`Self::max_flow`].
    pub fn source_side(&self) -> Vec<bool> {
        self.level[..self.source]
            .iter()
            .map(|&level| level != UNREACHED)
            .collect()
    }

    /// BFS levels from the source over unsaturated edges. Returns whether the
    /// sink is reachable.
    fn build_levels(&mut self) -> bool {
        self.level.fill(UNREACHED);
        self.level[self.source] = 0;
        let mut queue = VecDeque::from([self.source]);
        while let Some(u) = queue.pop_front() {
            for &e in &self.adjacency[u] {
                let v = self.to[e as usize] as usize;
                if self.level[v] == UNREACHED && self.capacity[e as usize] > CAPACITY_EPSILON {
                    self.level[v] = self.level[u] + 1;
                    queue.push_back(v);
                }
            }
        }
        self.level[self.sink] != UNREACHED
    }

    fn blocking_flow(&mut self) -> f64 {
        let mut total = 0.0;
        let mut path: Vec<usize> = Vec::new();
        let mut u = self.source;

        loop {
            if u == self.sink {
                let bottleneck = path
                    .iter()
                    .map(|&e| self.capacity[e])
                    .fold(f64::INFINITY, f64::min);
                let mut saturated_at = path.len();
                for (i, &e) in path.iter().enumerate() {
                    self.capacity[e] -= bottleneck;
                    self.capacity[e ^ 1] += bottleneck;
                    if saturated_at == path.len() && self.capacity[e] <= CAPACITY_EPSILON {
                        saturated_at = i;
                    }
                }
                total += bottleneck;
                // Resume from the tail of the first saturated edge.
                path.truncate(saturated_at);
                u = path
                    .last()
                    .map_or(self.source, |&e| self.to[e] as usize);
                continue;
            }

            let mut advanced = false;
            while self.cursor[u] < self.adjacency[u].len() {
                let e = self.adjacency[u][self.cursor[u]] as usize;
                let v = self.to[e] as usize;
                if self.capacity[e] > CAPACITY_EPSILON && self.level[v] == self.level[u] + 1 {
                    path.push(e);
                    u = v;
                    advanced = true;
                    break;
                }
                self.cursor[u] += 1;
            }

            if !advanced {
                let Some(e) = path.pop() else {
                    break;
                };
                u = self.to[e ^ 1] as usize;
                self.cursor[u] += 1;
            }
        }

        total
    }
}
