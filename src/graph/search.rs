//! Search algorithms over subgraph views: Dijkstra variants, BFS,
//! furthest-pair computation and connected components.
//!
//! All searches run on owned scratch ([`SearchContext`]) so concurrent
//! searches over disjoint or even overlapping subgraphs never share state.

use super::*;
use crate::datastr::addressable_heap::AddressableHeap;
use crate::datastr::epoch_vector::EpochVector;
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

/// Owned per-search scratch: tentative distances, path counts and the queue.
/// Reusable across searches; reset is amortized O(1).
#[derive(Debug)]
pub struct SearchContext {
    dist: EpochVector<Weight>,
    count: EpochVector<PathCount>,
    heap: AddressableHeap<Weight>,
}

impl SearchContext {
    /// `size` must cover all node ids of the store, i.e. `store.len()`.
    pub fn new(size: usize) -> Self {
        SearchContext {
            dist: EpochVector::new(size, INFINITY),
            count: EpochVector::new(size, 0),
            heap: AddressableHeap::new(size),
        }
    }

    /// Tentative distance of the last search.
    pub fn distance(&self, node: NodeId) -> Weight {
        self.dist.get(node as usize)
    }

    /// Shortest path count of the last counting search.
    pub fn path_count(&self, node: NodeId) -> PathCount {
        self.count.get(node as usize)
    }

    fn reset(&mut self) {
        self.dist.reset();
        self.count.reset();
        self.heap.clear();
    }

    fn relax(&mut self, node: NodeId, distance: Weight) -> bool {
        if distance < self.dist.get(node as usize) {
            self.dist.set(node as usize, distance);
            if self.heap.contains(node as usize) {
                self.heap.decrease(node as usize, distance);
            } else {
                self.heap.push(node as usize, distance);
            }
            true
        } else {
            false
        }
    }
}

/// Distance differences to the two extreme points of the rough partition.
#[derive(Debug, Copy, Clone)]
pub struct DiffData {
    pub node: NodeId,
    pub dist_a: Weight,
    pub dist_b: Weight,
}

impl DiffData {
    /// Distances reinterpret as signed words, so unreachable nodes sort as
    /// small constants instead of dominating the order.
    pub fn diff(&self) -> i64 {
        self.dist_a as i32 as i64 - self.dist_b as i32 as i64
    }

    pub fn min(&self) -> Weight {
        self.dist_a.min(self.dist_b)
    }
}

impl<'a> SubGraph<'a> {
    /// Dijkstra with shortest path counting: on strict improvement the count
    /// is replaced, on ties accumulated (wrapping mod 2^16).
    pub fn run_dijkstra(&self, v: NodeId, ctx: &mut SearchContext) {
        debug_assert!(self.contains(v));
        ctx.reset();
        ctx.dist.set(v as usize, 0);
        ctx.count.set(v as usize, 1);
        ctx.heap.push(v as usize, 0);

        while let Some((node, distance)) = ctx.heap.pop() {
            let node = node as NodeId;
            let source_count = ctx.count.get(node as usize);
            for n in self.neighbors(node) {
                if !self.contains(n.node) {
                    continue;
                }
                let new_dist = distance.saturating_add(n.distance);
                if ctx.relax(n.node, new_dist) {
                    ctx.count.set(n.node as usize, source_count);
                } else if new_dist == ctx.dist.get(n.node as usize) && new_dist < INFINITY {
                    ctx.count.set(n.node as usize, ctx.count.get(n.node as usize).wrapping_add(source_count));
                }
            }
        }
    }

    /// Landmark-pruned Dijkstra: skips neighbors whose landmark level is at
    /// least the pruning level of the source. No counting.
    pub fn run_dijkstra_llsub(&self, v: NodeId, ctx: &mut SearchContext) {
        debug_assert!(self.contains(v));
        let pruning_level = self.store().landmark_level(v);
        ctx.reset();
        ctx.dist.set(v as usize, 0);
        ctx.heap.push(v as usize, 0);

        while let Some((node, distance)) = ctx.heap.pop() {
            for n in self.neighbors(node as NodeId) {
                if !self.contains(n.node) || self.store().landmark_level(n.node) >= pruning_level {
                    continue;
                }
                ctx.relax(n.node, distance.saturating_add(n.distance));
            }
        }
    }

    /// Landmark-flag Dijkstra for pruning statistics. Distances are shifted
    /// left by one; the low bit is a "no landmark passed yet" flag which is
    /// cleared when settling a node of landmark level at least the source's
    /// pruning level.
    pub fn run_dijkstra_ll(&self, v: NodeId, ctx: &mut SearchContext) {
        debug_assert!(self.contains(v));
        let pruning_level = self.store().landmark_level(v);
        ctx.reset();
        ctx.dist.set(v as usize, 1);
        for n in self.neighbors(v) {
            if self.contains(n.node) {
                let n_dist = (n.distance << 1) | 1;
                if n_dist < ctx.dist.get(n.node as usize) {
                    ctx.dist.set(n.node as usize, n_dist);
                    ctx.heap.push(n.node as usize, n_dist);
                }
            }
        }

        while let Some((node, distance)) = ctx.heap.pop() {
            let node = node as NodeId;
            let current_dist = if self.store().landmark_level(node) >= pruning_level {
                distance & !1
            } else {
                distance
            };
            for n in self.neighbors(node) {
                if !self.contains(n.node) {
                    continue;
                }
                ctx.relax(n.node, current_dist + (n.distance << 1));
            }
        }
    }

    /// Bounded Dijkstra which ignores the direct edges of the source, leaving
    /// only alternative paths of two or more edges. Used to detect redundant
    /// edges.
    pub(crate) fn run_dijkstra_skipping_source_edges(&self, v: NodeId, max_dist: Weight, ctx: &mut SearchContext) {
        ctx.reset();
        ctx.dist.set(v as usize, 0);
        // seed queue entries only; node distances stay at infinity so the
        // direct edge does not shadow a two-edge path of equal length
        let mut queue: BinaryHeap<Reverse<(Weight, NodeId)>> = BinaryHeap::new();
        for n in self.neighbors(v) {
            if self.contains(n.node) {
                queue.push(Reverse((n.distance, n.node)));
            }
        }
        while let Some(Reverse((distance, node))) = queue.pop() {
            for n in self.neighbors(node) {
                if !self.contains(n.node) {
                    continue;
                }
                let new_dist = distance.saturating_add(n.distance);
                if new_dist <= max_dist && new_dist < ctx.dist.get(n.node as usize) {
                    ctx.dist.set(n.node as usize, new_dist);
                    queue.push(Reverse((new_dist, n.node)));
                }
            }
        }
    }

    /// Breadth-first search; hop distances end up in the context.
    pub fn run_bfs(&self, v: NodeId, ctx: &mut SearchContext) {
        debug_assert!(self.contains(v));
        ctx.reset();
        ctx.dist.set(v as usize, 0);
        let mut queue = VecDeque::new();
        queue.push_back(v);
        while let Some(next) = queue.pop_front() {
            let new_dist = ctx.dist.get(next as usize) + 1;
            for n in self.neighbors(next) {
                if self.contains(n.node) && ctx.dist.get(n.node as usize) == INFINITY {
                    ctx.dist.set(n.node as usize, new_dist);
                    queue.push_back(n.node);
                }
            }
        }
    }

    /// Run many plain Dijkstras in parallel and return, per source, the
    /// distances to the given targets. Each rayon worker owns its scratch.
    pub fn run_dijkstra_many(&self, sources: &[NodeId], targets: &[NodeId]) -> Vec<Vec<Weight>> {
        let scratch_size = self.store().len();
        sources
            .par_iter()
            .map_init(
                || SearchContext::new(scratch_size),
                |ctx, &source| {
                    self.run_dijkstra(source, ctx);
                    targets.iter().map(|&t| ctx.distance(t)).collect()
                },
            )
            .collect()
    }

    /// Parallel variant of [`Self::run_dijkstra_llsub`] over many sources.
    pub fn run_dijkstra_llsub_many(&self, sources: &[NodeId], targets: &[NodeId]) -> Vec<Vec<Weight>> {
        let scratch_size = self.store().len();
        sources
            .par_iter()
            .map_init(
                || SearchContext::new(scratch_size),
                |ctx, &source| {
                    self.run_dijkstra_llsub(source, ctx);
                    targets.iter().map(|&t| ctx.distance(t)).collect()
                },
            )
            .collect()
    }

    /// The node furthest from `v` and its distance.
    pub fn get_furthest(&self, v: NodeId, weighted: bool, ctx: &mut SearchContext) -> (NodeId, Weight) {
        if weighted {
            self.run_dijkstra(v, ctx);
        } else {
            self.run_bfs(v, ctx);
        }
        let mut furthest = v;
        for &node in &self.nodes {
            if ctx.distance(node) > ctx.distance(furthest) {
                furthest = node;
            }
        }
        (furthest, ctx.distance(furthest))
    }

    /// Iterated furthest search from `start` until the eccentricity stops
    /// growing; approximates the diameter endpoints.
    pub fn get_furthest_pair(&self, start: NodeId, weighted: bool, ctx: &mut SearchContext) -> Edge {
        debug_assert!(self.node_count() > 1);
        let mut max_dist = 0;
        let mut start = start;
        let mut furthest = self.get_furthest(start, weighted, ctx);
        while furthest.1 > max_dist {
            max_dist = furthest.1;
            start = furthest.0;
            furthest = self.get_furthest(start, weighted, ctx);
        }
        Edge::new(start, furthest.0, max_dist)
    }

    pub fn diameter(&self, weighted: bool, ctx: &mut SearchContext) -> Weight {
        if self.node_count() < 2 {
            return 0;
        }
        self.get_furthest_pair(self.nodes[0], weighted, ctx).d
    }

    /// Distances of all subgraph nodes to the extreme points `a` and `b`.
    pub fn get_diff_data(&self, a: NodeId, b: NodeId, weighted: bool, ctx: &mut SearchContext) -> Vec<DiffData> {
        let mut diff: Vec<DiffData> = Vec::with_capacity(self.node_count());
        if weighted {
            self.run_dijkstra(a, ctx);
        } else {
            self.run_bfs(a, ctx);
        }
        for &node in &self.nodes {
            diff.push(DiffData {
                node,
                dist_a: ctx.distance(node),
                dist_b: 0,
            });
        }
        if weighted {
            self.run_dijkstra(b, ctx);
        } else {
            self.run_bfs(b, ctx);
        }
        for dd in &mut diff {
            dd.dist_b = ctx.distance(dd.node);
        }
        diff
    }

    /// Connected components of the subgraph, via DFS over temporarily
    /// untagged nodes. Tags are restored before returning.
    pub fn connected_components(&self) -> Vec<Vec<NodeId>> {
        let mut components = Vec::new();
        for &start_node in &self.nodes {
            // visited nodes are temporarily removed
            if !self.contains(start_node) {
                continue;
            }
            self.store().set_tag(start_node, NO_SUBGRAPH);
            let mut cc = Vec::new();
            let mut stack = vec![start_node];
            while let Some(node) = stack.pop() {
                cc.push(node);
                for n in self.neighbors(node) {
                    if self.contains(n.node) {
                        self.store().set_tag(n.node, NO_SUBGRAPH);
                        stack.push(n.node);
                    }
                }
            }
            components.push(cc);
        }
        self.assign_nodes();
        debug_assert_eq!(components.iter().map(Vec::len).sum::<usize>(), self.node_count());
        components
    }
}

impl Graph {
    /// Ground truth distance by plain search over the whole graph.
    pub fn get_distance(&self, v: NodeId, w: NodeId, weighted: bool) -> Weight {
        let sub = self.view();
        let mut ctx = SearchContext::new(self.store().len());
        if weighted {
            sub.run_dijkstra(v, &mut ctx);
        } else {
            sub.run_bfs(v, &mut ctx);
        }
        ctx.distance(w)
    }

    /// Ground truth shortest path count by counting Dijkstra.
    pub fn get_path_count(&self, v: NodeId, w: NodeId) -> PathCount {
        let sub = self.view();
        let mut ctx = SearchContext::new(self.store().len());
        sub.run_dijkstra(v, &mut ctx);
        ctx.path_count(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    //      1
    //   1 --- 2
    //   |     |      unit square plus a diagonal tail 4 - 5
    // 1 |     | 1
    //   |     |
    //   4 --- 3 --- 5
    //      1     2
    fn square_graph() -> Graph {
        Graph::with_edges(
            5,
            &[
                Edge::new(1, 2, 1),
                Edge::new(2, 3, 1),
                Edge::new(3, 4, 1),
                Edge::new(4, 1, 1),
                Edge::new(3, 5, 2),
            ],
        )
    }

    #[test]
    fn test_dijkstra_distances_and_counts() {
        let g = square_graph();
        assert_eq!(g.get_distance(1, 3, true), 2);
        assert_eq!(g.get_path_count(1, 3), 2);
        assert_eq!(g.get_distance(1, 5, true), 4);
        assert_eq!(g.get_path_count(1, 5), 2);
        assert_eq!(g.get_distance(1, 1, true), 0);
        assert_eq!(g.get_path_count(1, 1), 1);
    }

    #[test]
    fn test_bfs_hops() {
        let g = square_graph();
        assert_eq!(g.get_distance(1, 5, false), 3);
    }

    #[test]
    fn test_furthest_pair() {
        let g = square_graph();
        let sub = g.view();
        let mut ctx = SearchContext::new(g.store().len());
        let e = sub.get_furthest_pair(1, true, &mut ctx);
        assert_eq!(e.d, 4);
    }

    #[test]
    fn test_connected_components() {
        let g = Graph::with_edges(5, &[Edge::new(1, 2, 1), Edge::new(3, 4, 1), Edge::new(4, 5, 1)]);
        let sub = g.view();
        let mut components = sub.connected_components();
        for c in &mut components {
            c.sort_unstable();
        }
        components.sort_by_key(|c| c[0]);
        assert_eq!(components, vec![vec![1, 2], vec![3, 4, 5]]);
        assert!(g.is_consistent());
    }

    #[test]
    fn test_parallel_dijkstra_matches_sequential() {
        let g = square_graph();
        let sub = g.view();
        let sources = [1, 3, 5];
        let targets = [1, 2, 3, 4, 5];
        let many = sub.run_dijkstra_many(&sources, &targets);
        let mut ctx = SearchContext::new(g.store().len());
        for (i, &s) in sources.iter().enumerate() {
            sub.run_dijkstra(s, &mut ctx);
            for (j, &t) in targets.iter().enumerate() {
                assert_eq!(many[i][j], ctx.distance(t));
            }
        }
    }
}
