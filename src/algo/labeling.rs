//! Recursive cut decomposition and label construction.
//!
//! Each recursion level partitions the current subgraph by a balanced vertex
//! cut, appends a label row per node (distances to the cut vertices, in
//! landmark order), inserts shortcut edges into both sides and recurses.
//! The per-level distance rows written here are build-time data grounding the
//! shortcut redundancy checks; the final query labels, including path counts,
//! are recomputed canonically by the shortcut hierarchy (see `hierarchy`).

use super::partition::Partition;
use super::LabelingConfig;
use crate::datastr::cell_slice::SharedCells;
use crate::graph::*;
use crate::util;
use rayon::prelude::*;
use std::sync::Mutex;

/// Maximum height of the decomposition tree: 58 bits of binary path plus 6
/// bits of path length fit one 64 bit word.
pub const MAX_CUT_LEVEL: u16 = 58;

/// Per-node labeling state during construction.
#[derive(Debug, Default, Clone)]
pub struct CutIndex {
    /// binary path in the decomposition tree; bit `i` set means right child
    /// at level `i`
    pub partition: u64,
    /// depth at which this node became a cut vertex
    pub cut_level: u16,
    /// exclusive end offset of each level's label row within `distances`
    pub dist_index: Vec<u16>,
    /// concatenated label rows, level by level, in landmark order
    pub distances: Vec<Weight>,
    /// shortest path counts per label entry
    pub paths: Vec<PathCount>,
}

/// Row offset of the given cut level.
pub fn get_offset(dist_index: &[u16], cut_level: usize) -> u16 {
    if cut_level > 0 {
        dist_index[cut_level - 1]
    } else {
        0
    }
}

impl CutIndex {
    pub fn empty(&self) -> bool {
        self.dist_index.is_empty()
    }

    pub fn is_consistent(&self, partial: bool) -> bool {
        if self.cut_level > MAX_CUT_LEVEL {
            eprintln!("cut_level={}", self.cut_level);
            return false;
        }
        if !partial && self.partition >= 1u64 << self.cut_level {
            eprintln!("partition={} for cut_level={}", self.partition, self.cut_level);
            return false;
        }
        if !partial && self.dist_index.len() != self.cut_level as usize + 1 {
            eprintln!("dist_index.len()={} for cut_level={}", self.dist_index.len(), self.cut_level);
            return false;
        }
        if !self.dist_index.windows(2).all(|w| w[0] <= w[1]) {
            eprintln!("unsorted dist_index: {:?}", self.dist_index);
            return false;
        }
        true
    }
}

/// Minimal 2-hop distance between `a` and `b` over the common label row of
/// the given cut level.
pub fn get_cut_level_distance(a: &CutIndex, b: &CutIndex, cut_level: usize) -> Weight {
    let a_offset = get_offset(&a.dist_index, cut_level) as usize;
    let b_offset = get_offset(&b.dist_index, cut_level) as usize;
    let common = (a.dist_index[cut_level] as usize - a_offset).min(b.dist_index[cut_level] as usize - b_offset);
    let mut min_dist = INFINITY;
    for i in 0..common {
        min_dist = min_dist.min(a.distances[a_offset + i].saturating_add(b.distances[b_offset + i]));
    }
    min_dist
}

impl<'a> SubGraph<'a> {
    /// Reorder the cut ascending by pruning potential: the number of nodes
    /// whose shortest path from the cut vertex passes some other cut vertex.
    fn sort_cut_for_pruning(&self, cut: &mut [NodeId], ctx: &mut SearchContext) {
        for &c in cut.iter() {
            self.store().set_landmark_level(c, 1);
        }
        let mut pruning_potential: Vec<(usize, NodeId)> = if self.node_count() > self.store().thread_threshold() {
            let scratch_size = self.store().len();
            cut.par_iter()
                .map_init(
                    || SearchContext::new(scratch_size),
                    |ctx, &c| {
                        self.run_dijkstra_ll(c, ctx);
                        let covered = self.nodes().iter().filter(|&&node| ctx.distance(node) & 1 == 0).count();
                        (covered, c)
                    },
                )
                .collect()
        } else {
            cut.iter()
                .map(|&c| {
                    self.run_dijkstra_ll(c, ctx);
                    let covered = self.nodes().iter().filter(|&&node| ctx.distance(node) & 1 == 0).count();
                    (covered, c)
                })
                .collect()
        };
        for &c in cut.iter() {
            self.store().set_landmark_level(c, 0);
        }
        pruning_potential.sort_unstable();
        for (slot, (_, c)) in cut.iter_mut().zip(pruning_potential) {
            *slot = c;
        }
    }

    /// Fill the label row of the current level: distances from every cut
    /// vertex to every subgraph node, truncated rows for the cut vertices
    /// themselves.
    fn fill_cut_labels(&self, ci: &SharedCells<CutIndex>, cut: &[NodeId], pruned: bool, ctx: &mut SearchContext) {
        for &node in self.nodes() {
            let index = ci.get_mut(node as usize);
            let len = *index.dist_index.last().unwrap() as usize;
            index.distances.resize(len, INFINITY);
        }
        // write position k of this level's row for every node owning that slot
        let write_row = |k: usize, dist: &dyn Fn(usize, NodeId) -> Weight| {
            for (pos, &node) in self.nodes().iter().enumerate() {
                let index = ci.get_mut(node as usize);
                let base = get_offset(&index.dist_index, index.dist_index.len() - 1) as usize;
                let slot = base + k;
                if slot < *index.dist_index.last().unwrap() as usize {
                    index.distances[slot] = dist(pos, node);
                }
            }
        };
        if self.node_count() > self.store().thread_threshold() {
            for (chunk_index, chunk) in cut.chunks(16).enumerate() {
                let rows = if pruned {
                    self.run_dijkstra_llsub_many(chunk, self.nodes())
                } else {
                    self.run_dijkstra_many(chunk, self.nodes())
                };
                for (offset, row) in rows.iter().enumerate() {
                    write_row(chunk_index * 16 + offset, &|pos, _| row[pos]);
                }
            }
        } else {
            for (k, &c) in cut.iter().enumerate() {
                if pruned {
                    self.run_dijkstra_llsub(c, ctx);
                } else {
                    self.run_dijkstra(c, ctx);
                }
                write_row(k, &|_, node| ctx.distance(node));
            }
        }
    }

    /// Insert non-redundant shortcut edges between the border nodes of this
    /// subgraph: pairs whose distance through the already-labeled parent cut
    /// undercuts their distance within the subgraph. Returns the added edges.
    fn add_shortcuts(&self, cut: &[NodeId], ci: &SharedCells<CutIndex>, ctx: &mut SearchContext) -> Vec<Edge> {
        // border = neighbors of the cut inside this subgraph
        let mut border: Vec<NodeId> = Vec::new();
        for &cut_node in cut {
            for n in self.store().neighbors(cut_node) {
                if self.contains(n.node) {
                    border.push(n.node);
                }
            }
        }
        util::make_set(&mut border);
        debug_assert!(!border.is_empty());
        let cut_level = ci.get(cut[0] as usize).cut_level as usize;

        // half-matrix index over border pairs
        let hmi = |a: usize, b: usize| if a < b { (b * (b - 1)) / 2 + a } else { (a * (a - 1)) / 2 + b };
        let mut d_partition = vec![INFINITY; border.len() * (border.len().saturating_sub(1)) / 2];
        let mut d_graph = d_partition.clone();

        if self.node_count() > self.store().thread_threshold() {
            let rows = self.run_dijkstra_many(&border, &border);
            for i in 1..border.len() {
                for j in 0..i {
                    let d_ij = rows[i][j];
                    let d_cut = get_cut_level_distance(ci.get(border[i] as usize), ci.get(border[j] as usize), cut_level);
                    d_partition[hmi(i, j)] = d_ij;
                    d_graph[hmi(i, j)] = d_ij.min(d_cut);
                }
            }
        } else {
            for i in 1..border.len() {
                self.run_dijkstra(border[i], ctx);
                for j in 0..i {
                    let d_ij = ctx.distance(border[j]);
                    let d_cut = get_cut_level_distance(ci.get(border[i] as usize), ci.get(border[j] as usize), cut_level);
                    d_partition[hmi(i, j)] = d_ij;
                    d_graph[hmi(i, j)] = d_ij.min(d_cut);
                }
            }
        }

        // separate pass as d_graph must be complete for the redundancy check
        let mut added = Vec::new();
        for i in 1..border.len() {
            for j in 0..i {
                let dg_ij = d_graph[hmi(i, j)];
                if d_partition[hmi(i, j)] > dg_ij {
                    // redundant when some third border node k lies on an
                    // equally short path
                    let redundant = (0..border.len())
                        .any(|k| k != i && k != j && d_graph[hmi(i, k)].saturating_add(d_graph[hmi(k, j)]) == dg_ij);
                    if !redundant {
                        self.add_edge(border[i], border[j], dg_ij);
                        added.push(Edge::new(border[i], border[j], dg_ij));
                    }
                }
            }
        }
        added
    }
}

fn extend_on_partition(
    sub: &SubGraph,
    ci: &SharedCells<CutIndex>,
    config: LabelingConfig,
    cut_level: u16,
    side: Vec<NodeId>,
    cut: &[NodeId],
    shortcuts: &Mutex<Vec<Edge>>,
    ctx: &mut SearchContext,
) {
    if side.len() > 1 {
        let mut child = SubGraph::from_nodes(sub.store(), side);
        if config.shortcuts_enabled && !cut.is_empty() {
            let added = child.add_shortcuts(cut, ci, ctx);
            if !added.is_empty() {
                shortcuts.lock().unwrap().extend(added);
            }
        }
        extend_cut_index(&mut child, ci, config, cut_level + 1, shortcuts, ctx);
    } else if side.len() == 1 {
        let index = ci.get_mut(side[0] as usize);
        index.cut_level = cut_level + 1;
        let end = index.dist_index[cut_level as usize] + 1;
        index.dist_index.push(end);
        debug_assert!(index.is_consistent(false));
    }
}

fn extend_cut_index(
    sub: &mut SubGraph,
    ci: &SharedCells<CutIndex>,
    config: LabelingConfig,
    cut_level: u16,
    shortcuts: &Mutex<Vec<Edge>>,
    ctx: &mut SearchContext,
) {
    debug_assert!(cut_level <= MAX_CUT_LEVEL);
    if sub.node_count() < 2 {
        debug_assert_eq!(cut_level, 0);
        // a lone node is a cut of size one containing itself
        for &node in sub.nodes() {
            let index = ci.get_mut(node as usize);
            index.cut_level = 0;
            index.dist_index.push(1);
        }
        return;
    }
    // find a balanced cut; at the maximum level everything left becomes cut
    let mut p = if cut_level < MAX_CUT_LEVEL {
        sub.create_partition(config.balance, !config.shortcuts_enabled, ctx)
    } else {
        Partition {
            cut: sub.nodes().to_vec(),
            ..Default::default()
        }
    };

    // fix the landmark order before any label positions derive from it
    if config.landmark_pruning && p.cut.len() > 1 {
        sub.sort_cut_for_pruning(&mut p.cut, ctx);
    }
    for (k, &c) in p.cut.iter().enumerate() {
        sub.store().set_landmark_level(c, (p.cut.len() - k) as u16);
    }

    // append the level's row end to every node's dist_index; a cut vertex at
    // position k only needs entries for positions 0..=k
    for &node in sub.nodes() {
        let landmark_level = sub.store().landmark_level(node);
        let index = ci.get_mut(node as usize);
        debug_assert_eq!(index.dist_index.len(), cut_level as usize);
        let prev = index.dist_index.last().copied().unwrap_or(0) as usize;
        let row = if landmark_level == 0 {
            p.cut.len()
        } else {
            p.cut.len() - landmark_level as usize + 1
        };
        debug_assert!(prev + row <= u16::MAX as usize);
        index.dist_index.push((prev + row) as u16);
    }

    // set cut levels
    for &c in &p.cut {
        let index = ci.get_mut(c as usize);
        index.cut_level = cut_level;
        debug_assert!(index.is_consistent(true));
    }
    // update partition bitstrings
    for &node in &p.right {
        ci.get_mut(node as usize).partition |= 1u64 << cut_level;
    }

    // build-time label rows for this level ground the shortcut computation
    if config.shortcuts_enabled {
        sub.fill_cut_labels(ci, &p.cut, config.landmark_pruning, ctx);
    }

    // reset landmark flags
    for &c in &p.cut {
        sub.store().set_landmark_level(c, 0);
    }

    // add shortcuts and recurse, forking for large left sides
    let (left, right) = (std::mem::take(&mut p.left), std::mem::take(&mut p.right));
    if left.len() > sub.store().thread_threshold() {
        let sub_ref = &*sub;
        let cut = &p.cut;
        rayon::join(
            || {
                let mut left_ctx = SearchContext::new(sub_ref.store().len());
                extend_on_partition(sub_ref, ci, config, cut_level, left, cut, shortcuts, &mut left_ctx);
            },
            || {
                let mut right_ctx = SearchContext::new(sub_ref.store().len());
                extend_on_partition(sub_ref, ci, config, cut_level, right, cut, shortcuts, &mut right_ctx);
            },
        );
    } else {
        extend_on_partition(sub, ci, config, cut_level, left, &p.cut, shortcuts, ctx);
        extend_on_partition(sub, ci, config, cut_level, right, &p.cut, shortcuts, ctx);
    }
}

impl Graph {
    /// Build the cut index of the current (possibly contracted) graph.
    /// Transient shortcut edges participate in the recursion but are removed
    /// from the graph again before returning.
    pub fn create_cut_index(&mut self, config: LabelingConfig) -> Vec<CutIndex> {
        debug_assert!(self.is_undirected());
        // deterministic neighbor order
        self.sort_neighbors();
        let original_edges = self.get_edges();

        let ci = SharedCells::new(vec![CutIndex::default(); self.store().len()]);
        let shortcuts = Mutex::new(Vec::new());
        let mut ctx = SearchContext::new(self.store().len());
        let mut sub = SubGraph::from_nodes(self.store(), self.nodes().to_vec());
        extend_cut_index(&mut sub, &ci, config, 0, &shortcuts, &mut ctx);
        self.retag();

        if !shortcuts.into_inner().unwrap().is_empty() {
            self.restore_edges(&original_edges);
        }

        let ci = ci.into_inner();
        for &node in self.nodes() {
            debug_assert!(ci[node as usize].is_consistent(false), "inconsistent cut index for node {}", node);
        }
        ci
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::store::Graph;

    fn path_graph(n: usize) -> Graph {
        let edges: Vec<Edge> = (1..n as NodeId).map(|i| Edge::new(i, i + 1, 1)).collect();
        Graph::with_edges(n, &edges)
    }

    #[test]
    fn test_cut_index_structure_on_path() {
        let mut g = path_graph(5);
        let ci = g.create_cut_index(LabelingConfig::default());
        for &node in g.nodes() {
            let index = &ci[node as usize];
            assert!(!index.empty());
            assert!(index.is_consistent(false));
        }
        // each level's landmark order is shared: exactly one node carries each
        // cut position, so the total of bottom row sizes covers all nodes
        let total: usize = g
            .nodes()
            .iter()
            .map(|&node| {
                let index = &ci[node as usize];
                let cl = index.cut_level as usize;
                (index.dist_index[cl] - get_offset(&index.dist_index, cl)) as usize
            })
            .sum();
        assert!(total >= g.node_count());
    }

    #[test]
    fn test_labeling_restores_original_edges() {
        let mut g = path_graph(6);
        let before = {
            let mut e = g.get_edges();
            e.sort_unstable();
            e
        };
        g.create_cut_index(LabelingConfig::default());
        let mut after = g.get_edges();
        after.sort_unstable();
        assert_eq!(before, after);
        assert!(g.is_consistent());
    }

    #[test]
    fn test_partition_bits_separate_sides() {
        let mut g = path_graph(9);
        let ci = g.create_cut_index(LabelingConfig::default());
        // nodes on different sides of the top cut differ in bit 0 of their
        // partition path unless one of them is the top cut vertex itself
        let top_cut: Vec<NodeId> = g
            .nodes()
            .iter()
            .copied()
            .filter(|&v| ci[v as usize].cut_level == 0)
            .collect();
        assert!(!top_cut.is_empty());
        let sides: std::collections::HashSet<u64> = g
            .nodes()
            .iter()
            .filter(|&&v| ci[v as usize].cut_level > 0)
            .map(|&v| ci[v as usize].partition & 1)
            .collect();
        assert_eq!(sides.len(), 2);
    }
}
