//! Balanced vertex-cut partitioning.
//!
//! A rough bisection orders nodes by the difference of their distances to two
//! extreme points; the band around the median becomes the cut candidate set,
//! which a maximum flow computation refines to a minimum vertex cut.

use crate::graph::flow::FlowNetwork;
use crate::graph::search::DiffData;
use crate::graph::*;
use crate::util;
use rand::Rng;

// use edge weights when locating extreme points / computing the diff order
const WEIGHTED_FURTHEST: bool = false;
const WEIGHTED_DIFF: bool = false;

/// A `(left, cut, right)` split of a subgraph's nodes.
#[derive(Debug, Default, Clone)]
pub struct Partition {
    pub left: Vec<NodeId>,
    pub cut: Vec<NodeId>,
    pub right: Vec<NodeId>,
}

impl Partition {
    /// Quality measure: balanced small cuts win.
    pub fn rating(&self) -> f64 {
        let (l, r, c) = (self.left.len(), self.right.len(), self.cut.len());
        l.min(r) as f64 / (c * c + 1) as f64
    }
}

fn cmp_size_desc(a: &Vec<NodeId>, b: &Vec<NodeId>) -> std::cmp::Ordering {
    b.len().cmp(&a.len())
}

fn add_to_smaller(pa: &mut Vec<NodeId>, pb: &mut Vec<NodeId>, cc: &[NodeId]) {
    let smaller = if pa.len() <= pb.len() { pa } else { pb };
    smaller.extend_from_slice(cc);
}

impl<'a> SubGraph<'a> {
    /// Bisect by distance difference to two extreme points. Returns whether
    /// the partition is already "fine" (its cut is known minimal); otherwise
    /// the cut is only a candidate band for the flow refinement.
    fn get_rough_partition(&mut self, p: &mut Partition, balance: f64, disconnected: bool, ctx: &mut SearchContext) -> bool {
        debug_assert!(p.left.is_empty() && p.cut.is_empty() && p.right.is_empty());
        if disconnected {
            let mut cc = self.connected_components();
            if cc.len() > 1 {
                cc.sort_by(cmp_size_desc);
                // for size zero cuts we loosen the balance requirement
                if (cc[0].len() as f64) < self.node_count() as f64 * (1.0 - balance / 2.0) {
                    for c in &cc {
                        add_to_smaller(&mut p.left, &mut p.right, c);
                    }
                    return true;
                }
                // rough partition over the main component only
                let mut main_cc = SubGraph::from_nodes(self.store(), cc[0].clone());
                let is_fine = main_cc.get_rough_partition(p, balance, false, ctx);
                // hand the main component's nodes back to this subgraph
                for &node in main_cc.nodes() {
                    self.store().set_tag(node, self.id());
                }
                if is_fine {
                    // distribute remaining components
                    for c in &cc[1..] {
                        add_to_smaller(&mut p.left, &mut p.right, c);
                    }
                }
                return is_fine;
            }
        }
        // graph is connected - find two extreme points
        let start = if cfg!(debug_assertions) {
            self.nodes()[0]
        } else {
            self.nodes()[rand::thread_rng().gen_range(0..self.node_count())]
        };
        let a = self.get_furthest(start, WEIGHTED_FURTHEST, ctx).0;
        let b = self.get_furthest(a, WEIGHTED_FURTHEST, ctx).0;
        // get distances from a and b and sort by difference
        let mut diff = self.get_diff_data(a, b, WEIGHTED_DIFF, ctx);
        diff.sort_by_key(|dd| dd.diff());
        // partition bounds based on balance; round up if possible
        let n = self.node_count();
        let mut max_left = (n / 2).min((n as f64 * balance).ceil() as usize);
        let mut min_right = n - max_left;
        debug_assert!(max_left <= min_right);
        // corner case where most nodes have the same distance difference
        if diff[max_left - 1].diff() == diff[min_right].diff() {
            let center_diff_value = diff[min_right].diff();
            let mut min_dist = INFINITY;
            let mut bottlenecks: Vec<NodeId> = Vec::new();
            for dd in &diff {
                if dd.diff() == center_diff_value {
                    if dd.min() < min_dist {
                        min_dist = dd.min();
                        bottlenecks.clear();
                    }
                    if dd.min() == min_dist {
                        bottlenecks.push(dd.node);
                    }
                }
            }
            bottlenecks.sort_unstable();
            // try again with the bottlenecks removed
            self.remove_nodes(&bottlenecks);
            let is_fine = self.get_rough_partition(p, balance, true, ctx);
            // add bottlenecks back to the graph and to the center partition
            for &bn in &bottlenecks {
                self.add_node(bn);
                p.cut.push(bn);
            }
            // if the bottlenecks are the only cut vertices they form a minimal cut
            return is_fine && p.cut.len() == bottlenecks.len();
        }
        // ensure left and right pre-partitions are connected
        while diff[max_left - 1].diff() == diff[max_left].diff() {
            max_left += 1;
        }
        while diff[min_right - 1].diff() == diff[min_right].diff() {
            min_right -= 1;
        }
        // assign nodes to left/cut/right
        for (i, dd) in diff.iter().enumerate() {
            if i < max_left {
                p.left.push(dd.node);
            } else if i < min_right {
                p.cut.push(dd.node);
            } else {
                p.right.push(dd.node);
            }
        }
        false
    }

    /// Refine a rough partition to minimum vertex cuts by maximum flow over
    /// `cut ∪ boundary(left) ∪ boundary(right)`.
    fn rough_partition_to_cuts(&self, p: &Partition) -> Vec<Vec<NodeId>> {
        let mut left = p.left.clone();
        left.sort_unstable();
        let mut right = p.right.clone();
        right.sort_unstable();
        let mut center = p.cut.clone();
        center.sort_unstable();
        // corner case of edges between the left and right partition: promote
        // both endpoints into the center first
        let mut s_neighbors = Vec::new();
        let mut t_neighbors = Vec::new();
        for &node in &left {
            for n in self.neighbors(node) {
                if right.binary_search(&n.node).is_ok() {
                    s_neighbors.push(node);
                    t_neighbors.push(n.node);
                }
            }
        }
        util::make_set(&mut s_neighbors);
        util::make_set(&mut t_neighbors);
        util::remove_set(&mut left, &s_neighbors);
        util::remove_set(&mut right, &t_neighbors);
        center.extend_from_slice(&s_neighbors);
        center.extend_from_slice(&t_neighbors);
        center.sort_unstable();
        // identify remaining terminal attachments: center nodes adjacent to
        // either side
        for &node in &left {
            for n in self.neighbors(node) {
                if center.binary_search(&n.node).is_ok() {
                    s_neighbors.push(n.node);
                }
            }
        }
        for &node in &right {
            for n in self.neighbors(node) {
                if center.binary_search(&n.node).is_ok() {
                    t_neighbors.push(n.node);
                }
            }
        }
        util::make_set(&mut s_neighbors);
        util::make_set(&mut t_neighbors);
        // find minimum cuts
        let store = self.store();
        let mut network = FlowNetwork::build(&center, &s_neighbors, &t_neighbors, |node| store.neighbors(node));
        network.min_vertex_cuts()
    }

    /// Fill `left`/`right` from the components remaining after removing the
    /// cut, larger components first, each to the currently smaller side.
    fn complete_partition(&mut self, p: &mut Partition) {
        util::make_set(&mut p.cut);
        self.remove_nodes(&p.cut);
        p.left.clear();
        p.right.clear();
        let mut components = self.connected_components();
        components.sort_by(cmp_size_desc);
        for cc in &components {
            add_to_smaller(&mut p.left, &mut p.right, cc);
        }
        // add cut vertices back to the subgraph
        for i in 0..p.cut.len() {
            self.add_node(p.cut[i]);
        }
        debug_assert_eq!(p.left.len() + p.right.len() + p.cut.len(), self.node_count());
    }

    /// Compute a balanced vertex-cut partition of this subgraph.
    pub fn create_partition(&mut self, balance: f64, allow_disconnected: bool, ctx: &mut SearchContext) -> Partition {
        debug_assert!(self.node_count() > 1);
        let mut p = Partition::default();
        if self.get_rough_partition(&mut p, balance, allow_disconnected, ctx) {
            return p;
        }
        let cuts = self.rough_partition_to_cuts(&p);
        debug_assert!(!cuts.is_empty());
        let mut best = Partition {
            cut: cuts[0].clone(),
            ..Default::default()
        };
        self.complete_partition(&mut best);
        for cut in &cuts[1..] {
            let mut alt = Partition {
                cut: cut.clone(),
                ..Default::default()
            };
            self.complete_partition(&mut alt);
            if best.rating() < alt.rating() {
                best = alt;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::store::Graph;

    fn check_partition(g: &Graph, p: &Partition) {
        let mut all: Vec<NodeId> = p.left.iter().chain(&p.cut).chain(&p.right).copied().collect();
        all.sort_unstable();
        let mut nodes = g.nodes().to_vec();
        nodes.sort_unstable();
        assert_eq!(all, nodes);
        // no edge may connect left and right directly
        let mut right = p.right.clone();
        right.sort_unstable();
        for &v in &p.left {
            for n in g.neighbors(v) {
                assert!(right.binary_search(&n.node).is_err(), "edge {}-{} crosses the cut", v, n.node);
            }
        }
    }

    #[test]
    fn test_partition_path() {
        let edges: Vec<Edge> = (1..8).map(|i| Edge::new(i, i + 1, 1)).collect();
        let g = Graph::with_edges(8, &edges);
        let mut sub = g.view();
        let mut ctx = SearchContext::new(g.store().len());
        let p = sub.create_partition(0.25, false, &mut ctx);
        check_partition(&g, &p);
        assert!(!p.left.is_empty() && !p.right.is_empty());
        assert_eq!(p.cut.len(), 1);
    }

    #[test]
    fn test_partition_grid() {
        // 4x4 grid, unit weights
        let mut edges = Vec::new();
        let id = |x: u32, y: u32| y * 4 + x + 1;
        for y in 0..4 {
            for x in 0..4 {
                if x + 1 < 4 {
                    edges.push(Edge::new(id(x, y), id(x + 1, y), 1));
                }
                if y + 1 < 4 {
                    edges.push(Edge::new(id(x, y), id(x, y + 1), 1));
                }
            }
        }
        let g = Graph::with_edges(16, &edges);
        let mut sub = g.view();
        let mut ctx = SearchContext::new(g.store().len());
        let p = sub.create_partition(0.2, false, &mut ctx);
        check_partition(&g, &p);
        // a grid's minimum balanced vertex cut is one row or column
        assert!(p.cut.len() <= 4);
        assert!(!p.left.is_empty() && !p.right.is_empty());
    }

    #[test]
    fn test_partition_disconnected_components() {
        let g = Graph::with_edges(
            6,
            &[Edge::new(1, 2, 1), Edge::new(3, 4, 1), Edge::new(5, 6, 1)],
        );
        let mut sub = g.view();
        let mut ctx = SearchContext::new(g.store().len());
        let p = sub.create_partition(0.2, true, &mut ctx);
        check_partition(&g, &p);
        assert!(p.cut.is_empty());
    }
}
