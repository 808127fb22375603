//! The shortcut contraction hierarchy over the labeling order.
//!
//! Every uncontracted node gets a unique rank within its ancestor chain: the
//! position of its own slot in its label. Upward edges point at smaller rank
//! values (cut earlier, closer to the decomposition root) and carry
//! `(distance, path_count)`. Contraction adds all pairwise shortcuts among
//! upward neighbors without witness searches; the bottom-up propagation then
//! fills every node's 2-hop label rows canonically, counting each shortest
//! path exactly once at the slot of its maximum-rank vertex.

use super::labeling::CutIndex;
use crate::datastr::cell_slice::SharedCells;
use crate::graph::*;
use crate::io::{ReadLe, WriteLe};
use crate::util;
use rayon::prelude::*;
use std::io::{Read, Result, Write};

/// Rank marker for contracted or absent nodes.
pub const CONTRACTED: u16 = u16::MAX;

#[derive(Debug, Clone)]
pub struct CHNode {
    /// rank: position of the node's own slot in its label; `CONTRACTED` for
    /// pendant-contracted nodes
    pub dist_index: u16,
    /// neighbors with strictly smaller rank value, with accumulated counts
    pub up_neighbors: Vec<Neighbor>,
    /// nodes whose upward edges point here, sorted ascending
    pub down_neighbors: Vec<NodeId>,
}

impl Default for CHNode {
    fn default() -> Self {
        CHNode {
            dist_index: CONTRACTED,
            up_neighbors: Vec::new(),
            down_neighbors: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ContractionHierarchy {
    pub nodes: Vec<CHNode>,
}

// upward order: larger dist_index (deeper in the decomposition) first
fn deeper_first(ch: &[CHNode], a: NodeId, b: NodeId) -> std::cmp::Ordering {
    ch[b as usize].dist_index.cmp(&ch[a as usize].dist_index)
}

impl ContractionHierarchy {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn rank(&self, node: NodeId) -> u16 {
        self.nodes[node as usize].dist_index
    }

    /// The upward edge from `v` to `w`, if present.
    pub fn up_neighbor_mut(&mut self, v: NodeId, w: NodeId) -> Option<&mut Neighbor> {
        self.nodes[v as usize].up_neighbors.iter_mut().find(|n| n.node == w)
    }

    pub fn up_neighbor(&self, v: NodeId, w: NodeId) -> Option<Neighbor> {
        self.nodes[v as usize].up_neighbors.iter().find(|n| n.node == w).copied()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.up_neighbors.len()).sum()
    }

    /// Build the hierarchy and fill the 2-hop labels of `ci` with canonical
    /// `(distance, path_count)` entries. `closest` marks pendant-contracted
    /// nodes, which stay outside the hierarchy.
    pub fn build(graph: &Graph, ci: &mut Vec<CutIndex>, closest: &[Neighbor]) -> Self {
        let mut ch = ContractionHierarchy {
            nodes: vec![CHNode::default(); graph.store().len()],
        };
        let mut bottom_up: Vec<NodeId> = Vec::with_capacity(graph.node_count());
        // assign ranks; reserve label space for the propagation
        for &node in graph.nodes() {
            if closest[node as usize].node == node {
                bottom_up.push(node);
                let index = &mut ci[node as usize];
                let rank = index.dist_index[index.cut_level as usize] - 1;
                ch.nodes[node as usize].dist_index = rank;
                index.distances.clear();
                index.distances.resize(rank as usize, INFINITY);
                index.paths.clear();
                index.paths.resize(rank as usize, 0);
            }
        }

        // initialize with upward graph edges
        for &node in &bottom_up {
            for n in graph.neighbors(node) {
                if closest[n.node as usize].node == n.node && ch.rank(n.node) < ch.rank(node) {
                    ch.nodes[node as usize].up_neighbors.push(Neighbor::new(n.node, n.distance));
                    let slot = ch.rank(n.node) as usize;
                    ci[node as usize].distances[slot] = n.distance;
                    ci[node as usize].paths[slot] = 1;
                }
            }
        }

        // add shortcuts bottom-up: deepest nodes contract first
        bottom_up.sort_unstable_by(|&a, &b| deeper_first(&ch.nodes, a, b).then(a.cmp(&b)));
        for &node in &bottom_up {
            let mut up = std::mem::take(&mut ch.nodes[node as usize].up_neighbors);
            // per destination keep minimum distance with maximum count
            util::make_set_by(
                &mut up,
                |a, b| {
                    deeper_first(&ch.nodes, a.node, b.node)
                        .then(a.distance.cmp(&b.distance))
                        .then(b.path_count.cmp(&a.path_count))
                },
                |n| n.node,
            );

            for i in 0..up.len() {
                for j in i + 1..up.len() {
                    // up[i] is the deeper endpoint; candidate shortcut from
                    // up[i] to up[j] through the contracted node
                    let weight = up[i].distance.saturating_add(up[j].distance);
                    let path_count = up[i].path_count.wrapping_mul(up[j].path_count);
                    let slot = ch.rank(up[j].node) as usize;
                    let low = up[i].node as usize;
                    if weight < ci[low].distances[slot] {
                        ci[low].distances[slot] = weight;
                        ci[low].paths[slot] = path_count;
                        ch.nodes[low].up_neighbors.push(Neighbor::with_count(up[j].node, weight, path_count));
                    } else if weight == ci[low].distances[slot] && weight < INFINITY {
                        ci[low].paths[slot] = ci[low].paths[slot].wrapping_add(path_count);
                        let merged = ci[low].paths[slot];
                        ch.nodes[low].up_neighbors.push(Neighbor::with_count(up[j].node, weight, merged));
                    }
                }
            }

            // downward neighbors mirror the upward edges
            for upn in &up {
                ch.nodes[upn.node as usize].down_neighbors.push(node);
            }
            ch.nodes[node as usize].up_neighbors = up;
        }
        for node in &mut ch.nodes {
            node.down_neighbors.sort_unstable();
        }

        // propagate 2-hop labels in ascending rank order; equal ranks live in
        // disjoint decomposition branches and are processed in parallel
        let max_rank = bottom_up.first().map(|&n| ch.rank(n)).unwrap_or(0);
        let mut buckets: Vec<Vec<NodeId>> = vec![Vec::new(); max_rank as usize + 1];
        for &node in &bottom_up {
            buckets[ch.rank(node) as usize].push(node);
        }
        let ci_cells = SharedCells::new(std::mem::take(ci));
        {
            let ch = &ch;
            let ci_cells = &ci_cells;
            let propagate = |x: NodeId| {
                let index = ci_cells.get_mut(x as usize);
                for n in &ch.nodes[x as usize].up_neighbors {
                    let n_index = ci_cells.get(n.node as usize);
                    for anc in 0..ch.rank(n.node) as usize {
                        let dist = n.distance.saturating_add(n_index.distances[anc]);
                        let path_count = n.path_count.wrapping_mul(n_index.paths[anc]);
                        if dist < index.distances[anc] {
                            index.distances[anc] = dist;
                            index.paths[anc] = path_count;
                        } else if dist == index.distances[anc] && dist < INFINITY {
                            index.paths[anc] = index.paths[anc].wrapping_add(path_count);
                        }
                    }
                }
                index.distances.push(0);
                index.paths.push(1);
            };
            for bucket in &buckets {
                if bucket.len() > 64 {
                    bucket.par_iter().for_each(|&x| propagate(x));
                } else {
                    bucket.iter().for_each(|&x| propagate(x));
                }
            }
        }
        *ci = ci_cells.into_inner();
        ch
    }

    // ---- serialization ----

    /// Write the `_gs` file.
    pub fn write<W: Write>(&self, os: &mut W) -> Result<()> {
        os.write_u64_le(self.nodes.len() as u64)?;
        for node in &self.nodes[1..] {
            os.write_u16_le(node.dist_index)?;
            if node.dist_index == CONTRACTED {
                continue;
            }
            os.write_u64_le(node.up_neighbors.len() as u64)?;
            for n in &node.up_neighbors {
                os.write_u32_le(n.node)?;
                os.write_u32_le(n.distance)?;
                os.write_u16_le(n.path_count)?;
            }
            os.write_u64_le(node.down_neighbors.len() as u64)?;
            for &n in &node.down_neighbors {
                os.write_u32_le(n)?;
            }
        }
        Ok(())
    }

    /// Read a `_gs` file.
    pub fn read<R: Read>(is: &mut R) -> Result<Self> {
        let node_count = is.read_u64_le()? as usize;
        let mut nodes = vec![CHNode::default(); node_count];
        for node in nodes.iter_mut().skip(1) {
            node.dist_index = is.read_u16_le()?;
            if node.dist_index == CONTRACTED {
                continue;
            }
            let up_count = is.read_u64_le()? as usize;
            node.up_neighbors.reserve(up_count);
            for _ in 0..up_count {
                let id = is.read_u32_le()?;
                let distance = is.read_u32_le()?;
                let path_count = is.read_u16_le()?;
                node.up_neighbors.push(Neighbor::with_count(id, distance, path_count));
            }
            let down_count = is.read_u64_le()? as usize;
            node.down_neighbors.reserve(down_count);
            for _ in 0..down_count {
                node.down_neighbors.push(is.read_u32_le()?);
            }
        }
        Ok(ContractionHierarchy { nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::flat_index::ContractionIndex;
    use crate::algo::LabelingConfig;

    fn build_index(g: &mut Graph) -> (ContractionHierarchy, ContractionIndex) {
        let closest = g.contract();
        let mut ci = g.create_cut_index(LabelingConfig::default());
        g.reset();
        let ch = ContractionHierarchy::build(g, &mut ci, &closest);
        let index = ContractionIndex::new(ci, &closest);
        (ch, index)
    }

    #[test]
    fn test_labels_match_dijkstra_on_cycle() {
        // 1 - 2 - 3 - 4 - 1 unit cycle: two shortest paths across
        let mut g = Graph::with_edges(
            4,
            &[Edge::new(1, 2, 1), Edge::new(2, 3, 1), Edge::new(3, 4, 1), Edge::new(4, 1, 1)],
        );
        let (_, index) = build_index(&mut g);
        for &v in g.nodes() {
            for &w in g.nodes() {
                assert!(index.check_query((v, w), &g), "query ({}, {})", v, w);
            }
        }
        assert_eq!(index.get_distance(1, 3), 2);
        assert_eq!(index.get_spc(1, 3), 2);
    }

    #[test]
    fn test_up_edges_point_to_smaller_ranks() {
        let mut g = Graph::with_edges(
            5,
            &[Edge::new(1, 2, 1), Edge::new(2, 3, 1), Edge::new(3, 4, 1), Edge::new(4, 5, 1), Edge::new(5, 1, 1)],
        );
        let (ch, _) = build_index(&mut g);
        for &node in g.nodes() {
            if ch.rank(node) == CONTRACTED {
                continue;
            }
            for n in &ch.nodes[node as usize].up_neighbors {
                assert!(ch.rank(n.node) < ch.rank(node));
            }
            for &d in &ch.nodes[node as usize].down_neighbors {
                assert!(ch.rank(d) > ch.rank(node));
            }
            let sorted = ch.nodes[node as usize].down_neighbors.windows(2).all(|w| w[0] <= w[1]);
            assert!(sorted);
        }
    }

    #[test]
    fn test_round_trip_gs_file() {
        let mut g = Graph::with_edges(
            4,
            &[Edge::new(1, 2, 2), Edge::new(2, 3, 1), Edge::new(3, 4, 3), Edge::new(4, 1, 1)],
        );
        let (ch, _) = build_index(&mut g);
        let mut bytes = Vec::new();
        ch.write(&mut bytes).unwrap();
        let restored = ContractionHierarchy::read(&mut &bytes[..]).unwrap();
        assert_eq!(restored.node_count(), ch.node_count());
        for node in 1..ch.node_count() {
            assert_eq!(restored.nodes[node].dist_index, ch.nodes[node].dist_index);
            assert_eq!(restored.nodes[node].up_neighbors, ch.nodes[node].up_neighbors);
            assert_eq!(restored.nodes[node].down_neighbors, ch.nodes[node].down_neighbors);
        }
    }
}
