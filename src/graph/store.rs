//! The adjacency store and its subgraph views.
//!
//! All algorithms of the preprocessing pipeline run on transient subsets of
//! the node set. Instead of copying adjacency, each node carries a subgraph
//! tag; "contained in subgraph S" means the tag equals S. The recursive
//! labeler splits node-disjoint subgraphs across threads, so tags are atomic
//! (sibling recursions read tags of foreign nodes while their owners retag
//! them) while the records themselves follow the single-owner discipline of
//! [`SharedCells`].

use super::*;
use crate::datastr::cell_slice::SharedCells;
use crate::util;
use rand::Rng;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicU32, Ordering::Relaxed};

#[derive(Debug, Default)]
pub(crate) struct NodeRecord {
    pub neighbors: Vec<Neighbor>,
    pub landmark_level: u16,
}

/// Backing storage shared by all subgraph views: one record and one tag per
/// node. Node numbering starts from 1; index 0 is unused.
#[derive(Debug)]
pub struct GraphStore {
    records: SharedCells<NodeRecord>,
    tags: Box<[AtomicU32]>,
    next_subgraph: AtomicU32,
    thread_threshold: usize,
}

impl GraphStore {
    fn new(node_count: usize) -> Self {
        let records = SharedCells::new((0..node_count + 1).map(|_| NodeRecord::default()).collect());
        let tags = (0..node_count + 1).map(|_| AtomicU32::new(NO_SUBGRAPH)).collect();
        GraphStore {
            records,
            tags,
            next_subgraph: AtomicU32::new(1),
            thread_threshold: (node_count / rayon::current_num_threads().max(1)).max(1000),
        }
    }

    /// Number of node slots including the unused slot 0.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Subgraph size above which the labeler recursion forks a thread.
    pub fn thread_threshold(&self) -> usize {
        self.thread_threshold
    }

    fn fresh_subgraph_id(&self) -> SubgraphId {
        self.next_subgraph.fetch_add(1, Relaxed)
    }

    #[inline]
    pub(crate) fn tag(&self, node: NodeId) -> SubgraphId {
        self.tags[node as usize].load(Relaxed)
    }

    #[inline]
    pub(crate) fn set_tag(&self, node: NodeId, id: SubgraphId) {
        self.tags[node as usize].store(id, Relaxed);
    }

    #[inline]
    pub(crate) fn neighbors(&self, node: NodeId) -> &[Neighbor] {
        &self.records.get(node as usize).neighbors
    }

    #[inline]
    pub(crate) fn landmark_level(&self, node: NodeId) -> u16 {
        self.records.get(node as usize).landmark_level
    }

    #[inline]
    pub(crate) fn set_landmark_level(&self, node: NodeId, level: u16) {
        self.records.get_mut(node as usize).landmark_level = level;
    }

    /// Insert an undirected edge, collapsing duplicates to the minimum weight.
    /// Caller must own both endpoints per the [`SharedCells`] discipline.
    pub(crate) fn add_edge(&self, v: NodeId, w: NodeId, distance: Weight, add_reverse: bool) {
        assert!((v as usize) < self.len() && (w as usize) < self.len());
        assert!(distance > 0);
        let neighbors = &mut self.records.get_mut(v as usize).neighbors;
        match neighbors.iter_mut().find(|n| n.node == w) {
            Some(n) => n.distance = n.distance.min(distance),
            None => neighbors.push(Neighbor::new(w, distance)),
        }
        if add_reverse {
            self.add_edge(w, v, distance, false);
        }
    }
}

/// The top-level graph owning the store.
#[derive(Debug)]
pub struct Graph {
    store: GraphStore,
    subgraph: SubgraphId,
    nodes: Vec<NodeId>,
}

impl Graph {
    pub fn new(node_count: usize) -> Self {
        let store = GraphStore::new(node_count);
        let subgraph = store.fresh_subgraph_id();
        let nodes: Vec<NodeId> = (1..=node_count as NodeId).collect();
        for &node in &nodes {
            store.set_tag(node, subgraph);
        }
        Graph { store, subgraph, nodes }
    }

    pub fn with_edges(node_count: usize, edges: &[Edge]) -> Self {
        let mut g = Graph::new(node_count);
        for e in edges {
            g.add_edge(e.a, e.b, e.d, true);
        }
        g
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// A borrowed subgraph view over all current nodes.
    pub fn view(&self) -> SubGraph {
        SubGraph {
            store: &self.store,
            id: self.subgraph,
            nodes: self.nodes.clone(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Largest valid node id.
    pub fn max_node_id(&self) -> NodeId {
        self.store.len() as NodeId - 1
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.store.tag(node) == self.subgraph
    }

    pub fn neighbors(&self, node: NodeId) -> &[Neighbor] {
        self.store.neighbors(node)
    }

    pub fn add_edge(&mut self, v: NodeId, w: NodeId, distance: Weight, add_reverse: bool) {
        self.store.add_edge(v, w, distance, add_reverse);
    }

    pub fn remove_edge(&mut self, v: NodeId, w: NodeId) {
        self.store.records.get_mut(v as usize).neighbors.retain(|n| n.node != w);
        self.store.records.get_mut(w as usize).neighbors.retain(|n| n.node != v);
    }

    /// Set the weight of the directed entry `v -> w`. The caller updates both
    /// directions, as the update file reader does.
    pub fn update_edge(&mut self, v: NodeId, w: NodeId, d: Weight) {
        if let Some(n) = self.store.records.get_mut(v as usize).neighbors.iter_mut().find(|n| n.node == w) {
            n.distance = d;
        }
    }

    pub fn degree(&self, v: NodeId) -> usize {
        self.view().degree(v)
    }

    /// Drop nodes without any incident edge from the node set.
    pub fn remove_isolated(&mut self) {
        let store = &self.store;
        self.nodes.retain(|&node| {
            if store.neighbors(node).is_empty() {
                store.set_tag(node, NO_SUBGRAPH);
                false
            } else {
                true
            }
        });
    }

    /// Sort all adjacency lists by neighbor id for deterministic traversal.
    pub(crate) fn sort_neighbors(&mut self) {
        for node in 1..self.store.len() {
            self.store.records.get_mut(node).neighbors.sort_unstable_by_key(|n| n.node);
        }
    }

    /// Re-assert the graph's own tag on its node set after subgraph splits.
    pub(crate) fn retag(&self) {
        for &node in &self.nodes {
            self.store.set_tag(node, self.subgraph);
        }
    }

    /// Drop all adjacency and re-add the given edge set. Used to revert
    /// transient shortcut edges after index construction.
    pub(crate) fn restore_edges(&mut self, edges: &[Edge]) {
        for node in 1..self.store.len() {
            self.store.records.get_mut(node).neighbors.clear();
        }
        for e in edges {
            self.add_edge(e.a, e.b, e.d, true);
        }
    }

    /// Restore the node set to all nodes with at least one edge and re-tag
    /// them. Undoes subgraph splits and degree-1 contraction removals.
    pub fn reset(&mut self) {
        self.nodes.clear();
        for node in 1..self.store.len() as NodeId {
            if !self.store.neighbors(node).is_empty() {
                self.nodes.push(node);
                self.store.set_tag(node, self.subgraph);
            }
        }
    }

    pub fn edge_count(&self) -> usize {
        self.view().edge_count()
    }

    pub fn get_edges(&self) -> Vec<Edge> {
        self.view().get_edges()
    }

    /// Iteratively contract degree-1 nodes. Returns for every node its
    /// `closest` entry: the node itself (distance 0) when kept, the pendant
    /// parent when contracted, and `NO_NODE` for untracked slots.
    pub fn contract(&mut self) -> Vec<Neighbor> {
        let mut closest = vec![Neighbor::with_count(NO_NODE, 0, 0); self.store.len()];
        for &node in &self.nodes {
            closest[node as usize] = Neighbor::with_count(node, 0, 1);
        }

        let mut sub = self.view();
        let find_degree_one = |sub: &SubGraph, candidates: &[NodeId], closest: &mut Vec<Neighbor>| {
            let mut degree_one = Vec::new();
            let mut neighbors = Vec::new();
            for &node in candidates {
                if !sub.contains(node) {
                    continue;
                }
                if let Some(neighbor) = sub.single_neighbor(node) {
                    // never collapse both endpoints of an edge
                    if sub.single_neighbor(neighbor.node).is_none() {
                        closest[node as usize] = neighbor;
                        degree_one.push(node);
                        neighbors.push(neighbor.node);
                    }
                }
            }
            (degree_one, neighbors)
        };

        let (mut degree_one, mut neighbors) = find_degree_one(&sub, &sub.nodes.clone(), &mut closest);
        while !degree_one.is_empty() {
            degree_one.sort_unstable();
            sub.remove_nodes(&degree_one);
            let old_neighbors = neighbors;
            (degree_one, neighbors) = find_degree_one(&sub, &old_neighbors, &mut closest);
        }
        self.nodes = sub.nodes;
        closest
    }

    pub fn random_node<R: Rng>(&self, rng: &mut R) -> NodeId {
        self.nodes[rng.gen_range(0..self.nodes.len())]
    }

    /// A random node pair connected by a random walk of the given length, or
    /// a uniform pair for zero steps.
    pub fn random_pair<R: Rng>(&self, steps: usize, rng: &mut R) -> (NodeId, NodeId) {
        if steps < 1 {
            return (self.random_node(rng), self.random_node(rng));
        }
        let start = self.random_node(rng);
        let mut stop = start;
        for _ in 0..steps {
            loop {
                let neighbors = self.neighbors(stop);
                let n = neighbors[rng.gen_range(0..neighbors.len())].node;
                if self.contains(n) {
                    stop = n;
                    break;
                }
            }
        }
        (start, stop)
    }

    /// Pick a random existing edge and return its weight and endpoints.
    pub fn random_update<R: Rng>(&self, rng: &mut R) -> (Weight, (NodeId, NodeId)) {
        let a = self.random_node(rng);
        let neighbors = self.neighbors(a);
        let n = neighbors[rng.gen_range(0..neighbors.len())];
        (n.distance, (a, n.node))
    }

    /// Every stored edge must have its reverse with equal weight.
    pub fn is_undirected(&self) -> bool {
        self.nodes.iter().all(|&node| {
            self.neighbors(node)
                .iter()
                .all(|n| self.neighbors(n.node).iter().any(|nn| nn.node == node && nn.distance == n.distance))
        })
    }

    /// All nodes in the set carry the graph's tag and no foreign node does.
    pub fn is_consistent(&self) -> bool {
        if !self.nodes.iter().all(|&node| self.contains(node)) {
            return false;
        }
        let tagged = (1..self.store.len() as NodeId).filter(|&node| self.contains(node)).count();
        tagged == self.nodes.len()
    }

    /// Report edges which are at least as long as an alternative path between
    /// their endpoints. Each redundant edge is reported once.
    pub fn get_redundant_edges(&self) -> Vec<Edge> {
        let sub = self.view();
        let mut ctx = SearchContext::new(self.store.len());
        let mut edges = Vec::new();
        for &v in &self.nodes {
            let max_dist = self
                .neighbors(v)
                .iter()
                .filter(|n| v < n.node && sub.contains(n.node))
                .map(|n| n.distance)
                .max()
                .unwrap_or(0);
            sub.run_dijkstra_skipping_source_edges(v, max_dist, &mut ctx);
            for n in self.neighbors(v) {
                if v < n.node && sub.contains(n.node) && ctx.distance(n.node) <= n.distance {
                    edges.push(Edge::new(v, n.node, n.distance));
                }
            }
        }
        edges
    }
}

/// A transient subgraph: a node list plus the tag identifying membership.
#[derive(Debug)]
pub struct SubGraph<'a> {
    store: &'a GraphStore,
    id: SubgraphId,
    pub(crate) nodes: Vec<NodeId>,
}

impl<'a> SubGraph<'a> {
    /// Create a subgraph over the given nodes with a fresh tag.
    pub fn from_nodes(store: &'a GraphStore, nodes: Vec<NodeId>) -> Self {
        let id = store.fresh_subgraph_id();
        for &node in &nodes {
            store.set_tag(node, id);
        }
        SubGraph { store, id, nodes }
    }

    pub fn store(&self) -> &'a GraphStore {
        self.store
    }

    pub(crate) fn id(&self) -> SubgraphId {
        self.id
    }

    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        self.store.tag(node) == self.id
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    #[inline]
    pub fn neighbors(&self, node: NodeId) -> &[Neighbor] {
        self.store.neighbors(node)
    }

    pub fn degree(&self, v: NodeId) -> usize {
        debug_assert!(self.contains(v));
        self.neighbors(v).iter().filter(|n| self.contains(n.node)).count()
    }

    /// The unique subgraph neighbor of `v`, or `None` if `v` has zero or
    /// more than one.
    pub fn single_neighbor(&self, v: NodeId) -> Option<Neighbor> {
        debug_assert!(self.contains(v));
        let mut found = None;
        for n in self.neighbors(v) {
            if self.contains(n.node) {
                if found.is_some() {
                    return None;
                }
                found = Some(*n);
            }
        }
        found
    }

    pub fn add_node(&mut self, v: NodeId) {
        self.nodes.push(v);
        self.store.set_tag(v, self.id);
    }

    /// Remove the given sorted node set from the subgraph, untagging members.
    pub fn remove_nodes(&mut self, node_set: &[NodeId]) {
        util::remove_set(&mut self.nodes, node_set);
        for &node in node_set {
            self.store.set_tag(node, NO_SUBGRAPH);
        }
    }

    /// Re-assert this subgraph's tag on all of its nodes.
    pub fn assign_nodes(&self) {
        for &node in &self.nodes {
            self.store.set_tag(node, self.id);
        }
    }

    /// Insert an undirected edge between two subgraph nodes (shortcuts).
    pub(crate) fn add_edge(&self, v: NodeId, w: NodeId, distance: Weight) {
        debug_assert!(self.contains(v) && self.contains(w));
        self.store.add_edge(v, w, distance, true);
    }

    pub fn edge_count(&self) -> usize {
        let ecount: usize = self
            .nodes
            .iter()
            .map(|&node| self.neighbors(node).iter().filter(|n| self.contains(n.node)).count())
            .sum();
        ecount / 2
    }

    pub fn get_edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for &a in &self.nodes {
            for n in self.neighbors(a) {
                if n.node > a && self.contains(n.node) {
                    edges.push(Edge::new(a, n.node, n.distance));
                }
            }
        }
        edges
    }
}

/// Read a DIMACS-style graph: `p sp N M` header, `a u v d` edge lines, any
/// other line ignored. Isolated nodes are dropped afterwards.
pub fn read_graph<R: BufRead>(input: R) -> std::io::Result<Graph> {
    let mut graph = Graph::new(0);
    for line in input.lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("p") => {
                // "p sp N M" - only N is used
                if let Some(n) = parts.nth(1).and_then(|v| v.parse::<usize>().ok()) {
                    graph = Graph::new(n);
                }
            }
            Some("a") => {
                let fields: Option<(NodeId, NodeId, Weight)> = (|| {
                    let v = parts.next()?.parse().ok()?;
                    let w = parts.next()?.parse().ok()?;
                    let d = parts.next()?.parse().ok()?;
                    Some((v, w, d))
                })();
                if let Some((v, w, d)) = fields {
                    graph.add_edge(v, w, d, true);
                }
            }
            _ => {}
        }
    }
    graph.remove_isolated();
    Ok(graph)
}

/// Write the graph in the format `read_graph` accepts.
pub fn print_graph<W: Write>(graph: &Graph, output: &mut W) -> std::io::Result<()> {
    let mut edges = graph.get_edges();
    edges.sort_unstable();
    writeln!(output, "p sp {} {}", graph.max_node_id(), edges.len())?;
    for e in edges {
        writeln!(output, "a {} {} {}", e.a, e.b, e.d)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_edge_collapses_duplicates() {
        let mut g = Graph::new(3);
        g.add_edge(1, 2, 5, true);
        g.add_edge(1, 2, 3, true);
        g.add_edge(2, 1, 7, true);
        assert_eq!(g.neighbors(1), &[Neighbor::new(2, 3)]);
        assert_eq!(g.neighbors(2), &[Neighbor::new(1, 3)]);
        assert!(g.is_undirected());
    }

    #[test]
    fn test_degree_one_contraction() {
        // 4 - 1 - 2 - 3, with 5 - 1 as well: 3, 4, 5 are pendants
        let mut g = Graph::with_edges(
            5,
            &[Edge::new(1, 2, 2), Edge::new(2, 3, 3), Edge::new(1, 4, 1), Edge::new(1, 5, 4)],
        );
        let closest = g.contract();
        assert_eq!(closest[3].node, 2);
        assert_eq!(closest[3].distance, 3);
        assert_eq!(closest[4].node, 1);
        assert_eq!(closest[5].node, 1);
        // 1 and 2 survive as each other's neighbor
        assert_eq!(closest[1].node, 1);
        assert_eq!(closest[2].node, 2);
        let mut remaining = g.nodes().to_vec();
        remaining.sort_unstable();
        assert_eq!(remaining, vec![1, 2]);
    }

    #[test]
    fn test_read_graph_skips_garbage() {
        let input = "c comment line\np sp 3 2\na 1 2 10\nx nonsense\na 2 3 20\n";
        let g = read_graph(input.as_bytes()).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        let mut out = Vec::new();
        print_graph(&g, &mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("a 1 2 10"));
        assert!(printed.contains("a 2 3 20"));
    }

    #[test]
    fn test_reset_restores_contracted_nodes() {
        let mut g = Graph::with_edges(3, &[Edge::new(1, 2, 1), Edge::new(2, 3, 1)]);
        g.contract();
        assert!(g.node_count() < 3);
        g.reset();
        assert_eq!(g.node_count(), 3);
        assert!(g.is_consistent());
    }
}
