//! Minimum vertex cuts via Dinitz' algorithm on a vertex-split flow network.
//!
//! Every node is treated as an (incoming, outgoing) pair joined by an internal
//! edge of capacity one, so a maximum s-t flow routes at most one unit through
//! any vertex. The flow network is an owned, node-local structure built per cut
//! refinement; the virtual terminals `s` and `t` never touch the shared store.
//!
//! Since all capacities are one, the flow is fully described by the inflow and
//! outflow partner of each node.

use super::*;
use std::collections::VecDeque;

const NONE: u32 = u32::MAX;

#[derive(Debug, Copy, Clone)]
struct FlowNode {
    node: u32,
    // outgoing copy of node?
    outcopy: bool,
}

/// A local flow network over the cut candidates. Local node 0 is `s`, local
/// node 1 is `t`, the candidates follow.
#[derive(Debug)]
pub struct FlowNetwork {
    ids: Vec<NodeId>,
    adj: Vec<Vec<u32>>,
    dist: Vec<Weight>,
    outcopy_dist: Vec<Weight>,
    inflow: Vec<u32>,
    outflow: Vec<u32>,
}

const S: u32 = 0;
const T: u32 = 1;

impl FlowNetwork {
    /// Build the network over `center`; `s_neighbors` and `t_neighbors` are
    /// the center nodes wired to the terminals. `edge_targets` must yield,
    /// for a center node, its neighbors (non-center entries are ignored).
    pub fn build<'n>(
        center: &[NodeId],
        s_neighbors: &[NodeId],
        t_neighbors: &[NodeId],
        mut edge_targets: impl FnMut(NodeId) -> &'n [Neighbor],
    ) -> Self {
        let n = center.len() + 2;
        let mut ids = vec![NO_NODE, NO_NODE];
        ids.extend_from_slice(center);
        let mut local = std::collections::HashMap::with_capacity(center.len());
        for (i, &node) in center.iter().enumerate() {
            local.insert(node, i as u32 + 2);
        }
        let mut adj: Vec<Vec<u32>> = vec![Vec::new(); n];
        for (i, &node) in center.iter().enumerate() {
            let u = i as u32 + 2;
            for neighbor in edge_targets(node) {
                if let Some(&v) = local.get(&neighbor.node) {
                    adj[u as usize].push(v);
                }
            }
        }
        for &node in s_neighbors {
            let v = local[&node];
            adj[S as usize].push(v);
            adj[v as usize].push(S);
        }
        for &node in t_neighbors {
            let v = local[&node];
            adj[T as usize].push(v);
            adj[v as usize].push(T);
        }
        FlowNetwork {
            ids,
            adj,
            dist: vec![INFINITY; n],
            outcopy_dist: vec![INFINITY; n],
            inflow: vec![NONE; n],
            outflow: vec![NONE; n],
        }
    }

    fn update(d: &mut Weight, d_new: Weight) -> bool {
        if *d > d_new {
            *d = d_new;
            true
        } else {
            false
        }
    }

    /// BFS levels from `t` in the inverse residual graph.
    fn run_flow_bfs_from_t(&mut self) {
        self.dist.fill(INFINITY);
        self.outcopy_dist.fill(INFINITY);
        self.dist[T as usize] = 0;
        self.outcopy_dist[T as usize] = 0;
        let mut q = VecDeque::new();
        // start with neighbors of t as t requires special flow handling
        for i in 0..self.adj[T as usize].len() {
            let n = self.adj[T as usize][i];
            if self.outflow[n as usize] != T {
                debug_assert_eq!(self.outflow[n as usize], NONE);
                self.outcopy_dist[n as usize] = 1;
                // treat inner-node edges as length 0
                self.dist[n as usize] = 1;
                q.push_back(FlowNode { node: n, outcopy: true });
            }
        }
        while let Some(fn_) = q.pop_front() {
            let fn_dist = if fn_.outcopy {
                self.outcopy_dist[fn_.node as usize]
            } else {
                self.dist[fn_.node as usize]
            };
            let outflow = self.outflow[fn_.node as usize];
            // special treatment is needed for a node with flow through it
            if outflow != NONE && fn_.outcopy {
                // outflow is the only valid neighbor
                if Self::update(&mut self.dist[outflow as usize], fn_dist + 1) {
                    // set the 0-length inner distance immediately so a longer
                    // path cannot claim it first
                    Self::update(&mut self.outcopy_dist[outflow as usize], fn_dist + 1);
                    q.push_back(FlowNode { node: outflow, outcopy: false });
                }
            } else {
                for i in 0..self.adj[fn_.node as usize].len() {
                    let n = self.adj[fn_.node as usize][i];
                    if n == outflow {
                        // following outflow by inverting flow
                        if Self::update(&mut self.dist[n as usize], fn_dist + 1) {
                            Self::update(&mut self.outcopy_dist[n as usize], fn_dist + 1);
                            q.push_back(FlowNode { node: n, outcopy: false });
                        }
                    } else if Self::update(&mut self.outcopy_dist[n as usize], fn_dist + 1) {
                        if self.outflow[n as usize] == NONE {
                            Self::update(&mut self.dist[n as usize], fn_dist + 1);
                        }
                        q.push_back(FlowNode { node: n, outcopy: true });
                    }
                }
            }
        }
    }

    /// BFS levels from `s` in the residual graph.
    fn run_flow_bfs_from_s(&mut self) {
        self.dist.fill(INFINITY);
        self.outcopy_dist.fill(INFINITY);
        self.dist[T as usize] = 0;
        self.outcopy_dist[T as usize] = 0;
        let mut q = VecDeque::new();
        for i in 0..self.adj[S as usize].len() {
            let n = self.adj[S as usize][i];
            if self.inflow[n as usize] != S {
                debug_assert_eq!(self.inflow[n as usize], NONE);
                self.dist[n as usize] = 1;
                self.outcopy_dist[n as usize] = 1;
                q.push_back(FlowNode { node: n, outcopy: false });
            }
        }
        while let Some(fn_) = q.pop_front() {
            let fn_dist = if fn_.outcopy {
                self.outcopy_dist[fn_.node as usize]
            } else {
                self.dist[fn_.node as usize]
            };
            let inflow = self.inflow[fn_.node as usize];
            if inflow != NONE && !fn_.outcopy {
                // inflow is the only valid neighbor
                if Self::update(&mut self.outcopy_dist[inflow as usize], fn_dist + 1) {
                    Self::update(&mut self.dist[inflow as usize], fn_dist + 1);
                    q.push_back(FlowNode { node: inflow, outcopy: true });
                }
            } else {
                for i in 0..self.adj[fn_.node as usize].len() {
                    let n = self.adj[fn_.node as usize][i];
                    if n == inflow {
                        if Self::update(&mut self.outcopy_dist[n as usize], fn_dist + 1) {
                            Self::update(&mut self.dist[n as usize], fn_dist + 1);
                            q.push_back(FlowNode { node: n, outcopy: true });
                        }
                    } else if Self::update(&mut self.dist[n as usize], fn_dist + 1) {
                        if self.inflow[n as usize] == NONE {
                            Self::update(&mut self.outcopy_dist[n as usize], fn_dist + 1);
                        }
                        q.push_back(FlowNode { node: n, outcopy: false });
                    }
                }
            }
        }
    }

    /// Compute a maximum flow and extract up to two minimum vertex cuts, one
    /// per side of the saturated network. An identical second cut is dropped.
    pub fn min_vertex_cuts(&mut self) -> Vec<Vec<NodeId>> {
        self.inflow.fill(NONE);
        self.outflow.fill(NONE);
        // find max s-t flow using Dinitz' algorithm
        loop {
            // construct BFS tree from t
            self.run_flow_bfs_from_t();
            let s_distance = self.outcopy_dist[S as usize];
            if s_distance == INFINITY {
                break;
            }
            // run DFS from s along inverse BFS tree edges
            let mut path: Vec<u32> = Vec::new();
            let mut stack: Vec<FlowNode> = Vec::new();
            for i in 0..self.adj[S as usize].len() {
                let sn = self.adj[S as usize][i];
                if self.dist[sn as usize] != s_distance - 1 {
                    continue;
                }
                // ensure the edge from s still exists in the residual graph
                if self.inflow[sn as usize] != NONE {
                    debug_assert_eq!(self.inflow[sn as usize], S);
                    continue;
                }
                stack.push(FlowNode { node: sn, outcopy: false });
                while let Some(fn_) = stack.pop() {
                    let fn_dist = if fn_.outcopy {
                        self.outcopy_dist[fn_.node as usize]
                    } else {
                        self.dist[fn_.node as usize]
                    };
                    // may have been enqueued before its first visit
                    if fn_dist == INFINITY {
                        continue;
                    }
                    debug_assert!(fn_dist < s_distance && (s_distance - fn_dist - 1) as usize <= path.len());
                    path.truncate((s_distance - fn_dist - 1) as usize);
                    // increase flow when an s-t path is found
                    if fn_.node == T {
                        debug_assert_eq!(self.inflow[path[0] as usize], NONE);
                        self.inflow[path[0] as usize] = S;
                        for path_pos in 1..path.len() {
                            let from = path[path_pos - 1];
                            let to = path[path_pos];
                            // we might be reverting existing flow;
                            // from.inflow may have changed already, check outflow
                            if self.outflow[to as usize] == from {
                                self.outflow[to as usize] = NONE;
                                if self.inflow[from as usize] == to {
                                    self.inflow[from as usize] = NONE;
                                }
                            } else {
                                self.outflow[from as usize] = to;
                                self.inflow[to as usize] = from;
                            }
                        }
                        let last = *path.last().unwrap();
                        debug_assert_eq!(self.outflow[last as usize], NONE);
                        self.outflow[last as usize] = T;
                        // skip to the next neighbor of s
                        stack.clear();
                        path.clear();
                        break;
                    }
                    // ensure the vertex is not re-visited during this DFS
                    if fn_.outcopy {
                        self.outcopy_dist[fn_.node as usize] = INFINITY;
                    } else {
                        self.dist[fn_.node as usize] = INFINITY;
                    }
                    path.push(fn_.node);
                    let next_distance = fn_dist - 1;
                    // arriving at the outgoing copy of a node with flow means
                    // we invert its outflow, so all neighbors are valid;
                    // otherwise inverting the inflow is the only option
                    let inflow = self.inflow[fn_.node as usize];
                    if inflow != NONE && !fn_.outcopy {
                        if self.outcopy_dist[inflow as usize] == next_distance {
                            stack.push(FlowNode { node: inflow, outcopy: true });
                        }
                    } else {
                        for j in 0..self.adj[fn_.node as usize].len() {
                            let n = self.adj[fn_.node as usize][j];
                            if n == inflow {
                                if self.outcopy_dist[inflow as usize] == next_distance {
                                    stack.push(FlowNode { node: inflow, outcopy: true });
                                }
                            } else if self.dist[n as usize] == next_distance {
                                stack.push(FlowNode { node: n, outcopy: false });
                            }
                        }
                    }
                }
            }
        }
        // a node-internal edge is cut iff the outgoing copy is reachable from
        // t in the inverse residual graph and the incoming copy is not; for
        // node-external edges the unreachable starting point of a reachable
        // endpoint can only occur at t, making the starting point the cut vertex
        let mut cuts = vec![Vec::new()];
        for v in 2..self.adj.len() as u32 {
            if self.outflow[v as usize] != NONE {
                debug_assert!(self.inflow[v as usize] != NONE);
                if self.outcopy_dist[v as usize] < INFINITY {
                    if self.dist[v as usize] == INFINITY {
                        cuts[0].push(self.ids[v as usize]);
                    }
                } else if self.outflow[v as usize] == T {
                    cuts[0].push(self.ids[v as usize]);
                }
            }
        }
        // same extraction w.r.t. reachability from s in the residual graph
        self.run_flow_bfs_from_s();
        let mut second = Vec::new();
        for v in 2..self.adj.len() as u32 {
            if self.inflow[v as usize] != NONE {
                debug_assert!(self.outflow[v as usize] != NONE);
                if self.dist[v as usize] < INFINITY {
                    if self.outcopy_dist[v as usize] == INFINITY {
                        second.push(self.ids[v as usize]);
                    }
                } else if self.inflow[v as usize] == S {
                    second.push(self.ids[v as usize]);
                }
            }
        }
        // eliminate potential duplicate
        if second != cuts[0] {
            cuts.push(second);
        }
        cuts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neighbors(edges: &[(NodeId, NodeId)]) -> impl Fn(NodeId) -> &'static [Neighbor] + '_ {
        // build static-ish adjacency for the closure-based interface
        let mut adj: std::collections::HashMap<NodeId, Vec<Neighbor>> = std::collections::HashMap::new();
        for &(a, b) in edges {
            adj.entry(a).or_default().push(Neighbor::new(b, 1));
            adj.entry(b).or_default().push(Neighbor::new(a, 1));
        }
        let adj: &'static std::collections::HashMap<NodeId, Vec<Neighbor>> = &*Box::leak(Box::new(adj));
        move |node| adj.get(&node).map(|v| &v[..]).unwrap_or(&[])
    }

    #[test]
    fn test_single_path_yields_unit_cuts() {
        // s - 10 - 11 - 12 - t
        let lookup = neighbors(&[(10, 11), (11, 12)]);
        let mut net = FlowNetwork::build(&[10, 11, 12], &[10], &[12], lookup);
        let cuts = net.min_vertex_cuts();
        assert!(!cuts.is_empty() && cuts.len() <= 2);
        for cut in &cuts {
            assert_eq!(cut.len(), 1);
        }
    }

    #[test]
    fn test_two_disjoint_paths_need_two_vertices() {
        //     10 - 11
        //    /       \
        //   s         t     two vertex-disjoint paths, max flow 2
        //    \       /
        //     12 - 13
        let lookup = neighbors(&[(10, 11), (12, 13)]);
        let mut net = FlowNetwork::build(&[10, 11, 12, 13], &[10, 12], &[11, 13], lookup);
        let cuts = net.min_vertex_cuts();
        for cut in &cuts {
            assert_eq!(cut.len(), 2);
        }
    }

    #[test]
    fn test_bottleneck_vertex() {
        //   10        13
        //     \      /
        //      12 --        all paths pass 12
        //     /      \
        //   11        14
        let lookup = neighbors(&[(10, 12), (11, 12), (12, 13), (12, 14)]);
        let mut net = FlowNetwork::build(&[10, 11, 12, 13, 14], &[10, 11], &[13, 14], lookup);
        let cuts = net.min_vertex_cuts();
        assert!(cuts.iter().any(|cut| cut == &vec![12]));
        for cut in &cuts {
            assert_eq!(cut.len(), 1);
        }
    }
}
