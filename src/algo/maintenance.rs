//! Dynamic maintenance of the shortcut hierarchy and the 2-hop labels under
//! edge weight updates.
//!
//! A batch of updates first repairs the hierarchy (`gs_dec`/`gs_inc`),
//! producing the set of changed upward edges; those changes then drive the
//! label repair (`dcl_dec`/`dcl_inc`), draining a min-rank bucket queue so
//! ancestors are resolved before descendants consume them. The optimized
//! variants snapshot each touched slot once, the parallel variants partition
//! the work by label slot.

use super::flat_index::ContractionIndex;
use super::hierarchy::ContractionHierarchy;
use crate::datastr::bucket_queue::{MinBucketQueue, SharedBucketQueue};
use crate::graph::*;
use std::collections::BinaryHeap;

/// One edge weight update: `((old_weight, new_weight), (a, b))`.
pub type WeightUpdate = ((Weight, Weight), (NodeId, NodeId));
/// Update routed into the pendant forest:
/// `((old_offset, new_offset), contracted_endpoint)`.
pub type ContractedUpdate = ((Weight, Weight), NodeId);
/// A changed hierarchy edge and its `(distance, path_count)` payload.
pub type EdgeChange = ((NodeId, NodeId), (Weight, PathCount));

/// dirty marker of the optimized single-pass maintenance
const DIRTY: PathCount = 1 << 15;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct DchNode {
    // heap key: deepest (largest rank value) first
    dist_index: u16,
    v: NodeId,
    w: NodeId,
    distance: Weight,
    path_count: PathCount,
}

#[derive(Debug, Copy, Clone)]
struct IchNode {
    v: NodeId,
    i: usize,
    distance: Weight,
    path_count: PathCount,
}

/// Collapse duplicate edges keeping the minimum distance, summing counts on
/// ties.
fn merge_edges(v: &mut Vec<EdgeChange>) {
    if v.len() < 2 {
        return;
    }
    v.sort_unstable();
    let mut last_distinct = 0;
    for next in 1..v.len() {
        if v[next].0 == v[last_distinct].0 {
            if v[next].1 .0 < v[last_distinct].1 .0 {
                v[last_distinct].1 = v[next].1;
            } else if v[next].1 .0 == v[last_distinct].1 .0 {
                v[last_distinct].1 .1 = v[last_distinct].1 .1.wrapping_add(v[next].1 .1);
            }
        } else {
            last_distinct += 1;
            v[last_distinct] = v[next];
        }
    }
    v.truncate(last_distinct + 1);
}

// orient an edge so that v is the deeper endpoint
fn orient(ch: &ContractionHierarchy, a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if ch.rank(a) < ch.rank(b) {
        (b, a)
    } else {
        (a, b)
    }
}

impl Graph {
    /// Repair the hierarchy after weight decreases; returns the merged set of
    /// changed upward edges with their new `(distance, path_count)`.
    pub fn gs_dec(&self, ch: &mut ContractionHierarchy, updates: &[WeightUpdate]) -> Vec<EdgeChange> {
        let mut q = BinaryHeap::new();
        for &((_, new_w), (a, b)) in updates {
            let (a, b) = orient(ch, a, b);
            let direct = ch.up_neighbor(a, b).expect("update against a non-existent edge");
            if direct.distance >= new_w {
                q.push(DchNode {
                    dist_index: ch.rank(a),
                    v: a,
                    w: b,
                    distance: new_w,
                    path_count: 1,
                });
            }
        }

        let mut changes = Vec::new();
        while let Some(next) = q.pop() {
            {
                let x = ch.up_neighbor_mut(next.v, next.w).unwrap();
                if next.distance < x.distance {
                    x.distance = next.distance;
                    x.path_count = next.path_count;
                } else if next.distance == x.distance {
                    x.path_count = x.path_count.wrapping_add(next.path_count);
                } else {
                    continue;
                }
            }
            let up = ch.nodes[next.v as usize].up_neighbors.clone();
            for n in up {
                if n.node != next.w {
                    let dist = next.distance.saturating_add(n.distance);
                    let path_count = next.path_count.wrapping_mul(n.path_count);
                    let (a, b) = orient(ch, next.w, n.node);
                    if ch.up_neighbor(a, b).map_or(false, |x| x.distance >= dist) {
                        q.push(DchNode {
                            dist_index: ch.rank(a),
                            v: a,
                            w: b,
                            distance: dist,
                            path_count,
                        });
                    }
                }
            }
            changes.push(((next.v, next.w), (next.distance, next.path_count)));
        }
        merge_edges(&mut changes);
        changes
    }

    /// Repair the hierarchy after weight increases; the change set carries,
    /// per edge, the old distance and the removed path count.
    pub fn gs_inc(&self, ch: &mut ContractionHierarchy, updates: &[WeightUpdate]) -> Vec<EdgeChange> {
        let mut q = BinaryHeap::new();
        for &((old_w, _), (a, b)) in updates {
            let (a, b) = orient(ch, a, b);
            let direct = ch.up_neighbor(a, b).expect("update against a non-existent edge");
            if direct.distance == old_w {
                q.push(DchNode {
                    dist_index: ch.rank(a),
                    v: a,
                    w: b,
                    distance: old_w,
                    path_count: 1,
                });
            }
        }

        let mut changes = Vec::new();
        while let Some(next) = q.pop() {
            // propagate along still-matching shortcut compositions first
            let up = ch.nodes[next.v as usize].up_neighbors.clone();
            for n in &up {
                if n.node != next.w {
                    let dist = next.distance.saturating_add(n.distance);
                    let path_count = next.path_count.wrapping_mul(n.path_count);
                    let (a, b) = orient(ch, next.w, n.node);
                    if ch.up_neighbor(a, b).map_or(false, |x| x.distance == dist) {
                        q.push(DchNode {
                            dist_index: ch.rank(a),
                            v: a,
                            w: b,
                            distance: dist,
                            path_count,
                        });
                    }
                }
            }

            let x = ch.up_neighbor(next.v, next.w).unwrap();
            if x.path_count > next.path_count {
                let x = ch.up_neighbor_mut(next.v, next.w).unwrap();
                x.path_count = x.path_count.wrapping_sub(next.path_count);
            } else {
                // all counted paths are gone: recompute from the base edge
                // and the common lower neighbors
                let mut distance = INFINITY;
                let mut path_count: PathCount = 1;
                for n in self.neighbors(next.v) {
                    if n.node == next.w {
                        distance = n.distance;
                        break;
                    }
                }
                let down_v = &ch.nodes[next.v as usize].down_neighbors;
                let down_w = &ch.nodes[next.w as usize].down_neighbors;
                let (mut i, mut j) = (0, 0);
                while i < down_v.len() && j < down_w.len() {
                    let (a, b) = (down_v[i], down_w[j]);
                    if a < b {
                        i += 1;
                    } else if b < a {
                        j += 1;
                    } else {
                        let av = ch.up_neighbor(a, next.v).unwrap();
                        let aw = ch.up_neighbor(a, next.w).unwrap();
                        let dist = av.distance.saturating_add(aw.distance);
                        let count = av.path_count.wrapping_mul(aw.path_count);
                        if dist < distance {
                            distance = dist;
                            path_count = count;
                        } else if dist == distance && dist < INFINITY {
                            path_count = path_count.wrapping_add(count);
                        }
                        i += 1;
                        j += 1;
                    }
                }
                let x = ch.up_neighbor_mut(next.v, next.w).unwrap();
                x.distance = distance;
                x.path_count = path_count;
            }
            changes.push(((next.v, next.w), (next.distance, next.path_count)));
        }
        merge_edges(&mut changes);
        changes
    }

    /// Label maintenance for a batch of weight decreases.
    pub fn dcl_dec(&self, ch: &mut ContractionHierarchy, index: &mut ContractionIndex, updates: &[WeightUpdate]) {
        let changes = self.gs_dec(ch, updates);

        // candidates at the changed edges' deeper endpoints, per ancestor slot
        let mut q = MinBucketQueue::new();
        for &((v, w), (d, c)) in &changes {
            let a = index.get_contraction_label(v).cut_index;
            let rw = ch.rank(w) as usize;
            if d <= index.label_distance(a, rw) {
                let b = index.get_contraction_label(w).cut_index;
                for i in 0..=rw {
                    let dist = d.saturating_add(index.label_distance(b, i));
                    if index.label_distance(a, i) >= dist {
                        let path_count = c.wrapping_mul(index.label_path(b, i));
                        q.push(
                            IchNode {
                                v,
                                i,
                                distance: dist,
                                path_count,
                            },
                            ch.rank(v) as usize,
                        );
                    }
                }
            }
        }

        // drain: ancestors resolve before descendants consume them
        while !q.is_empty() {
            let next = q.pop();
            let cv = index.get_contraction_label(next.v).cut_index;
            if index.label_distance(cv, next.i) > next.distance {
                index.set_label_distance(cv, next.i, next.distance);
                index.set_label_path(cv, next.i, next.path_count);
            } else if index.label_distance(cv, next.i) == next.distance {
                index.set_label_path(cv, next.i, index.label_path(cv, next.i).wrapping_add(next.path_count));
            } else {
                continue;
            }

            for &u in &ch.nodes[next.v as usize].down_neighbors {
                let x = ch.up_neighbor(u, next.v).unwrap();
                let dist = x.distance.saturating_add(next.distance);
                let cu = index.get_contraction_label(u).cut_index;
                if index.label_distance(cu, next.i) >= dist {
                    q.push(
                        IchNode {
                            v: u,
                            i: next.i,
                            distance: dist,
                            path_count: x.path_count.wrapping_mul(next.path_count),
                        },
                        ch.rank(u) as usize,
                    );
                }
            }
        }
    }

    /// Label maintenance for a batch of weight increases.
    pub fn dcl_inc(&self, ch: &mut ContractionHierarchy, index: &mut ContractionIndex, updates: &[WeightUpdate]) {
        let changes = self.gs_inc(ch, updates);

        let mut q = MinBucketQueue::new();
        for &((v, w), (d_old, c_removed)) in &changes {
            let a = index.get_contraction_label(v).cut_index;
            let rw = ch.rank(w) as usize;
            if d_old == index.label_distance(a, rw) {
                let b = index.get_contraction_label(w).cut_index;
                for i in 0..=rw {
                    let dist = d_old.saturating_add(index.label_distance(b, i));
                    if dist == index.label_distance(a, i) {
                        let path_count = c_removed.wrapping_mul(index.label_path(b, i));
                        q.push(
                            IchNode {
                                v,
                                i,
                                distance: dist,
                                path_count,
                            },
                            ch.rank(v) as usize,
                        );
                    }
                }
            }
        }

        while !q.is_empty() {
            let next = q.pop();
            let cv = index.get_contraction_label(next.v).cut_index;
            // push descendant updates while this slot still holds the old value
            for &u in &ch.nodes[next.v as usize].down_neighbors {
                let x = ch.up_neighbor(u, next.v).unwrap();
                let cu = index.get_contraction_label(u).cut_index;
                let dist = x.distance.saturating_add(index.label_distance(cv, next.i));
                if dist == index.label_distance(cu, next.i) {
                    q.push(
                        IchNode {
                            v: u,
                            i: next.i,
                            distance: dist,
                            path_count: x.path_count.wrapping_mul(next.path_count),
                        },
                        ch.rank(u) as usize,
                    );
                }
            }

            if index.label_path(cv, next.i) > next.path_count {
                // other shortest paths remain, only the count changes
                index.set_label_path(cv, next.i, index.label_path(cv, next.i).wrapping_sub(next.path_count));
            } else {
                // recompute the slot from the upward neighbors covering it
                index.set_label_distance(cv, next.i, INFINITY);
                for n in &ch.nodes[next.v as usize].up_neighbors {
                    if ch.rank(n.node) as usize >= next.i {
                        let cu = index.get_contraction_label(n.node).cut_index;
                        let dist = n.distance.saturating_add(index.label_distance(cu, next.i));
                        let count = n.path_count.wrapping_mul(index.label_path(cu, next.i));
                        if dist < index.label_distance(cv, next.i) {
                            index.set_label_distance(cv, next.i, dist);
                            index.set_label_path(cv, next.i, count);
                        } else if dist == index.label_distance(cv, next.i) && dist < INFINITY {
                            index.set_label_path(cv, next.i, index.label_path(cv, next.i).wrapping_add(count));
                        }
                    }
                }
            }
        }
    }

    /// Optimized decrease maintenance: one pass which snapshots each touched
    /// slot on first contact (dirty high bit) so converging candidates
    /// propagate their net delta only once.
    pub fn dcl_dec_opt(&self, ch: &mut ContractionHierarchy, index: &mut ContractionIndex, updates: &[WeightUpdate]) {
        let changes = self.gs_dec(ch, updates);

        let mut q: MinBucketQueue<IchNode> = MinBucketQueue::new();
        let enqueue_and_update = |q: &mut MinBucketQueue<IchNode>, ch: &ContractionHierarchy, v: NodeId, i: usize, dist: Weight, count: PathCount| {
            let cv = index.get_contraction_label(v).cut_index;
            if index.label_path(cv, i) & DIRTY == 0 {
                // snapshot the pre-update slot
                q.push(
                    IchNode {
                        v,
                        i,
                        distance: index.label_distance(cv, i),
                        path_count: index.label_path(cv, i),
                    },
                    ch.rank(v) as usize,
                );
                index.set_label_path(cv, i, index.label_path(cv, i) | DIRTY);
            }
            if index.label_distance(cv, i) > dist {
                index.set_label_distance(cv, i, dist);
                index.set_label_path(cv, i, count | DIRTY);
            } else {
                index.set_label_path(cv, i, index.label_path(cv, i).wrapping_add(count));
            }
        };

        for &((v, w), (d, c)) in &changes {
            let a = index.get_contraction_label(v).cut_index;
            let rw = ch.rank(w) as usize;
            if d <= index.label_distance(a, rw) {
                let b = index.get_contraction_label(w).cut_index;
                for i in 0..=rw {
                    let dist = d.saturating_add(index.label_distance(b, i));
                    if index.label_distance(a, i) >= dist {
                        enqueue_and_update(&mut q, ch, v, i, dist, c.wrapping_mul(index.label_path(b, i)));
                    }
                }
            }
        }

        while !q.is_empty() {
            // the queued entry holds the snapshot; the live slot has the result
            let next = q.pop();
            let cv = index.get_contraction_label(next.v).cut_index;
            index.set_label_path(cv, next.i, index.label_path(cv, next.i) & !DIRTY);
            let convex_path_count = if index.label_distance(cv, next.i) == next.distance {
                index.label_path(cv, next.i).wrapping_sub(next.path_count)
            } else if index.label_distance(cv, next.i) < next.distance {
                index.label_path(cv, next.i)
            } else {
                continue;
            };

            for &u in &ch.nodes[next.v as usize].down_neighbors {
                let x = ch.up_neighbor(u, next.v).unwrap();
                let dist = x.distance.saturating_add(index.label_distance(cv, next.i));
                let cu = index.get_contraction_label(u).cut_index;
                if index.label_distance(cu, next.i) >= dist {
                    enqueue_and_update(&mut q, ch, u, next.i, dist, x.path_count.wrapping_mul(convex_path_count));
                }
            }
        }
    }

    /// Optimized increase maintenance, single pass with snapshot slots.
    pub fn dcl_inc_opt(&self, ch: &mut ContractionHierarchy, index: &mut ContractionIndex, updates: &[WeightUpdate]) {
        let changes = self.gs_inc(ch, updates);

        let mut q: MinBucketQueue<IchNode> = MinBucketQueue::new();
        let enqueue_and_update = |q: &mut MinBucketQueue<IchNode>, ch: &ContractionHierarchy, v: NodeId, i: usize, count: PathCount| {
            let cv = index.get_contraction_label(v).cut_index;
            if index.label_path(cv, i) & DIRTY == 0 {
                q.push(
                    IchNode {
                        v,
                        i,
                        distance: index.label_distance(cv, i),
                        path_count: index.label_path(cv, i),
                    },
                    ch.rank(v) as usize,
                );
                index.set_label_path(cv, i, index.label_path(cv, i) | DIRTY);
            }
            index.set_label_path(cv, i, index.label_path(cv, i).wrapping_sub(count));
        };

        for &((v, w), (d_old, c_removed)) in &changes {
            let a = index.get_contraction_label(v).cut_index;
            let rw = ch.rank(w) as usize;
            if d_old == index.label_distance(a, rw) {
                let b = index.get_contraction_label(w).cut_index;
                for i in 0..=rw {
                    let dist = d_old.saturating_add(index.label_distance(b, i));
                    if dist == index.label_distance(a, i) {
                        enqueue_and_update(&mut q, ch, v, i, c_removed.wrapping_mul(index.label_path(b, i)));
                    }
                }
            }
        }

        while !q.is_empty() {
            let next = q.pop();
            let cv = index.get_contraction_label(next.v).cut_index;
            index.set_label_path(cv, next.i, index.label_path(cv, next.i) & !DIRTY);
            let convex_path_count = next.path_count.wrapping_sub(index.label_path(cv, next.i));

            for &u in &ch.nodes[next.v as usize].down_neighbors {
                let x = ch.up_neighbor(u, next.v).unwrap();
                let cu = index.get_contraction_label(u).cut_index;
                let dist = x.distance.saturating_add(index.label_distance(cv, next.i));
                if dist == index.label_distance(cu, next.i) {
                    enqueue_and_update(&mut q, ch, u, next.i, x.path_count.wrapping_mul(convex_path_count));
                }
            }

            if index.label_path(cv, next.i) == 0 {
                index.set_label_distance(cv, next.i, INFINITY);
                for n in &ch.nodes[next.v as usize].up_neighbors {
                    if ch.rank(n.node) as usize >= next.i {
                        let cw = index.get_contraction_label(n.node).cut_index;
                        let dist = n.distance.saturating_add(index.label_distance(cw, next.i));
                        let count = n.path_count.wrapping_mul(index.label_path(cw, next.i));
                        if dist < index.label_distance(cv, next.i) {
                            index.set_label_distance(cv, next.i, dist);
                            index.set_label_path(cv, next.i, count);
                        } else if dist == index.label_distance(cv, next.i) && dist < INFINITY {
                            index.set_label_path(cv, next.i, index.label_path(cv, next.i).wrapping_add(count));
                        }
                    }
                }
            }
        }
    }

    /// Parallel decrease maintenance: label slots are independent, so a
    /// shared queue hands each worker one whole slot bucket which it drains
    /// with a private min-rank queue identical to the sequential drain.
    pub fn dcl_dec_par(&self, ch: &mut ContractionHierarchy, index: &mut ContractionIndex, updates: &[WeightUpdate]) {
        let changes = self.gs_dec(ch, updates);

        let grouping: SharedBucketQueue<(NodeId, Weight, PathCount)> = SharedBucketQueue::new();
        for &((v, w), (d, c)) in &changes {
            let a = index.get_contraction_label(v).cut_index;
            let rw = ch.rank(w) as usize;
            if d <= index.label_distance(a, rw) {
                let b = index.get_contraction_label(w).cut_index;
                for i in 0..=rw {
                    let dist = d.saturating_add(index.label_distance(b, i));
                    if index.label_distance(a, i) >= dist {
                        grouping.push((v, dist, c.wrapping_mul(index.label_path(b, i))), i);
                    }
                }
            }
        }

        let ch = &*ch;
        let index = &*index;
        rayon::scope(|s| {
            for _ in 0..rayon::current_num_threads() {
                s.spawn(|_| {
                    while let Some((items, slot)) = grouping.next_bucket() {
                        let mut bq = MinBucketQueue::new();
                        for (v, dist, count) in items {
                            bq.push((v, dist, count), ch.rank(v) as usize);
                        }
                        while !bq.is_empty() {
                            let (v, distance, path_count) = bq.pop();
                            let cv = index.get_contraction_label(v).cut_index;
                            if index.label_distance(cv, slot) > distance {
                                index.set_label_distance(cv, slot, distance);
                                index.set_label_path(cv, slot, path_count);
                            } else if index.label_distance(cv, slot) == distance {
                                index.set_label_path(cv, slot, index.label_path(cv, slot).wrapping_add(path_count));
                            } else {
                                continue;
                            }
                            for &u in &ch.nodes[v as usize].down_neighbors {
                                let x = ch.up_neighbor(u, v).unwrap();
                                let dist = x.distance.saturating_add(distance);
                                let cu = index.get_contraction_label(u).cut_index;
                                if index.label_distance(cu, slot) >= dist {
                                    bq.push((u, dist, x.path_count.wrapping_mul(path_count)), ch.rank(u) as usize);
                                }
                            }
                        }
                    }
                });
            }
        });
    }

    /// Parallel increase maintenance, slot-partitioned like [`Self::dcl_dec_par`].
    pub fn dcl_inc_par(&self, ch: &mut ContractionHierarchy, index: &mut ContractionIndex, updates: &[WeightUpdate]) {
        let changes = self.gs_inc(ch, updates);

        let grouping: SharedBucketQueue<(NodeId, Weight, PathCount)> = SharedBucketQueue::new();
        for &((v, w), (d_old, c_removed)) in &changes {
            let a = index.get_contraction_label(v).cut_index;
            let rw = ch.rank(w) as usize;
            if d_old == index.label_distance(a, rw) {
                let b = index.get_contraction_label(w).cut_index;
                for i in 0..=rw {
                    let dist = d_old.saturating_add(index.label_distance(b, i));
                    if dist == index.label_distance(a, i) {
                        grouping.push((v, dist, c_removed.wrapping_mul(index.label_path(b, i))), i);
                    }
                }
            }
        }

        let ch = &*ch;
        let index = &*index;
        rayon::scope(|s| {
            for _ in 0..rayon::current_num_threads() {
                s.spawn(|_| {
                    while let Some((items, slot)) = grouping.next_bucket() {
                        let mut bq = MinBucketQueue::new();
                        for (v, dist, count) in items {
                            bq.push((v, dist, count), ch.rank(v) as usize);
                        }
                        while !bq.is_empty() {
                            let (v, _distance, path_count) = bq.pop();
                            let cv = index.get_contraction_label(v).cut_index;
                            for &u in &ch.nodes[v as usize].down_neighbors {
                                let x = ch.up_neighbor(u, v).unwrap();
                                let cu = index.get_contraction_label(u).cut_index;
                                let dist = x.distance.saturating_add(index.label_distance(cv, slot));
                                if dist == index.label_distance(cu, slot) {
                                    bq.push((u, dist, x.path_count.wrapping_mul(path_count)), ch.rank(u) as usize);
                                }
                            }
                            if index.label_path(cv, slot) > path_count {
                                index.set_label_path(cv, slot, index.label_path(cv, slot).wrapping_sub(path_count));
                            } else {
                                index.set_label_distance(cv, slot, INFINITY);
                                for n in &ch.nodes[v as usize].up_neighbors {
                                    if ch.rank(n.node) as usize >= slot {
                                        let cu = index.get_contraction_label(n.node).cut_index;
                                        let dist = n.distance.saturating_add(index.label_distance(cu, slot));
                                        let count = n.path_count.wrapping_mul(index.label_path(cu, slot));
                                        if dist < index.label_distance(cv, slot) {
                                            index.set_label_distance(cv, slot, dist);
                                            index.set_label_path(cv, slot, count);
                                        } else if dist == index.label_distance(cv, slot) && dist < INFINITY {
                                            index.set_label_path(cv, slot, index.label_path(cv, slot).wrapping_add(count));
                                        }
                                    }
                                }
                            }
                        }
                    }
                });
            }
        });
    }

    /// Propagate updated pendant edge weights through the contraction forest:
    /// searches start in ascending order of the original offset and skip
    /// subtrees an earlier search already rewrote.
    pub fn contract_seq(&self, index: &mut ContractionIndex, contracted_updates: &mut Vec<ContractedUpdate>) {
        contracted_updates.sort_unstable();
        let mut stack: Vec<(Weight, NodeId)> = Vec::new();
        for &((old_offset, new_offset), v) in contracted_updates.iter() {
            // already rewritten by a closer update
            if index.get_contraction_label(v).distance_offset != old_offset {
                continue;
            }
            stack.push((new_offset, v));
            while let Some((distance, node)) = stack.pop() {
                index.update_distance_offset(node, distance);
                for n in self.neighbors(node) {
                    if index.get_contraction_label(n.node).parent == node {
                        stack.push((distance + n.distance, n.node));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::LabelingConfig;

    fn build(g: &mut Graph) -> (ContractionHierarchy, ContractionIndex) {
        let closest = g.contract();
        let mut ci = g.create_cut_index(LabelingConfig::default());
        g.reset();
        let ch = ContractionHierarchy::build(g, &mut ci, &closest);
        let index = ContractionIndex::new(ci, &closest);
        (ch, index)
    }

    fn apply_updates(g: &mut Graph, updates: &[WeightUpdate]) {
        for &((_, new_w), (a, b)) in updates {
            g.update_edge(a, b, new_w);
            g.update_edge(b, a, new_w);
        }
    }

    fn assert_matches_rebuild(g: &Graph, index: &ContractionIndex) {
        for &v in g.nodes() {
            for &w in g.nodes() {
                assert_eq!(index.get_distance(v, w), g.get_distance(v, w, true), "distance ({}, {})", v, w);
                assert_eq!(index.get_spc(v, w), g.get_path_count(v, w), "spc ({}, {})", v, w);
            }
        }
    }

    fn grid3(scale: Weight) -> Graph {
        let id = |x: u32, y: u32| y * 3 + x + 1;
        let mut edges = Vec::new();
        for y in 0..3 {
            for x in 0..3 {
                if x + 1 < 3 {
                    edges.push(Edge::new(id(x, y), id(x + 1, y), scale));
                }
                if y + 1 < 3 {
                    edges.push(Edge::new(id(x, y), id(x, y + 1), scale));
                }
            }
        }
        Graph::with_edges(9, &edges)
    }

    #[test]
    fn test_increase_on_path() {
        // 1-2-3-4-5, weights 2; increasing one edge by half reroutes nothing
        // but lengthens the chain
        let edges: Vec<Edge> = (1..5).map(|i| Edge::new(i, i + 1, 2)).collect();
        let mut g = Graph::with_edges(5, &edges);
        let (mut ch, mut index) = build(&mut g);
        assert_eq!(index.get_distance(1, 5), 8);
        assert_eq!(index.get_spc(1, 5), 1);

        // the inner edge (2,3) survives pendant contraction only if both
        // endpoints are uncontracted; on a path everything but the middle is
        // contracted, so route through the pendant update path
        let updates = [((2, 3), (2, 3))];
        apply_updates(&mut g, &updates);
        let (x, y) = (index.get_contraction_label(2), index.get_contraction_label(3));
        let mut contracted = Vec::new();
        let mut normal = Vec::new();
        if index.is_contracted(2) || index.is_contracted(3) {
            if x.distance_offset > y.distance_offset {
                contracted.push(((x.distance_offset, y.distance_offset + 3), 2));
            } else {
                contracted.push(((y.distance_offset, x.distance_offset + 3), 3));
            }
        } else {
            normal.push(updates[0]);
        }
        g.dcl_inc(&mut ch, &mut index, &normal);
        g.contract_seq(&mut index, &mut contracted);
        assert_eq!(index.get_distance(1, 5), 9);
        assert_eq!(index.get_spc(1, 5), 1);
        assert_matches_rebuild(&g, &index);
    }

    #[test]
    fn test_decrease_on_cycle() {
        // unit 4-cycle scaled by 2: d(1,3)=4 with two paths; decreasing edge
        // (1,2) to 1 makes the path through 2 uniquely shortest
        let mut g = Graph::with_edges(
            4,
            &[Edge::new(1, 2, 2), Edge::new(2, 3, 2), Edge::new(3, 4, 2), Edge::new(4, 1, 2)],
        );
        let (mut ch, mut index) = build(&mut g);
        assert_eq!(index.get_distance(1, 3), 4);
        assert_eq!(index.get_spc(1, 3), 2);

        let updates = [((2, 1), (1, 2))];
        apply_updates(&mut g, &updates);
        g.dcl_dec(&mut ch, &mut index, &updates);
        assert_eq!(index.get_distance(1, 3), 3);
        assert_eq!(index.get_spc(1, 3), 1);
        assert_matches_rebuild(&g, &index);
    }

    #[test]
    fn test_increase_on_cycle() {
        let mut g = Graph::with_edges(
            4,
            &[Edge::new(1, 2, 2), Edge::new(2, 3, 2), Edge::new(3, 4, 2), Edge::new(4, 1, 2)],
        );
        let (mut ch, mut index) = build(&mut g);
        let updates = [((2, 3), (1, 2))];
        apply_updates(&mut g, &updates);
        g.dcl_inc(&mut ch, &mut index, &updates);
        assert_eq!(index.get_distance(1, 3), 4);
        assert_eq!(index.get_spc(1, 3), 1);
        assert_matches_rebuild(&g, &index);
    }

    fn uncontracted_labels(g: &Graph, index: &ContractionIndex) -> Vec<(Vec<Weight>, Vec<PathCount>)> {
        g.nodes()
            .iter()
            .filter(|&&v| !index.is_contracted(v))
            .map(|&v| {
                let label = index.flat(index.get_contraction_label(v).cut_index);
                (label.distances().to_vec(), label.paths().to_vec())
            })
            .collect()
    }

    #[test]
    fn test_variant_equivalence_decrease() {
        let updates = [((3, 1), (4, 5)), ((3, 1), (5, 6))];
        let mut results = Vec::new();
        for variant in 0..3 {
            let mut g = grid3(3);
            let (mut ch, mut index) = build(&mut g);
            apply_updates(&mut g, &updates);
            match variant {
                0 => g.dcl_dec(&mut ch, &mut index, &updates),
                1 => g.dcl_dec_opt(&mut ch, &mut index, &updates),
                _ => g.dcl_dec_par(&mut ch, &mut index, &updates),
            }
            assert_matches_rebuild(&g, &index);
            results.push(uncontracted_labels(&g, &index));
        }
        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], results[2]);
    }

    #[test]
    fn test_variant_equivalence_increase() {
        let updates = [((3, 4), (4, 5))];
        let mut results = Vec::new();
        for variant in 0..3 {
            let mut g = grid3(3);
            let (mut ch, mut index) = build(&mut g);
            apply_updates(&mut g, &updates);
            match variant {
                0 => g.dcl_inc(&mut ch, &mut index, &updates),
                1 => g.dcl_inc_opt(&mut ch, &mut index, &updates),
                _ => g.dcl_inc_par(&mut ch, &mut index, &updates),
            }
            assert_matches_rebuild(&g, &index);
            results.push(uncontracted_labels(&g, &index));
        }
        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], results[2]);
    }

    #[test]
    fn test_grid_decrease_batch_matches_ground_truth() {
        let mut g = grid3(2);
        let (mut ch, mut index) = build(&mut g);
        assert_matches_rebuild(&g, &index);
        let updates = [((2, 1), (1, 2)), ((2, 1), (8, 9))];
        apply_updates(&mut g, &updates);
        g.dcl_dec(&mut ch, &mut index, &updates);
        assert_matches_rebuild(&g, &index);
    }

    #[test]
    fn test_pendant_update_via_contract_seq() {
        //           6
        //           |
        //   1 - 2 - 3 - 4 - 5    with 6 hanging off the center
        let mut g = Graph::with_edges(
            6,
            &[
                Edge::new(1, 2, 2),
                Edge::new(2, 3, 2),
                Edge::new(3, 4, 2),
                Edge::new(4, 5, 2),
                Edge::new(3, 6, 2),
            ],
        );
        let (_ch, mut index) = build(&mut g);
        assert_eq!(index.get_distance(1, 6), 6);
        // increase pendant edge (4,5) from 2 to 3
        g.update_edge(4, 5, 3);
        g.update_edge(5, 4, 3);
        let (x, y) = (index.get_contraction_label(4), index.get_contraction_label(5));
        let mut contracted = Vec::new();
        assert!(index.is_contracted(5));
        if x.distance_offset > y.distance_offset {
            contracted.push(((x.distance_offset, y.distance_offset + 3), 4));
        } else {
            contracted.push(((y.distance_offset, x.distance_offset + 3), 5));
        }
        g.contract_seq(&mut index, &mut contracted);
        assert_eq!(index.get_distance(3, 5), 5);
        assert_eq!(index.get_distance(1, 5), 9);
        assert_matches_rebuild(&g, &index);
    }
}
