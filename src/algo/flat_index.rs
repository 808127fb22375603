//! The compact query-time index: packed partition bitvectors, flat label
//! buffers and the contraction index answering distance and shortest path
//! count queries.

use super::labeling::CutIndex;
use crate::graph::*;
use crate::io::{DataBytes, DataBytesMut, ReadLe, WriteLe};
use crate::util::aligned4;
use rand::Rng;
use std::cell::UnsafeCell;
use std::io::{Read, Result, Write};

/// Packed partition bitvectors: the 6 low bits store the cut level, the high
/// 58 bits the binary path in the decomposition tree.
pub mod pbv {
    /// Pack a partition path and its length into one word.
    pub fn from(bits: u64, length: u16) -> u64 {
        if length == 0 {
            return 0;
        }
        (bits << (64 - length) >> (58 - length)) | length as u64
    }

    pub fn partition(bv: u64) -> u64 {
        bv >> 6
    }

    pub fn cut_level(bv: u64) -> u16 {
        (bv & 63) as u16
    }

    /// Lowest level at which the two partition paths agree as ancestors:
    /// the minimum cut level, further capped by the lowest differing bit.
    pub fn lca_level(bv1: u64, bv2: u64) -> u16 {
        let mut lca_level = cut_level(bv1).min(cut_level(bv2));
        let (p1, p2) = (partition(bv1), partition(bv2));
        if p1 != p2 {
            let diff_level = (p1 ^ p2).trailing_zeros() as u16;
            if diff_level < lca_level {
                lca_level = diff_level;
            }
        }
        lca_level
    }

    /// The packed bitvector of the lowest common ancestor cut.
    pub fn lca(bv1: u64, bv2: u64) -> u64 {
        let cut_level = lca_level(bv1, bv2);
        // shifting by 64 does not work
        if cut_level == 0 {
            return 0;
        }
        (bv1 >> 6) << (64 - cut_level) >> (58 - cut_level) | cut_level as u64
    }

    pub fn is_ancestor(bv_ancestor: u64, bv_descendant: u64) -> bool {
        let (cla, cld) = (cut_level(bv_ancestor), cut_level(bv_descendant));
        // shifting by 64 does not work, so check for cla == 0
        cla == 0 || (cla <= cld && (bv_ancestor ^ bv_descendant) >> 6 << (64 - cla) == 0)
    }
}

/// Interned handle to a flat label buffer in the pool owned by the enclosing
/// [`ContractionIndex`]. Copies of a handle denote the same buffer, which is
/// how contracted nodes share their representative's label; equality is
/// handle equality.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FlatCutIndex(u32);

const EMPTY_LABEL: u32 = u32::MAX;

impl Default for FlatCutIndex {
    fn default() -> Self {
        FlatCutIndex(EMPTY_LABEL)
    }
}

impl FlatCutIndex {
    pub fn empty(&self) -> bool {
        self.0 == EMPTY_LABEL
    }
}

// byte offset of the distances region for the given cut level
fn distances_offset(cut_level: usize) -> usize {
    8 + aligned4((cut_level + 1) * 2)
}

/// Resolved read access to one label buffer, laid out as
/// `[u64 pbv][u16 dist_index[L+1] padded to 4][u32 distances[M]][u16 paths[M]]`.
/// The backing words are 8-byte aligned, so all three regions can be viewed
/// as slices of their element type.
#[derive(Debug, Copy, Clone)]
pub struct FlatLabel<'a> {
    words: &'a [u64],
}

impl<'a> FlatLabel<'a> {
    pub fn pbv(&self) -> u64 {
        self.words[0]
    }

    pub fn partition(&self) -> u64 {
        pbv::partition(self.pbv())
    }

    pub fn cut_level(&self) -> u16 {
        pbv::cut_level(self.pbv())
    }

    fn bytes(&self) -> &'a [u8] {
        let words: &'a [u64] = self.words;
        words.data_bytes()
    }

    pub fn dist_index(&self) -> &'a [u16] {
        let len = self.cut_level() as usize + 1;
        let bytes = &self.bytes()[8..8 + len * 2];
        unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const u16, len) }
    }

    pub fn distances(&self) -> &'a [Weight] {
        let len = self.label_count();
        let offset = distances_offset(self.cut_level() as usize);
        let bytes = &self.bytes()[offset..offset + len * 4];
        unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const Weight, len) }
    }

    pub fn paths(&self) -> &'a [PathCount] {
        let len = self.label_count();
        let offset = distances_offset(self.cut_level() as usize) + len * 4;
        let bytes = &self.bytes()[offset..offset + len * 2];
        unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const PathCount, len) }
    }

    /// Number of label entries.
    pub fn label_count(&self) -> usize {
        self.dist_index()[self.cut_level() as usize] as usize
    }

    /// Number of label entries contributed by the given cut level.
    pub fn cut_size(&self, cl: usize) -> usize {
        let di = self.dist_index();
        if cl == 0 {
            di[0] as usize
        } else {
            (di[cl] - di[cl - 1]) as usize
        }
    }

    pub fn bottom_cut_size(&self) -> usize {
        self.cut_size(self.cut_level() as usize)
    }

    /// Exact byte size of the buffer contents (excluding tail padding).
    pub fn size(&self) -> usize {
        distances_offset(self.cut_level() as usize) + self.label_count() * 6
    }
}

/// Build a flat buffer from the build-time cut index of one node.
fn flatten(ci: &CutIndex) -> Box<[u64]> {
    debug_assert!(ci.is_consistent(false));
    debug_assert_eq!(ci.distances.len(), ci.paths.len());
    let size = 8 + aligned4(ci.dist_index.len() * 2) + ci.distances.len() * 6;
    let mut buffer = vec![0u64; size.div_ceil(8)].into_boxed_slice();
    buffer[0] = pbv::from(ci.partition, ci.cut_level);
    let bytes = buffer.data_bytes_mut();
    let mut offset = 8;
    bytes[offset..offset + ci.dist_index.len() * 2].copy_from_slice(ci.dist_index.data_bytes());
    offset = 8 + aligned4(ci.dist_index.len() * 2);
    bytes[offset..offset + ci.distances.len() * 4].copy_from_slice(ci.distances.data_bytes());
    offset += ci.distances.len() * 4;
    bytes[offset..offset + ci.paths.len() * 2].copy_from_slice(ci.paths.data_bytes());
    buffer
}

/// Owner table of the interned label buffers. Maintenance mutates label
/// entries in place, and its parallel drains have different workers writing
/// different slot columns of the same buffer, so the pool hands out
/// element-granular pointers instead of references.
///
/// Safety contract for all users: between synchronization points, each slot
/// column is written by at most one thread, and no thread reads a slot
/// another thread writes. The buffer headers (pbv, dist_index) are never
/// written after construction.
#[derive(Debug)]
struct LabelPool {
    buffers: Vec<UnsafeCell<Box<[u64]>>>,
}

unsafe impl Sync for LabelPool {}

impl LabelPool {
    fn intern(&mut self, buffer: Box<[u64]>) -> FlatCutIndex {
        self.buffers.push(UnsafeCell::new(buffer));
        FlatCutIndex(self.buffers.len() as u32 - 1)
    }

    fn words(&self, handle: FlatCutIndex) -> &[u64] {
        debug_assert!(!handle.empty());
        unsafe { &*self.buffers[handle.0 as usize].get() }
    }

    // element-granular base pointer for the maintenance slot accessors
    fn base(&self, handle: FlatCutIndex) -> *mut u8 {
        debug_assert!(!handle.empty());
        unsafe { (*self.buffers[handle.0 as usize].get()).as_ptr() as *mut u8 }
    }
}

/// Per-node query-time label.
#[derive(Debug, Copy, Clone, Default)]
pub struct ContractionLabel {
    pub cut_index: FlatCutIndex,
    /// nonzero iff the node is contracted; distance to the representative
    pub distance_offset: Weight,
    /// pendant parent of a contracted node, `NO_NODE` otherwise
    pub parent: NodeId,
}

/// The query surface: flat labels plus the pendant contraction tree.
#[derive(Debug)]
pub struct ContractionIndex {
    labels: Vec<ContractionLabel>,
    pool: LabelPool,
}

impl ContractionIndex {
    /// Build from the filled cut index and the degree-1 contraction data;
    /// contracted nodes share the buffer of their pendant tree root.
    pub fn new(ci: Vec<CutIndex>, closest: &[Neighbor]) -> Self {
        assert_eq!(ci.len(), closest.len());
        let mut labels = vec![ContractionLabel::default(); ci.len()];
        let mut pool = LabelPool { buffers: Vec::new() };
        // core nodes own their label data
        for node in 1..closest.len() {
            if closest[node].node == node as NodeId {
                debug_assert_eq!(closest[node].distance, 0);
                labels[node].cut_index = pool.intern(flatten(&ci[node]));
            }
        }
        // peripheral nodes borrow the label of their pendant tree root
        for node in 1..closest.len() {
            let n = closest[node];
            // isolated nodes were removed (n.node == NO_NODE)
            if n.node != node as NodeId && n.node != NO_NODE {
                debug_assert!(n.distance > 0);
                let mut root = n.node;
                let mut root_dist = n.distance;
                while closest[root as usize].node != root {
                    root_dist += closest[root as usize].distance;
                    root = closest[root as usize].node;
                }
                debug_assert!(!labels[root as usize].cut_index.empty());
                labels[node].cut_index = labels[root as usize].cut_index;
                labels[node].distance_offset = root_dist;
                labels[node].parent = n.node;
            }
        }
        ContractionIndex { labels, pool }
    }

    pub fn node_count(&self) -> usize {
        self.labels.len() - 1
    }

    /// Resolve a handle to its label buffer.
    pub fn flat(&self, handle: FlatCutIndex) -> FlatLabel {
        FlatLabel {
            words: self.pool.words(handle),
        }
    }

    pub fn get_contraction_label(&self, v: NodeId) -> ContractionLabel {
        self.labels[v as usize]
    }

    pub fn is_contracted(&self, node: NodeId) -> bool {
        self.labels[node as usize].parent != NO_NODE
    }

    pub fn update_distance_offset(&mut self, node: NodeId, d: Weight) {
        self.labels[node as usize].distance_offset = d;
    }

    // ---- per-slot label access for the maintenance drains ----
    // Reads and writes go through the pool's element pointers so concurrent
    // workers touching disjoint slot columns of one buffer never hold
    // overlapping references.

    pub fn label_distance(&self, handle: FlatCutIndex, i: usize) -> Weight {
        let view = self.flat(handle);
        debug_assert!(i < view.label_count());
        let offset = distances_offset(view.cut_level() as usize);
        unsafe { (self.pool.base(handle).add(offset) as *const Weight).add(i).read() }
    }

    pub fn label_path(&self, handle: FlatCutIndex, i: usize) -> PathCount {
        let view = self.flat(handle);
        debug_assert!(i < view.label_count());
        let offset = distances_offset(view.cut_level() as usize) + view.label_count() * 4;
        unsafe { (self.pool.base(handle).add(offset) as *const PathCount).add(i).read() }
    }

    pub fn set_label_distance(&self, handle: FlatCutIndex, i: usize, value: Weight) {
        let view = self.flat(handle);
        debug_assert!(i < view.label_count());
        let offset = distances_offset(view.cut_level() as usize);
        unsafe { (self.pool.base(handle).add(offset) as *mut Weight).add(i).write(value) }
    }

    pub fn set_label_path(&self, handle: FlatCutIndex, i: usize, value: PathCount) {
        let view = self.flat(handle);
        debug_assert!(i < view.label_count());
        let offset = distances_offset(view.cut_level() as usize) + view.label_count() * 4;
        unsafe { (self.pool.base(handle).add(offset) as *mut PathCount).add(i).write(value) }
    }

    /// Shortest path distance between two nodes.
    pub fn get_distance(&self, v: NodeId, w: NodeId) -> Weight {
        let cv = self.labels[v as usize];
        let cw = self.labels[w as usize];
        debug_assert!(!cv.cut_index.empty() && !cw.cut_index.empty());
        if cv.cut_index == cw.cut_index {
            // both hang off the same representative: distance runs along the
            // pendant tree
            if v == w {
                return 0;
            }
            if cv.distance_offset == 0 {
                return cw.distance_offset;
            }
            if cw.distance_offset == 0 {
                return cv.distance_offset;
            }
            if cv.parent == w {
                return cv.distance_offset - cw.distance_offset;
            }
            if cw.parent == v {
                return cw.distance_offset - cv.distance_offset;
            }
            // find the lowest common ancestor; offsets strictly decrease
            // towards the root
            let (mut v_anc, mut w_anc) = (v, w);
            let (mut cv_anc, mut cw_anc) = (cv, cw);
            while v_anc != w_anc {
                if cv_anc.distance_offset < cw_anc.distance_offset {
                    w_anc = cw_anc.parent;
                    cw_anc = self.labels[w_anc as usize];
                } else if cv_anc.distance_offset > cw_anc.distance_offset {
                    v_anc = cv_anc.parent;
                    cv_anc = self.labels[v_anc as usize];
                } else {
                    v_anc = cv_anc.parent;
                    w_anc = cw_anc.parent;
                    cv_anc = self.labels[v_anc as usize];
                    cw_anc = self.labels[w_anc as usize];
                }
            }
            return cv.distance_offset + cw.distance_offset - 2 * cv_anc.distance_offset;
        }
        cv.distance_offset
            .saturating_add(cw.distance_offset)
            .saturating_add(self.flat_distance(cv.cut_index, cw.cut_index))
    }

    /// Number of shortest paths between two nodes. Along a pendant chain the
    /// path is unique.
    pub fn get_spc(&self, v: NodeId, w: NodeId) -> PathCount {
        let cv = self.labels[v as usize];
        let cw = self.labels[w as usize];
        debug_assert!(!cv.cut_index.empty() && !cw.cut_index.empty());
        if cv.cut_index == cw.cut_index {
            return 1;
        }
        self.flat_paths(cv.cut_index, cw.cut_index)
    }

    /// Theoretical number of label comparisons for the query.
    pub fn get_hoplinks(&self, v: NodeId, w: NodeId) -> usize {
        let hv = self.labels[v as usize].cut_index;
        let hw = self.labels[w as usize].cut_index;
        if hv == hw {
            return 0;
        }
        let (cv, cw) = (self.flat(hv), self.flat(hw));
        let cut_level = pbv::lca_level(cv.pbv(), cw.pbv()) as usize;
        cv.cut_size(cut_level).min(cw.cut_size(cut_level))
    }

    pub fn avg_hoplinks(&self, queries: &[(NodeId, NodeId)]) -> f64 {
        let hop_count: usize = queries.iter().map(|&(a, b)| self.get_hoplinks(a, b)).sum();
        hop_count as f64 / queries.len() as f64
    }

    /// 2-hop minimum over the common label prefix up to the LCA level.
    pub fn flat_distance(&self, a: FlatCutIndex, b: FlatCutIndex) -> Weight {
        let (a, b) = (self.flat(a), self.flat(b));
        let cut_level = pbv::lca_level(a.pbv(), b.pbv()) as usize;
        let common = (a.dist_index()[cut_level] as usize).min(b.dist_index()[cut_level] as usize);
        let (da, db) = (a.distances(), b.distances());
        let mut min_dist = INFINITY;
        for i in 0..common {
            let dist = da[i].saturating_add(db[i]);
            if dist < min_dist {
                min_dist = dist;
            }
        }
        min_dist
    }

    /// Count of shortest paths over the common label prefix: products summed
    /// across all slots achieving the minimum distance.
    pub fn flat_paths(&self, a: FlatCutIndex, b: FlatCutIndex) -> PathCount {
        let (a, b) = (self.flat(a), self.flat(b));
        let cut_level = pbv::lca_level(a.pbv(), b.pbv()) as usize;
        let common = (a.dist_index()[cut_level] as usize).min(b.dist_index()[cut_level] as usize);
        let (da, db) = (a.distances(), b.distances());
        let (pa, pb) = (a.paths(), b.paths());
        let mut min_dist = INFINITY;
        let mut spc: PathCount = 0;
        for i in 0..common {
            let dist = da[i].saturating_add(db[i]);
            let count = pa[i].wrapping_mul(pb[i]);
            if dist < min_dist {
                min_dist = dist;
                spc = count;
            } else if dist == min_dist && dist < INFINITY {
                spc = spc.wrapping_add(count);
            }
        }
        spc
    }

    // ---- statistics ----

    pub fn uncontracted_count(&self) -> usize {
        (1..self.labels.len()).filter(|&node| !self.is_contracted(node as NodeId)).count()
    }

    /// Total index size in bytes; shared buffers are counted once.
    pub fn size(&self) -> usize {
        let mut total = 0;
        for node in 1..self.labels.len() {
            let label = &self.labels[node];
            if !label.cut_index.empty() {
                total += std::mem::size_of::<ContractionLabel>();
                if label.distance_offset == 0 {
                    total += self.flat(label.cut_index).size();
                }
            }
        }
        total
    }

    pub fn label_count(&self) -> usize {
        (1..self.labels.len())
            .filter(|&node| !self.labels[node].cut_index.empty() && self.labels[node].distance_offset == 0)
            .map(|node| self.flat(self.labels[node].cut_index).label_count())
            .sum()
    }

    pub fn max_label_count(&self) -> usize {
        (1..self.labels.len())
            .filter(|&node| !self.labels[node].cut_index.empty())
            .map(|node| self.flat(self.labels[node].cut_index).label_count())
            .max()
            .unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        (1..self.labels.len())
            .filter(|&node| !self.labels[node].cut_index.empty())
            .map(|node| self.flat(self.labels[node].cut_index).cut_level() as usize)
            .max()
            .unwrap_or(0)
    }

    pub fn max_cut_size(&self) -> usize {
        (1..self.labels.len())
            .filter(|&node| !self.labels[node].cut_index.empty())
            .map(|node| 1 + self.flat(self.labels[node].cut_index).bottom_cut_size())
            .max()
            .unwrap_or(0)
    }

    pub fn avg_cut_size(&self) -> f64 {
        let mut cut_sum = 0.0;
        let mut label_count = 0.0;
        for node in 1..self.labels.len() {
            let handle = self.labels[node].cut_index;
            if !handle.empty() {
                let ci = self.flat(handle);
                cut_sum += ci.cut_level() as f64 + 1.0;
                label_count += ci.label_count() as f64;
            }
        }
        label_count / cut_sum.max(1.0)
    }

    /// Count the cuts of the decomposition by counting nodes which come first
    /// within their own cut (self-distance slot at the row start).
    pub fn non_empty_cuts(&self) -> usize {
        (1..self.labels.len())
            .filter(|&node| {
                if self.is_contracted(node as NodeId) {
                    return false;
                }
                let handle = self.labels[node].cut_index;
                if handle.empty() {
                    return false;
                }
                let ci = self.flat(handle);
                let offset = if ci.cut_level() == 0 {
                    0
                } else {
                    ci.dist_index()[ci.cut_level() as usize - 1] as usize
                };
                ci.distances()[offset] == 0
            })
            .count()
    }

    /// Compare one query against ground truth search on the graph.
    pub fn check_query(&self, query: (NodeId, NodeId), g: &Graph) -> bool {
        let d_index = self.get_distance(query.0, query.1);
        let p_index = self.get_spc(query.0, query.1);
        let d_dijkstra = g.get_distance(query.0, query.1, true);
        let p_dijkstra = g.get_path_count(query.0, query.1);
        if d_index != d_dijkstra {
            eprintln!("BUG: d_index={}, d_dijkstra={} for {:?}", d_index, d_dijkstra, query);
        }
        if p_index != p_dijkstra {
            eprintln!("BUG: p_index={}, p_dijkstra={} for {:?}", p_index, p_dijkstra, query);
        }
        d_index == d_dijkstra && p_index == p_dijkstra
    }

    /// Batch of random node pairs filtered into buckets by query distance,
    /// geometrically spaced between `min_dist` and the graph diameter.
    pub fn random_pairs<R: Rng>(
        &self,
        g: &Graph,
        min_dist: Weight,
        bucket_count: usize,
        bucket_size: usize,
        rng: &mut R,
    ) -> Vec<Vec<(NodeId, NodeId)>> {
        assert!(bucket_count > 0);
        let mut ctx = SearchContext::new(g.store().len());
        let max_dist = g.view().diameter(true, &mut ctx);
        let x = (max_dist as f64 / min_dist as f64).powf(1.0 / bucket_count as f64);
        let bucket_caps: Vec<Weight> = (1..bucket_count).map(|i| (min_dist as f64 * x.powi(i as i32)) as Weight).collect();
        let mut buckets = vec![Vec::new(); bucket_count];
        let mut todo = bucket_count;
        let mut counter = 0usize;
        while todo > 0 {
            counter += 1;
            // random walks generate short-range queries faster
            let q = if counter % 5 != 0 {
                (g.random_node(rng), g.random_node(rng))
            } else {
                g.random_pair(1 + rng.gen_range(0..100), rng)
            };
            let d = self.get_distance(q.0, q.1);
            if d >= min_dist && d < INFINITY {
                let bucket = bucket_caps.partition_point(|&cap| cap <= d);
                if buckets[bucket].len() < bucket_size {
                    buckets[bucket].push(q);
                    if buckets[bucket].len() == bucket_size {
                        todo -= 1;
                    }
                }
            }
        }
        buckets
    }

    // ---- serialization ----

    /// Write the `_cl` file: per node its distance offset, then either the
    /// raw label buffer (representatives) or the pendant parent.
    pub fn write<W: Write>(&self, os: &mut W) -> Result<()> {
        os.write_u64_le(self.node_count() as u64)?;
        for node in 1..self.labels.len() {
            let cl = &self.labels[node];
            os.write_u32_le(cl.distance_offset)?;
            if cl.distance_offset == 0 {
                if cl.cut_index.empty() {
                    os.write_u64_le(0)?;
                } else {
                    let data_size = self.flat(cl.cut_index).size();
                    os.write_u64_le(data_size as u64)?;
                    os.write_all(&self.pool.words(cl.cut_index).data_bytes()[..data_size])?;
                }
            } else {
                os.write_u32_le(cl.parent)?;
            }
        }
        Ok(())
    }

    /// Read a `_cl` file; contracted nodes re-share their root's buffer.
    pub fn read<R: Read>(is: &mut R) -> Result<Self> {
        let node_count = is.read_u64_le()? as usize;
        let mut labels = vec![ContractionLabel::default(); node_count + 1];
        let mut pool = LabelPool { buffers: Vec::new() };
        for node in 1..labels.len() {
            let distance_offset = is.read_u32_le()?;
            labels[node].distance_offset = distance_offset;
            if distance_offset == 0 {
                let data_size = is.read_u64_le()? as usize;
                if data_size > 0 {
                    let mut buffer = vec![0u64; data_size.div_ceil(8)].into_boxed_slice();
                    is.read_exact(&mut buffer.data_bytes_mut()[..data_size])?;
                    labels[node].cut_index = pool.intern(buffer);
                }
            } else {
                labels[node].parent = is.read_u32_le()?;
            }
        }
        // fix shared label references
        for node in 1..labels.len() {
            if labels[node].distance_offset != 0 {
                let mut root = labels[node].parent;
                while labels[root as usize].distance_offset != 0 {
                    root = labels[root as usize].parent;
                }
                labels[node].cut_index = labels[root as usize].cut_index;
            }
        }
        Ok(ContractionIndex { labels, pool })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pbv_round_trip() {
        for (bits, len) in [(0b0u64, 0u16), (0b1, 1), (0b10, 2), (0b1011, 4), (0x3FF_FFFF_FFFF_FFFF, 58)] {
            let bv = pbv::from(bits, len);
            assert_eq!(pbv::cut_level(bv), len);
            if len > 0 {
                assert_eq!(pbv::partition(bv), bits & ((1u64 << len) - 1), "bits={:b} len={}", bits, len);
            }
        }
    }

    #[test]
    fn test_pbv_lca_invariants() {
        // x = left,left ; y = left,right : diverge at level 1
        let x = pbv::from(0b00, 2);
        let y = pbv::from(0b10, 2);
        assert_eq!(pbv::lca_level(x, y), 1);
        let l = pbv::lca(x, y);
        assert!(pbv::is_ancestor(l, x) && pbv::is_ancestor(l, y));
        assert!(pbv::lca_level(x, y) <= pbv::cut_level(x).min(pbv::cut_level(y)));
        // the root is everyone's ancestor
        assert!(pbv::is_ancestor(0, x));
        assert!(pbv::is_ancestor(0, y));
        // a node is its own ancestor
        assert!(pbv::is_ancestor(x, x));
        // deeper on the same path
        let z = pbv::from(0b110, 3);
        assert!(pbv::is_ancestor(y, z));
        assert!(!pbv::is_ancestor(z, y));
    }

    fn sample_cut_index() -> CutIndex {
        CutIndex {
            partition: 0b01,
            cut_level: 2,
            dist_index: vec![2, 3, 5],
            distances: vec![4, 7, 0, 9, 0],
            paths: vec![1, 2, 1, 3, 1],
        }
    }

    #[test]
    fn test_flat_layout_round_trip() {
        let buffer = flatten(&sample_cut_index());
        let flat = FlatLabel { words: &buffer };
        assert_eq!(flat.cut_level(), 2);
        assert_eq!(flat.partition(), 0b01);
        assert_eq!(flat.dist_index(), &[2, 3, 5]);
        assert_eq!(flat.distances(), &[4, 7, 0, 9, 0]);
        assert_eq!(flat.paths(), &[1, 2, 1, 3, 1]);
        assert_eq!(flat.cut_size(0), 2);
        assert_eq!(flat.cut_size(1), 1);
        assert_eq!(flat.cut_size(2), 2);
        assert_eq!(flat.label_count(), 5);
    }

    #[test]
    fn test_slot_accessors_through_handle() {
        // one core node owning its label
        let ci = vec![CutIndex::default(), sample_cut_index()];
        let closest = [Neighbor::with_count(NO_NODE, 0, 0), Neighbor::with_count(1, 0, 1)];
        let index = ContractionIndex::new(ci, &closest);
        let handle = index.get_contraction_label(1).cut_index;
        assert!(!handle.empty());
        assert_eq!(handle, index.get_contraction_label(1).cut_index);
        assert_eq!(index.label_distance(handle, 1), 7);
        assert_eq!(index.label_path(handle, 1), 2);
        index.set_label_distance(handle, 1, 6);
        index.set_label_path(handle, 1, 5);
        assert_eq!(index.flat(handle).distances(), &[4, 6, 0, 9, 0]);
        assert_eq!(index.flat(handle).paths(), &[1, 5, 1, 3, 1]);
    }
}
