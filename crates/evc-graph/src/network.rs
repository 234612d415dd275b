//! Road network representation and builder.
//!
//! # Data layout
//!
//! Physical edges are stored once, indexed by `EdgeId`.  Every physical
//! edge can be traversed along or against its digitized direction, and the
//! graph keeps two **CSR** stars over those traversals:
//!
//! ```text
//! out_keys[ out_start[v] .. out_start[v+1] ]   traversals leaving v
//! in_keys [ in_start[v]  .. in_start[v+1]  ]   traversals entering v
//! ```
//!
//! Forward search scans the out-star, the backward CARMA search scans the
//! in-star.  Traversals forbidden by a one-way restriction never appear in
//! either star.
//!
//! Edges whose endpoints are not valid junctions are kept in the edge
//! arrays (so `EdgeId`s stay dense) but are left out of both stars; the
//! edge cache turns them into sentinel edges.

use evc_core::{Direction, EdgeId, EdgeKey, VertexId};

use crate::Set;

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Road graph with both traversal stars, one-way flags, and turn
/// restrictions.
///
/// All per-edge arrays are `pub` for direct indexed access on hot paths.
/// Do not construct directly; use [`RoadNetworkBuilder`].
pub struct RoadNetwork {
    junction_count: usize,

    // ── Physical edge data (indexed by EdgeId) ───────────────────────────
    pub edge_from: Vec<VertexId>,
    pub edge_to:   Vec<VertexId>,

    /// Raw cost attribute; may be NaN or negative in malformed input.
    pub edge_cost: Vec<f64>,

    /// Raw capacity attribute (vehicles or lanes).
    pub edge_capacity: Vec<f64>,

    /// Identifier of the feature this edge came from, for output records.
    pub edge_source_id: Vec<i64>,

    /// Position of `edge_from` / `edge_to` along the source feature, 0..1.
    pub edge_from_pos: Vec<f64>,
    pub edge_to_pos:   Vec<f64>,

    /// Allowed traversal directions (`Direction::bit` mask).
    pub edge_dirs: Vec<u8>,

    // ── CSR traversal stars ───────────────────────────────────────────────
    out_start: Vec<u32>,
    out_keys:  Vec<EdgeKey>,
    in_start:  Vec<u32>,
    in_keys:   Vec<EdgeKey>,

    /// Forbidden `(arriving, leaving)` traversal pairs.
    turn_restrictions: Set<(EdgeKey, EdgeKey)>,
}

impl RoadNetwork {
    /// Construct an empty network with no junctions or edges.
    pub fn empty() -> Self {
        RoadNetworkBuilder::new().build()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn junction_count(&self) -> usize {
        self.junction_count
    }

    pub fn edge_count(&self) -> usize {
        self.edge_from.len()
    }

    pub fn is_empty(&self) -> bool {
        self.junction_count == 0
    }

    #[inline]
    pub fn has_junction(&self, v: VertexId) -> bool {
        v.index() < self.junction_count
    }

    #[inline]
    pub fn has_edge(&self, e: EdgeId) -> bool {
        e.index() < self.edge_from.len()
    }

    /// Both endpoints of the physical edge are known junctions.
    #[inline]
    pub fn has_endpoints(&self, e: EdgeId) -> bool {
        self.has_edge(e)
            && self.has_junction(self.edge_from[e.index()])
            && self.has_junction(self.edge_to[e.index()])
    }

    // ── Traversals ────────────────────────────────────────────────────────

    /// Junction a traversal starts from.
    #[inline]
    pub fn tail(&self, key: EdgeKey) -> VertexId {
        match key.dir {
            Direction::Along   => self.edge_from[key.id.index()],
            Direction::Against => self.edge_to[key.id.index()],
        }
    }

    /// Junction a traversal ends at.
    #[inline]
    pub fn head(&self, key: EdgeKey) -> VertexId {
        match key.dir {
            Direction::Along   => self.edge_to[key.id.index()],
            Direction::Against => self.edge_from[key.id.index()],
        }
    }

    /// Source positions `(from, to)` in traversal order.
    #[inline]
    pub fn positions(&self, key: EdgeKey) -> (f64, f64) {
        let (a, b) = (self.edge_from_pos[key.id.index()], self.edge_to_pos[key.id.index()]);
        match key.dir {
            Direction::Along   => (a, b),
            Direction::Against => (b, a),
        }
    }

    /// The traversal is permitted by the one-way flags.
    #[inline]
    pub fn is_traversable(&self, key: EdgeKey) -> bool {
        self.has_edge(key.id) && self.edge_dirs[key.id.index()] & key.dir.bit() != 0
    }

    /// Traversals leaving `v`.  Contiguous slice, no allocation.
    #[inline]
    pub fn out_traversals(&self, v: VertexId) -> &[EdgeKey] {
        let start = self.out_start[v.index()] as usize;
        let end   = self.out_start[v.index() + 1] as usize;
        &self.out_keys[start..end]
    }

    /// Traversals entering `v`.
    #[inline]
    pub fn in_traversals(&self, v: VertexId) -> &[EdgeKey] {
        let start = self.in_start[v.index()] as usize;
        let end   = self.in_start[v.index() + 1] as usize;
        &self.in_keys[start..end]
    }

    /// Whether a traveller arriving on `from` may continue on `to`.
    ///
    /// U-turns onto the same physical edge are allowed unless restricted.
    #[inline]
    pub fn turn_allowed(&self, from: EdgeKey, to: EdgeKey) -> bool {
        self.turn_restrictions.is_empty() || !self.turn_restrictions.contains(&(from, to))
    }

    pub fn turn_restriction_count(&self) -> usize {
        self.turn_restrictions.len()
    }
}

// ── Barriers ──────────────────────────────────────────────────────────────────

/// Edges and junctions closed for this solve.
///
/// A blocked edge is closed in both directions; a blocked junction closes
/// every traversal entering or leaving it.
#[derive(Clone, Debug, Default)]
pub struct Barriers {
    edges:     Set<EdgeId>,
    junctions: Set<VertexId>,
}

impl Barriers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_edge(&mut self, e: EdgeId) {
        self.edges.insert(e);
    }

    pub fn block_junction(&mut self, v: VertexId) {
        self.junctions.insert(v);
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.junctions.is_empty()
    }

    #[inline]
    pub fn is_edge_blocked(&self, e: EdgeId) -> bool {
        self.edges.contains(&e)
    }

    #[inline]
    pub fn is_junction_blocked(&self, v: VertexId) -> bool {
        self.junctions.contains(&v)
    }

    /// A traversal is closed if its edge or either endpoint is blocked.
    pub fn blocks(&self, network: &RoadNetwork, key: EdgeKey) -> bool {
        if self.is_empty() {
            return false;
        }
        self.is_edge_blocked(key.id)
            || self.is_junction_blocked(network.tail(key))
            || self.is_junction_blocked(network.head(key))
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use evc_graph::RoadNetworkBuilder;
///
/// let mut b = RoadNetworkBuilder::new();
/// let a = b.add_junction();
/// let c = b.add_junction();
/// b.add_edge(a, c, 10.0, 5.0); // cost 10, capacity 5
/// let net = b.build();
/// assert_eq!(net.junction_count(), 2);
/// assert_eq!(net.out_traversals(a).len(), 1);
/// assert_eq!(net.out_traversals(c).len(), 1); // two-way by default
/// ```
pub struct RoadNetworkBuilder {
    junctions:         usize,
    raw_edges:         Vec<RawEdge>,
    turn_restrictions: Set<(EdgeKey, EdgeKey)>,
}

struct RawEdge {
    from:      VertexId,
    to:        VertexId,
    cost:      f64,
    capacity:  f64,
    source_id: i64,
    from_pos:  f64,
    to_pos:    f64,
    dirs:      u8,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self { junctions: 0, raw_edges: Vec::new(), turn_restrictions: Set::default() }
    }

    /// Pre-allocate for the expected number of edges.
    pub fn with_capacity(edges: usize) -> Self {
        Self { raw_edges: Vec::with_capacity(edges), ..Self::new() }
    }

    /// Add a junction and return its `VertexId` (sequential from 0).
    pub fn add_junction(&mut self) -> VertexId {
        let id = VertexId(self.junctions as u32);
        self.junctions += 1;
        id
    }

    /// Ensure junctions `0..n` exist.
    pub fn ensure_junctions(&mut self, n: usize) {
        self.junctions = self.junctions.max(n);
    }

    /// Add a two-way physical edge and return its `EdgeId` (sequential from 0).
    ///
    /// The source id defaults to the `EdgeId` and positions to `0 → 1`.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId, cost: f64, capacity: f64) -> EdgeId {
        let id = EdgeId(self.raw_edges.len() as u32);
        self.raw_edges.push(RawEdge {
            from,
            to,
            cost,
            capacity,
            source_id: id.0 as i64,
            from_pos: 0.0,
            to_pos: 1.0,
            dirs: Direction::Along.bit() | Direction::Against.bit(),
        });
        id
    }

    /// Attach source-feature information to an edge.
    pub fn set_source(&mut self, edge: EdgeId, source_id: i64, from_pos: f64, to_pos: f64) {
        if let Some(e) = self.raw_edges.get_mut(edge.index()) {
            e.source_id = source_id;
            e.from_pos = from_pos;
            e.to_pos = to_pos;
        }
    }

    /// Forbid traversing `edge` in direction `dir`.
    pub fn restrict_direction(&mut self, edge: EdgeId, dir: Direction) {
        if let Some(e) = self.raw_edges.get_mut(edge.index()) {
            e.dirs &= !dir.bit();
        }
    }

    /// Forbid continuing from traversal `from` onto traversal `to`.
    pub fn add_turn_restriction(&mut self, from: EdgeKey, to: EdgeKey) {
        self.turn_restrictions.insert((from, to));
    }

    pub fn junction_count(&self) -> usize { self.junctions }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    /// Consume the builder and produce a [`RoadNetwork`].
    ///
    /// Time complexity: O(E + N) for the two counting-sort passes.
    pub fn build(self) -> RoadNetwork {
        let n = self.junctions;
        let raw = self.raw_edges;

        // Collect every permitted traversal whose endpoints exist.
        let mut traversals: Vec<(VertexId, VertexId, EdgeKey)> = Vec::with_capacity(raw.len() * 2);
        for (i, e) in raw.iter().enumerate() {
            if e.from.index() >= n || e.to.index() >= n {
                continue;
            }
            let id = EdgeId(i as u32);
            if e.dirs & Direction::Along.bit() != 0 {
                traversals.push((e.from, e.to, EdgeKey::along(id)));
            }
            if e.dirs & Direction::Against.bit() != 0 {
                traversals.push((e.to, e.from, EdgeKey::against(id)));
            }
        }

        let (out_start, out_keys) = csr(n, &traversals, |t| t.0);
        let (in_start, in_keys) = csr(n, &traversals, |t| t.1);

        RoadNetwork {
            junction_count: n,
            edge_from:      raw.iter().map(|e| e.from).collect(),
            edge_to:        raw.iter().map(|e| e.to).collect(),
            edge_cost:      raw.iter().map(|e| e.cost).collect(),
            edge_capacity:  raw.iter().map(|e| e.capacity).collect(),
            edge_source_id: raw.iter().map(|e| e.source_id).collect(),
            edge_from_pos:  raw.iter().map(|e| e.from_pos).collect(),
            edge_to_pos:    raw.iter().map(|e| e.to_pos).collect(),
            edge_dirs:      raw.iter().map(|e| e.dirs).collect(),
            out_start,
            out_keys,
            in_start,
            in_keys,
            turn_restrictions: self.turn_restrictions,
        }
    }
}

impl Default for RoadNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable counting sort of traversals into a CSR row-pointer + key array.
fn csr<F>(n: usize, traversals: &[(VertexId, VertexId, EdgeKey)], row: F) -> (Vec<u32>, Vec<EdgeKey>)
where
    F: Fn(&(VertexId, VertexId, EdgeKey)) -> VertexId,
{
    let mut start = vec![0u32; n + 1];
    for t in traversals {
        start[row(t).index() + 1] += 1;
    }
    for i in 1..=n {
        start[i] += start[i - 1];
    }
    debug_assert_eq!(start[n] as usize, traversals.len());

    let mut cursor = start.clone();
    let mut keys = vec![EdgeKey::along(EdgeId::INVALID); traversals.len()];
    for t in traversals {
        let slot = &mut cursor[row(t).index()];
        keys[*slot as usize] = t.2;
        *slot += 1;
    }
    (start, keys)
}
