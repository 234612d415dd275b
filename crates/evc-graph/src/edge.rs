//! Search-time edges, reservations, dirty tracking, and the CARMA tree.
//!
//! # Ownership
//!
//! [`EdgeCache`] owns every [`Edge`] in one arena `Vec`; everything else
//! refers to edges by [`EdgeIdx`].  Tree links (`tree_previous`,
//! `tree_next`) are arena indices too, so the CARMA tree has no owning
//! cycles.
//!
//! # Reservations
//!
//! Population committed to an edge lives in a [`Reservation`] record.  With
//! two-way capacity sharing both traversals of a physical edge point at the
//! same record; otherwise each traversal has its own.  Changing a record
//! flags every edge sharing it as [`DirtyState::Maybe`].

use evc_core::{EdgeId, EdgeKey, EvacueeId, VertexId};

use crate::cost::CostModel;
use crate::edge_map::EdgeMap;
use crate::network::RoadNetwork;
use crate::Map;

/// Relative cost increase above which a clean edge becomes dirty.
pub const DIRTY_COST_INCREASE: f64 = 0.02;

/// Any decrease beyond this also makes an edge dirty.
pub const DIRTY_COST_DECREASE: f64 = f32::EPSILON as f64;

/// Subtrees deeper than this are marked with an explicit stack.
pub const MAX_MARK_RECURSION: usize = 1024;

// ── Indices ───────────────────────────────────────────────────────────────────

/// Index of an [`Edge`] inside its [`EdgeCache`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct EdgeIdx(pub u32);

impl EdgeIdx {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifies one committed path: its evacuee and its position in that
/// evacuee's path list.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct PathRef {
    pub evacuee: EvacueeId,
    pub path:    u32,
}

// ── Dirty state ───────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum DirtyState {
    Clean,
    /// Reservations changed; resolved on the next query.
    Maybe,
    Dirty,
}

// ── Reservation ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct Reservation {
    pub reserved_pop: f64,
    pub paths:        Vec<PathRef>,
    /// Edges drawing on this record.
    pub edges:        Vec<EdgeIdx>,
}

// ── Edge ──────────────────────────────────────────────────────────────────────

/// One directed traversal of a physical edge, as seen by the search.
#[derive(Clone, Debug)]
pub struct Edge {
    pub key:  EdgeKey,
    pub from: VertexId,
    pub to:   VertexId,

    pub source_id:     i64,
    pub from_position: f64,
    pub to_position:   f64,

    /// `max(0, cost attribute)`, or `-1` on a sentinel edge.
    pub original_cost:      f64,
    /// `max(1, capacity attribute)`.
    pub capacity:           f64,
    pub critical_density:   f64,
    pub saturation_density: f64,

    /// `false` for sentinel edges built from unusable attributes.
    pub valid: bool,

    pub tree_previous: Option<EdgeIdx>,
    pub tree_next:     Vec<EdgeIdx>,

    reservation: usize,
    dirty:       DirtyState,
    clean_cost:  f64,
    clean_pop:   f64,
}

impl Edge {
    pub fn dirty_state(&self) -> DirtyState {
        self.dirty
    }

    /// Cost recorded by the last `set_clean`, `-1` before that.
    pub fn clean_cost(&self) -> f64 {
        self.clean_cost
    }

    fn apply_static(&mut self, network: &RoadNetwork, model: &CostModel) {
        let i = self.key.id.index();
        let cost = network.edge_cost[i];
        let cap = network.edge_capacity[i];
        let usable = network.has_endpoints(self.key.id)
            && cost.is_finite()
            && !cap.is_nan();

        let (from_position, to_position) = network.positions(self.key);
        self.from_position = from_position;
        self.to_position = to_position;
        self.source_id = network.edge_source_id[i];

        if usable {
            self.from = network.tail(self.key);
            self.to = network.head(self.key);
            self.original_cost = cost.max(0.0);
            self.capacity = cap.max(1.0);
            self.valid = true;
        } else {
            self.from = VertexId::INVALID;
            self.to = VertexId::INVALID;
            self.original_cost = -1.0;
            self.capacity = 1.0;
            self.valid = false;
        }
        self.critical_density = model.critical_density(self.capacity);
        self.saturation_density = model.saturation_density(self.capacity);
    }
}

// ── EdgeCache ─────────────────────────────────────────────────────────────────

/// Arena of canonical edges, one per traversal, created on first use.
pub struct EdgeCache {
    model:         CostModel,
    two_way_share: bool,
    edges:         Vec<Edge>,
    index:         Map<EdgeKey, EdgeIdx>,
    reservations:  Vec<Reservation>,
    shared:        Map<EdgeId, usize>,
}

impl EdgeCache {
    pub fn new(model: CostModel, two_way_share: bool) -> Self {
        Self {
            model,
            two_way_share,
            edges:        Vec::new(),
            index:        Map::default(),
            reservations: Vec::new(),
            shared:       Map::default(),
        }
    }

    pub fn model(&self) -> &CostModel {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Drop every edge and reservation.
    pub fn clear(&mut self) {
        self.edges.clear();
        self.index.clear();
        self.reservations.clear();
        self.shared.clear();
    }

    // ── Creation & lookup ─────────────────────────────────────────────────

    /// Return the canonical edge for `key`, creating it on first use.
    ///
    /// With `replace`, an existing edge has its static attributes rebuilt
    /// from the network in place; its reservations and tree links survive.
    pub fn get_or_create(&mut self, network: &RoadNetwork, key: EdgeKey, replace: bool) -> EdgeIdx {
        if let Some(&idx) = self.index.get(&key) {
            if replace {
                let model = self.model;
                self.edges[idx.index()].apply_static(network, &model);
            }
            return idx;
        }

        let idx = EdgeIdx(self.edges.len() as u32);
        let reservation = if self.two_way_share {
            match self.shared.get(&key.id) {
                Some(&r) => r,
                None => {
                    let r = self.new_reservation();
                    self.shared.insert(key.id, r);
                    r
                }
            }
        } else {
            self.new_reservation()
        };
        self.reservations[reservation].edges.push(idx);

        let mut edge = Edge {
            key,
            from:               VertexId::INVALID,
            to:                 VertexId::INVALID,
            source_id:          0,
            from_position:      0.0,
            to_position:        1.0,
            original_cost:      -1.0,
            capacity:           1.0,
            critical_density:   0.0,
            saturation_density: 0.0,
            valid:              false,
            tree_previous:      None,
            tree_next:          Vec::new(),
            reservation,
            dirty:              DirtyState::Dirty,
            clean_cost:         -1.0,
            clean_pop:          f64::NAN,
        };
        if network.has_edge(key.id) {
            let model = self.model;
            edge.apply_static(network, &model);
        }
        if !edge.valid {
            log::warn!("edge {key} has unusable attributes; treated as impassable");
        }
        self.edges.push(edge);
        self.index.insert(key, idx);
        idx
    }

    fn new_reservation(&mut self) -> usize {
        self.reservations.push(Reservation::default());
        self.reservations.len() - 1
    }

    pub fn get(&self, key: EdgeKey) -> Option<EdgeIdx> {
        self.index.get(&key).copied()
    }

    #[inline]
    pub fn edge(&self, idx: EdgeIdx) -> &Edge {
        &self.edges[idx.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (EdgeIdx, &Edge)> + '_ {
        self.edges.iter().enumerate().map(|(i, e)| (EdgeIdx(i as u32), e))
    }

    #[inline]
    pub fn reservation(&self, idx: EdgeIdx) -> &Reservation {
        &self.reservations[self.edges[idx.index()].reservation]
    }

    // ── Costs ─────────────────────────────────────────────────────────────

    #[inline]
    pub fn reserved_pop(&self, idx: EdgeIdx) -> f64 {
        self.reservation(idx).reserved_pop
    }

    /// Cost if `proposed` more people are routed over the edge.
    pub fn cost(&self, idx: EdgeIdx, proposed: f64) -> f64 {
        let e = self.edge(idx);
        self.model.cost(e.original_cost, e.capacity, self.reserved_pop(idx), proposed)
    }

    /// Cost with the committed reservations only.
    pub fn current_cost(&self, idx: EdgeIdx) -> f64 {
        let e = self.edge(idx);
        self.model.current_cost(e.original_cost, e.capacity, self.reserved_pop(idx))
    }

    pub fn global_delta(&self, idx: EdgeIdx, proposed: f64) -> f64 {
        let e = self.edge(idx);
        self.model.global_delta(e.original_cost, e.capacity, self.reserved_pop(idx), proposed)
    }

    pub fn capacity_left(&self, idx: EdgeIdx) -> f64 {
        self.model.capacity_left(self.edge(idx).capacity, self.reserved_pop(idx))
    }

    /// Current cost over original cost; `1` on free-flowing or zero-cost edges.
    pub fn congestion(&self, idx: EdgeIdx) -> f64 {
        let original = self.edge(idx).original_cost;
        if original > 0.0 { self.current_cost(idx) / original } else { 1.0 }
    }

    // ── Reservations ──────────────────────────────────────────────────────

    /// Commit `population` of `path` to the edge's reservation record.
    pub fn add_reservation(&mut self, idx: EdgeIdx, population: f64, path: PathRef) {
        let pop = self.model.effective_population(self.edge(idx).original_cost, population);
        let r = self.edges[idx.index()].reservation;
        let res = &mut self.reservations[r];
        res.reserved_pop += pop;
        res.paths.push(path);
        self.flag_sharing(r);
    }

    /// Withdraw what `add_reservation` committed for `path`.
    pub fn remove_reservation(&mut self, idx: EdgeIdx, population: f64, path: PathRef) {
        let pop = self.model.effective_population(self.edge(idx).original_cost, population);
        let r = self.edges[idx.index()].reservation;
        let res = &mut self.reservations[r];
        res.reserved_pop = (res.reserved_pop - pop).max(0.0);
        if let Some(pos) = res.paths.iter().position(|p| *p == path) {
            res.paths.swap_remove(pos);
        }
        self.flag_sharing(r);
    }

    fn flag_sharing(&mut self, r: usize) {
        for i in 0..self.reservations[r].edges.len() {
            let e = &mut self.edges[self.reservations[r].edges[i].index()];
            if e.dirty != DirtyState::Dirty {
                e.dirty = DirtyState::Maybe;
            }
        }
    }

    /// Paths currently holding a reservation on the edge.
    pub fn crossing_paths(&self, idx: EdgeIdx) -> &[PathRef] {
        &self.reservation(idx).paths
    }

    // ── Dirty tracking ────────────────────────────────────────────────────

    /// Classify the edge against its clean baseline for `min_pop` people.
    ///
    /// `Maybe` is resolved here; `Clean` is only re-evaluated when the
    /// baseline was taken at a different population; `Dirty` sticks until
    /// [`set_clean`](Self::set_clean).
    pub fn how_dirty(&mut self, idx: EdgeIdx, min_pop: f64) -> DirtyState {
        let e = &self.edges[idx.index()];
        let state = match e.dirty {
            DirtyState::Dirty => DirtyState::Dirty,
            DirtyState::Clean if e.clean_pop == min_pop => DirtyState::Clean,
            _ if e.clean_cost <= 0.0 => DirtyState::Dirty,
            _ => {
                let change = self.cost(idx, min_pop) / e.clean_cost - 1.0;
                if change > DIRTY_COST_INCREASE || change < -DIRTY_COST_DECREASE {
                    DirtyState::Dirty
                } else {
                    DirtyState::Clean
                }
            }
        };
        self.edges[idx.index()].dirty = state;
        state
    }

    #[inline]
    pub fn is_dirty(&mut self, idx: EdgeIdx, min_pop: f64) -> bool {
        self.how_dirty(idx, min_pop) == DirtyState::Dirty
    }

    /// Take a fresh baseline at `min_pop`.
    pub fn set_clean(&mut self, idx: EdgeIdx, min_pop: f64) {
        let cost = self.cost(idx, min_pop);
        let e = &mut self.edges[idx.index()];
        e.clean_cost = cost;
        e.clean_pop = min_pop;
        e.dirty = DirtyState::Clean;
    }

    pub fn clean_all(&mut self, min_pop: f64) {
        for i in 0..self.edges.len() {
            self.set_clean(EdgeIdx(i as u32), min_pop);
        }
    }

    // ── CARMA tree ────────────────────────────────────────────────────────

    /// Re-hang `child` under `parent`, detaching it from its old parent.
    pub fn set_tree_parent(&mut self, child: EdgeIdx, parent: Option<EdgeIdx>) {
        if let Some(old) = self.edges[child.index()].tree_previous.take() {
            let next = &mut self.edges[old.index()].tree_next;
            if let Some(pos) = next.iter().position(|&c| c == child) {
                next.remove(pos);
            }
        }
        self.edges[child.index()].tree_previous = parent;
        if let Some(p) = parent {
            self.edges[p.index()].tree_next.push(child);
        }
    }

    pub fn clear_tree(&mut self) {
        for e in &mut self.edges {
            e.tree_previous = None;
            e.tree_next.clear();
        }
    }

    /// Climb from a dirty edge towards the tree root while the current edge
    /// is dirty.  Returns the first clean ancestor, or the root.
    pub fn dirty_subtree_root(&mut self, idx: EdgeIdx, min_pop: f64) -> EdgeIdx {
        let mut cur = idx;
        while let Some(parent) = self.edges[cur.index()].tree_previous {
            if !self.is_dirty(cur, min_pop) {
                break;
            }
            cur = parent;
        }
        cur
    }

    /// Detach the subtree under `root`: remove every edge in it from
    /// `closed`, drop its tree links, and flag it dirty.
    ///
    /// Recurses up to [`MAX_MARK_RECURSION`] levels and continues with an
    /// explicit stack below that.  Returns the removed edges in visit order.
    pub fn mark_subtree(&mut self, root: EdgeIdx, closed: &mut EdgeMap) -> Vec<EdgeIdx> {
        let mut out = Vec::new();
        self.mark_recursive(root, closed, 0, MAX_MARK_RECURSION, &mut out);
        out
    }

    /// Pure recursive marker.
    pub fn mark_subtree_recursive(&mut self, root: EdgeIdx, closed: &mut EdgeMap) -> Vec<EdgeIdx> {
        let mut out = Vec::new();
        self.mark_recursive(root, closed, 0, usize::MAX, &mut out);
        out
    }

    /// Explicit-stack marker.
    pub fn mark_subtree_iterative(&mut self, root: EdgeIdx, closed: &mut EdgeMap) -> Vec<EdgeIdx> {
        let mut out = Vec::new();
        self.mark_iterative(root, closed, &mut out);
        out
    }

    fn detach_one(&mut self, e: EdgeIdx, closed: &mut EdgeMap) -> Vec<EdgeIdx> {
        let edge = &mut self.edges[e.index()];
        closed.remove(edge.key);
        edge.dirty = DirtyState::Dirty;
        let children = std::mem::take(&mut edge.tree_next);
        for &c in &children {
            self.edges[c.index()].tree_previous = None;
        }
        children
    }

    fn mark_recursive(
        &mut self,
        e: EdgeIdx,
        closed: &mut EdgeMap,
        depth: usize,
        limit: usize,
        out: &mut Vec<EdgeIdx>,
    ) {
        if depth >= limit {
            self.mark_iterative(e, closed, out);
            return;
        }
        out.push(e);
        for c in self.detach_one(e, closed) {
            self.mark_recursive(c, closed, depth + 1, limit, out);
        }
    }

    fn mark_iterative(&mut self, head: EdgeIdx, closed: &mut EdgeMap, out: &mut Vec<EdgeIdx>) {
        let mut stack = vec![head];
        while let Some(e) = stack.pop() {
            out.push(e);
            let children = self.detach_one(e, closed);
            stack.extend(children.into_iter().rev());
        }
    }
}
