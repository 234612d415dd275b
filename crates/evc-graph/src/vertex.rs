//! Search vertices and their heuristic tables.
//!
//! Each junction has at most one **canonical** [`Vertex`] in a
//! [`VertexCache`]; it carries the heuristic table `h` that the CARMA loop
//! maintains.  A search that needs a scratch copy of a junction asks for a
//! **side clone**, which lives in a separate arena and is dropped wholesale
//! by [`VertexCache::release_side`].

use evc_core::{EdgeId, VertexId};

use crate::edge::EdgeIdx;
use crate::Map;

/// Slack allowed when a later CARMA loop lowers a heuristic.
const H_TOLERANCE: f64 = 1e-9;

/// Heuristic key for a safe zone reached without a zone edge.
pub const SAFE_ZONE_EDGE: EdgeId = EdgeId(u32::MAX - 1);

// ── HValue ────────────────────────────────────────────────────────────────────

/// Distance-to-safety estimate through one tree edge, recorded by one CARMA
/// loop.  `EdgeId::INVALID` marks the heuristic floor.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct HValue {
    pub value:      f64,
    pub edge:       EdgeId,
    pub carma_loop: u32,
}

// ── Vertex ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Vertex {
    pub junction:    VertexId,
    pub g:           f64,
    pub penalty:     f64,
    pub behind_edge: Option<EdgeIdx>,
    pub previous:    Option<VertexHandle>,
    /// Ascending by value.
    h: Vec<HValue>,
}

impl Vertex {
    pub fn new(junction: VertexId) -> Self {
        Self { junction, g: 0.0, penalty: 0.0, behind_edge: None, previous: None, h: Vec::new() }
    }

    pub fn h_values(&self) -> &[HValue] {
        &self.h
    }

    /// Heuristic through `edge`, or `f64::MAX` if none was recorded.
    pub fn get_h(&self, edge: EdgeId) -> f64 {
        self.h.iter().find(|v| v.edge == edge).map_or(f64::MAX, |v| v.value)
    }

    pub fn min_h_or_zero(&self) -> f64 {
        self.h.first().map_or(0.0, |v| v.value)
    }

    /// Record `value` for `edge` in `carma_loop`.
    ///
    /// Within one loop a value only goes down.  A later loop may raise it
    /// but not lower it.  Returns `true` when a later loop left the value
    /// unchanged.
    pub fn update_heuristic(&mut self, edge: EdgeId, value: f64, carma_loop: u32) -> bool {
        let mut unchanged = false;
        match self.h.iter_mut().find(|v| v.edge == edge) {
            Some(v) => {
                debug_assert!(carma_loop >= v.carma_loop);
                if carma_loop == v.carma_loop {
                    debug_assert!(value <= v.value + H_TOLERANCE * v.value.abs().max(1.0));
                } else {
                    debug_assert!(v.value - value <= H_TOLERANCE * v.value.abs().max(1.0));
                    unchanged = (value - v.value).abs() <= H_TOLERANCE * v.value.abs().max(1.0);
                    v.carma_loop = carma_loop;
                }
                v.value = value;
            }
            None => self.h.push(HValue { value, edge, carma_loop }),
        }
        self.h.sort_by(|a, b| a.value.total_cmp(&b.value));
        unchanged
    }
}

// ── VertexHandle ──────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum VertexHandle {
    Canonical(u32),
    Side(u32),
}

// ── VertexCache ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct VertexCache {
    canonical: Vec<Vertex>,
    index:     Map<VertexId, u32>,
    side:      Vec<Vertex>,
    floor:     f64,
}

impl VertexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Heuristic given to vertices the CARMA search never reached.
    pub fn heuristic_floor(&self) -> f64 {
        self.floor
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn side_len(&self) -> usize {
        self.side.len()
    }

    /// Canonical vertex for `junction`, created with the current floor.
    pub fn get_or_create(&mut self, junction: VertexId) -> VertexHandle {
        VertexHandle::Canonical(self.canonical_slot(junction))
    }

    fn canonical_slot(&mut self, junction: VertexId) -> u32 {
        if let Some(&i) = self.index.get(&junction) {
            return i;
        }
        let mut v = Vertex::new(junction);
        v.update_heuristic(EdgeId::INVALID, self.floor, 0);
        let i = self.canonical.len() as u32;
        self.canonical.push(v);
        self.index.insert(junction, i);
        i
    }

    pub fn get(&self, junction: VertexId) -> Option<VertexHandle> {
        self.index.get(&junction).map(|&i| VertexHandle::Canonical(i))
    }

    /// Scratch copy of `junction` seeded with the canonical heuristics.
    pub fn side_clone(&mut self, junction: VertexId) -> VertexHandle {
        let c = self.canonical_slot(junction);
        let mut v = self.canonical[c as usize].clone();
        v.g = 0.0;
        v.penalty = 0.0;
        v.behind_edge = None;
        v.previous = None;
        self.side.push(v);
        VertexHandle::Side((self.side.len() - 1) as u32)
    }

    pub fn vertex(&self, h: VertexHandle) -> &Vertex {
        match h {
            VertexHandle::Canonical(i) => &self.canonical[i as usize],
            VertexHandle::Side(i)      => &self.side[i as usize],
        }
    }

    pub fn vertex_mut(&mut self, h: VertexHandle) -> &mut Vertex {
        match h {
            VertexHandle::Canonical(i) => &mut self.canonical[i as usize],
            VertexHandle::Side(i)      => &mut self.side[i as usize],
        }
    }

    /// Heuristic of the canonical vertex for `junction` through `edge`.
    pub fn h_of(&self, junction: VertexId, edge: EdgeId) -> f64 {
        self.get(junction).map_or(f64::MAX, |h| self.vertex(h).get_h(edge))
    }

    /// Smallest heuristic of `junction`, the floor if it was never seen.
    pub fn min_h_of(&self, junction: VertexId) -> f64 {
        self.get(junction).map_or(self.floor, |h| self.vertex(h).min_h_or_zero())
    }

    pub fn update_heuristic(&mut self, junction: VertexId, edge: EdgeId, value: f64, carma_loop: u32) -> bool {
        let h = self.get_or_create(junction);
        self.vertex_mut(h).update_heuristic(edge, value, carma_loop)
    }

    /// Raise the floor for vertices outside the CARMA search radius.
    ///
    /// Existing vertices only receive the new floor on the first loop; later
    /// loops leave their tables alone and only new vertices see it.
    pub fn update_heuristic_for_outside_vertices(&mut self, value: f64, carma_loop: u32) {
        if value <= self.floor {
            return;
        }
        self.floor = value;
        if carma_loop == 1 {
            for v in &mut self.canonical {
                v.update_heuristic(EdgeId::INVALID, value, carma_loop);
            }
        }
    }

    /// Drop every side clone.
    pub fn release_side(&mut self) {
        self.side.clear();
    }

    /// Drop every vertex and reset the floor.
    pub fn clear(&mut self) {
        self.canonical.clear();
        self.index.clear();
        self.side.clear();
        self.floor = 0.0;
    }
}
