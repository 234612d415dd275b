//! Demand, destinations, and committed paths.

use evc_core::{EdgeKey, EvacueeId, VertexId};
use evc_graph::EdgeIdx;

// ── Origin ────────────────────────────────────────────────────────────────────

/// Where an evacuee starts.
///
/// With an `edge`, the evacuee sits on that traversal (which ends at
/// `vertex`) and still has `portion` of it to travel.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Origin {
    pub vertex:  VertexId,
    pub edge:    Option<EdgeKey>,
    pub portion: f64,
}

impl Origin {
    /// Origin exactly at a junction.
    pub fn at(vertex: VertexId) -> Self {
        Self { vertex, edge: None, portion: 0.0 }
    }

    /// Origin on `edge`, `portion` of it away from `vertex`.
    pub fn on_edge(vertex: VertexId, edge: EdgeKey, portion: f64) -> Self {
        Self { vertex, edge: Some(edge), portion: portion.clamp(0.0, 1.0) }
    }
}

// ── Evacuee ───────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum EvacueeStatus {
    #[default]
    Unprocessed,
    Processed,
    Unreachable,
}

/// One demand unit: a population at one or more origins.
#[derive(Clone, Debug)]
pub struct Evacuee {
    pub id:         EvacueeId,
    pub population: f64,
    pub origins:    Vec<Origin>,
    pub paths:      Vec<EvcPath>,

    /// Cost to safety estimated by the last CARMA loop.
    pub predicted_cost: f64,
    /// Largest final cost among the committed paths.
    pub final_cost:     f64,
    pub status:         EvacueeStatus,
    /// Position in the processing sequence, `None` until routed.
    pub process_order:  Option<u32>,

    /// Costs of the previous refinement pass, used by the reverse sorts.
    pub(crate) previous_final_cost:   f64,
    pub(crate) previous_reserve_cost: f64,
}

impl Evacuee {
    pub fn new(id: EvacueeId, population: f64, origins: Vec<Origin>) -> Self {
        Self {
            id,
            population: population.max(0.0),
            origins,
            paths: Vec::new(),
            predicted_cost: f64::MAX,
            final_cost: 0.0,
            status: EvacueeStatus::Unprocessed,
            process_order: None,
            previous_final_cost: 0.0,
            previous_reserve_cost: 0.0,
        }
    }

    /// Population carried by committed paths.
    pub fn routed_population(&self) -> f64 {
        self.paths.iter().map(|p| p.routed_population).sum()
    }

    /// Largest reserve cost among the committed paths.
    pub fn reserve_cost(&self) -> f64 {
        self.paths.iter().map(|p| p.reserve_cost).fold(0.0, f64::max)
    }
}

// ── SafeZone ──────────────────────────────────────────────────────────────────

/// A destination.  The zone is at `vertex`, or `position_along` the way
/// down `edge` when it sits on a traversal leaving `vertex`.
#[derive(Clone, Debug)]
pub struct SafeZone {
    pub vertex:         VertexId,
    pub edge:           Option<EdgeKey>,
    pub position_along: f64,
    /// `None` is unlimited.
    pub capacity:       Option<f64>,
    pub reserved_population: f64,
}

impl SafeZone {
    pub fn new(vertex: VertexId, capacity: Option<f64>) -> Self {
        Self { vertex, edge: None, position_along: 0.0, capacity, reserved_population: 0.0 }
    }

    /// Place the zone part-way down a traversal leaving `vertex`.
    pub fn with_edge(mut self, edge: EdgeKey, position_along: f64) -> Self {
        self.edge = Some(edge);
        self.position_along = position_along.clamp(0.0, 1.0);
        self
    }

    /// Over-capacity cost for `population` more arrivals, `None` when the
    /// zone accepts nobody.
    pub fn density_cost(&self, population: f64, cost_per_density: f64) -> Option<f64> {
        match self.capacity {
            Some(cap) if cap <= 0.0 => (cost_per_density <= 0.0).then_some(0.0),
            Some(cap) => {
                let total = population + self.reserved_population;
                if total > cap {
                    Some(cost_per_density * (total / cap - 1.0))
                } else {
                    Some(0.0)
                }
            }
            None => Some(0.0),
        }
    }
}

// ── Paths ─────────────────────────────────────────────────────────────────────

/// A stretch of one traversal, in positions along its source feature.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct PathSegment {
    pub edge:          EdgeIdx,
    pub key:           EdgeKey,
    pub source_id:     i64,
    pub from_position: f64,
    pub to_position:   f64,
    /// Share of the traversal covered, `0..=1`.
    pub portion:       f64,
}

/// One committed route for part (or all) of an evacuee's population.
#[derive(Clone, Debug)]
pub struct EvcPath {
    pub evacuee: EvacueeId,
    /// Index into the solver's safe-zone list.
    pub zone:    usize,
    /// Origin first.
    pub segments: Vec<PathSegment>,
    pub routed_population: f64,
    /// Cost when the path was committed.
    pub reserve_cost:  f64,
    /// Cost against the reservations at the end of the pass.
    pub final_cost:    f64,
    /// Free-flow cost.
    pub original_cost: f64,
    /// Global commit order.
    pub order: u32,
}
