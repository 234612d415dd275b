//! Flat views of a solved state for writers and the flocking engine.

use std::collections::BTreeSet;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use evc_core::{Direction, EdgeId, EvacueeId, VertexId};
use evc_graph::EdgeIdx;

use crate::evacuee::EvcPath;
use crate::Solver;

/// One stretch of a route in source-feature positions.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteSegment {
    pub source_feature_id: i64,
    pub from_position:     f64,
    pub to_position:       f64,
    pub edge_id:           EdgeId,
    pub direction:         Direction,
    /// Cost of the whole traversal at the end of the solve.
    pub cost:              f64,
    pub portion:           f64,
}

/// One committed path.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteRecord {
    pub evacuee_id:        EvacueeId,
    /// Index among the evacuee's paths.
    pub path:              u32,
    /// Global commit order.
    pub path_order:        u32,
    pub zone_vertex:       VertexId,
    pub routed_population: f64,
    /// Cost against the reservations at the end of the solve.
    pub routed_cost:       f64,
    /// Cost when the path was committed.
    pub reserve_cost:      f64,
    pub original_cost:     f64,
    pub segments:          Vec<RouteSegment>,
}

/// Load on one used traversal.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeStatRecord {
    pub edge_id:             EdgeId,
    pub direction:           Direction,
    pub source_feature_id:   i64,
    pub from_position:       f64,
    pub to_position:         f64,
    pub reserved_population: f64,
    pub capacity:            f64,
    pub current_cost:        f64,
    pub original_cost:       f64,
    /// `current_cost / original_cost`.
    pub congestion:          f64,
    pub path_count:          usize,
}

impl Solver {
    /// Every committed path in commit order.
    pub fn routes(&self) -> Vec<RouteRecord> {
        let mut out: Vec<RouteRecord> = self
            .evacuees
            .iter()
            .flat_map(|ev| ev.paths.iter().enumerate().map(|(n, p)| self.route_record(p, n as u32)))
            .collect();
        out.sort_by_key(|r| r.path_order);
        out
    }

    fn route_record(&self, path: &EvcPath, n: u32) -> RouteRecord {
        RouteRecord {
            evacuee_id:        path.evacuee,
            path:              n,
            path_order:        path.order,
            zone_vertex:       self.zones[path.zone].vertex,
            routed_population: path.routed_population,
            routed_cost:       path.final_cost,
            reserve_cost:      path.reserve_cost,
            original_cost:     path.original_cost,
            segments: path
                .segments
                .iter()
                .map(|s| RouteSegment {
                    source_feature_id: s.source_id,
                    from_position:     s.from_position,
                    to_position:       s.to_position,
                    edge_id:           s.key.id,
                    direction:         s.key.dir,
                    cost:              self.edges.current_cost(s.edge),
                    portion:           s.portion,
                })
                .collect(),
        }
    }

    /// Loaded traversals used by at least one committed path, ordered by
    /// edge and direction.  With shared two-way capacity both directions of
    /// an edge report the same load.
    pub fn edge_stats(&self) -> Vec<EdgeStatRecord> {
        let used: BTreeSet<EdgeIdx> = self
            .evacuees
            .iter()
            .flat_map(|ev| ev.paths.iter())
            .flat_map(|p| p.segments.iter().map(|s| s.edge))
            .collect();
        let used: Vec<EdgeIdx> = used.into_iter().filter(|&idx| self.edges.reserved_pop(idx) > 0.0).collect();

        #[cfg(feature = "parallel")]
        let mut out: Vec<EdgeStatRecord> = used.into_par_iter().map(|idx| self.edge_stat(idx)).collect();
        #[cfg(not(feature = "parallel"))]
        let mut out: Vec<EdgeStatRecord> = used.into_iter().map(|idx| self.edge_stat(idx)).collect();

        out.sort_by_key(|r| (r.edge_id, r.direction));
        out
    }

    fn edge_stat(&self, idx: EdgeIdx) -> EdgeStatRecord {
        let e = self.edges.edge(idx);
        EdgeStatRecord {
            edge_id:             e.key.id,
            direction:           e.key.dir,
            source_feature_id:   e.source_id,
            from_position:       e.from_position,
            to_position:         e.to_position,
            reserved_population: self.edges.reserved_pop(idx),
            capacity:            e.capacity,
            current_cost:        self.edges.current_cost(idx),
            original_cost:       e.original_cost,
            congestion:          self.edges.congestion(idx),
            path_count:          self.edges.crossing_paths(idx).len(),
        }
    }
}
