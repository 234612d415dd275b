//! Plain data row types written by output backends.

use evc_core::Direction;
use evc_solver::{EdgeStatRecord, RouteRecord};

/// One committed path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRow {
    pub evacuee_id:        u32,
    /// Index among the evacuee's paths.
    pub path:              u32,
    pub path_order:        u32,
    pub zone_vertex:       u32,
    pub routed_population: f64,
    pub routed_cost:       f64,
    pub reserve_cost:      f64,
    pub original_cost:     f64,
    pub segments:          u32,
}

/// One stretch of a committed path, origin first (`seq` 0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentRow {
    pub evacuee_id:        u32,
    pub path:              u32,
    pub seq:               u32,
    pub source_feature_id: i64,
    pub edge_id:           u32,
    pub direction:         Direction,
    pub from_position:     f64,
    pub to_position:       f64,
}

/// Load on one traversal at the end of the solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStatRow {
    pub edge_id:             u32,
    pub direction:           Direction,
    pub source_feature_id:   i64,
    pub from_position:       f64,
    pub to_position:         f64,
    pub reserved_population: f64,
    pub capacity:            f64,
    pub current_cost:        f64,
    pub original_cost:       f64,
    pub congestion:          f64,
    pub path_count:          u32,
}

/// Summary of one solve pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummaryRow {
    pub pass:        u32,
    pub carma_loops: u32,
    pub paths:       u64,
    /// Evacuees sent back for another pass.
    pub flagged:     u64,
}

/// Flatten solver routes into path and segment rows.
pub fn route_rows(routes: &[RouteRecord]) -> (Vec<RouteRow>, Vec<SegmentRow>) {
    let mut paths = Vec::with_capacity(routes.len());
    let mut segments = Vec::new();
    for r in routes {
        paths.push(RouteRow {
            evacuee_id:        r.evacuee_id.0,
            path:              r.path,
            path_order:        r.path_order,
            zone_vertex:       r.zone_vertex.0,
            routed_population: r.routed_population,
            routed_cost:       r.routed_cost,
            reserve_cost:      r.reserve_cost,
            original_cost:     r.original_cost,
            segments:          r.segments.len() as u32,
        });
        segments.extend(r.segments.iter().enumerate().map(|(seq, s)| SegmentRow {
            evacuee_id:        r.evacuee_id.0,
            path:              r.path,
            seq:               seq as u32,
            source_feature_id: s.source_feature_id,
            edge_id:           s.edge_id.0,
            direction:         s.direction,
            from_position:     s.from_position,
            to_position:       s.to_position,
        }));
    }
    (paths, segments)
}

impl From<&EdgeStatRecord> for EdgeStatRow {
    fn from(r: &EdgeStatRecord) -> Self {
        Self {
            edge_id:             r.edge_id.0,
            direction:           r.direction,
            source_feature_id:   r.source_feature_id,
            from_position:       r.from_position,
            to_position:         r.to_position,
            reserved_population: r.reserved_population,
            capacity:            r.capacity,
            current_cost:        r.current_cost,
            original_cost:       r.original_cost,
            congestion:          r.congestion,
            path_count:          r.path_count as u32,
        }
    }
}
