//! Timed paths handed to the movement engine.

use evc_core::{EdgeKey, EvacueeId};
use evc_solver::RouteRecord;

/// One stretch of a path, `length` in distance units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedSegment {
    pub edge:   EdgeKey,
    pub length: f64,
}

/// A path to follow and the group that follows it.
///
/// Every started person becomes one agent, so a population of `2.3` spawns
/// three agents.
#[derive(Debug, Clone, PartialEq)]
pub struct FlockPath {
    pub evacuee_id: EvacueeId,
    pub population: f64,
    pub start_time: f64,
    pub segments:   Vec<TimedSegment>,
}

impl FlockPath {
    /// Path along a solved route.  Segment lengths are the share of each
    /// traversal's end-of-solve cost the route covers, so agents moving at
    /// speed 1 reproduce the routed cost.
    pub fn from_route(route: &RouteRecord, start_time: f64) -> Self {
        Self {
            evacuee_id: route.evacuee_id,
            population: route.routed_population,
            start_time,
            segments:   route
                .segments
                .iter()
                .map(|s| TimedSegment {
                    edge:   EdgeKey::new(s.edge_id, s.direction),
                    length: (s.cost * s.portion).max(0.0),
                })
                .collect(),
        }
    }

    /// Total length of all segments.
    pub fn length(&self) -> f64 {
        self.segments.iter().map(|s| s.length).sum()
    }

    pub fn agent_count(&self) -> usize {
        if self.population > 0.0 { self.population.ceil() as usize } else { 0 }
    }
}
