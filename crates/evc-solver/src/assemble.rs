//! Path assembly, commitment, and refinement bookkeeping.

use std::collections::BTreeSet;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use evc_graph::{EdgeCache, PathRef};

use crate::evacuee::{Evacuee, EvacueeStatus, EvcPath, PathSegment};
use crate::search::SearchHit;
use crate::Solver;

/// Position `share` of the way from `a` towards `b`.
#[inline]
fn along(a: f64, b: f64, share: f64) -> f64 {
    a + share * (b - a)
}

impl Solver {
    // ── Assembly ──────────────────────────────────────────────────────────

    /// Segments of the route found by a forward search, origin first.
    ///
    /// The zone edge contributes `position_along` of its length, interior
    /// traversals count in full, and the origin traversal contributes the
    /// portion the evacuee still had to travel.
    pub(crate) fn assemble_segments(&self, i: usize, hit: &SearchHit) -> Vec<PathSegment> {
        let mut reversed: Vec<PathSegment> = Vec::new();

        let zone = &self.zones[hit.zone];
        if let Some(key) = zone.edge
            && zone.position_along > 0.0
            && let Some(idx) = self.edges.get(key)
        {
            let e = self.edges.edge(idx);
            reversed.push(PathSegment {
                edge:          idx,
                key,
                source_id:     e.source_id,
                from_position: e.from_position,
                to_position:   along(e.from_position, e.to_position, zone.position_along),
                portion:       zone.position_along,
            });
        }

        let mut cur = Some(hit.label);
        while let Some(h) = cur {
            let v = self.vertices.vertex(h);
            let Some(idx) = v.behind_edge else { break };
            let e = self.edges.edge(idx);

            if v.previous.is_some() {
                reversed.push(PathSegment {
                    edge:          idx,
                    key:           e.key,
                    source_id:     e.source_id,
                    from_position: e.from_position,
                    to_position:   e.to_position,
                    portion:       1.0,
                });
            } else {
                let portion = self.evacuees[i]
                    .origins
                    .iter()
                    .find(|o| o.vertex == v.junction && o.edge == Some(e.key))
                    .map_or(1.0, |o| o.portion);
                let from = along(e.to_position, e.from_position, portion);
                match reversed.last_mut() {
                    // Starting on the zone edge itself.
                    Some(front) if front.key == e.key => {
                        front.from_position = from;
                        front.portion = (front.portion + portion).min(1.0);
                    }
                    _ if portion > 0.0 => reversed.push(PathSegment {
                        edge:          idx,
                        key:           e.key,
                        source_id:     e.source_id,
                        from_position: from,
                        to_position:   e.to_position,
                        portion,
                    }),
                    _ => {}
                }
            }
            cur = v.previous;
        }

        reversed.reverse();
        reversed
    }

    /// How many of the `left` people a CCRP path carries.
    ///
    /// Separable evacuees fill the path up to its smallest remaining
    /// capacity; a path already at capacity takes everyone.
    pub(crate) fn ccrp_population(&self, segments: &[PathSegment], left: f64) -> f64 {
        if !self.config.separable_evacuee {
            return left;
        }
        let room = segments
            .iter()
            .map(|s| self.edges.capacity_left(s.edge))
            .fold(f64::INFINITY, f64::min);
        if room <= 0.0 { left } else { room.min(left) }
    }

    /// Reserve `population` on every segment and on the zone, and store the
    /// path on evacuee `i`.  Returns the path's index.
    pub(crate) fn commit_path(&mut self, i: usize, zone: usize, segments: Vec<PathSegment>, population: f64) -> usize {
        let id = self.evacuees[i].id;
        let index = self.evacuees[i].paths.len();
        let path_ref = PathRef { evacuee: id, path: index as u32 };

        let mut reserve_cost = 0.0;
        let mut original_cost = 0.0;
        for s in &segments {
            self.edges.add_reservation(s.edge, population, path_ref);
            reserve_cost += self.edges.current_cost(s.edge) * s.portion;
            original_cost += self.edges.edge(s.edge).original_cost * s.portion;
        }
        self.zones[zone].reserved_population += population;

        let path = EvcPath {
            evacuee: id,
            zone,
            segments,
            routed_population: population,
            reserve_cost,
            final_cost: reserve_cost + population * self.config.initial_delay_cost_per_population,
            original_cost,
            order: self.path_order,
        };
        self.path_order += 1;
        self.max_evacuee_cost = self.max_evacuee_cost.max(reserve_cost);
        self.evacuees[i].paths.push(path);
        index
    }

    // ── Refinement ────────────────────────────────────────────────────────

    /// Recompute every path's cost against the current reservations.
    pub(crate) fn update_final_costs(&mut self) {
        let edges = &self.edges;
        let delay = self.config.initial_delay_cost_per_population;

        #[cfg(feature = "parallel")]
        self.evacuees.par_iter_mut().for_each(|ev| refresh_final_cost(ev, edges, delay));

        #[cfg(not(feature = "parallel"))]
        self.evacuees.iter_mut().for_each(|ev| refresh_final_cost(ev, edges, delay));
    }

    /// Evacuees whose committed costs drifted by more than
    /// `iterative_ratio` of the worst final cost.
    ///
    /// A path that ended up much costlier than when it was committed also
    /// flags everyone crossing its most congested and its costliest segment.
    pub(crate) fn second_chance_candidates(&self) -> Vec<usize> {
        let ratio = self.config.iterative_ratio;
        if ratio <= 0.0 {
            return Vec::new();
        }
        let max_cost = self.evacuees.iter().map(|e| e.final_cost).fold(0.0, f64::max);
        if max_cost <= 0.0 {
            return Vec::new();
        }

        let mut flagged = BTreeSet::new();
        for (i, ev) in self.evacuees.iter().enumerate() {
            if ev.status != EvacueeStatus::Processed {
                continue;
            }
            for path in &ev.paths {
                let predicted_ratio = if ev.predicted_cost < f64::MAX {
                    (path.reserve_cost - ev.predicted_cost) / max_cost
                } else {
                    0.0
                };
                let final_ratio = (path.final_cost - path.reserve_cost) / max_cost;
                if predicted_ratio > ratio || final_ratio > ratio {
                    flagged.insert(i);
                }
                if final_ratio <= ratio {
                    continue;
                }

                let congested = path
                    .segments
                    .iter()
                    .max_by(|a, b| self.edges.congestion(a.edge).total_cmp(&self.edges.congestion(b.edge)));
                let costliest = path.segments.iter().max_by(|a, b| {
                    (self.edges.current_cost(a.edge) * a.portion)
                        .total_cmp(&(self.edges.current_cost(b.edge) * b.portion))
                });
                for s in congested.into_iter().chain(costliest) {
                    for p in self.edges.crossing_paths(s.edge) {
                        if let Some(&j) = self.evacuee_index.get(&p.evacuee)
                            && self.evacuees[j].status == EvacueeStatus::Processed
                        {
                            flagged.insert(j);
                        }
                    }
                }
            }
        }
        flagged.into_iter().collect()
    }

    /// Take back every path of evacuee `i` and queue it for routing again.
    pub(crate) fn withdraw(&mut self, i: usize) {
        let id = self.evacuees[i].id;
        let previous_reserve = self.evacuees[i].reserve_cost();
        let paths = std::mem::take(&mut self.evacuees[i].paths);

        for (n, path) in paths.iter().enumerate() {
            let path_ref = PathRef { evacuee: id, path: n as u32 };
            for s in &path.segments {
                self.edges.remove_reservation(s.edge, path.routed_population, path_ref);
            }
            let zone = &mut self.zones[path.zone];
            zone.reserved_population = (zone.reserved_population - path.routed_population).max(0.0);
        }

        let ev = &mut self.evacuees[i];
        ev.previous_final_cost = ev.final_cost;
        ev.previous_reserve_cost = previous_reserve;
        ev.final_cost = 0.0;
        ev.process_order = None;
        ev.status = EvacueeStatus::Unprocessed;
    }
}

fn refresh_final_cost(ev: &mut Evacuee, edges: &EdgeCache, delay: f64) {
    let mut worst: f64 = 0.0;
    for path in &mut ev.paths {
        let travel: f64 = path
            .segments
            .iter()
            .map(|s| edges.current_cost(s.edge) * s.portion.abs())
            .sum();
        path.final_cost = travel + path.routed_population * delay;
        worst = worst.max(path.final_cost);
    }
    ev.final_cost = worst;
}
