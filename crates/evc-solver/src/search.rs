//! Forward search from an evacuee's origins to the nearest safe zone.
//!
//! Labels are side clones in the vertex cache, one per traversal reached,
//! so the same junction can be reached over several edges.  Each label
//! carries the cost `g`, the selfish-routing penalty, and the traversal it
//! arrived on.  The heap key is `g + penalty + min_h` with `min_h` taken from
//! the CARMA heuristics, and nothing is queued past the best zone cost found
//! so far.
//!
//! Edges are costed at their committed reservations only; the group being
//! routed does not congest its own search.  Its population enters through
//! the selfish-routing penalty and the safe-zone density cost.

use evc_core::EdgeKey;
use evc_graph::{EdgeIdx, EdgeMap, VertexHandle};
use evc_heap::{FibHeap, HeapHandle};

use crate::{Map, SolveResult, Solver};

/// Safe zone reached by a forward search.
pub(crate) struct SearchHit {
    /// Label the zone was reached from.
    pub label: VertexHandle,
    pub zone:  usize,
}

pub(crate) struct SearchOutcome {
    pub hit:           Option<SearchHit>,
    /// Traversals settled.
    pub visited:       usize,
    /// Settled traversals that were dirty at the CARMA population.
    pub dirty_visited: usize,
}

impl Solver {
    /// Search from evacuee `i`'s origins for `population` people.
    pub(crate) fn find_path(&mut self, i: usize, population: f64) -> SolveResult<SearchOutcome> {
        let origins = self.evacuees[i].origins.clone();
        let mut heap: FibHeap<VertexHandle> = FibHeap::new();
        let mut queued: Map<EdgeIdx, (VertexHandle, HeapHandle)> = Map::default();
        let mut closed = EdgeMap::new();
        let mut time_to_beat = f64::MAX;
        let mut best: Option<SearchHit> = None;
        let mut dirty_visited = 0;

        // ── Seeds ─────────────────────────────────────────────────────────
        for origin in &origins {
            let (behind, g) = match origin.edge {
                Some(key) => {
                    let idx = self.edges.get_or_create(&self.network, key, false);
                    if !self.edges.edge(idx).valid
                        || self.barriers.blocks(&self.network, key)
                        || queued.contains_key(&idx)
                    {
                        continue;
                    }
                    (Some(idx), origin.portion * self.edges.current_cost(idx))
                }
                None => (None, 0.0),
            };

            let h = self.vertices.side_clone(origin.vertex);
            let min_h = self.vertices.vertex(h).min_h_or_zero();
            let penalty = match behind {
                Some(idx) => self.selfish_penalty(idx, population, g + min_h),
                None => 0.0,
            };
            let v = self.vertices.vertex_mut(h);
            v.g = g;
            v.penalty = penalty;
            v.behind_edge = behind;

            let handle = heap.insert(g + penalty + min_h, h);
            if let Some(idx) = behind {
                queued.insert(idx, (h, handle));
            }
        }

        // ── Label setting ─────────────────────────────────────────────────
        while let Some((key, h)) = heap.extract_min() {
            if key > time_to_beat {
                break;
            }
            let (junction, g, penalty, behind) = {
                let v = self.vertices.vertex(h);
                (v.junction, v.g, v.penalty, v.behind_edge)
            };
            let behind_key = behind.map(|idx| self.edges.edge(idx).key);
            if let (Some(idx), Some(k)) = (behind, behind_key) {
                queued.remove(&idx);
                closed.insert(k, idx);
                if self.edges.is_dirty(idx, self.carma_min_pop) {
                    dirty_visited += 1;
                }
            }

            if let Some(zones) = self.zone_index.get(&junction) {
                for &z in zones {
                    let Some(zone_cost) = self.zone_cost(z, population, behind_key) else {
                        continue;
                    };
                    let cost = g + penalty + zone_cost + self.zone_penalty(z, population, g + zone_cost);
                    if cost < time_to_beat {
                        time_to_beat = cost;
                        best = Some(SearchHit { label: h, zone: z });
                    }
                }
            }

            for &next in self.network.out_traversals(junction) {
                if self.barriers.blocks(&self.network, next)
                    || behind_key.is_some_and(|b| !self.network.turn_allowed(b, next))
                    || closed.contains(next)
                {
                    continue;
                }
                let idx = self.edges.get_or_create(&self.network, next, false);
                if !self.edges.edge(idx).valid {
                    continue;
                }
                let head = self.edges.edge(idx).to;
                let new_cost = g + self.edges.current_cost(idx);
                let min_h = self.vertices.min_h_of(head);
                let added = self.selfish_penalty(idx, population, new_cost + min_h);
                let k = new_cost + (penalty + added) + min_h;

                match queued.get(&idx).copied() {
                    Some((nh, handle)) => {
                        if heap.key(handle).is_some_and(|queued_key| k < queued_key) {
                            let n = self.vertices.vertex_mut(nh);
                            n.g = new_cost;
                            n.penalty = penalty + added;
                            n.previous = Some(h);
                            heap.decrease_key(handle, k)?;
                        }
                    }
                    None => {
                        if k > time_to_beat {
                            continue;
                        }
                        let nh = self.vertices.side_clone(head);
                        let n = self.vertices.vertex_mut(nh);
                        n.g = new_cost;
                        n.penalty = penalty + added;
                        n.behind_edge = Some(idx);
                        n.previous = Some(h);
                        let handle = heap.insert(k, nh);
                        queued.insert(idx, (nh, handle));
                    }
                }
            }
        }

        Ok(SearchOutcome { hit: best, visited: closed.len(), dirty_visited })
    }

    /// Cost of entering safe zone `z` with `population` people arriving on
    /// `arriving`, `None` when the zone cannot be entered.  The zone edge is
    /// costed at its committed reservations.
    pub(crate) fn zone_cost(&self, z: usize, population: f64, arriving: Option<EdgeKey>) -> Option<f64> {
        let zone = &self.zones[z];
        let mut cost = zone.density_cost(population, self.config.cost_per_zone_density)?;
        if let Some(key) = zone.edge {
            let idx = self.open_zone_edge(key)?;
            if arriving.is_some_and(|a| !self.network.turn_allowed(a, key)) {
                return None;
            }
            cost += self.edges.current_cost(idx) * zone.position_along;
        }
        Some(cost)
    }

    /// The cached zone edge, if it can be driven on.
    pub(crate) fn open_zone_edge(&self, key: EdgeKey) -> Option<EdgeIdx> {
        let idx = self.edges.get(key)?;
        let usable = self.edges.edge(idx).valid
            && self.network.is_traversable(key)
            && !self.barriers.blocks(&self.network, key);
        usable.then_some(idx)
    }

    fn zone_penalty(&self, z: usize, population: f64, path_cost: f64) -> f64 {
        match self.zones[z].edge.and_then(|key| self.edges.get(key)) {
            Some(idx) => self.selfish_penalty(idx, population, path_cost) * self.zones[z].position_along,
            None => 0.0,
        }
    }

    /// Extra cost charged for pushing `population` onto edge `idx` when
    /// that slows down people already routed over it.
    ///
    /// Only the part of the slowdown that would make some committed path
    /// longer than both the longest evacuee so far and the current path
    /// counts, scaled by `selfish_ratio`.
    pub(crate) fn selfish_penalty(&self, idx: EdgeIdx, population: f64, path_cost: f64) -> f64 {
        let ratio = self.config.selfish_ratio;
        if ratio <= 0.0 {
            return 0.0;
        }
        let delta = self.edges.global_delta(idx, population);
        if delta <= 0.0 {
            return 0.0;
        }
        let cutoff = self.max_evacuee_cost.max(path_cost);
        let worst = self
            .edges
            .crossing_paths(idx)
            .iter()
            .filter_map(|p| self.path(p.evacuee, p.path))
            .map(|p| p.reserve_cost + delta - cutoff)
            .fold(0.0, f64::max);
        ratio * worst.min(delta)
    }
}
