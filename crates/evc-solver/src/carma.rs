//! CARMA loop: backward Dijkstra from the safe zones.
//!
//! Each loop settles traversals outwards from the zones at the costs of the
//! committed reservations, the same costs the forward search sees, so every
//! recorded heuristic is a lower bound until more flow is committed.  The
//! smallest population still to route decides which zones are open and
//! what counts as dirty.  Settling a traversal records its
//! cost-to-safety as a heuristic on the junction it starts from and hangs it
//! under the traversal it was reached from, which builds the search tree
//! used for dirty-subtree invalidation.
//!
//! In three-generation mode the previous loop's tree is kept: only dirty
//! subtrees and the leaves where evacuees were found are settled again.

use evc_core::{CarmaSort, SolverMethod, VertexId};
use evc_graph::{EdgeContainer, EdgeIdx, Generation, SAFE_ZONE_EDGE};
use evc_heap::{FibHeap, HeapHandle};

use crate::evacuee::EvacueeStatus;
use crate::{Map, SolveError, SolveObserver, SolveResult, Solver};

/// One queued traversal: reached at `junction` (its tail) over `edge`, or a
/// safe zone itself when `edge` is `None`.
#[derive(Copy, Clone)]
struct Label {
    junction: VertexId,
    edge:     Option<EdgeIdx>,
    g:        f64,
    previous: Option<usize>,
}

impl Solver {
    /// Run one CARMA loop and return the unprocessed evacuees it reached,
    /// in reverse processing order (pop from the back).
    pub(crate) fn run_carma<O: SolveObserver>(&mut self, observer: &mut O) -> SolveResult<Vec<usize>> {
        // ── Index unprocessed evacuees by origin junction ─────────────────
        let continuous = self.config.carma_sort.is_continuous();
        let mut index: Map<VertexId, Vec<usize>> = Map::default();
        let mut min_population = f64::MAX;
        for (i, ev) in self.evacuees.iter_mut().enumerate() {
            if ev.status != EvacueeStatus::Unprocessed || ev.population <= 0.0 {
                continue;
            }
            if continuous {
                ev.predicted_cost = f64::MAX;
            }
            min_population = min_population.min(ev.population);
            for origin in &ev.origins {
                let list = index.entry(origin.vertex).or_default();
                if !list.contains(&i) {
                    list.push(i);
                }
            }
        }
        if index.is_empty() {
            return Ok(Vec::new());
        }

        self.carma_loop += 1;
        self.carma_loops += 1;
        let three_gen = self.config.three_generation_carma;
        if three_gen {
            self.closed.promote_all();
        } else {
            self.closed.clear(Generation::All);
        }
        let min_pop = self.carma_population(min_population);
        self.carma_min_pop = min_pop;

        let mut labels: Vec<Label> = Vec::new();
        let mut heap: FibHeap<usize> = FibHeap::new();
        let mut queued: Map<EdgeIdx, (usize, HeapHandle)> = Map::default();

        // ── Seeds ─────────────────────────────────────────────────────────
        if three_gen {
            self.invalidate_dirty_subtrees(min_pop);
        }
        for z in 0..self.zones.len() {
            let zone = &self.zones[z];
            if zone.density_cost(min_pop, self.config.cost_per_zone_density).is_none() {
                continue;
            }
            let (junction, position) = (zone.vertex, zone.position_along);
            let label = match zone.edge {
                Some(key) => {
                    let Some(idx) = self.open_zone_edge(key) else { continue };
                    if self.closed.contains(key, Generation::Old) {
                        continue;
                    }
                    let g = self.edges.current_cost(idx) * position;
                    Label { junction, edge: Some(idx), g, previous: None }
                }
                None => Label { junction, edge: None, g: 0.0, previous: None },
            };
            push(&mut labels, &mut heap, &mut queued, label)?;
        }
        if three_gen {
            for key in self.leafs.keys() {
                let Some(idx) = self.edges.get(key) else { continue };
                let e = self.edges.edge(idx);
                let Some(parent) = e.tree_previous else { continue };
                let h = self.vertices.h_of(e.to, self.edges.edge(parent).key.id);
                if h >= f64::MAX {
                    continue;
                }
                let g = h + self.edges.current_cost(idx);
                let label = Label { junction: e.from, edge: Some(idx), g, previous: None };
                push(&mut labels, &mut heap, &mut queued, label)?;
            }
        }
        self.leafs.clear();

        // ── Backward Dijkstra ─────────────────────────────────────────────
        let mut discovered = vec![false; self.evacuees.len()];
        let mut sorted: Vec<usize> = Vec::new();
        let mut last_cost = 0.0;
        let mut radius = 0.0;
        let mut settled = 0usize;

        while let Some((_, li)) = heap.extract_min() {
            let label = labels[li];
            match label.edge {
                Some(idx) => {
                    queued.remove(&idx);
                    let key = self.edges.edge(idx).key;
                    self.closed.insert(key, idx, Generation::New);
                    if let Some(p) = label.previous {
                        self.edges.set_tree_parent(idx, labels[p].edge);
                    }
                    self.vertices.update_heuristic(label.junction, key.id, label.g, self.carma_loop);
                }
                None => {
                    self.vertices.update_heuristic(label.junction, SAFE_ZONE_EDGE, label.g, self.carma_loop);
                }
            }
            settled += 1;
            last_cost = label.g;

            if let Some(found) = index.remove(&label.junction) {
                for i in found {
                    if self.cancel.is_cancelled() {
                        return Err(SolveError::Cancelled);
                    }
                    let predicted = label.g + self.origin_offset(i, label.junction);
                    let ev = &mut self.evacuees[i];
                    ev.predicted_cost = ev.predicted_cost.min(predicted);
                    if !discovered[i] {
                        discovered[i] = true;
                        sorted.push(i);
                    }
                }
                if let Some(idx) = label.edge {
                    self.leafs.insert(self.edges.edge(idx).key);
                }
            }
            if index.is_empty() && radius <= 0.0 {
                radius = heap.max_inserted_key();
            }

            for &prev in self.network.in_traversals(label.junction) {
                if self.barriers.blocks(&self.network, prev) || self.closed.contains(prev, Generation::All) {
                    continue;
                }
                let idx = self.edges.get_or_create(&self.network, prev, false);
                let e = self.edges.edge(idx);
                if !e.valid {
                    continue;
                }
                let new_cost = label.g + self.edges.current_cost(idx);
                match queued.get(&idx).copied() {
                    Some((lj, handle)) => {
                        if new_cost < labels[lj].g {
                            labels[lj].g = new_cost;
                            labels[lj].previous = Some(li);
                            heap.decrease_key(handle, new_cost)?;
                        }
                    }
                    None if !index.is_empty() || new_cost < radius => {
                        let next = Label { junction: e.from, edge: Some(idx), g: new_cost, previous: Some(li) };
                        labels.push(next);
                        let handle = heap.insert(new_cost, labels.len() - 1);
                        queued.insert(idx, (labels.len() - 1, handle));
                    }
                    None => {}
                }
            }
        }

        // ── Outside vertices, leftovers, ordering ─────────────────────────
        self.vertices.update_heuristic_for_outside_vertices(last_cost, self.carma_loop);

        for i in index.into_values().flatten() {
            if discovered[i] {
                continue;
            }
            discovered[i] = true;
            let ev = &mut self.evacuees[i];
            if ev.predicted_cost >= f64::MAX {
                log::warn!("evacuee {} cannot reach any safe zone", ev.id);
                ev.status = EvacueeStatus::Unreachable;
            } else {
                sorted.push(i);
            }
        }

        self.sort_for_processing(&mut sorted);
        self.edges.clean_all(min_pop);

        log::debug!(
            "CARMA loop {}: settled {} traversals at population {}, {} evacuees queued",
            self.carma_loop,
            settled,
            min_pop,
            sorted.len()
        );
        observer.on_carma_loop(self.carma_loop, settled, min_pop);
        Ok(sorted)
    }

    /// Population that decides open zones and dirtiness in a CARMA loop.
    fn carma_population(&self, min_unprocessed: f64) -> f64 {
        let method = self.config.solver_method;
        let mut pop = if method == SolverMethod::Casper
            || (method == SolverMethod::Ccrp && !self.config.separable_evacuee)
        {
            min_unprocessed
        } else {
            1.0
        };
        if self.global_min_pop > 0.0 {
            pop = pop.min(self.global_min_pop);
        }
        pop.max(1.0)
    }

    /// Cost for evacuee `i` to reach `junction` from its origin there.
    fn origin_offset(&mut self, i: usize, junction: VertexId) -> f64 {
        let mut best = f64::MAX;
        for k in 0..self.evacuees[i].origins.len() {
            let origin = self.evacuees[i].origins[k];
            if origin.vertex != junction {
                continue;
            }
            let offset = match origin.edge {
                Some(key) => {
                    let idx = self.edges.get_or_create(&self.network, key, false);
                    origin.portion * self.edges.current_cost(idx)
                }
                None => 0.0,
            };
            best = best.min(offset);
        }
        if best == f64::MAX { 0.0 } else { best }
    }

    /// Drop dirty parts of the kept search tree from the old generation and
    /// collect the edges to re-seed from.
    fn invalidate_dirty_subtrees(&mut self, min_pop: f64) {
        let mut leafs = EdgeContainer::new();
        let dirty = self.closed.dirty_edges(&mut self.edges, min_pop, Generation::Old);
        let dirty_count = dirty.len();
        for idx in dirty {
            let key = self.edges.edge(idx).key;
            if !self.closed.contains(key, Generation::Old) {
                continue;
            }
            let root = self.edges.dirty_subtree_root(idx, min_pop);
            self.edges.mark_subtree(root, self.closed.old_mut());
            leafs.insert(self.edges.edge(root).key);
        }
        for key in self.leafs.keys() {
            if self.closed.contains(key, Generation::Old) {
                self.closed.remove(key, Generation::Old);
                leafs.insert(key);
            }
        }
        log::debug!(
            "CARMA loop {}: {} dirty traversals, {} kept",
            self.carma_loop,
            dirty_count,
            self.closed.len(Generation::Old)
        );
        self.leafs = leafs;
    }

    /// Order `sorted` so that popping from the back yields the processing
    /// order of the configured CARMA sort.
    fn sort_for_processing(&self, sorted: &mut [usize]) {
        let ev = &self.evacuees;
        let by_prediction = |a: &usize, b: &usize| {
            ev[*a]
                .predicted_cost
                .total_cmp(&ev[*b].predicted_cost)
                .then(ev[*a].population.total_cmp(&ev[*b].population))
                .then(b.cmp(a))
        };
        let refining = self.pass > 0;
        match self.config.carma_sort {
            CarmaSort::None => sorted.sort_unstable_by(|a, b| b.cmp(a)),
            CarmaSort::FwSingle | CarmaSort::FwCont => sorted.sort_unstable_by(|a, b| by_prediction(b, a)),
            CarmaSort::ReverseFinalCost if refining => sorted.sort_unstable_by(|a, b| {
                ev[*a].previous_final_cost.total_cmp(&ev[*b].previous_final_cost).then(b.cmp(a))
            }),
            CarmaSort::ReverseEvacuationCost if refining => sorted.sort_unstable_by(|a, b| {
                ev[*a].previous_reserve_cost.total_cmp(&ev[*b].previous_reserve_cost).then(b.cmp(a))
            }),
            _ => sorted.sort_unstable_by(by_prediction),
        }
    }
}

/// Queue `label`, or lower the queued label for the same traversal.
fn push(
    labels: &mut Vec<Label>,
    heap: &mut FibHeap<usize>,
    queued: &mut Map<EdgeIdx, (usize, HeapHandle)>,
    label: Label,
) -> SolveResult<()> {
    let Some(idx) = label.edge else {
        labels.push(label);
        heap.insert(label.g, labels.len() - 1);
        return Ok(());
    };
    if let Some(&(li, handle)) = queued.get(&idx) {
        if label.g < labels[li].g {
            labels[li] = label;
            heap.decrease_key(handle, label.g)?;
        }
        return Ok(());
    }
    labels.push(label);
    let handle = heap.insert(label.g, labels.len() - 1);
    queued.insert(idx, (labels.len() - 1, handle));
    Ok(())
}
