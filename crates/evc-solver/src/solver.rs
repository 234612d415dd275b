//! The `Solver` struct and its solve passes.

use evc_core::{CancelToken, EvacueeId, SolverConfig, SolverMethod, VertexId};
use evc_graph::{Barriers, EdgeCache, EdgeContainer, EdgeMapTwoGen, Generation, RoadNetwork, VertexCache};

use crate::evacuee::{Evacuee, EvacueeStatus, EvcPath, SafeZone};
use crate::{Map, SolveError, SolveObserver, SolveResult};

/// Speed in m/s used to relate distance cost units to time.
pub(crate) const COMMON_SPEED_MPS: f64 = 25.0;

/// Relative slack when comparing routed and total population.
const POPULATION_EPSILON: f64 = 1e-9;

// ── SolveReport ───────────────────────────────────────────────────────────────

/// Outcome of one [`Solver::solve`] call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolveReport {
    pub evacuees:            usize,
    pub paths:               usize,
    pub routed_population:   f64,
    /// Population of evacuees that got no path, or only part of one.
    pub unrouted_population: f64,
    pub unreachable:         Vec<EvacueeId>,
    pub carma_loops:         u32,
    pub refinement_passes:   u32,
    /// Largest final cost over all evacuees.
    pub max_final_cost:      f64,
    /// `false` when the refinement budget ran out with evacuees still flagged.
    pub converged:           bool,
    /// Someone is unreachable, unrouted, or the budget ran out.
    pub partial:             bool,
}

// ── Solver ────────────────────────────────────────────────────────────────────

/// Capacity-aware evacuation router.
///
/// `Solver` owns the network, the demand, and every cache used while
/// solving:
///
/// 1. **CARMA loop**: a backward Dijkstra from the safe zones refreshes the
///    per-vertex heuristics and orders the unprocessed evacuees.
/// 2. **Routing**: evacuees are routed one at a time with a forward A*
///    search over congestion-aware costs; each path reserves its population
///    on every edge it uses.  Once enough visited edges turn dirty the solver
///    goes back to step 1.
/// 3. **Refinement**: with `iterative_ratio > 0`, evacuees whose costs
///    drifted lose their paths and are routed again in another pass.
///
/// Create via [`SolverBuilder`][crate::SolverBuilder].
pub struct Solver {
    pub(crate) config:   SolverConfig,
    pub(crate) network:  RoadNetwork,
    pub(crate) barriers: Barriers,
    pub(crate) cancel:   CancelToken,

    pub(crate) edges:    EdgeCache,
    pub(crate) vertices: VertexCache,

    pub(crate) evacuees:      Vec<Evacuee>,
    pub(crate) evacuee_index: Map<EvacueeId, usize>,
    pub(crate) zones:         Vec<SafeZone>,
    pub(crate) zone_index:    Map<VertexId, Vec<usize>>,

    // ── CARMA state ───────────────────────────────────────────────────────
    pub(crate) closed:        EdgeMapTwoGen,
    pub(crate) leafs:         EdgeContainer,
    pub(crate) carma_loop:    u32,
    pub(crate) carma_min_pop: f64,
    pub(crate) carma_loops:   u32,

    // ── Pass state ────────────────────────────────────────────────────────
    /// Chunk size for separable CASPER, `0` when populations are not split.
    pub(crate) global_min_pop:   f64,
    pub(crate) max_evacuee_cost: f64,
    pub(crate) path_order:       u32,
    pub(crate) process_order:    u32,
    pub(crate) pass:             u32,
}

impl Solver {
    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn edges(&self) -> &EdgeCache {
        &self.edges
    }

    pub fn evacuees(&self) -> &[Evacuee] {
        &self.evacuees
    }

    pub fn evacuee(&self, id: EvacueeId) -> Option<&Evacuee> {
        self.evacuee_index.get(&id).map(|&i| &self.evacuees[i])
    }

    pub fn safe_zones(&self) -> &[SafeZone] {
        &self.zones
    }

    /// Chunk size used to split populations, `0` when they are not split.
    pub fn global_min_pop(&self) -> f64 {
        self.global_min_pop
    }

    pub(crate) fn path(&self, evacuee: EvacueeId, path: u32) -> Option<&EvcPath> {
        let i = *self.evacuee_index.get(&evacuee)?;
        self.evacuees[i].paths.get(path as usize)
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Route every unprocessed evacuee.
    ///
    /// Returns [`SolveError::Cancelled`] if the cancel token fires; paths
    /// committed before that stay in place and a later call picks up the
    /// remaining evacuees.  Calling `solve` again on a converged state
    /// changes nothing.
    pub fn solve<O: SolveObserver>(&mut self, observer: &mut O) -> SolveResult<SolveReport> {
        self.pass = 0;
        self.carma_loops = 0;
        self.determine_global_min_pop();
        for ev in &mut self.evacuees {
            if ev.status == EvacueeStatus::Unprocessed && ev.population <= 0.0 {
                ev.status = EvacueeStatus::Processed;
            }
        }

        let converged = loop {
            self.solve_pass(observer)?;
            self.update_final_costs();

            let flagged = self.second_chance_candidates();
            observer.on_pass_end(self.pass, flagged.len());
            log::debug!(
                "pass {}: {} CARMA loops so far, {} evacuees flagged for another pass",
                self.pass,
                self.carma_loops,
                flagged.len()
            );
            if flagged.is_empty() {
                break true;
            }
            if self.pass >= self.config.max_refinement_passes {
                break false;
            }

            self.pass += 1;
            for i in flagged {
                self.withdraw(i);
            }
            self.reset_search_state();
        };

        let report = self.report(converged);
        if report.partial {
            log::warn!(
                "partial solution: {} unreachable evacuees, {} people unrouted, converged = {}",
                report.unreachable.len(),
                report.unrouted_population,
                report.converged
            );
        }
        log::info!(
            "solved {} evacuees: {} paths, {} people routed, max cost {:.3}",
            report.evacuees,
            report.paths,
            report.routed_population,
            report.max_final_cost
        );
        observer.on_solve_end(&report);
        Ok(report)
    }

    // ── Solve pass ────────────────────────────────────────────────────────

    /// Alternate CARMA loops and routing until no evacuee is left.
    fn solve_pass<O: SolveObserver>(&mut self, observer: &mut O) -> SolveResult<()> {
        loop {
            // Processing order: pop from the back.
            let mut order = self.run_carma(observer)?;
            if order.is_empty() {
                return Ok(());
            }

            let mut visited = 0usize;
            let mut dirty_visited = 0usize;
            while let Some(i) = order.pop() {
                if self.cancel.is_cancelled() {
                    return Err(SolveError::Cancelled);
                }
                if self.evacuees[i].status != EvacueeStatus::Unprocessed {
                    continue;
                }
                let (v, d) = self.route_evacuee(i, observer)?;
                visited += v;
                dirty_visited += d;

                if self.config.solver_method == SolverMethod::Casper
                    && dirty_visited as f64 > self.config.carma_performance_ratio * visited as f64
                {
                    break;
                }
            }
        }
    }

    /// Route all of evacuee `i`, possibly over several paths.  Returns the
    /// number of edges visited and how many of them were dirty.
    fn route_evacuee<O: SolveObserver>(&mut self, i: usize, observer: &mut O) -> SolveResult<(usize, usize)> {
        let predicted = self.evacuees[i].predicted_cost;
        if predicted < f64::MAX {
            self.max_evacuee_cost = self.max_evacuee_cost.max(predicted);
        }

        let mut left = self.evacuees[i].population - self.evacuees[i].routed_population();
        let mut visited = 0;
        let mut dirty_visited = 0;

        while left > 0.0 {
            let search_pop = self.population_to_route(left);
            let outcome = self.find_path(i, search_pop)?;
            visited += outcome.visited;
            dirty_visited += outcome.dirty_visited;

            let Some(hit) = outcome.hit else {
                log::warn!(
                    "evacuee {} has no reachable safe zone for {} people",
                    self.evacuees[i].id,
                    left
                );
                break;
            };

            let segments = self.assemble_segments(i, &hit);
            let routed = match self.config.solver_method {
                SolverMethod::Ccrp => self.ccrp_population(&segments, left),
                _ => search_pop.min(left),
            };
            let p = self.commit_path(i, hit.zone, segments, routed);
            self.vertices.release_side();
            observer.on_path(&self.evacuees[i], &self.evacuees[i].paths[p]);
            left -= routed;
        }
        self.vertices.release_side();

        let order = self.process_order;
        self.process_order += 1;
        let ev = &mut self.evacuees[i];
        ev.process_order = Some(order);
        ev.status = if ev.paths.is_empty() {
            EvacueeStatus::Unreachable
        } else {
            EvacueeStatus::Processed
        };
        Ok((visited, dirty_visited))
    }

    /// Population to search with for the `left` people still unrouted.
    fn population_to_route(&self, left: f64) -> f64 {
        match self.config.solver_method {
            SolverMethod::Ccrp => 1.0,
            SolverMethod::Casper if self.global_min_pop > 0.0 => {
                let chunk = self.global_min_pop;
                if left - chunk < chunk { left } else { chunk }
            }
            _ => left,
        }
    }

    /// Smallest chunk a separable CASPER solve splits populations into.
    ///
    /// Splitting only pays off when a single edge can saturate: if the
    /// largest population fits under the saturation density, or the initial
    /// delay alone keeps people spread out, nothing is split.
    fn determine_global_min_pop(&mut self) {
        self.global_min_pop = 0.0;
        if !self.config.separable_evacuee || self.config.solver_method != SolverMethod::Casper {
            return;
        }
        let saturation = self.edges.model().saturation_per_capacity;
        let common = self.config.cost_unit.units_per_day(COMMON_SPEED_MPS) / (60.0 * 24.0);
        let delay = self.config.initial_delay_cost_per_population;

        let pops = self.evacuees.iter().map(|e| e.population).filter(|&p| p > 0.0);
        let max_pop = pops.clone().fold(1.0, f64::max);
        let min_pop = pops.fold(f64::MAX, f64::min);

        if (delay > 0.0 && common / delay <= saturation) || max_pop <= saturation {
            return;
        }
        let mut chunk = saturation / 2.0;
        if chunk * 3.0 < min_pop {
            chunk = min_pop / 3.0;
        }
        self.global_min_pop = chunk.max(1.0);
        log::debug!("splitting populations into chunks of {}", self.global_min_pop);
    }

    /// Drop per-pass search state before a refinement pass.
    fn reset_search_state(&mut self) {
        self.vertices.clear();
        self.edges.clear_tree();
        self.closed.clear(Generation::All);
        self.leafs.clear();
        self.carma_loop = 0;
    }

    fn report(&self, converged: bool) -> SolveReport {
        let mut report = SolveReport {
            evacuees: self.evacuees.len(),
            carma_loops: self.carma_loops,
            refinement_passes: self.pass,
            converged,
            ..SolveReport::default()
        };
        for ev in &self.evacuees {
            let routed = ev.routed_population();
            report.paths += ev.paths.len();
            report.routed_population += routed;
            let unrouted = ev.population - routed;
            if unrouted > POPULATION_EPSILON * ev.population.max(1.0) {
                report.unrouted_population += unrouted;
            }
            report.max_final_cost = report.max_final_cost.max(ev.final_cost);
            if ev.status == EvacueeStatus::Unreachable {
                report.unreachable.push(ev.id);
            }
        }
        report.partial = !converged || !report.unreachable.is_empty() || report.unrouted_population > 0.0;
        report
    }
}
