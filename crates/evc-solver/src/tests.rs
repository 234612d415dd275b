//! Unit tests for evc-solver.
//!
//! Networks are built by hand; loaders read CSV from memory.

#[cfg(test)]
mod helpers {
    use evc_core::{EvacueeId, SolverConfig, SolverMethod, TrafficModelKind, VertexId};
    use evc_graph::{RoadNetwork, RoadNetworkBuilder};

    use crate::{Evacuee, Origin, SafeZone, Solver, SolverBuilder};

    /// CASPER, exponential model, critical density 5, saturation 10, no
    /// initial delay.
    pub fn config() -> SolverConfig {
        SolverConfig {
            solver_method: SolverMethod::Casper,
            traffic_model: TrafficModelKind::Exponential,
            critical_density_per_capacity: 5.0,
            saturation_density_per_capacity: 10.0,
            initial_delay_cost_per_population: 0.0,
            ..SolverConfig::default()
        }
    }

    /// `n` junctions in a line, `0 → 1 → … → n-1`, edge `i` joining `i` and
    /// `i + 1`.
    pub fn line(n: usize, cost: f64, capacity: f64) -> (RoadNetwork, Vec<VertexId>) {
        let mut b = RoadNetworkBuilder::new();
        let v: Vec<VertexId> = (0..n).map(|_| b.add_junction()).collect();
        for w in v.windows(2) {
            b.add_edge(w[0], w[1], cost, capacity);
        }
        (b.build(), v)
    }

    /// ```text
    ///        1
    ///   e0 /   \ e1
    ///     0     3
    ///   e2 \   / e3
    ///        2
    /// ```
    ///
    /// Top edges cost 1, bottom edges cost `bottom`.  Capacity 1.
    pub fn diamond(bottom: f64) -> (RoadNetwork, [VertexId; 4]) {
        let mut b = RoadNetworkBuilder::new();
        let v: [VertexId; 4] = std::array::from_fn(|_| b.add_junction());
        b.add_edge(v[0], v[1], 1.0, 1.0);
        b.add_edge(v[1], v[3], 1.0, 1.0);
        b.add_edge(v[0], v[2], bottom, 1.0);
        b.add_edge(v[2], v[3], bottom, 1.0);
        (b.build(), v)
    }

    pub fn at(id: u32, population: f64, vertex: VertexId) -> Evacuee {
        Evacuee::new(EvacueeId(id), population, vec![Origin::at(vertex)])
    }

    pub fn solver(config: SolverConfig, net: RoadNetwork, evacuees: Vec<Evacuee>, zones: Vec<SafeZone>) -> Solver {
        SolverBuilder::new(config, net)
            .evacuees(evacuees)
            .safe_zones(zones)
            .build()
            .expect("valid inputs")
    }

    pub fn edge_ids(solver: &Solver, id: u32) -> Vec<u32> {
        solver.evacuee(EvacueeId(id)).expect("evacuee")
            .paths
            .iter()
            .flat_map(|p| p.segments.iter().map(|s| s.key.id.0))
            .collect()
    }

    /// Every cached traversal carries exactly the population of the paths
    /// committed to it (or to its reverse when capacity is shared).
    pub fn assert_capacity_conserved(solver: &Solver) {
        let shared = solver.config().two_way_share_capacity;
        for (idx, e) in solver.edges().iter() {
            let expected: f64 = solver
                .evacuees()
                .iter()
                .flat_map(|ev| ev.paths.iter())
                .map(|p| {
                    let uses = p
                        .segments
                        .iter()
                        .filter(|s| s.key == e.key || (shared && s.key.id == e.key.id))
                        .count();
                    uses as f64 * p.routed_population
                })
                .sum();
            let got = solver.edges().reserved_pop(idx);
            assert!((got - expected).abs() < 1e-9, "{}: reserved {got}, paths carry {expected}", e.key);
        }
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use evc_core::{EdgeId, EdgeKey, EvacueeId, SolverConfig, VertexId};
    use evc_graph::GraphError;

    use super::helpers::*;
    use crate::{Evacuee, Origin, SafeZone, SolveError, SolverBuilder};

    #[test]
    fn duplicate_evacuee_rejected() {
        let (net, v) = line(2, 1.0, 1.0);
        let err = SolverBuilder::new(config(), net)
            .evacuees(vec![at(0, 1.0, v[0]), at(0, 2.0, v[0])])
            .build()
            .err();
        assert!(matches!(err, Some(SolveError::DuplicateEvacuee(EvacueeId(0)))));
    }

    #[test]
    fn unknown_junction_rejected() {
        let (net, _) = line(2, 1.0, 1.0);
        let err = SolverBuilder::new(config(), net)
            .evacuees(vec![at(0, 1.0, VertexId(9))])
            .build()
            .err();
        assert!(matches!(err, Some(SolveError::Graph(GraphError::UnknownJunction(VertexId(9))))));
    }

    #[test]
    fn unknown_edge_rejected() {
        let (net, v) = line(2, 1.0, 1.0);
        let zone = SafeZone::new(v[0], None).with_edge(EdgeKey::along(EdgeId(7)), 0.5);
        let err = SolverBuilder::new(config(), net).safe_zones(vec![zone]).build().err();
        assert!(matches!(err, Some(SolveError::Graph(GraphError::UnknownEdge(EdgeId(7))))));
    }

    #[test]
    fn origin_edge_must_end_at_origin() {
        let (net, v) = line(2, 1.0, 1.0);
        // e0 along ends at v1, not v0.
        let ev = Evacuee::new(EvacueeId(0), 1.0, vec![Origin::on_edge(v[0], EdgeKey::along(EdgeId(0)), 0.5)]);
        let err = SolverBuilder::new(config(), net).evacuees(vec![ev]).build().err();
        assert!(matches!(err, Some(SolveError::Config(_))));
    }

    #[test]
    fn zone_edge_must_start_at_zone() {
        let (net, v) = line(2, 1.0, 1.0);
        let zone = SafeZone::new(v[1], None).with_edge(EdgeKey::along(EdgeId(0)), 0.5);
        let err = SolverBuilder::new(config(), net).safe_zones(vec![zone]).build().err();
        assert!(matches!(err, Some(SolveError::Config(_))));
    }

    #[test]
    fn invalid_config_rejected() {
        let (net, _) = line(2, 1.0, 1.0);
        let bad = SolverConfig { selfish_ratio: 2.0, ..config() };
        assert!(matches!(SolverBuilder::new(bad, net).build().err(), Some(SolveError::Config(_))));
    }

    #[test]
    fn origin_and_zone_edges_are_cached_up_front() {
        let (net, v) = line(3, 1.0, 1.0);
        let origin = EdgeKey::along(EdgeId(0));
        let zone_edge = EdgeKey::along(EdgeId(1));
        let ev = Evacuee::new(EvacueeId(0), 1.0, vec![Origin::on_edge(v[1], origin, 0.5)]);
        let zone = SafeZone::new(v[1], None).with_edge(zone_edge, 0.5);
        let s = solver(config(), net, vec![ev], vec![zone]);
        assert!(s.edges().get(origin).is_some());
        assert!(s.edges().get(zone_edge).is_some());
        assert_eq!(s.edges().len(), 2);
    }
}

// ── CASPER ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod casper_tests {
    use evc_core::{Direction, EdgeId, EdgeKey, EvacueeId, SolverConfig, VertexId};
    use evc_graph::{Barriers, RoadNetwork, RoadNetworkBuilder};

    use super::helpers::*;
    use crate::{EvacueeStatus, NoopObserver, SafeZone, SolverBuilder};

    /// Diamond with top edges `e0`, `e1` and bottom edges `e2`, `e3`, each
    /// given as `(cost, capacity)`.  Callers adjust the builder before it is
    /// built.
    fn diamond_with(
        top: (f64, f64),
        bottom: (f64, f64),
        adjust: impl FnOnce(&mut RoadNetworkBuilder, &[VertexId; 4]),
    ) -> (RoadNetwork, [VertexId; 4]) {
        let mut b = RoadNetworkBuilder::new();
        let v: [VertexId; 4] = std::array::from_fn(|_| b.add_junction());
        b.add_edge(v[0], v[1], top.0, top.1);
        b.add_edge(v[1], v[3], top.0, top.1);
        b.add_edge(v[0], v[2], bottom.0, bottom.1);
        b.add_edge(v[2], v[3], bottom.0, bottom.1);
        adjust(&mut b, &v);
        (b.build(), v)
    }

    #[test]
    fn congestion_raises_committed_cost() {
        let (net, v) = line(2, 1.0, 1.0);
        let mut s = solver(config(), net, vec![at(0, 10.0, v[0])], vec![SafeZone::new(v[1], None)]);
        let report = s.solve(&mut NoopObserver).unwrap();

        assert!(report.converged);
        assert!(!report.partial);
        let path = &s.evacuee(EvacueeId(0)).unwrap().paths[0];
        assert_eq!(path.routed_population, 10.0);
        assert_eq!(path.original_cost, 1.0);
        // 10 people over a critical density of 5: 1 / exp(-0.5).
        assert!((path.reserve_cost - 0.5f64.exp()).abs() < 1e-9);
    }

    #[test]
    fn free_flow_keeps_original_cost() {
        let (net, v) = line(2, 1.0, 8.0);
        let mut s = solver(
            config(),
            net,
            vec![at(0, 3.0, v[0]), at(1, 4.0, v[0])],
            vec![SafeZone::new(v[1], None)],
        );
        s.solve(&mut NoopObserver).unwrap();
        for ev in s.evacuees() {
            assert_eq!(ev.status, EvacueeStatus::Processed);
            assert_eq!(ev.paths.len(), 1);
            assert_eq!(ev.paths[0].reserve_cost, ev.paths[0].original_cost);
        }
    }

    #[test]
    fn prefers_cheaper_branch() {
        let (net, v) = diamond(2.0);
        let mut s = solver(config(), net, vec![at(0, 1.0, v[0])], vec![SafeZone::new(v[3], None)]);
        s.solve(&mut NoopObserver).unwrap();
        assert_eq!(edge_ids(&s, 0), vec![0, 1]);
    }

    #[test]
    fn search_ignores_own_population() {
        // Ten people would saturate the top (2 × e^0.5 ≈ 3.30) but nothing
        // is committed yet, so the top is still cheaper than the bottom's 3.
        let (net, v) = diamond_with((1.0, 1.0), (1.5, 100.0), |_, _| {});
        let mut s = solver(config(), net, vec![at(0, 10.0, v[0])], vec![SafeZone::new(v[3], None)]);
        s.solve(&mut NoopObserver).unwrap();

        assert_eq!(edge_ids(&s, 0), vec![0, 1]);
        let path = &s.evacuee(EvacueeId(0)).unwrap().paths[0];
        assert!((path.reserve_cost - 2.0 * 0.5f64.exp()).abs() < 1e-9);
        assert_eq!(s.evacuee(EvacueeId(0)).unwrap().predicted_cost, 2.0);
    }

    #[test]
    fn second_evacuee_diverted_around_congestion() {
        // Top costs 2 at free flow, 2 × e^0.5 ≈ 3.30 once the first ten
        // people are committed to it; bottom 3.
        let (net, v) = diamond(1.5);
        let mut s = solver(
            config(),
            net,
            vec![at(0, 10.0, v[0]), at(1, 10.0, v[0])],
            vec![SafeZone::new(v[3], None)],
        );
        s.solve(&mut NoopObserver).unwrap();

        let routes = s.routes();
        assert_eq!(routes.len(), 2);
        let ids = |r: &crate::RouteRecord| r.segments.iter().map(|x| x.edge_id.0).collect::<Vec<_>>();
        assert_eq!(ids(&routes[0]), vec![0, 1]);
        assert_eq!(ids(&routes[1]), vec![2, 3]);
        assert_capacity_conserved(&s);
    }

    #[test]
    fn barrier_makes_evacuee_unreachable() {
        let (net, v) = line(2, 1.0, 1.0);
        let mut barriers = Barriers::new();
        barriers.block_edge(EdgeId(0));
        let mut s = SolverBuilder::new(config(), net)
            .barriers(barriers)
            .evacuees(vec![at(0, 10.0, v[0])])
            .safe_zones(vec![SafeZone::new(v[1], None)])
            .build()
            .unwrap();
        let report = s.solve(&mut NoopObserver).unwrap();

        assert_eq!(report.unreachable, vec![EvacueeId(0)]);
        assert_eq!(report.unrouted_population, 10.0);
        assert_eq!(report.paths, 0);
        assert!(report.partial);
        assert_eq!(s.evacuee(EvacueeId(0)).unwrap().status, EvacueeStatus::Unreachable);
    }

    #[test]
    fn turn_restriction_forces_detour() {
        // 0 → 1 → 3 directly, or 0 → 1 → 2 → 3 around the banned turn.
        let mut b = RoadNetworkBuilder::new();
        let v: [VertexId; 4] = std::array::from_fn(|_| b.add_junction());
        let e0 = b.add_edge(v[0], v[1], 1.0, 100.0);
        let e1 = b.add_edge(v[1], v[3], 1.0, 100.0);
        b.add_edge(v[1], v[2], 1.0, 100.0);
        b.add_edge(v[2], v[3], 1.0, 100.0);
        b.add_turn_restriction(EdgeKey::along(e0), EdgeKey::along(e1));
        let mut s = solver(config(), b.build(), vec![at(0, 1.0, v[0])], vec![SafeZone::new(v[3], None)]);
        s.solve(&mut NoopObserver).unwrap();

        assert_eq!(edge_ids(&s, 0), vec![0, 2, 3]);
        assert_eq!(s.evacuee(EvacueeId(0)).unwrap().paths[0].reserve_cost, 3.0);
    }

    #[test]
    fn one_way_edge_is_not_driven_backwards() {
        // e1 may only be driven from 3 to 1.
        let (net, v) = diamond_with((1.0, 100.0), (2.0, 100.0), |b, _| {
            b.restrict_direction(EdgeId(1), Direction::Along);
        });
        let mut s = solver(config(), net, vec![at(0, 1.0, v[0])], vec![SafeZone::new(v[3], None)]);
        s.solve(&mut NoopObserver).unwrap();
        assert_eq!(edge_ids(&s, 0), vec![2, 3]);
    }

    #[test]
    fn blocked_junction_is_avoided() {
        let (net, v) = diamond(2.0);
        let mut barriers = Barriers::new();
        barriers.block_junction(v[1]);
        let mut s = SolverBuilder::new(config(), net)
            .barriers(barriers)
            .evacuees(vec![at(0, 1.0, v[0])])
            .safe_zones(vec![SafeZone::new(v[3], None)])
            .build()
            .unwrap();
        s.solve(&mut NoopObserver).unwrap();
        assert_eq!(edge_ids(&s, 0), vec![2, 3]);
    }

    #[test]
    fn zone_behind_banned_turn_is_skipped() {
        // Zone A sits half way along e1 and costs 1.5, but the turn from e0
        // onto e1 is banned; zone B at the end of e2 costs 3.
        let mut b = RoadNetworkBuilder::new();
        let v: [VertexId; 4] = std::array::from_fn(|_| b.add_junction());
        let e0 = b.add_edge(v[0], v[1], 1.0, 100.0);
        let e1 = b.add_edge(v[1], v[2], 1.0, 100.0);
        b.add_edge(v[0], v[3], 3.0, 100.0);
        b.add_turn_restriction(EdgeKey::along(e0), EdgeKey::along(e1));
        let zones = vec![
            SafeZone::new(v[1], None).with_edge(EdgeKey::along(e1), 0.5),
            SafeZone::new(v[3], None),
        ];
        let mut s = solver(config(), b.build(), vec![at(0, 1.0, v[0])], zones);
        s.solve(&mut NoopObserver).unwrap();

        let routes = s.routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].zone_vertex, v[3]);
        assert_eq!(edge_ids(&s, 0), vec![2]);
    }

    #[test]
    fn closed_zone_is_skipped() {
        let (net, v) = line(3, 1.0, 1.0);
        let cfg = SolverConfig { cost_per_zone_density: 1.0, ..config() };
        let zones = vec![SafeZone::new(v[1], Some(0.0)), SafeZone::new(v[2], None)];
        let mut s = solver(cfg, net, vec![at(0, 1.0, v[0])], zones);
        s.solve(&mut NoopObserver).unwrap();
        let routes = s.routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].zone_vertex, v[2]);
        assert_eq!(edge_ids(&s, 0), vec![0, 1]);
    }

    #[test]
    fn evacuee_at_zone_gets_empty_path() {
        let (net, v) = line(2, 1.0, 1.0);
        let mut s = solver(config(), net, vec![at(0, 4.0, v[1])], vec![SafeZone::new(v[1], None)]);
        let report = s.solve(&mut NoopObserver).unwrap();
        let ev = s.evacuee(EvacueeId(0)).unwrap();
        assert_eq!(ev.status, EvacueeStatus::Processed);
        assert_eq!(ev.paths.len(), 1);
        assert!(ev.paths[0].segments.is_empty());
        assert_eq!(ev.paths[0].reserve_cost, 0.0);
        assert_eq!(report.routed_population, 4.0);
    }

    #[test]
    fn zero_population_is_processed_without_paths() {
        let (net, v) = line(2, 1.0, 1.0);
        let mut s = solver(config(), net, vec![at(0, 0.0, v[0])], vec![SafeZone::new(v[1], None)]);
        let report = s.solve(&mut NoopObserver).unwrap();
        let ev = s.evacuee(EvacueeId(0)).unwrap();
        assert_eq!(ev.status, EvacueeStatus::Processed);
        assert!(ev.paths.is_empty());
        assert!(!report.partial);
    }
}

// ── CCRP ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod ccrp_tests {
    use evc_core::{EvacueeId, SolverConfig, SolverMethod};

    use super::helpers::*;
    use crate::{NoopObserver, SafeZone};

    fn ccrp(separable: bool) -> SolverConfig {
        SolverConfig {
            solver_method: SolverMethod::Ccrp,
            separable_evacuee: separable,
            critical_density_per_capacity: 12.0,
            ..config()
        }
    }

    #[test]
    fn separable_population_fills_remaining_capacity() {
        let (net, v) = line(2, 1.0, 1.0);
        let mut s = solver(ccrp(true), net, vec![at(0, 20.0, v[0])], vec![SafeZone::new(v[1], None)]);
        s.solve(&mut NoopObserver).unwrap();

        let paths = &s.evacuee(EvacueeId(0)).unwrap().paths;
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].routed_population, 12.0);
        assert_eq!(paths[1].routed_population, 8.0);
        assert_eq!(paths[0].reserve_cost, 1.0);
        assert!(paths[1].reserve_cost > paths[0].reserve_cost);
        assert_capacity_conserved(&s);
    }

    #[test]
    fn inseparable_population_moves_together() {
        let (net, v) = line(2, 1.0, 1.0);
        let mut s = solver(ccrp(false), net, vec![at(0, 20.0, v[0])], vec![SafeZone::new(v[1], None)]);
        s.solve(&mut NoopObserver).unwrap();
        let paths = &s.evacuee(EvacueeId(0)).unwrap().paths;
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].routed_population, 20.0);
    }
}

// ── Ordering & chunking ───────────────────────────────────────────────────────

#[cfg(test)]
mod order_tests {
    use evc_core::{CarmaSort, EvacueeId, SolverConfig};

    use super::helpers::*;
    use crate::{NoopObserver, SafeZone, Solver};

    /// Evacuee 0 one edge from the zone, evacuee 1 three edges away.
    fn near_and_far(sort: CarmaSort) -> Solver {
        let (net, v) = line(4, 1.0, 100.0);
        let cfg = SolverConfig { carma_sort: sort, ..config() };
        let mut s = solver(cfg, net, vec![at(0, 1.0, v[2]), at(1, 1.0, v[0])], vec![SafeZone::new(v[3], None)]);
        s.solve(&mut NoopObserver).unwrap();
        s
    }

    fn order_of(s: &Solver, id: u32) -> Option<u32> {
        s.evacuee(EvacueeId(id)).unwrap().process_order
    }

    #[test]
    fn backward_sort_routes_farthest_first() {
        let s = near_and_far(CarmaSort::BwCont);
        assert_eq!(order_of(&s, 1), Some(0));
        assert_eq!(order_of(&s, 0), Some(1));
    }

    #[test]
    fn forward_sort_routes_nearest_first() {
        let s = near_and_far(CarmaSort::FwCont);
        assert_eq!(order_of(&s, 0), Some(0));
        assert_eq!(order_of(&s, 1), Some(1));
    }

    #[test]
    fn no_sort_keeps_input_order() {
        let s = near_and_far(CarmaSort::None);
        assert_eq!(order_of(&s, 0), Some(0));
        assert_eq!(order_of(&s, 1), Some(1));
    }

    #[test]
    fn predictions_match_distance() {
        let s = near_and_far(CarmaSort::BwSingle);
        assert_eq!(s.evacuee(EvacueeId(0)).unwrap().predicted_cost, 1.0);
        assert_eq!(s.evacuee(EvacueeId(1)).unwrap().predicted_cost, 3.0);
    }

    #[test]
    fn separable_casper_splits_into_chunks() {
        let (net, v) = line(2, 1.0, 1.0);
        let cfg = SolverConfig { separable_evacuee: true, ..config() };
        let mut s = solver(cfg, net, vec![at(0, 30.0, v[0])], vec![SafeZone::new(v[1], None)]);
        let report = s.solve(&mut NoopObserver).unwrap();

        // Saturation 10 halves to 5, raised to a third of the smallest group.
        assert_eq!(s.global_min_pop(), 10.0);
        let paths = &s.evacuee(EvacueeId(0)).unwrap().paths;
        assert_eq!(paths.len(), 3);
        assert!(paths.iter().all(|p| p.routed_population == 10.0));
        assert_eq!(report.routed_population, 30.0);
        assert_capacity_conserved(&s);
    }

    #[test]
    fn no_chunks_below_saturation() {
        let (net, v) = line(2, 1.0, 1.0);
        let cfg = SolverConfig { separable_evacuee: true, ..config() };
        let mut s = solver(cfg, net, vec![at(0, 8.0, v[0])], vec![SafeZone::new(v[1], None)]);
        s.solve(&mut NoopObserver).unwrap();
        assert_eq!(s.global_min_pop(), 0.0);
        assert_eq!(s.evacuee(EvacueeId(0)).unwrap().paths.len(), 1);
    }
}

// ── Invariants over a full solve ──────────────────────────────────────────────

#[cfg(test)]
mod invariant_tests {
    use evc_core::SolverConfig;
    use evc_graph::RoadNetworkBuilder;

    use super::helpers::*;
    use crate::{Evacuee, EvacueeStatus, NoopObserver, SafeZone, Solver};

    fn crowd(v: &[evc_core::VertexId; 4]) -> Vec<Evacuee> {
        vec![at(0, 4.0, v[0]), at(1, 3.0, v[0]), at(2, 6.0, v[1]), at(3, 2.0, v[2]), at(4, 5.0, v[0])]
    }

    fn solved(cfg: SolverConfig) -> Solver {
        let (net, v) = diamond(1.5);
        let mut s = solver(cfg, net, crowd(&v), vec![SafeZone::new(v[3], None)]);
        s.solve(&mut NoopObserver).unwrap();
        s
    }

    #[test]
    fn capacity_conserved_with_shared_two_way_capacity() {
        assert_capacity_conserved(&solved(config()));
    }

    #[test]
    fn capacity_conserved_per_direction() {
        assert_capacity_conserved(&solved(SolverConfig { two_way_share_capacity: false, ..config() }));
    }

    #[test]
    fn every_reachable_evacuee_fully_routed() {
        let s = solved(config());
        for ev in s.evacuees() {
            assert_eq!(ev.status, EvacueeStatus::Processed);
            assert!((ev.routed_population() - ev.population).abs() < 1e-9);
        }
    }

    #[test]
    fn final_costs_match_reservations() {
        let cfg = SolverConfig { initial_delay_cost_per_population: 0.01, ..config() };
        let s = solved(cfg);
        for ev in s.evacuees() {
            let mut worst: f64 = 0.0;
            for p in &ev.paths {
                let travel: f64 = p.segments.iter().map(|x| s.edges().current_cost(x.edge) * x.portion).sum();
                let expected = travel + p.routed_population * 0.01;
                assert!((p.final_cost - expected).abs() < 1e-9);
                assert!(p.final_cost >= p.original_cost);
                worst = worst.max(p.final_cost);
            }
            assert_eq!(ev.final_cost, worst);
        }
    }

    #[test]
    fn second_solve_changes_nothing() {
        let mut s = solved(config());
        let before = s.routes();
        let report = s.solve(&mut NoopObserver).unwrap();
        assert_eq!(s.routes(), before);
        assert!(report.converged);
        assert_eq!(report.carma_loops, 0);
    }

    #[test]
    fn three_generation_carma_routes_everyone() {
        let cfg = SolverConfig { three_generation_carma: true, carma_performance_ratio: 0.0, ..config() };
        let (net, v) = line(4, 1.0, 1.0);
        let crowd = vec![at(0, 6.0, v[0]), at(1, 6.0, v[1]), at(2, 6.0, v[2]), at(3, 6.0, v[0])];
        let mut s = solver(cfg, net, crowd, vec![SafeZone::new(v[3], None)]);
        let report = s.solve(&mut NoopObserver).unwrap();

        assert!(report.carma_loops >= 2);
        assert!(!report.partial);
        assert_eq!(report.routed_population, 24.0);
        assert_capacity_conserved(&s);
    }

    #[test]
    fn selfish_penalty_keeps_every_evacuee_routed() {
        let s = solved(SolverConfig { selfish_ratio: 0.5, ..config() });
        let total: f64 = s.evacuees().iter().map(|e| e.routed_population()).sum();
        assert_eq!(total, 20.0);
        assert_capacity_conserved(&s);
    }

    #[test]
    fn selfish_penalty_with_converging_routes() {
        // Two routes of cost 3 meet at junction 3 and share the exit e4, so
        // the exit is reached again from a second label at the same junction.
        let mut b = RoadNetworkBuilder::new();
        let v: [evc_core::VertexId; 5] = std::array::from_fn(|_| b.add_junction());
        b.add_edge(v[0], v[1], 1.0, 1.0);
        b.add_edge(v[1], v[3], 2.0, 1.0);
        b.add_edge(v[0], v[2], 2.0, 1.0);
        b.add_edge(v[2], v[3], 1.0, 1.0);
        b.add_edge(v[3], v[4], 1.0, 1.0);
        let crowd = (0..3).map(|i| at(i, 6.0, v[0])).collect();
        let cfg = SolverConfig { selfish_ratio: 0.5, ..config() };
        let mut s = solver(cfg, b.build(), crowd, vec![SafeZone::new(v[4], None)]);
        let report = s.solve(&mut NoopObserver).unwrap();

        assert_eq!(report.routed_population, 18.0);
        assert!(!report.partial);
        for route in s.routes() {
            assert_eq!(route.segments.len(), 3);
            assert_eq!(route.segments.last().map(|x| x.edge_id.0), Some(4));
        }
        assert_capacity_conserved(&s);
    }
}

// ── Refinement & cancellation ─────────────────────────────────────────────────

#[cfg(test)]
mod refinement_tests {
    use evc_core::{CancelToken, EvacueeId, SolverConfig};

    use super::helpers::*;
    use crate::{Evacuee, EvcPath, EvacueeStatus, NoopObserver, SafeZone, SolveError, SolveObserver, SolverBuilder};

    #[test]
    fn refinement_stays_within_budget() {
        let cfg = SolverConfig { iterative_ratio: 0.05, max_refinement_passes: 2, ..config() };
        let (net, v) = diamond(1.5);
        let crowd = (0..6).map(|i| at(i, 8.0, v[0])).collect();
        let mut s = solver(cfg, net, crowd, vec![SafeZone::new(v[3], None)]);
        let report = s.solve(&mut NoopObserver).unwrap();

        assert!(report.refinement_passes <= 2);
        assert_eq!(report.routed_population, 48.0);
        assert_eq!(report.partial, !report.converged);
        assert_capacity_conserved(&s);
    }

    #[test]
    fn no_refinement_when_ratio_is_zero() {
        let (net, v) = diamond(1.5);
        let crowd = (0..4).map(|i| at(i, 8.0, v[0])).collect();
        let mut s = solver(config(), net, crowd, vec![SafeZone::new(v[3], None)]);
        let report = s.solve(&mut NoopObserver).unwrap();
        assert_eq!(report.refinement_passes, 0);
        assert!(report.converged);
    }

    #[test]
    fn cancelled_before_start() {
        let (net, v) = line(2, 1.0, 1.0);
        let token = CancelToken::new();
        token.cancel();
        let mut s = SolverBuilder::new(config(), net)
            .evacuees(vec![at(0, 1.0, v[0])])
            .safe_zones(vec![SafeZone::new(v[1], None)])
            .cancel_token(token.clone())
            .build()
            .unwrap();
        assert!(matches!(s.solve(&mut NoopObserver), Err(SolveError::Cancelled)));
        assert!(s.evacuee(EvacueeId(0)).unwrap().paths.is_empty());

        token.reset();
        s.solve(&mut NoopObserver).unwrap();
        assert_eq!(s.evacuee(EvacueeId(0)).unwrap().status, EvacueeStatus::Processed);
    }

    /// Fires the token once the first path is committed.
    struct CancelAfterFirst(CancelToken);

    impl SolveObserver for CancelAfterFirst {
        fn on_path(&mut self, _evacuee: &Evacuee, _path: &EvcPath) {
            self.0.cancel();
        }
    }

    #[test]
    fn cancellation_keeps_committed_paths() {
        let (net, v) = line(2, 1.0, 100.0);
        let token = CancelToken::new();
        let mut s = SolverBuilder::new(config(), net)
            .evacuees(vec![at(0, 1.0, v[0]), at(1, 1.0, v[0])])
            .safe_zones(vec![SafeZone::new(v[1], None)])
            .cancel_token(token.clone())
            .build()
            .unwrap();

        let result = s.solve(&mut CancelAfterFirst(token.clone()));
        assert!(matches!(result, Err(SolveError::Cancelled)));
        let routed: Vec<_> = s.evacuees().iter().filter(|e| !e.paths.is_empty()).collect();
        assert_eq!(routed.len(), 1);
        assert_capacity_conserved(&s);

        token.reset();
        let report = s.solve(&mut NoopObserver).unwrap();
        assert_eq!(report.routed_population, 2.0);
        assert_capacity_conserved(&s);
    }
}

// ── Positions on edges ────────────────────────────────────────────────────────

#[cfg(test)]
mod segment_tests {
    use evc_core::{Direction, EdgeId, EdgeKey, EvacueeId};

    use super::helpers::*;
    use crate::{Evacuee, NoopObserver, Origin, SafeZone};

    #[test]
    fn origin_on_edge_covers_remaining_portion() {
        let (net, v) = line(3, 1.0, 1.0);
        let ev = Evacuee::new(EvacueeId(0), 1.0, vec![Origin::on_edge(v[1], EdgeKey::along(EdgeId(0)), 0.5)]);
        let mut s = solver(config(), net, vec![ev], vec![SafeZone::new(v[2], None)]);
        s.solve(&mut NoopObserver).unwrap();

        let route = &s.routes()[0];
        assert_eq!(route.segments.len(), 2);
        let first = &route.segments[0];
        assert_eq!((first.edge_id, first.direction), (EdgeId(0), Direction::Along));
        assert_eq!((first.from_position, first.to_position), (0.5, 1.0));
        assert_eq!(first.portion, 0.5);
        assert_eq!((route.segments[1].from_position, route.segments[1].to_position), (0.0, 1.0));
        assert_eq!(route.reserve_cost, 1.5);
    }

    #[test]
    fn zone_on_edge_ends_part_way() {
        let (net, v) = line(3, 1.0, 1.0);
        let zone = SafeZone::new(v[1], None).with_edge(EdgeKey::along(EdgeId(1)), 0.5);
        let mut s = solver(config(), net, vec![at(0, 1.0, v[0])], vec![zone]);
        s.solve(&mut NoopObserver).unwrap();

        let route = &s.routes()[0];
        let ids: Vec<u32> = route.segments.iter().map(|x| x.edge_id.0).collect();
        assert_eq!(ids, vec![0, 1]);
        let last = &route.segments[1];
        assert_eq!((last.from_position, last.to_position), (0.0, 0.5));
        assert_eq!(route.reserve_cost, 1.5);
        assert_eq!(s.safe_zones()[0].reserved_population, 1.0);
    }

    #[test]
    fn edge_stats_report_load() {
        let (net, v) = line(2, 1.0, 100.0);
        let mut s = solver(
            config(),
            net,
            vec![at(0, 3.0, v[0]), at(1, 4.0, v[0])],
            vec![SafeZone::new(v[1], None)],
        );
        s.solve(&mut NoopObserver).unwrap();

        let stats = s.edge_stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].edge_id, EdgeId(0));
        assert_eq!(stats[0].reserved_population, 7.0);
        assert_eq!(stats[0].path_count, 2);
        assert_eq!(stats[0].congestion, 1.0);
    }
}

// ── Loaders ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod loader_tests {
    use std::io::Cursor;

    use evc_core::{Direction, EdgeId, EdgeKey, EvacueeId, VertexId};

    use crate::{load_evacuees_reader, load_safe_zones_reader, SolveError};

    #[test]
    fn evacuee_rows_grouped_by_id() {
        let csv = "evacuee_id,population,vertex,edge,direction,portion\n\
                   1,10,7,12,against,0.4\n\
                   0,25,4,,,\n\
                   1,10,9,,,\n";
        let evs = load_evacuees_reader(Cursor::new(csv)).unwrap();
        assert_eq!(evs.len(), 2);
        assert_eq!(evs[0].id, EvacueeId(0));
        assert_eq!(evs[0].population, 25.0);
        assert_eq!(evs[1].origins.len(), 2);
        let o = evs[1].origins[0];
        assert_eq!(o.vertex, VertexId(7));
        assert_eq!(o.edge, Some(EdgeKey::new(EdgeId(12), Direction::Against)));
        assert_eq!(o.portion, 0.4);
        assert_eq!(evs[1].origins[1].edge, None);
    }

    #[test]
    fn missing_portion_defaults_to_whole_edge() {
        let csv = "evacuee_id,population,vertex,edge,direction,portion\n0,5,1,0,,\n";
        let evs = load_evacuees_reader(Cursor::new(csv)).unwrap();
        assert_eq!(evs[0].origins[0].portion, 1.0);
        assert_eq!(evs[0].origins[0].edge, Some(EdgeKey::along(EdgeId(0))));
    }

    #[test]
    fn bad_direction_is_parse_error() {
        let csv = "evacuee_id,population,vertex,edge,direction,portion\n0,5,1,0,sideways,\n";
        assert!(matches!(load_evacuees_reader(Cursor::new(csv)), Err(SolveError::Parse(_))));
    }

    #[test]
    fn safe_zones_parse_capacity_and_edge() {
        let csv = "vertex,capacity,edge,direction,position\n3,,,,\n5,200,8,against,0.5\n";
        let zones = load_safe_zones_reader(Cursor::new(csv)).unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].capacity, None);
        assert_eq!(zones[0].edge, None);
        assert_eq!(zones[1].capacity, Some(200.0));
        assert_eq!(zones[1].edge, Some(EdgeKey::against(EdgeId(8))));
        assert_eq!(zones[1].position_along, 0.5);
    }
}

// ── Observer ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod observer_tests {
    use super::helpers::*;
    use crate::{Evacuee, EvcPath, SafeZone, SolveObserver, SolveReport};

    #[derive(Default)]
    struct Counter {
        loops:  u32,
        paths:  usize,
        passes: u32,
        ends:   u32,
    }

    impl SolveObserver for Counter {
        fn on_carma_loop(&mut self, _l: u32, _settled: usize, _min_pop: f64) { self.loops += 1; }
        fn on_path(&mut self, _e: &Evacuee, _p: &EvcPath) { self.paths += 1; }
        fn on_pass_end(&mut self, _pass: u32, _flagged: usize) { self.passes += 1; }
        fn on_solve_end(&mut self, _r: &SolveReport) { self.ends += 1; }
    }

    #[test]
    fn callbacks_match_report() {
        let (net, v) = diamond(1.5);
        let mut s = solver(
            config(),
            net,
            vec![at(0, 2.0, v[0]), at(1, 3.0, v[1])],
            vec![SafeZone::new(v[3], None)],
        );
        let mut obs = Counter::default();
        let report = s.solve(&mut obs).unwrap();
        assert_eq!(obs.loops, report.carma_loops);
        assert_eq!(obs.paths, report.paths);
        assert_eq!(obs.passes, 1);
        assert_eq!(obs.ends, 1);
    }
}
