//! Fluent builder for constructing a [`Solver`].

use evc_core::{CancelToken, EdgeKey, SolverConfig};
use evc_graph::{
    Barriers, CostModel, EdgeCache, EdgeContainer, EdgeMapTwoGen, GraphError, RoadNetwork, VertexCache,
};

use crate::evacuee::{Evacuee, SafeZone};
use crate::{Map, SolveError, SolveResult, Solver};

/// Fluent builder for [`Solver`].
///
/// # Required inputs
///
/// - [`SolverConfig`] — method, traffic model, densities, sort, …
/// - [`RoadNetwork`] — from [`evc_graph::RoadNetworkBuilder`] or
///   [`evc_graph::load_network_csv`]
///
/// # Optional inputs (have defaults)
///
/// | Method               | Default                  |
/// |----------------------|--------------------------|
/// | `.evacuees(v)`       | No demand                |
/// | `.safe_zones(v)`     | No destinations          |
/// | `.barriers(b)`       | Nothing blocked          |
/// | `.cancel_token(t)`   | A fresh, never-fired token |
///
/// # Example
///
/// ```rust,ignore
/// let mut solver = SolverBuilder::new(config, network)
///     .evacuees(load_evacuees_csv(&evacuee_path)?)
///     .safe_zones(load_safe_zones_csv(&zone_path)?)
///     .build()?;
/// let report = solver.solve(&mut NoopObserver)?;
/// ```
pub struct SolverBuilder {
    config:   SolverConfig,
    network:  RoadNetwork,
    barriers: Barriers,
    evacuees: Vec<Evacuee>,
    zones:    Vec<SafeZone>,
    cancel:   CancelToken,
}

impl SolverBuilder {
    pub fn new(config: SolverConfig, network: RoadNetwork) -> Self {
        Self {
            config,
            network,
            barriers: Barriers::new(),
            evacuees: Vec::new(),
            zones:    Vec::new(),
            cancel:   CancelToken::new(),
        }
    }

    pub fn barriers(mut self, barriers: Barriers) -> Self {
        self.barriers = barriers;
        self
    }

    pub fn evacuees(mut self, evacuees: Vec<Evacuee>) -> Self {
        self.evacuees = evacuees;
        self
    }

    pub fn safe_zones(mut self, zones: Vec<SafeZone>) -> Self {
        self.zones = zones;
        self
    }

    /// Token checked between evacuees and during CARMA discovery.  Keep a
    /// clone to cancel a running solve from another thread.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Validate the inputs and return a ready-to-solve [`Solver`].
    ///
    /// Every origin and zone edge is created in the edge cache up front so
    /// the searches never have to insert them mid-flight.
    pub fn build(self) -> SolveResult<Solver> {
        self.config.validate()?;
        let network = self.network;

        // ── Validate demand ───────────────────────────────────────────────
        let mut evacuee_index = Map::default();
        for (i, ev) in self.evacuees.iter().enumerate() {
            if evacuee_index.insert(ev.id, i).is_some() {
                return Err(SolveError::DuplicateEvacuee(ev.id));
            }
            for origin in &ev.origins {
                check_junction(&network, origin.vertex)?;
                if let Some(key) = origin.edge {
                    check_edge(&network, key)?;
                    if network.head(key) != origin.vertex {
                        return Err(SolveError::Config(format!(
                            "evacuee {}: origin edge {key} does not end at {}",
                            ev.id, origin.vertex
                        )));
                    }
                }
            }
        }

        // ── Validate destinations ─────────────────────────────────────────
        let mut zone_index: Map<_, Vec<usize>> = Map::default();
        for (z, zone) in self.zones.iter().enumerate() {
            check_junction(&network, zone.vertex)?;
            if let Some(key) = zone.edge {
                check_edge(&network, key)?;
                if network.tail(key) != zone.vertex {
                    return Err(SolveError::Config(format!(
                        "safe zone {z}: edge {key} does not start at {}",
                        zone.vertex
                    )));
                }
            }
            zone_index.entry(zone.vertex).or_default().push(z);
        }

        // ── Edge cache ────────────────────────────────────────────────────
        let mut edges = EdgeCache::new(CostModel::new(&self.config), self.config.two_way_share_capacity);
        let keys = self
            .evacuees
            .iter()
            .flat_map(|ev| ev.origins.iter().filter_map(|o| o.edge))
            .chain(self.zones.iter().filter_map(|z| z.edge));
        for key in keys {
            edges.get_or_create(&network, key, false);
        }

        log::debug!(
            "solver built: {} junctions, {} edges, {} evacuees, {} safe zones, {} cached traversals",
            network.junction_count(),
            network.edge_count(),
            self.evacuees.len(),
            self.zones.len(),
            edges.len()
        );

        Ok(Solver {
            config: self.config,
            network,
            barriers: self.barriers,
            cancel: self.cancel,
            edges,
            vertices: VertexCache::new(),
            evacuees: self.evacuees,
            evacuee_index,
            zones: self.zones,
            zone_index,
            closed: EdgeMapTwoGen::new(),
            leafs: EdgeContainer::new(),
            carma_loop: 0,
            carma_min_pop: 1.0,
            carma_loops: 0,
            global_min_pop: 0.0,
            max_evacuee_cost: 0.0,
            path_order: 0,
            process_order: 0,
            pass: 0,
        })
    }
}

fn check_junction(network: &RoadNetwork, v: evc_core::VertexId) -> SolveResult<()> {
    if network.has_junction(v) {
        Ok(())
    } else {
        Err(GraphError::UnknownJunction(v).into())
    }
}

fn check_edge(network: &RoadNetwork, key: EdgeKey) -> SolveResult<()> {
    if network.has_edge(key.id) {
        Ok(())
    } else {
        Err(GraphError::UnknownEdge(key.id).into())
    }
}
