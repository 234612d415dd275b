//! Congestion cost model.
//!
//! Travel cost on a traversal is `original_cost / speed_ratio`, where the
//! ratio depends on how far the population on the edge exceeds its critical
//! density:
//!
//! | Model         | Ratio when `excess > 0`                  |
//! |---------------|------------------------------------------|
//! | `Flat`        | `1`                                      |
//! | `Step`        | `0.001` (cost ×1000)                     |
//! | `Linear`      | `1 − excess / (2·(saturation − critical))` |
//! | `Exponential` | `exp(−excess / saturation)`              |
//! | `Power`       | `1 − k·sqrt(excess)`, `k = 0.5/sqrt(saturation)` |
//!
//! Ratios are clamped to `[0.001, 1]`.  The solver method can override the
//! configured model: shortest path never congests and CCRP always uses the
//! step model.
//!
//! Everything here is pure and monotone in the population.

use evc_core::{SolverConfig, SolverMethod, TrafficModelKind};

/// Lower bound on the speed ratio.
pub const MIN_SPEED_RATIO: f64 = 0.001;

/// Cost model shared by every edge in one solve.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CostModel {
    pub method:                   SolverMethod,
    pub kind:                     TrafficModelKind,
    pub critical_per_capacity:    f64,
    pub saturation_per_capacity:  f64,
    pub initial_delay_per_person: f64,
}

impl CostModel {
    /// Derive the model from a solver configuration.
    ///
    /// A saturation density at or below the critical density is shifted up
    /// by the critical density.
    pub fn new(config: &SolverConfig) -> Self {
        let critical = config.critical_density_per_capacity;
        let mut saturation = config.saturation_density_per_capacity;
        if saturation <= critical {
            saturation += critical;
        }
        Self {
            method:                   config.solver_method,
            kind:                     config.traffic_model,
            critical_per_capacity:    critical,
            saturation_per_capacity:  saturation,
            initial_delay_per_person: config.initial_delay_cost_per_population,
        }
    }

    /// The traffic model actually applied after the method override.
    pub fn effective_kind(&self) -> TrafficModelKind {
        match self.method {
            SolverMethod::ShortestPath => TrafficModelKind::Flat,
            SolverMethod::Ccrp         => TrafficModelKind::Step,
            SolverMethod::Casper       => self.kind,
        }
    }

    #[inline]
    pub fn critical_density(&self, capacity: f64) -> f64 {
        self.critical_per_capacity * capacity
    }

    #[inline]
    pub fn saturation_density(&self, capacity: f64) -> f64 {
        self.saturation_per_capacity * capacity
    }

    /// Speed ratio for `population` vehicles on an edge of `capacity`.
    pub fn speed_ratio(&self, capacity: f64, population: f64) -> f64 {
        let critical = self.critical_density(capacity);
        let excess = population - critical;
        if excess <= 0.0 {
            return 1.0;
        }
        let saturation = self.saturation_density(capacity);
        let ratio = match self.effective_kind() {
            TrafficModelKind::Flat        => 1.0,
            TrafficModelKind::Step        => MIN_SPEED_RATIO,
            TrafficModelKind::Linear      => 1.0 - excess / (2.0 * (saturation - critical)),
            TrafficModelKind::Exponential => (-excess / saturation).exp(),
            TrafficModelKind::Power       => 1.0 - 0.5 / saturation.sqrt() * excess.sqrt(),
        };
        if ratio.is_nan() {
            return MIN_SPEED_RATIO;
        }
        ratio.clamp(MIN_SPEED_RATIO, 1.0)
    }

    /// Population that counts against an edge when `proposed` people are
    /// routed over it.  With a per-person initial delay, no more than
    /// `original_cost / delay` people can be on the edge at once.
    #[inline]
    pub fn effective_population(&self, original_cost: f64, proposed: f64) -> f64 {
        if self.initial_delay_per_person > 0.0 {
            proposed.min(original_cost / self.initial_delay_per_person)
        } else {
            proposed
        }
    }

    /// Cost of the edge once `proposed` more people join `reserved`.
    pub fn cost(&self, original_cost: f64, capacity: f64, reserved: f64, proposed: f64) -> f64 {
        let pop = reserved + self.effective_population(original_cost, proposed);
        original_cost / self.speed_ratio(capacity, pop)
    }

    /// Cost with only the committed reservations.
    pub fn current_cost(&self, original_cost: f64, capacity: f64, reserved: f64) -> f64 {
        original_cost / self.speed_ratio(capacity, reserved)
    }

    /// Extra cost the new flow imposes on people already routed over the
    /// edge, measured as the drop in speed ratio scaled by the original cost.
    pub fn global_delta(&self, original_cost: f64, capacity: f64, reserved: f64, proposed: f64) -> f64 {
        let pop = reserved + self.effective_population(original_cost, proposed);
        let drop = self.speed_ratio(capacity, reserved) - self.speed_ratio(capacity, pop);
        debug_assert!(drop >= 0.0);
        original_cost * drop.max(0.0)
    }

    /// Room left before the edge reaches critical density.  May be negative.
    #[inline]
    pub fn capacity_left(&self, capacity: f64, reserved: f64) -> f64 {
        self.critical_density(capacity) - reserved
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new(&SolverConfig::default())
    }
}
