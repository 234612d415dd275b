//! Solver configuration.
//!
//! `SolverConfig` is immutable once handed to the solver.  Build one with
//! struct-update syntax over [`SolverConfig::default`] and call
//! [`validate`](SolverConfig::validate) (the solver builder does this for you).

use std::fmt;
use std::str::FromStr;

use crate::{CostUnit, EvcError, EvcResult};

// ── SolverMethod ──────────────────────────────────────────────────────────────

/// Which routing strategy the solver runs.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverMethod {
    /// Plain shortest path: reservations are recorded but never raise cost.
    ShortestPath,
    /// Capacity-constrained route planning: step cost once critical density
    /// is exceeded, population routed in capacity-sized chunks.
    Ccrp,
    /// Congestion-aware routing using the configured traffic model.
    #[default]
    Casper,
}

impl FromStr for SolverMethod {
    type Err = EvcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sp" | "shortestpath" | "shortest_path" => Ok(SolverMethod::ShortestPath),
            "ccrp"                                  => Ok(SolverMethod::Ccrp),
            "casper"                                => Ok(SolverMethod::Casper),
            other => Err(EvcError::Parse(format!("unknown solver method `{other}`"))),
        }
    }
}

impl fmt::Display for SolverMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolverMethod::ShortestPath => "SP",
            SolverMethod::Ccrp         => "CCRP",
            SolverMethod::Casper       => "CASPER",
        })
    }
}

// ── TrafficModelKind ──────────────────────────────────────────────────────────

/// Congestion curve mapping excess density to a speed ratio.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrafficModelKind {
    /// Ratio is always 1.
    Flat,
    /// Cost jumps ×1000 once critical density is exceeded.
    Step,
    /// Ratio falls linearly with excess density.
    Linear,
    /// Ratio `exp(-excess / saturation)`.
    #[default]
    Exponential,
    /// Ratio `1 - k·sqrt(excess)`.
    Power,
}

impl FromStr for TrafficModelKind {
    type Err = EvcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat"                   => Ok(TrafficModelKind::Flat),
            "step"                   => Ok(TrafficModelKind::Step),
            "linear"                 => Ok(TrafficModelKind::Linear),
            "exponential" | "casper" => Ok(TrafficModelKind::Exponential),
            "power"                  => Ok(TrafficModelKind::Power),
            other => Err(EvcError::Parse(format!("unknown traffic model `{other}`"))),
        }
    }
}

// ── CarmaSort ─────────────────────────────────────────────────────────────────

/// Order in which evacuees are processed after a CARMA loop.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CarmaSort {
    /// Input order.
    None,
    /// Nearest first, predictions kept across loops.
    FwSingle,
    /// Nearest first, predictions reset every loop.
    FwCont,
    /// Farthest first, predictions kept across loops.
    BwSingle,
    /// Farthest first, predictions reset every loop.
    #[default]
    BwCont,
    /// Refinement passes order by previous final cost, descending.
    ReverseFinalCost,
    /// Refinement passes order by previous reserve cost, descending.
    ReverseEvacuationCost,
}

impl CarmaSort {
    /// Whether predicted costs are reset at the start of every CARMA loop.
    pub fn is_continuous(self) -> bool {
        matches!(
            self,
            CarmaSort::FwCont
                | CarmaSort::BwCont
                | CarmaSort::ReverseFinalCost
                | CarmaSort::ReverseEvacuationCost
        )
    }
}

impl FromStr for CarmaSort {
    type Err = EvcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none"                  => Ok(CarmaSort::None),
            "fwsingle"              => Ok(CarmaSort::FwSingle),
            "fwcont"                => Ok(CarmaSort::FwCont),
            "bwsingle"              => Ok(CarmaSort::BwSingle),
            "bwcont"                => Ok(CarmaSort::BwCont),
            "reversefinalcost"      => Ok(CarmaSort::ReverseFinalCost),
            "reverseevacuationcost" => Ok(CarmaSort::ReverseEvacuationCost),
            other => Err(EvcError::Parse(format!("unknown CARMA sort `{other}`"))),
        }
    }
}

// ── SolverConfig ──────────────────────────────────────────────────────────────

/// Tunables for one solve.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverConfig {
    pub solver_method: SolverMethod,
    pub traffic_model: TrafficModelKind,

    /// Population per unit of capacity at which congestion begins.
    pub critical_density_per_capacity: f64,

    /// Population per unit of capacity at which traffic is jammed.
    pub saturation_density_per_capacity: f64,

    /// Both directions of a physical edge draw on one reservation record.
    pub two_way_share_capacity: bool,

    /// An evacuee's population may be split across several paths.
    pub separable_evacuee: bool,

    /// Fixed cost charged per evacuated person (loading time).
    pub initial_delay_cost_per_population: f64,

    /// Fraction of dirty edges among visited edges that triggers a new
    /// CARMA loop.
    pub carma_performance_ratio: f64,

    pub carma_sort: CarmaSort,

    /// Weight of the selfish-routing penalty; 0 disables it.
    pub selfish_ratio: f64,

    /// Relative drift that earns a path a second chance; 0 disables
    /// refinement.
    pub iterative_ratio: f64,

    /// Upper bound on refinement passes after the first solve.
    pub max_refinement_passes: u32,

    /// Penalty per unit of over-capacity at a safe zone.
    pub cost_per_zone_density: f64,

    /// Keep the previous CARMA tree and only rebuild its dirty parts.
    pub three_generation_carma: bool,

    pub cost_unit: CostUnit,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            solver_method:                     SolverMethod::Casper,
            traffic_model:                     TrafficModelKind::Exponential,
            critical_density_per_capacity:     20.0,
            saturation_density_per_capacity:   500.0,
            two_way_share_capacity:            true,
            separable_evacuee:                 false,
            initial_delay_cost_per_population: 0.01,
            carma_performance_ratio:           0.1,
            carma_sort:                        CarmaSort::BwCont,
            selfish_ratio:                     0.0,
            iterative_ratio:                   0.0,
            max_refinement_passes:             3,
            cost_per_zone_density:             0.0,
            three_generation_carma:            false,
            cost_unit:                         CostUnit::Minutes,
        }
    }
}

impl SolverConfig {
    /// Check every numeric field.
    ///
    /// Saturation at or below critical density is accepted here; the cost
    /// model shifts it up by the critical density.
    pub fn validate(&self) -> EvcResult<()> {
        non_negative("critical_density_per_capacity", self.critical_density_per_capacity)?;
        non_negative("saturation_density_per_capacity", self.saturation_density_per_capacity)?;
        non_negative("initial_delay_cost_per_population", self.initial_delay_cost_per_population)?;
        non_negative("cost_per_zone_density", self.cost_per_zone_density)?;
        unit_ratio("carma_performance_ratio", self.carma_performance_ratio)?;
        unit_ratio("selfish_ratio", self.selfish_ratio)?;
        unit_ratio("iterative_ratio", self.iterative_ratio)?;
        Ok(())
    }

    /// Separation is only meaningful when the method splits populations.
    pub fn splits_population(&self) -> bool {
        self.separable_evacuee && self.solver_method != SolverMethod::ShortestPath
    }
}

fn non_negative(name: &str, v: f64) -> EvcResult<()> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(EvcError::Config(format!("{name} must be finite and >= 0, got {v}")))
    }
}

fn unit_ratio(name: &str, v: f64) -> EvcResult<()> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(EvcError::Config(format!("{name} must be within [0, 1], got {v}")))
    }
}
