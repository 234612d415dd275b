//! `evc-solver` — capacity-aware evacuation routing.
//!
//! # Solve loop
//!
//! ```text
//! for pass in 0..=max_refinement_passes:
//!   loop:
//!     ① CARMA   — backward Dijkstra from the safe zones at the smallest
//!                 unprocessed population; refreshes vertex heuristics and
//!                 orders the evacuees it reaches.
//!     ② Route   — pop evacuees in that order; forward A* per evacuee,
//!                 commit the path, reserve its population on every edge.
//!                 CASPER goes back to ① once too many visited edges are dirty.
//!   ③ Refine    — recompute final costs; withdraw flagged evacuees and
//!                 start another pass, or stop.
//! ```
//!
//! # Crate layout
//!
//! | Module       | Contents                                                    |
//! |--------------|-------------------------------------------------------------|
//! | [`evacuee`]  | `Evacuee`, `Origin`, `SafeZone`, `EvcPath`, `PathSegment`   |
//! | [`loader`]   | CSV loaders for evacuees and safe zones                     |
//! | [`builder`]  | `SolverBuilder` (validation, edge pre-creation)             |
//! | [`solver`]   | `Solver`, `SolveReport`, pass and routing loop              |
//! | `carma`      | CARMA loop and processing order                             |
//! | `search`     | Forward search, zone costs, selfish-routing penalty         |
//! | `assemble`   | Path assembly, commitment, refinement bookkeeping           |
//! | [`solution`] | `RouteRecord`, `EdgeStatRecord` views of the solved state   |
//! | [`observer`] | `SolveObserver`, `NoopObserver`                             |
//! | [`error`]    | `SolveError`, `SolveResult<T>`                              |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                     |
//! |------------|------------------------------------------------------------|
//! | `parallel` | Final-cost refresh and edge statistics on Rayon.           |
//! | `fx-hash`  | FxHash for the evacuee and zone indices.                   |
//! | `serde`    | Serde derives on the core id and config types.             |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use evc_core::SolverConfig;
//! use evc_graph::load_network_csv;
//! use evc_solver::{load_evacuees_csv, load_safe_zones_csv, NoopObserver, SolverBuilder};
//!
//! let network = load_network_csv(&network_path)?;
//! let mut solver = SolverBuilder::new(SolverConfig::default(), network)
//!     .evacuees(load_evacuees_csv(&evacuee_path)?)
//!     .safe_zones(load_safe_zones_csv(&zone_path)?)
//!     .build()?;
//! let report = solver.solve(&mut NoopObserver)?;
//! for route in solver.routes() { /* … */ }
//! ```

mod assemble;
pub mod builder;
mod carma;
pub mod error;
pub mod evacuee;
pub mod loader;
pub mod observer;
mod search;
pub mod solution;
pub mod solver;

#[cfg(test)]
mod tests;

pub use builder::SolverBuilder;
pub use error::{SolveError, SolveResult};
pub use evacuee::{Evacuee, EvacueeStatus, EvcPath, Origin, PathSegment, SafeZone};
pub use loader::{load_evacuees_csv, load_evacuees_reader, load_safe_zones_csv, load_safe_zones_reader};
pub use observer::{NoopObserver, SolveObserver};
pub use solution::{EdgeStatRecord, RouteRecord, RouteSegment};
pub use solver::{SolveReport, Solver};

#[cfg(feature = "fx-hash")]
pub(crate) type Map<K, V> = rustc_hash::FxHashMap<K, V>;
#[cfg(not(feature = "fx-hash"))]
pub(crate) type Map<K, V> = std::collections::HashMap<K, V>;
