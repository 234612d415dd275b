//! `evc-core` — foundational types for the `evc` evacuation routing workspace.
//!
//! This crate is a dependency of every other `evc-*` crate.  It has no
//! `evc-*` dependencies and only `thiserror` (plus optional `serde`).
//!
//! # What lives here
//!
//! | Module       | Contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | [`ids`]      | `VertexId`, `EdgeId`, `EvacueeId`, `Direction`, `EdgeKey` |
//! | [`config`]   | `SolverConfig`, `SolverMethod`, `TrafficModelKind`, `CarmaSort` |
//! | [`units`]    | `CostUnit` and per-day conversion factors                |
//! | [`cancel`]   | `CancelToken` for cooperative cancellation               |
//! | [`error`]    | `EvcError`, `EvcResult`                                   |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to ids and config types.    |

pub mod cancel;
pub mod config;
pub mod error;
pub mod ids;
pub mod units;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use cancel::CancelToken;
pub use config::{CarmaSort, SolverConfig, SolverMethod, TrafficModelKind};
pub use error::{EvcError, EvcResult};
pub use ids::{Direction, EdgeId, EdgeKey, EvacueeId, VertexId};
pub use units::CostUnit;
