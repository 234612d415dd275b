//! `evc-flock` — agents walking solved evacuation routes.
//!
//! Used to validate a solution: every routed person becomes an agent that
//! follows its path at a jittered speed, keeps a gap to the agent in front,
//! and records a trajectory.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                       |
//! |------------|----------------------------------------------------------------|
//! | [`path`]   | `FlockPath`, `TimedSegment` — input, built from solver routes  |
//! | [`state`]  | `AgentState`, `FlockStatus`, `Trajectory`, `TrajectoryPoint`    |
//! | [`store`]  | `FlockStore` — per-agent state and trajectories                 |
//! | [`engine`] | `FlockEngine`, `FlockConfig`, `FlockReport`                     |
//! | [`error`]  | `FlockError`, `FlockResult<T>`                                  |
//!
//! # Movement model
//!
//! 1. Each path spawns `ceil(population)` agents, started `start_spacing`
//!    apart from the path's `start_time`.
//! 2. Every `simulation_interval` each started agent moves `speed * dt`
//!    along its segments, leaders first on each edge, never closer than
//!    `spacing` to the agent in front.
//! 3. A point is recorded when an agent enters, every `snapshot_interval`,
//!    and at the exact time it reaches the end of its path.
//!
//! Speeds are drawn from a per-agent `SmallRng`, so runs with the same seed
//! produce identical trajectories.

pub mod engine;
pub mod error;
pub mod path;
pub mod state;
pub mod store;


pub use engine::{FlockConfig, FlockEngine, FlockReport};
pub use error::{FlockError, FlockResult};
pub use path::{FlockPath, TimedSegment};
pub use state::{AgentState, FlockStatus, Trajectory, TrajectoryPoint};
pub use store::FlockStore;
