//! `evc-graph` — road network, congestion costs, and search-time graph state.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                      |
//! |--------------|---------------------------------------------------------------|
//! | [`network`]  | `RoadNetwork` (CSR traversal stars), `RoadNetworkBuilder`, `Barriers` |
//! | [`loader`]   | `load_network_csv`, `load_network_reader`                     |
//! | [`cost`]     | `CostModel` (traffic models and method overrides)             |
//! | [`edge`]     | `Edge`, `EdgeCache`, reservations, dirty tracking, CARMA tree |
//! | [`vertex`]   | `Vertex`, `HValue`, `VertexCache`                             |
//! | [`edge_map`] | `EdgeMap`, `EdgeMapTwoGen`, `EdgeContainer`                   |
//! | [`error`]    | `GraphError`, `GraphResult<T>`                                |
//!
//! # Feature flags
//!
//! | Flag      | Effect                                                      |
//! |-----------|-------------------------------------------------------------|
//! | `serde`   | Derives `Serialize`/`Deserialize` on `evc-core` types.      |
//! | `fx-hash` | Uses FxHash for cache indices and closed lists.             |

pub mod cost;
pub mod edge;
pub mod edge_map;
pub mod error;
pub mod loader;
pub mod network;
pub mod vertex;


pub use cost::CostModel;
pub use edge::{DirtyState, Edge, EdgeCache, EdgeIdx, PathRef, Reservation};
pub use edge_map::{EdgeContainer, EdgeMap, EdgeMapTwoGen, Generation};
pub use error::{GraphError, GraphResult};
pub use loader::{load_network_csv, load_network_reader};
pub use network::{Barriers, RoadNetwork, RoadNetworkBuilder};
pub use vertex::{HValue, SAFE_ZONE_EDGE, Vertex, VertexCache, VertexHandle};

/// Hash map used by caches and closed lists.
#[cfg(feature = "fx-hash")]
pub(crate) type Map<K, V> = rustc_hash::FxHashMap<K, V>;
#[cfg(not(feature = "fx-hash"))]
pub(crate) type Map<K, V> = std::collections::HashMap<K, V>;

/// Hash set for turn restrictions and barriers.
#[cfg(feature = "fx-hash")]
pub(crate) type Set<K> = rustc_hash::FxHashSet<K>;
#[cfg(not(feature = "fx-hash"))]
pub(crate) type Set<K> = std::collections::HashSet<K>;
