//! CSV network loader.
//!
//! # CSV format
//!
//! One row per physical edge.  Junctions are numbered from 0; the network
//! gets `max(from, to) + 1` junctions.  Edges receive `EdgeId`s in row
//! order, and `edge_id` is kept as the source feature id.
//!
//! ```csv
//! edge_id,from,to,cost,capacity,oneway
//! 100,0,1,2.5,2,
//! 101,1,2,4.0,1,FT
//! 102,2,3,1.0,3,TF
//! ```
//!
//! **`oneway`** field (optional column):
//!
//! | Value          | Meaning                           |
//! |----------------|-----------------------------------|
//! | empty / `B`    | two-way                           |
//! | `FT`           | only along the digitized direction |
//! | `TF`           | only against it                   |
//! | `N`            | closed both ways                  |
//!
//! Optional `from_pos` / `to_pos` columns give positions along the source
//! feature (defaults `0` and `1`).
//!
//! Unparseable numbers are errors, but out-of-range values (negative cost,
//! NaN capacity) are accepted here and become sentinel edges in the cache.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use evc_core::{Direction, VertexId};

use crate::network::{RoadNetwork, RoadNetworkBuilder};
use crate::{GraphError, GraphResult};

// ── CSV record ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct EdgeRecord {
    edge_id:  i64,
    from:     u32,
    to:       u32,
    cost:     f64,
    capacity: f64,
    #[serde(default)]
    oneway:   Option<String>,
    #[serde(default)]
    from_pos: Option<f64>,
    #[serde(default)]
    to_pos:   Option<f64>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a [`RoadNetwork`] from a CSV file.
pub fn load_network_csv(path: &Path) -> GraphResult<RoadNetwork> {
    let file = std::fs::File::open(path).map_err(GraphError::Io)?;
    load_network_reader(file)
}

/// Like [`load_network_csv`] but accepts any `Read` source.
pub fn load_network_reader<R: Read>(reader: R) -> GraphResult<RoadNetwork> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows: Vec<EdgeRecord> = Vec::new();
    for result in csv_reader.deserialize::<EdgeRecord>() {
        rows.push(result.map_err(|e| GraphError::Parse(e.to_string()))?);
    }

    let mut b = RoadNetworkBuilder::with_capacity(rows.len());
    let junctions = rows
        .iter()
        .map(|r| r.from.max(r.to) as usize + 1)
        .max()
        .unwrap_or(0);
    b.ensure_junctions(junctions);

    for r in rows {
        let id = b.add_edge(VertexId(r.from), VertexId(r.to), r.cost, r.capacity);
        b.set_source(id, r.edge_id, r.from_pos.unwrap_or(0.0), r.to_pos.unwrap_or(1.0));
        for dir in parse_oneway(r.oneway.as_deref())? {
            b.restrict_direction(id, dir);
        }
    }

    let net = b.build();
    log::debug!(
        "loaded network: {} junctions, {} edges",
        net.junction_count(),
        net.edge_count()
    );
    Ok(net)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Directions to forbid for a `oneway` value.
fn parse_oneway(s: Option<&str>) -> GraphResult<Vec<Direction>> {
    match s.map(str::trim).unwrap_or("") {
        "" | "B" | "b"   => Ok(vec![]),
        "FT" | "ft"      => Ok(vec![Direction::Against]),
        "TF" | "tf"      => Ok(vec![Direction::Along]),
        "N" | "n"        => Ok(vec![Direction::Along, Direction::Against]),
        other => Err(GraphError::Parse(format!("unknown oneway value `{other}`"))),
    }
}
