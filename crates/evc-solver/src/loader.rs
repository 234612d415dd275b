//! CSV demand and safe-zone loaders.
//!
//! # Evacuee CSV
//!
//! One row per origin.  Rows sharing an `evacuee_id` are origins of the same
//! evacuee; the population is taken from the first of them.
//!
//! ```csv
//! evacuee_id,population,vertex,edge,direction,portion
//! 0,25,4,,,
//! 1,10,7,12,along,0.4
//! 1,10,9,,,
//! ```
//!
//! `edge` is the 0-based row index of the edge in the network file,
//! `direction` is `along` (default) or `against`, and `portion` is the share
//! of that traversal still to travel (default `1`).
//!
//! # Safe-zone CSV
//!
//! ```csv
//! vertex,capacity,edge,direction,position
//! 3,,,,
//! 5,200,8,against,0.5
//! ```
//!
//! An empty `capacity` is unlimited.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use evc_core::{Direction, EdgeId, EdgeKey, EvacueeId, VertexId};

use crate::evacuee::{Evacuee, Origin, SafeZone};
use crate::{SolveError, SolveResult};

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct EvacueeRecord {
    evacuee_id: u32,
    population: f64,
    vertex:     u32,
    #[serde(default)]
    edge:       Option<u32>,
    #[serde(default)]
    direction:  Option<String>,
    #[serde(default)]
    portion:    Option<f64>,
}

#[derive(Deserialize)]
struct SafeZoneRecord {
    vertex:    u32,
    #[serde(default)]
    capacity:  Option<f64>,
    #[serde(default)]
    edge:      Option<u32>,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    position:  Option<f64>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load evacuees from a CSV file, sorted by id.
pub fn load_evacuees_csv(path: &Path) -> SolveResult<Vec<Evacuee>> {
    let file = std::fs::File::open(path).map_err(SolveError::Io)?;
    load_evacuees_reader(file)
}

/// Like [`load_evacuees_csv`] but accepts any `Read` source.
pub fn load_evacuees_reader<R: Read>(reader: R) -> SolveResult<Vec<Evacuee>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut by_id: BTreeMap<u32, Evacuee> = BTreeMap::new();

    for result in csv_reader.deserialize::<EvacueeRecord>() {
        let row = result.map_err(|e| SolveError::Parse(e.to_string()))?;
        let origin = match row.edge {
            None => Origin::at(VertexId(row.vertex)),
            Some(e) => {
                let dir = parse_direction(row.direction.as_deref())?;
                Origin::on_edge(
                    VertexId(row.vertex),
                    EdgeKey::new(EdgeId(e), dir),
                    row.portion.unwrap_or(1.0),
                )
            }
        };
        by_id
            .entry(row.evacuee_id)
            .or_insert_with(|| Evacuee::new(EvacueeId(row.evacuee_id), row.population, Vec::new()))
            .origins
            .push(origin);
    }

    log::debug!("loaded {} evacuees", by_id.len());
    Ok(by_id.into_values().collect())
}

/// Load safe zones from a CSV file, in row order.
pub fn load_safe_zones_csv(path: &Path) -> SolveResult<Vec<SafeZone>> {
    let file = std::fs::File::open(path).map_err(SolveError::Io)?;
    load_safe_zones_reader(file)
}

/// Like [`load_safe_zones_csv`] but accepts any `Read` source.
pub fn load_safe_zones_reader<R: Read>(reader: R) -> SolveResult<Vec<SafeZone>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut zones = Vec::new();

    for result in csv_reader.deserialize::<SafeZoneRecord>() {
        let row = result.map_err(|e| SolveError::Parse(e.to_string()))?;
        let mut zone = SafeZone::new(VertexId(row.vertex), row.capacity);
        if let Some(e) = row.edge {
            let dir = parse_direction(row.direction.as_deref())?;
            zone = zone.with_edge(EdgeKey::new(EdgeId(e), dir), row.position.unwrap_or(0.0));
        }
        zones.push(zone);
    }

    log::debug!("loaded {} safe zones", zones.len());
    Ok(zones)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_direction(s: Option<&str>) -> SolveResult<Direction> {
    match s.map(str::trim).unwrap_or("") {
        "" | "along" | "Along"  => Ok(Direction::Along),
        "against" | "Against"   => Ok(Direction::Against),
        other => Err(SolveError::Parse(format!(
            "invalid direction {other:?}: expected \"along\" or \"against\""
        ))),
    }
}
