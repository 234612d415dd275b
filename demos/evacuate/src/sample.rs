//! Built-in scenario used when no input files are given.
//!
//! ```text
//!   0 ──1── 1 ──2── 2 ──3──┐
//!   │       │              │
//!   4       7              6 (safe zone)
//!   │       │              │
//!   3 ──5── 4 ──────6──────┘
//!   │                      │
//!   8                     10
//!   │                      │
//!   5 ─────────9────────── 7 (safe zone, 50 places)
//! ```
//!
//! Residential junctions 0, 1 and 5 hold 110 people in total; the side
//! streets have capacity 2 and will congest.

use std::io::Cursor;

use anyhow::Result;

use evc_graph::{load_network_reader, RoadNetwork};
use evc_solver::{load_evacuees_reader, load_safe_zones_reader, Evacuee, SafeZone};

const NETWORK_CSV: &str = "\
edge_id,from,to,cost,capacity,oneway
1,0,1,2.0,4,
2,1,2,2.0,4,
3,2,6,3.0,6,
4,0,3,2.5,2,
5,3,4,2.0,2,
6,4,6,2.5,3,
7,1,4,1.5,2,
8,5,3,1.0,2,
9,5,7,4.0,1,
10,7,6,2.0,1,
";

const EVACUEE_CSV: &str = "\
evacuee_id,population,vertex,edge,direction,portion
0,40,0,,,
1,25,5,,,
2,15,1,,,
3,30,0,3,against,0.5
";

const SAFE_ZONE_CSV: &str = "\
vertex,capacity,edge,direction,position
6,,,,
7,50,,,
";

pub fn network() -> Result<RoadNetwork> {
    Ok(load_network_reader(Cursor::new(NETWORK_CSV))?)
}

pub fn evacuees() -> Result<Vec<Evacuee>> {
    Ok(load_evacuees_reader(Cursor::new(EVACUEE_CSV))?)
}

pub fn safe_zones() -> Result<Vec<SafeZone>> {
    Ok(load_safe_zones_reader(Cursor::new(SAFE_ZONE_CSV))?)
}
