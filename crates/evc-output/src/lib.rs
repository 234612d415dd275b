//! `evc-output` — solution writers for the evc evacuation router.
//!
//! Three backends are provided behind Cargo features:
//!
//! | Feature   | Backend | Files created                                                                     |
//! |-----------|---------|-----------------------------------------------------------------------------------|
//! | *(none)*  | CSV     | `routes.csv`, `route_segments.csv`, `edge_stats.csv`, `pass_summaries.csv`         |
//! | `sqlite`  | SQLite  | `output.db`                                                                       |
//! | `parquet` | Parquet | `routes.parquet`, `route_segments.parquet`, `edge_stats.parquet`, `pass_summaries.parquet` |
//!
//! All backends implement [`OutputWriter`].  Pass summaries are written while
//! the solver runs by [`SolveOutputObserver`], which implements
//! `evc_solver::SolveObserver`; routes and edge statistics are written once
//! the solve is over by [`write_solution`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use evc_output::{write_solution, CsvWriter, SolveOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut obs = SolveOutputObserver::new(writer);
//! let report = solver.solve(&mut obs)?;
//! if let Some(e) = obs.take_error() {
//!     eprintln!("output error: {e}");
//! }
//! write_solution(&solver, obs.writer_mut())?;
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "parquet")]
pub mod parquet;

#[cfg(test)]
mod tests;

pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::SolveOutputObserver;
pub use row::{route_rows, EdgeStatRow, PassSummaryRow, RouteRow, SegmentRow};
pub use writer::{write_solution, OutputWriter};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteWriter;

#[cfg(feature = "parquet")]
pub use parquet::ParquetWriter;
