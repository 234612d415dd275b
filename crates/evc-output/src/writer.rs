//! The `OutputWriter` trait implemented by all backend writers.

use evc_solver::Solver;

use crate::row::{route_rows, EdgeStatRow, PassSummaryRow, RouteRow, SegmentRow};
use crate::OutputResult;

/// Trait implemented by CSV, SQLite, and Parquet writers.
pub trait OutputWriter {
    /// Write a batch of committed paths.
    fn write_routes(&mut self, rows: &[RouteRow]) -> OutputResult<()>;

    /// Write a batch of path segments.
    fn write_segments(&mut self, rows: &[SegmentRow]) -> OutputResult<()>;

    /// Write a batch of edge statistics.
    fn write_edge_stats(&mut self, rows: &[EdgeStatRow]) -> OutputResult<()>;

    /// Write one pass summary row.
    fn write_pass_summary(&mut self, row: &PassSummaryRow) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent — safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}

/// Write the routes and edge statistics of a solved `solver`, then finish
/// the writer.
pub fn write_solution<W: OutputWriter>(solver: &Solver, writer: &mut W) -> OutputResult<()> {
    let (paths, segments) = route_rows(&solver.routes());
    writer.write_routes(&paths)?;
    writer.write_segments(&segments)?;

    let stats: Vec<EdgeStatRow> = solver.edge_stats().iter().map(EdgeStatRow::from).collect();
    writer.write_edge_stats(&stats)?;
    writer.finish()
}
