//! CSV output backend.
//!
//! Creates four files in the configured output directory:
//! - `routes.csv`
//! - `route_segments.csv`
//! - `edge_stats.csv`
//! - `pass_summaries.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::row::{EdgeStatRow, PassSummaryRow, RouteRow, SegmentRow};
use crate::writer::OutputWriter;
use crate::OutputResult;

pub const ROUTE_HEADER: [&str; 9] = [
    "evacuee_id", "path", "path_order", "zone_vertex", "routed_population",
    "routed_cost", "reserve_cost", "original_cost", "segments",
];

pub const SEGMENT_HEADER: [&str; 8] = [
    "evacuee_id", "path", "seq", "source_feature_id", "edge_id", "direction",
    "from_position", "to_position",
];

pub const EDGE_STAT_HEADER: [&str; 11] = [
    "edge_id", "direction", "source_feature_id", "from_position", "to_position",
    "reserved_population", "capacity", "current_cost", "original_cost", "congestion", "path_count",
];

pub const PASS_HEADER: [&str; 4] = ["pass", "carma_loops", "paths", "flagged"];

/// Writes a solution to four CSV files.
pub struct CsvWriter {
    routes:     Writer<File>,
    segments:   Writer<File>,
    edge_stats: Writer<File>,
    passes:     Writer<File>,
    finished:   bool,
}

impl CsvWriter {
    /// Open (or create) the CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut routes = Writer::from_path(dir.join("routes.csv"))?;
        routes.write_record(ROUTE_HEADER)?;

        let mut segments = Writer::from_path(dir.join("route_segments.csv"))?;
        segments.write_record(SEGMENT_HEADER)?;

        let mut edge_stats = Writer::from_path(dir.join("edge_stats.csv"))?;
        edge_stats.write_record(EDGE_STAT_HEADER)?;

        let mut passes = Writer::from_path(dir.join("pass_summaries.csv"))?;
        passes.write_record(PASS_HEADER)?;

        Ok(Self { routes, segments, edge_stats, passes, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_routes(&mut self, rows: &[RouteRow]) -> OutputResult<()> {
        for row in rows {
            self.routes.write_record(&[
                row.evacuee_id.to_string(),
                row.path.to_string(),
                row.path_order.to_string(),
                row.zone_vertex.to_string(),
                row.routed_population.to_string(),
                row.routed_cost.to_string(),
                row.reserve_cost.to_string(),
                row.original_cost.to_string(),
                row.segments.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_segments(&mut self, rows: &[SegmentRow]) -> OutputResult<()> {
        for row in rows {
            self.segments.write_record(&[
                row.evacuee_id.to_string(),
                row.path.to_string(),
                row.seq.to_string(),
                row.source_feature_id.to_string(),
                row.edge_id.to_string(),
                row.direction.as_str().to_owned(),
                row.from_position.to_string(),
                row.to_position.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_edge_stats(&mut self, rows: &[EdgeStatRow]) -> OutputResult<()> {
        for row in rows {
            self.edge_stats.write_record(&[
                row.edge_id.to_string(),
                row.direction.as_str().to_owned(),
                row.source_feature_id.to_string(),
                row.from_position.to_string(),
                row.to_position.to_string(),
                row.reserved_population.to_string(),
                row.capacity.to_string(),
                row.current_cost.to_string(),
                row.original_cost.to_string(),
                row.congestion.to_string(),
                row.path_count.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_pass_summary(&mut self, row: &PassSummaryRow) -> OutputResult<()> {
        self.passes.write_record(&[
            row.pass.to_string(),
            row.carma_loops.to_string(),
            row.paths.to_string(),
            row.flagged.to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.routes.flush()?;
        self.segments.flush()?;
        self.edge_stats.flush()?;
        self.passes.flush()?;
        Ok(())
    }
}
