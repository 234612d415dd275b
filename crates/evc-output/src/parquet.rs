//! Parquet output backend (feature `parquet`).
//!
//! Creates four files in the configured output directory:
//! - `routes.parquet`
//! - `route_segments.parquet`
//! - `edge_stats.parquet`
//! - `pass_summaries.parquet`

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Float64Builder, Int64Builder, StringBuilder, UInt32Builder, UInt64Builder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::row::{EdgeStatRow, PassSummaryRow, RouteRow, SegmentRow};
use crate::writer::OutputWriter;
use crate::OutputResult;

fn route_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("evacuee_id",        DataType::UInt32,  false),
        Field::new("path",              DataType::UInt32,  false),
        Field::new("path_order",        DataType::UInt32,  false),
        Field::new("zone_vertex",       DataType::UInt32,  false),
        Field::new("routed_population", DataType::Float64, false),
        Field::new("routed_cost",       DataType::Float64, false),
        Field::new("reserve_cost",      DataType::Float64, false),
        Field::new("original_cost",     DataType::Float64, false),
        Field::new("segments",          DataType::UInt32,  false),
    ]))
}

fn segment_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("evacuee_id",        DataType::UInt32,  false),
        Field::new("path",              DataType::UInt32,  false),
        Field::new("seq",               DataType::UInt32,  false),
        Field::new("source_feature_id", DataType::Int64,   false),
        Field::new("edge_id",           DataType::UInt32,  false),
        Field::new("direction",         DataType::Utf8,    false),
        Field::new("from_position",     DataType::Float64, false),
        Field::new("to_position",       DataType::Float64, false),
    ]))
}

fn edge_stat_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("edge_id",             DataType::UInt32,  false),
        Field::new("direction",           DataType::Utf8,    false),
        Field::new("source_feature_id",   DataType::Int64,   false),
        Field::new("from_position",       DataType::Float64, false),
        Field::new("to_position",         DataType::Float64, false),
        Field::new("reserved_population", DataType::Float64, false),
        Field::new("capacity",            DataType::Float64, false),
        Field::new("current_cost",        DataType::Float64, false),
        Field::new("original_cost",       DataType::Float64, false),
        Field::new("congestion",          DataType::Float64, false),
        Field::new("path_count",          DataType::UInt32,  false),
    ]))
}

fn pass_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("pass",        DataType::UInt32, false),
        Field::new("carma_loops", DataType::UInt32, false),
        Field::new("paths",       DataType::UInt64, false),
        Field::new("flagged",     DataType::UInt64, false),
    ]))
}

fn snappy_props() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

fn open(dir: &Path, name: &str, schema: &Arc<Schema>) -> OutputResult<ArrowWriter<File>> {
    let file = File::create(dir.join(name))?;
    Ok(ArrowWriter::try_new(file, Arc::clone(schema), Some(snappy_props()))?)
}

/// Writes a solution to four Parquet files.
///
/// `finish()` **must** be called to write the Parquet file footers; files
/// written without calling `finish()` cannot be opened by Parquet readers.
pub struct ParquetWriter {
    routes:         Option<ArrowWriter<File>>,
    segments:       Option<ArrowWriter<File>>,
    edge_stats:     Option<ArrowWriter<File>>,
    passes:         Option<ArrowWriter<File>>,
    route_schema:   Arc<Schema>,
    segment_schema: Arc<Schema>,
    stat_schema:    Arc<Schema>,
    pass_schema:    Arc<Schema>,
}

impl ParquetWriter {
    /// Create all four Parquet files in `dir`.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let route_schema = route_schema();
        let segment_schema = segment_schema();
        let stat_schema = edge_stat_schema();
        let pass_schema = pass_schema();

        Ok(Self {
            routes:     Some(open(dir, "routes.parquet", &route_schema)?),
            segments:   Some(open(dir, "route_segments.parquet", &segment_schema)?),
            edge_stats: Some(open(dir, "edge_stats.parquet", &stat_schema)?),
            passes:     Some(open(dir, "pass_summaries.parquet", &pass_schema)?),
            route_schema,
            segment_schema,
            stat_schema,
            pass_schema,
        })
    }
}

impl OutputWriter for ParquetWriter {
    fn write_routes(&mut self, rows: &[RouteRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let Some(writer) = self.routes.as_mut() else {
            return Ok(());
        };

        let mut evacuee_ids = UInt32Builder::new();
        let mut paths       = UInt32Builder::new();
        let mut orders      = UInt32Builder::new();
        let mut zones       = UInt32Builder::new();
        let mut populations = Float64Builder::new();
        let mut routed      = Float64Builder::new();
        let mut reserved    = Float64Builder::new();
        let mut original    = Float64Builder::new();
        let mut segments    = UInt32Builder::new();

        for row in rows {
            evacuee_ids.append_value(row.evacuee_id);
            paths.append_value(row.path);
            orders.append_value(row.path_order);
            zones.append_value(row.zone_vertex);
            populations.append_value(row.routed_population);
            routed.append_value(row.routed_cost);
            reserved.append_value(row.reserve_cost);
            original.append_value(row.original_cost);
            segments.append_value(row.segments);
        }

        let batch = RecordBatch::try_new(
            Arc::clone(&self.route_schema),
            vec![
                Arc::new(evacuee_ids.finish()),
                Arc::new(paths.finish()),
                Arc::new(orders.finish()),
                Arc::new(zones.finish()),
                Arc::new(populations.finish()),
                Arc::new(routed.finish()),
                Arc::new(reserved.finish()),
                Arc::new(original.finish()),
                Arc::new(segments.finish()),
            ],
        )?;
        writer.write(&batch)?;
        Ok(())
    }

    fn write_segments(&mut self, rows: &[SegmentRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let Some(writer) = self.segments.as_mut() else {
            return Ok(());
        };

        let mut evacuee_ids = UInt32Builder::new();
        let mut paths       = UInt32Builder::new();
        let mut seqs        = UInt32Builder::new();
        let mut sources     = Int64Builder::new();
        let mut edge_ids    = UInt32Builder::new();
        let mut directions  = StringBuilder::new();
        let mut froms       = Float64Builder::new();
        let mut tos         = Float64Builder::new();

        for row in rows {
            evacuee_ids.append_value(row.evacuee_id);
            paths.append_value(row.path);
            seqs.append_value(row.seq);
            sources.append_value(row.source_feature_id);
            edge_ids.append_value(row.edge_id);
            directions.append_value(row.direction.as_str());
            froms.append_value(row.from_position);
            tos.append_value(row.to_position);
        }

        let batch = RecordBatch::try_new(
            Arc::clone(&self.segment_schema),
            vec![
                Arc::new(evacuee_ids.finish()),
                Arc::new(paths.finish()),
                Arc::new(seqs.finish()),
                Arc::new(sources.finish()),
                Arc::new(edge_ids.finish()),
                Arc::new(directions.finish()),
                Arc::new(froms.finish()),
                Arc::new(tos.finish()),
            ],
        )?;
        writer.write(&batch)?;
        Ok(())
    }

    fn write_edge_stats(&mut self, rows: &[EdgeStatRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let Some(writer) = self.edge_stats.as_mut() else {
            return Ok(());
        };

        let mut edge_ids    = UInt32Builder::new();
        let mut directions  = StringBuilder::new();
        let mut sources     = Int64Builder::new();
        let mut froms       = Float64Builder::new();
        let mut tos         = Float64Builder::new();
        let mut reserved    = Float64Builder::new();
        let mut capacities  = Float64Builder::new();
        let mut current     = Float64Builder::new();
        let mut original    = Float64Builder::new();
        let mut congestion  = Float64Builder::new();
        let mut path_counts = UInt32Builder::new();

        for row in rows {
            edge_ids.append_value(row.edge_id);
            directions.append_value(row.direction.as_str());
            sources.append_value(row.source_feature_id);
            froms.append_value(row.from_position);
            tos.append_value(row.to_position);
            reserved.append_value(row.reserved_population);
            capacities.append_value(row.capacity);
            current.append_value(row.current_cost);
            original.append_value(row.original_cost);
            congestion.append_value(row.congestion);
            path_counts.append_value(row.path_count);
        }

        let batch = RecordBatch::try_new(
            Arc::clone(&self.stat_schema),
            vec![
                Arc::new(edge_ids.finish()),
                Arc::new(directions.finish()),
                Arc::new(sources.finish()),
                Arc::new(froms.finish()),
                Arc::new(tos.finish()),
                Arc::new(reserved.finish()),
                Arc::new(capacities.finish()),
                Arc::new(current.finish()),
                Arc::new(original.finish()),
                Arc::new(congestion.finish()),
                Arc::new(path_counts.finish()),
            ],
        )?;
        writer.write(&batch)?;
        Ok(())
    }

    fn write_pass_summary(&mut self, row: &PassSummaryRow) -> OutputResult<()> {
        let Some(writer) = self.passes.as_mut() else {
            return Ok(());
        };

        let mut passes  = UInt32Builder::new();
        let mut loops   = UInt32Builder::new();
        let mut paths   = UInt64Builder::new();
        let mut flagged = UInt64Builder::new();

        passes.append_value(row.pass);
        loops.append_value(row.carma_loops);
        paths.append_value(row.paths);
        flagged.append_value(row.flagged);

        let batch = RecordBatch::try_new(
            Arc::clone(&self.pass_schema),
            vec![
                Arc::new(passes.finish()),
                Arc::new(loops.finish()),
                Arc::new(paths.finish()),
                Arc::new(flagged.finish()),
            ],
        )?;
        writer.write(&batch)?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        for slot in [&mut self.routes, &mut self.segments, &mut self.edge_stats, &mut self.passes] {
            if let Some(w) = slot.take() {
                w.close()?;
            }
        }
        Ok(())
    }
}
