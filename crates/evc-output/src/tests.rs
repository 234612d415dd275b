//! Integration tests for evc-output.

#[cfg(test)]
mod fixtures {
    use evc_core::{Direction, EvacueeId, SolverConfig, VertexId};
    use evc_graph::RoadNetworkBuilder;
    use evc_solver::{Evacuee, Origin, SafeZone, Solver, SolverBuilder};

    use crate::row::{EdgeStatRow, PassSummaryRow, RouteRow, SegmentRow};

    pub fn route_row(evacuee_id: u32, path: u32) -> RouteRow {
        RouteRow {
            evacuee_id,
            path,
            path_order:        evacuee_id + path,
            zone_vertex:       9,
            routed_population: 5.0,
            routed_cost:       2.5,
            reserve_cost:      2.0,
            original_cost:     1.5,
            segments:          2,
        }
    }

    pub fn segment_row(seq: u32, direction: Direction) -> SegmentRow {
        SegmentRow {
            evacuee_id:        1,
            path:              0,
            seq,
            source_feature_id: 100 + seq as i64,
            edge_id:           seq,
            direction,
            from_position:     0.0,
            to_position:       1.0,
        }
    }

    pub fn stat_row(edge_id: u32) -> EdgeStatRow {
        EdgeStatRow {
            edge_id,
            direction:           Direction::Along,
            source_feature_id:   edge_id as i64,
            from_position:       0.0,
            to_position:         1.0,
            reserved_population: 7.0,
            capacity:            1.0,
            current_cost:        1.5,
            original_cost:       1.0,
            congestion:          1.5,
            path_count:          2,
        }
    }

    pub fn pass_row(pass: u32) -> PassSummaryRow {
        PassSummaryRow { pass, carma_loops: 2, paths: 4, flagged: 1 }
    }

    /// Line `0 → 1 → 2` with one evacuee of 4 at `0` and a zone at `2`.
    pub fn solver() -> Solver {
        let mut b = RoadNetworkBuilder::new();
        let v: Vec<VertexId> = (0..3).map(|_| b.add_junction()).collect();
        b.add_edge(v[0], v[1], 1.0, 1.0);
        b.add_edge(v[1], v[2], 1.0, 1.0);

        let config = SolverConfig {
            critical_density_per_capacity:     5.0,
            saturation_density_per_capacity:   10.0,
            initial_delay_cost_per_population: 0.0,
            ..SolverConfig::default()
        };
        SolverBuilder::new(config, b.build())
            .evacuees(vec![Evacuee::new(EvacueeId(1), 4.0, vec![Origin::at(v[0])])])
            .safe_zones(vec![SafeZone::new(v[2], None)])
            .build()
            .unwrap()
    }
}

#[cfg(test)]
mod csv_tests {
    use tempfile::TempDir;

    use evc_core::Direction;

    use super::fixtures::{pass_row, route_row, segment_row, solver, stat_row};
    use crate::csv::CsvWriter;
    use crate::observer::SolveOutputObserver;
    use crate::writer::{write_solution, OutputWriter};

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn records(dir: &TempDir, name: &str) -> Vec<csv::StringRecord> {
        let mut rdr = csv::Reader::from_path(dir.path().join(name)).unwrap();
        rdr.records().map(|r| r.unwrap()).collect()
    }

    fn headers(dir: &TempDir, name: &str) -> Vec<String> {
        let mut rdr = csv::Reader::from_path(dir.path().join(name)).unwrap();
        rdr.headers().unwrap().iter().map(str::to_owned).collect()
    }

    #[test]
    fn csv_files_created() {
        let dir = tmp();
        let _w = CsvWriter::new(dir.path()).unwrap();
        for name in ["routes.csv", "route_segments.csv", "edge_stats.csv", "pass_summaries.csv"] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn csv_headers_correct() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();

        assert_eq!(headers(&dir, "routes.csv"), crate::csv::ROUTE_HEADER);
        assert_eq!(headers(&dir, "route_segments.csv"), crate::csv::SEGMENT_HEADER);
        assert_eq!(headers(&dir, "edge_stats.csv"), crate::csv::EDGE_STAT_HEADER);
        assert_eq!(headers(&dir, "pass_summaries.csv"), ["pass", "carma_loops", "paths", "flagged"]);
    }

    #[test]
    fn csv_route_rows() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_routes(&[route_row(1, 0), route_row(1, 1), route_row(2, 0)]).unwrap();
        w.finish().unwrap();

        let rows = records(&dir, "routes.csv");
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[1][0], "1"); // evacuee_id
        assert_eq!(&rows[1][1], "1"); // path
        assert_eq!(&rows[2][4], "5"); // routed_population
        assert_eq!(&rows[2][5], "2.5"); // routed_cost
    }

    #[test]
    fn csv_direction_written_as_text() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_segments(&[segment_row(0, Direction::Along), segment_row(1, Direction::Against)]).unwrap();
        w.finish().unwrap();

        let rows = records(&dir, "route_segments.csv");
        assert_eq!(&rows[0][5], "Along");
        assert_eq!(&rows[1][5], "Against");
        assert_eq!(&rows[1][3], "101"); // source_feature_id
    }

    #[test]
    fn csv_pass_summary() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_pass_summary(&pass_row(3)).unwrap();
        w.write_edge_stats(&[stat_row(4)]).unwrap();
        w.finish().unwrap();

        let rows = records(&dir, "pass_summaries.csv");
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "3");
        assert_eq!(&rows[0][2], "4");
        assert_eq!(records(&dir, "edge_stats.csv").len(), 1);
    }

    #[test]
    fn csv_finish_idempotent() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        w.finish().unwrap();
    }

    #[test]
    fn csv_empty_batches_ok() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_routes(&[]).unwrap();
        w.write_segments(&[]).unwrap();
        w.write_edge_stats(&[]).unwrap();
    }

    #[test]
    fn integration_csv() {
        let dir = tmp();
        let mut solver = solver();
        let mut obs = SolveOutputObserver::new(CsvWriter::new(dir.path()).unwrap());
        let report = solver.solve(&mut obs).unwrap();
        assert!(obs.take_error().is_none());
        write_solution(&solver, obs.writer_mut()).unwrap();

        assert_eq!(report.paths, 1);
        let routes = records(&dir, "routes.csv");
        assert_eq!(routes.len(), 1);
        assert_eq!(&routes[0][3], "2"); // zone_vertex
        assert_eq!(&routes[0][8], "2"); // segments

        let segments = records(&dir, "route_segments.csv");
        assert_eq!(segments.len(), 2);
        assert_eq!(&segments[0][4], "0");
        assert_eq!(&segments[1][4], "1");

        // Only the used direction of each edge is reported.
        assert_eq!(records(&dir, "edge_stats.csv").len(), 2);

        let passes = records(&dir, "pass_summaries.csv");
        assert_eq!(passes.len(), 1);
        assert_eq!(&passes[0][0], "0"); // pass
        assert_eq!(&passes[0][2], "1"); // paths
        assert_eq!(&passes[0][3], "0"); // flagged
    }
}

// ── SQLite tests ──────────────────────────────────────────────────────────────

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_tests {
    use tempfile::TempDir;

    use evc_core::Direction;

    use super::fixtures::{pass_row, route_row, segment_row, stat_row};
    use crate::sqlite::SqliteWriter;
    use crate::writer::OutputWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn count(dir: &TempDir, table: &str) -> i64 {
        let conn = rusqlite::Connection::open(dir.path().join("output.db")).unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn sqlite_db_created() {
        let dir = tmp();
        let _w = SqliteWriter::new(dir.path()).unwrap();
        assert!(dir.path().join("output.db").exists());
    }

    #[test]
    fn sqlite_row_counts() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.write_routes(&[route_row(1, 0), route_row(2, 0)]).unwrap();
        w.write_segments(&[segment_row(0, Direction::Along), segment_row(1, Direction::Along), segment_row(2, Direction::Against)]).unwrap();
        w.write_edge_stats(&[stat_row(0)]).unwrap();
        w.write_pass_summary(&pass_row(0)).unwrap();
        w.finish().unwrap();

        assert_eq!(count(&dir, "routes"), 2);
        assert_eq!(count(&dir, "route_segments"), 3);
        assert_eq!(count(&dir, "edge_stats"), 1);
        assert_eq!(count(&dir, "pass_summaries"), 1);
    }

    #[test]
    fn sqlite_direction_as_text() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.write_segments(&[segment_row(0, Direction::Against)]).unwrap();
        w.finish().unwrap();

        let conn = rusqlite::Connection::open(dir.path().join("output.db")).unwrap();
        let dir_text: String = conn
            .query_row("SELECT direction FROM route_segments WHERE seq = 0", [], |r| r.get(0))
            .unwrap();
        assert_eq!(dir_text, "Against");
    }

    #[test]
    fn sqlite_edge_stat_values() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.write_edge_stats(&[stat_row(3)]).unwrap();
        w.finish().unwrap();

        let conn = rusqlite::Connection::open(dir.path().join("output.db")).unwrap();
        let (reserved, paths): (f64, i64) = conn
            .query_row(
                "SELECT reserved_population, path_count FROM edge_stats WHERE edge_id = 3",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(reserved, 7.0);
        assert_eq!(paths, 2);
    }
}

// ── Parquet tests ─────────────────────────────────────────────────────────────

#[cfg(all(test, feature = "parquet"))]
mod parquet_tests {
    use tempfile::TempDir;

    use arrow::datatypes::DataType;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    use evc_core::Direction;

    use super::fixtures::{route_row, segment_row};
    use crate::parquet::ParquetWriter;
    use crate::writer::OutputWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    #[test]
    fn parquet_files_created() {
        let dir = tmp();
        let mut w = ParquetWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        for name in ["routes.parquet", "route_segments.parquet", "edge_stats.parquet", "pass_summaries.parquet"] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn parquet_route_rows() {
        let dir = tmp();
        let mut w = ParquetWriter::new(dir.path()).unwrap();
        w.write_routes(&[route_row(1, 0), route_row(1, 1)]).unwrap();
        w.finish().unwrap();

        let file = std::fs::File::open(dir.path().join("routes.parquet")).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        let schema = builder.schema().clone();
        let reader = builder.build().unwrap();

        let total_rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(total_rows, 2);

        let field_names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(field_names, crate::csv::ROUTE_HEADER);
    }

    #[test]
    fn parquet_direction_column_type() {
        let dir = tmp();
        let mut w = ParquetWriter::new(dir.path()).unwrap();
        w.write_segments(&[segment_row(0, Direction::Along)]).unwrap();
        w.finish().unwrap();

        let file = std::fs::File::open(dir.path().join("route_segments.parquet")).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        let field = builder.schema().field_with_name("direction").unwrap().clone();
        assert_eq!(*field.data_type(), DataType::Utf8);
    }

    #[test]
    fn parquet_finish_required() {
        let dir = tmp();
        {
            let mut w = ParquetWriter::new(dir.path()).unwrap();
            w.write_routes(&[route_row(0, 0)]).unwrap();
            // Dropped without finish(): no footer.
        }

        let file = std::fs::File::open(dir.path().join("routes.parquet")).unwrap();
        let result = ParquetRecordBatchReaderBuilder::try_new(file);
        assert!(result.is_err(), "file without Parquet footer should fail to open");
    }
}
