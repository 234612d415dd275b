//! SQLite output backend (feature `sqlite`).
//!
//! Creates a single `output.db` file in the configured output directory with
//! four tables: `routes`, `route_segments`, `edge_stats`, and
//! `pass_summaries`.

use std::path::Path;

use rusqlite::Connection;

use crate::row::{EdgeStatRow, PassSummaryRow, RouteRow, SegmentRow};
use crate::writer::OutputWriter;
use crate::OutputResult;

/// Writes a solution to an SQLite database.
pub struct SqliteWriter {
    conn:     Connection,
    finished: bool,
}

impl SqliteWriter {
    /// Open (or create) `output.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let conn = Connection::open(dir.join("output.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS routes (
                 evacuee_id        INTEGER NOT NULL,
                 path              INTEGER NOT NULL,
                 path_order        INTEGER NOT NULL,
                 zone_vertex       INTEGER NOT NULL,
                 routed_population REAL    NOT NULL,
                 routed_cost       REAL    NOT NULL,
                 reserve_cost      REAL    NOT NULL,
                 original_cost     REAL    NOT NULL,
                 segments          INTEGER NOT NULL,
                 PRIMARY KEY (evacuee_id, path)
             );
             CREATE TABLE IF NOT EXISTS route_segments (
                 evacuee_id        INTEGER NOT NULL,
                 path              INTEGER NOT NULL,
                 seq               INTEGER NOT NULL,
                 source_feature_id INTEGER NOT NULL,
                 edge_id           INTEGER NOT NULL,
                 direction         TEXT    NOT NULL,
                 from_position     REAL    NOT NULL,
                 to_position       REAL    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS edge_stats (
                 edge_id             INTEGER NOT NULL,
                 direction           TEXT    NOT NULL,
                 source_feature_id   INTEGER NOT NULL,
                 from_position       REAL    NOT NULL,
                 to_position         REAL    NOT NULL,
                 reserved_population REAL    NOT NULL,
                 capacity            REAL    NOT NULL,
                 current_cost        REAL    NOT NULL,
                 original_cost       REAL    NOT NULL,
                 congestion          REAL    NOT NULL,
                 path_count          INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS pass_summaries (
                 pass        INTEGER PRIMARY KEY,
                 carma_loops INTEGER NOT NULL,
                 paths       INTEGER NOT NULL,
                 flagged     INTEGER NOT NULL
             );",
        )?;

        Ok(Self { conn, finished: false })
    }
}

impl OutputWriter for SqliteWriter {
    fn write_routes(&mut self, rows: &[RouteRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO routes \
                 (evacuee_id, path, path_order, zone_vertex, routed_population, \
                  routed_cost, reserve_cost, original_cost, segments) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.evacuee_id,
                    row.path,
                    row.path_order,
                    row.zone_vertex,
                    row.routed_population,
                    row.routed_cost,
                    row.reserve_cost,
                    row.original_cost,
                    row.segments,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_segments(&mut self, rows: &[SegmentRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO route_segments \
                 (evacuee_id, path, seq, source_feature_id, edge_id, direction, from_position, to_position) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.evacuee_id,
                    row.path,
                    row.seq,
                    row.source_feature_id,
                    row.edge_id,
                    row.direction.as_str(),
                    row.from_position,
                    row.to_position,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_edge_stats(&mut self, rows: &[EdgeStatRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO edge_stats \
                 (edge_id, direction, source_feature_id, from_position, to_position, \
                  reserved_population, capacity, current_cost, original_cost, congestion, path_count) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.edge_id,
                    row.direction.as_str(),
                    row.source_feature_id,
                    row.from_position,
                    row.to_position,
                    row.reserved_population,
                    row.capacity,
                    row.current_cost,
                    row.original_cost,
                    row.congestion,
                    row.path_count,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_pass_summary(&mut self, row: &PassSummaryRow) -> OutputResult<()> {
        self.conn.execute(
            "INSERT INTO pass_summaries (pass, carma_loops, paths, flagged) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![row.pass, row.carma_loops, row.paths as i64, row.flagged as i64],
        )?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
