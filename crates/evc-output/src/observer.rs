//! `SolveOutputObserver<W>` — bridges `SolveObserver` to an `OutputWriter`.

use evc_solver::{Evacuee, EvcPath, SolveObserver};

use crate::row::PassSummaryRow;
use crate::writer::OutputWriter;
use crate::OutputError;

/// A [`SolveObserver`] that writes one summary row per solve pass to any
/// [`OutputWriter`] backend (CSV, SQLite, Parquet, …).
///
/// Errors from the writer are stored internally because `SolveObserver`
/// methods have no return value.  After `solver.solve()` returns, check for
/// errors with [`take_error`][Self::take_error], then hand the writer to
/// [`write_solution`][crate::write_solution] for the routes themselves.
pub struct SolveOutputObserver<W: OutputWriter> {
    writer:      W,
    carma_loops: u32,
    paths:       u64,
    last_error:  Option<OutputError>,
}

impl<W: OutputWriter> SolveOutputObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, carma_loops: 0, paths: 0, last_error: None }
    }

    /// Take the stored write error (if any) after `solver.solve()` returns.
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Unwrap the inner writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: crate::OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> SolveObserver for SolveOutputObserver<W> {
    fn on_carma_loop(&mut self, _carma_loop: u32, _settled: usize, _min_pop: f64) {
        self.carma_loops += 1;
    }

    fn on_path(&mut self, _evacuee: &Evacuee, _path: &EvcPath) {
        self.paths += 1;
    }

    fn on_pass_end(&mut self, pass: u32, flagged: usize) {
        let row = PassSummaryRow {
            pass,
            carma_loops: self.carma_loops,
            paths:       self.paths,
            flagged:     flagged as u64,
        };
        self.carma_loops = 0;
        self.paths = 0;
        let result = self.writer.write_pass_summary(&row);
        self.store_err(result);
    }
}
