//! Solve observer trait for progress reporting.

use crate::evacuee::{Evacuee, EvcPath};
use crate::solver::SolveReport;

/// Callbacks invoked by [`Solver::solve`][crate::Solver::solve] at key points
/// of the CARMA loop and the refinement passes.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example — loop counter
///
/// ```rust,ignore
/// struct LoopCounter(u32);
///
/// impl SolveObserver for LoopCounter {
///     fn on_carma_loop(&mut self, _loop: u32, _settled: usize, _min_pop: f64) {
///         self.0 += 1;
///     }
/// }
/// ```
pub trait SolveObserver {
    /// Called after each CARMA loop with the number of edges it settled and
    /// the minimum population it classified dirty edges at.
    fn on_carma_loop(&mut self, _carma_loop: u32, _settled: usize, _min_pop: f64) {}

    /// Called after a path is committed.
    fn on_path(&mut self, _evacuee: &Evacuee, _path: &EvcPath) {}

    /// Called at the end of each pass.  `flagged` is the number of evacuees
    /// sent back for another pass.
    fn on_pass_end(&mut self, _pass: u32, _flagged: usize) {}

    /// Called once when the solve finishes.
    fn on_solve_end(&mut self, _report: &SolveReport) {}
}

/// A [`SolveObserver`] that does nothing.
pub struct NoopObserver;

impl SolveObserver for NoopObserver {}
