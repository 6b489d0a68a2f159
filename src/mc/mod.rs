//! Monte Carlo path abstractions consumed by payoff evaluation.
//!
//! A [`Path`] answers two questions for a payoff: the asset level at a time
//! and the numeraire at a time. A [`Simulation`] is an indexable collection of
//! paths.

pub mod simulation;

pub use simulation::{ConstantPath, GbmSimulation, GridPath, PathSet};

use std::sync::Arc;

/// One simulated scenario.
pub trait Path: Send + Sync {
    /// Underlying asset level at time `t`.
    fn asset(&self, t: f64) -> f64;

    /// Numeraire value at time `t`; `numeraire(0.0)` is normally `1.0`.
    fn numeraire(&self, t: f64) -> f64;
}

/// An indexable set of simulated paths.
pub trait Simulation: Send + Sync {
    fn n_paths(&self) -> usize;

    /// Path at index `n`, `0 <= n < n_paths()`.
    fn path(&self, n: usize) -> Arc<dyn Path>;
}
