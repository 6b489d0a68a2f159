//! Path implementations and a seeded GBM simulator.

use crate::mc::{Path, Simulation};
use crate::script::ScriptError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use std::sync::Arc;

/// Flat asset level with a deterministic bank-account numeraire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPath {
    pub spot: f64,
    pub rate: f64,
}

impl ConstantPath {
    pub fn new(spot: f64, rate: f64) -> Self {
        Self { spot, rate }
    }
}

impl Path for ConstantPath {
    fn asset(&self, _t: f64) -> f64 {
        self.spot
    }

    fn numeraire(&self, t: f64) -> f64 {
        (self.rate * t).exp()
    }
}

/// Asset values on a time grid.
///
/// Lookup at `t` returns the value at the last grid time not after `t`;
/// times before the grid start return the first value.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPath {
    times: Arc<Vec<f64>>,
    values: Vec<f64>,
    rate: f64,
}

impl GridPath {
    pub fn new(times: Vec<f64>, values: Vec<f64>, rate: f64) -> Result<Self, ScriptError> {
        Self::on_grid(Arc::new(times), values, rate)
    }

    fn on_grid(times: Arc<Vec<f64>>, values: Vec<f64>, rate: f64) -> Result<Self, ScriptError> {
        if times.is_empty() {
            return Err(ScriptError::InvalidInput(
                "path grid must not be empty".to_string(),
            ));
        }
        if times.len() != values.len() {
            return Err(ScriptError::InvalidInput(format!(
                "path grid has {} times but {} values",
                times.len(),
                values.len()
            )));
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ScriptError::InvalidInput(
                "path grid times must be strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            times,
            values,
            rate,
        })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn index_at(&self, t: f64) -> usize {
        // Small tolerance so that year fractions computed from dates land on
        // the grid point they were meant to hit.
        let idx = self.times.partition_point(|&x| x <= t + 1e-12);
        idx.saturating_sub(1)
    }
}

impl Path for GridPath {
    fn asset(&self, t: f64) -> f64 {
        self.values[self.index_at(t)]
    }

    fn numeraire(&self, t: f64) -> f64 {
        (self.rate * t).exp()
    }
}

/// A simulation over an explicit list of paths.
#[derive(Clone)]
pub struct PathSet {
    paths: Vec<Arc<dyn Path>>,
}

impl PathSet {
    pub fn new(paths: Vec<Arc<dyn Path>>) -> Self {
        Self { paths }
    }

    /// `n` copies of the same path.
    pub fn repeated(path: Arc<dyn Path>, n: usize) -> Self {
        Self {
            paths: vec![path; n],
        }
    }
}

impl std::fmt::Debug for PathSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathSet")
            .field("n_paths", &self.paths.len())
            .finish()
    }
}

impl Simulation for PathSet {
    fn n_paths(&self) -> usize {
        self.paths.len()
    }

    fn path(&self, n: usize) -> Arc<dyn Path> {
        Arc::clone(&self.paths[n])
    }
}

/// Geometric Brownian motion under the bank-account measure.
///
/// `dS = (r - q) S dt + sigma S dW`, simulated exactly in log space on an
/// equidistant grid over `[0, horizon]`. Paths are generated eagerly at
/// construction from a seeded `StdRng`, so repeated runs are reproducible.
#[derive(Debug, Clone)]
pub struct GbmSimulation {
    pub spot: f64,
    pub vol: f64,
    pub rate: f64,
    pub dividend_yield: f64,
    pub horizon: f64,
    pub steps: usize,
    paths: Vec<Arc<GridPath>>,
}

impl GbmSimulation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spot: f64,
        vol: f64,
        rate: f64,
        dividend_yield: f64,
        horizon: f64,
        steps: usize,
        num_paths: usize,
        seed: u64,
    ) -> Result<Self, ScriptError> {
        if num_paths == 0 {
            return Err(ScriptError::InvalidInput(
                "num_paths must be > 0".to_string(),
            ));
        }
        if steps == 0 {
            return Err(ScriptError::InvalidInput("steps must be > 0".to_string()));
        }
        if horizon <= 0.0 || !horizon.is_finite() {
            return Err(ScriptError::InvalidInput(
                "horizon must be positive and finite".to_string(),
            ));
        }
        if spot <= 0.0 || vol < 0.0 {
            return Err(ScriptError::InvalidInput(
                "spot must be > 0 and vol >= 0".to_string(),
            ));
        }

        let dt = horizon / steps as f64;
        let times: Arc<Vec<f64>> = Arc::new((0..=steps).map(|i| i as f64 * dt).collect());
        let drift = (rate - dividend_yield - 0.5 * vol * vol) * dt;
        let diffusion = vol * dt.sqrt();

        let mut rng = StdRng::seed_from_u64(seed);
        let mut paths = Vec::with_capacity(num_paths);
        for _ in 0..num_paths {
            let mut values = Vec::with_capacity(steps + 1);
            let mut s = spot;
            values.push(s);
            for _ in 0..steps {
                let z: f64 = StandardNormal.sample(&mut rng);
                s *= diffusion.mul_add(z, drift).exp();
                values.push(s);
            }
            paths.push(Arc::new(GridPath::on_grid(Arc::clone(&times), values, rate)?));
        }

        Ok(Self {
            spot,
            vol,
            rate,
            dividend_yield,
            horizon,
            steps,
            paths,
        })
    }
}

impl Simulation for GbmSimulation {
    fn n_paths(&self) -> usize {
        self.paths.len()
    }

    fn path(&self, n: usize) -> Arc<dyn Path> {
        self.paths[n].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn grid_path_step_lookup() {
        let p = GridPath::new(vec![0.0, 0.5, 1.0], vec![1.0, 2.0, 3.0], 0.0).unwrap();
        assert_eq!(p.asset(-1.0), 1.0);
        assert_eq!(p.asset(0.0), 1.0);
        assert_eq!(p.asset(0.49), 1.0);
        assert_eq!(p.asset(0.5), 2.0);
        assert_eq!(p.asset(10.0), 3.0);
    }

    #[test]
    fn grid_path_rejects_bad_grids() {
        assert!(GridPath::new(vec![], vec![], 0.0).is_err());
        assert!(GridPath::new(vec![0.0, 1.0], vec![1.0], 0.0).is_err());
        assert!(GridPath::new(vec![0.0, 0.0], vec![1.0, 1.0], 0.0).is_err());
    }

    #[test]
    fn constant_path_numeraire() {
        let p = ConstantPath::new(100.0, 0.05);
        assert_eq!(p.numeraire(0.0), 1.0);
        assert_relative_eq!(p.numeraire(2.0), 0.1f64.exp(), epsilon = 1e-14);
    }

    #[test]
    fn gbm_paths_start_at_spot_and_are_reproducible() {
        let a = GbmSimulation::new(100.0, 0.2, 0.03, 0.0, 1.0, 12, 8, 42).unwrap();
        let b = GbmSimulation::new(100.0, 0.2, 0.03, 0.0, 1.0, 12, 8, 42).unwrap();
        assert_eq!(a.n_paths(), 8);
        for n in 0..a.n_paths() {
            assert_eq!(a.path(n).asset(0.0), 100.0);
            assert_eq!(a.path(n).asset(1.0), b.path(n).asset(1.0));
        }
    }

    #[test]
    fn gbm_forward_is_martingale_under_numeraire() {
        let sim = GbmSimulation::new(100.0, 0.2, 0.05, 0.0, 1.0, 4, 40_000, 7).unwrap();
        let mean: f64 = (0..sim.n_paths())
            .map(|n| {
                let p = sim.path(n);
                p.asset(1.0) / p.numeraire(1.0)
            })
            .sum::<f64>()
            / sim.n_paths() as f64;
        assert!((mean - 100.0).abs() < 0.5, "deflated mean {mean}");
    }

    #[test]
    fn gbm_rejects_invalid_inputs() {
        assert!(GbmSimulation::new(100.0, 0.2, 0.0, 0.0, 1.0, 10, 0, 1).is_err());
        assert!(GbmSimulation::new(100.0, 0.2, 0.0, 0.0, 1.0, 0, 10, 1).is_err());
        assert!(GbmSimulation::new(100.0, 0.2, 0.0, 0.0, 0.0, 10, 10, 1).is_err());
        assert!(GbmSimulation::new(-1.0, 0.2, 0.0, 0.0, 1.0, 10, 10, 1).is_err());
    }
}
