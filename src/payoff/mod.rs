//! Payoff nodes evaluated on simulated paths.
//!
//! A payoff is an immutable node in a shared DAG. Composite nodes hold
//! [`PayoffRef`] handles to their children, so one sub-result can be reused by
//! many parents without copying. Nodes never mutate after construction; any
//! per-path state (the [`nodes::Cache`] memo) lives in the [`PathContext`].
//!
//! ```rust
//! use std::sync::Arc;
//! use mcscript::mc::ConstantPath;
//! use mcscript::payoff::{Axpy, FixedAmount, PathContext, Payoff, PayoffRef};
//!
//! let two: PayoffRef = Arc::new(FixedAmount::new(2.0));
//! let three: PayoffRef = Arc::new(FixedAmount::new(3.0));
//! let sum = Axpy::new(1.0, two, Some(three));
//!
//! let path = ConstantPath::new(100.0, 0.0);
//! let ctx = PathContext::new(&path);
//! assert_eq!(sum.at(&ctx), 5.0);
//! ```

pub mod nodes;

pub use nodes::{
    Asset, Axpy, Cache, Division, FixedAmount, IfThenElse, Logical, LogicalOp, Max, Min, Mult,
    Pay, PayoffAt,
};

use crate::mc::Path;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a payoff node.
pub type PayoffRef = Arc<dyn Payoff>;

/// A computation yielding one number per simulated path.
pub trait Payoff: fmt::Debug + Send + Sync {
    /// Time at which the value is observed; drives discounting.
    fn observation_time(&self) -> f64;

    /// Value on the path held by `ctx`.
    fn at(&self, ctx: &PathContext<'_>) -> f64;

    /// Sorted, de-duplicated simulation times this node needs.
    fn observation_times(&self) -> Vec<f64>;

    /// Value deflated by the numeraire at the observation time.
    fn discounted_at(&self, ctx: &PathContext<'_>) -> f64 {
        self.at(ctx) / ctx.path().numeraire(self.observation_time())
    }
}

/// Per-path evaluation context.
///
/// Holds the path plus a memo table for cached nodes. A context must not
/// outlive its path and is never shared between paths.
pub struct PathContext<'a> {
    path: &'a dyn Path,
    memo: RefCell<HashMap<usize, f64>>,
}

impl<'a> PathContext<'a> {
    pub fn new(path: &'a dyn Path) -> Self {
        Self {
            path,
            memo: RefCell::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn path(&self) -> &'a dyn Path {
        self.path
    }

    pub(crate) fn cached(&self, id: usize) -> Option<f64> {
        self.memo.borrow().get(&id).copied()
    }

    pub(crate) fn store(&self, id: usize, value: f64) {
        self.memo.borrow_mut().insert(id, value);
    }
}

impl fmt::Debug for PathContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathContext")
            .field("cached", &self.memo.borrow().len())
            .finish()
    }
}

/// Union of two sorted time sets.
pub fn union_times(lhs: &[f64], rhs: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(lhs.len() + rhs.len());
    out.extend_from_slice(lhs);
    out.extend_from_slice(rhs);
    normalize_times(&mut out);
    out
}

/// Sorts and removes duplicate times in place.
pub fn normalize_times(times: &mut Vec<f64>) {
    times.sort_by(f64::total_cmp);
    times.dedup();
}
