//! mcscript compiles line-oriented payoff scripts into Monte Carlo payoff graphs.
//!
//! A script is a list of `name = expression` statements. Each line is compiled
//! in order into an immutable DAG of payoff nodes; later lines may reference
//! names bound by earlier lines (or by the caller's initial bindings). The
//! compiled script is then priced by averaging discounted values across the
//! paths of a simulation.
//!
//! Modules:
//! - [`payoff`]: the [`Payoff`](payoff::Payoff) trait and node types
//!   (fixed amounts, linear combinations, conditionals, payment and caching).
//! - [`mc`]: path and simulation traits plus a seeded GBM simulation.
//! - [`script`]: tokenizer, line parser, expression compiler, symbol table,
//!   diagnostics log and the [`McScript`](script::McScript) orchestrator.
//!
//! Numerical considerations:
//! - Truthiness is strict: a value is true iff it is greater than zero.
//! - Values are deflated by the path numeraire at their observation time; date
//!   literals become Act/365 year fractions from the configured valuation date.
//! - Node caching is scoped to one path evaluation, so a compiled graph can be
//!   evaluated on many paths concurrently.
//!
//! # Feature Flags
//! - `parallel`: enables Rayon-powered parallel NPV across paths.
//!
//! # Quick Start
//! Price a call on flat paths:
//! ```rust
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use mcscript::prelude::*;
//!
//! let spot: PayoffRef = Arc::new(Asset::new(1.0));
//! let config = ScriptConfig::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
//! let script = McScript::new(&["S"], vec![spot], &["payoff = Max(S - 95, 0)"], config).unwrap();
//!
//! let paths = PathSet::repeated(Arc::new(ConstantPath::new(100.0, 0.0)), 16);
//! assert_eq!(script.npv(&paths, &["payoff"]).unwrap(), vec![5.0]);
//! ```
//!
//! Inspect the diagnostics of a script with a bad line:
//! ```rust
//! use chrono::NaiveDate;
//! use mcscript::script::{McScript, ScriptConfig};
//!
//! let config = ScriptConfig::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
//! let script = McScript::new::<&str, _>(&[], vec![], &["a = 1", "b = c + 1"], config).unwrap();
//! assert!(script.payoff("b").is_none());
//! assert_eq!(script.log().errors().count(), 1);
//! ```

pub mod mc;
pub mod payoff;
pub mod script;

/// Common imports for ergonomic usage.
pub mod prelude {
    pub use crate::mc::{ConstantPath, GbmSimulation, GridPath, Path, PathSet, Simulation};
    pub use crate::payoff::{PathContext, Payoff, PayoffRef};
    pub use crate::payoff::nodes::*;
    pub use crate::script::{Dialect, McScript, ScriptConfig, ScriptError, ScriptLog};
}
