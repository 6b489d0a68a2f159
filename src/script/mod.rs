//! Payoff script compiler.
//!
//! Compiles a line-oriented script of `name = expression` statements into a
//! DAG of [`Payoff`](crate::payoff::Payoff) nodes and prices any of the named
//! results on a Monte Carlo [`Simulation`].
//!
//! # Architecture
//!
//! ```text
//! script lines ──→ LineCompiler ──→ SymbolTable ──→ result payoff
//!                  │                                   ↑
//!                  ├─ PrimaryDialect: lexer → parser → ExpressionCompiler
//!                  └─ LegacyDialect:  regex grammar (NonRecursive)
//!                                                      │
//!                                       Simulation ────┴──→ npv
//! ```
//!
//! A bad line never aborts a script: it is reported in the [`ScriptLog`] and
//! skipped. Only configuration problems (initial bindings, no payoffs at all)
//! fail construction.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use mcscript::mc::{ConstantPath, PathSet};
//! use mcscript::payoff::{Asset, PayoffRef};
//! use mcscript::script::{McScript, ScriptConfig};
//!
//! let spot: PayoffRef = Arc::new(Asset::new(1.0));
//! let script = ["K = 90", "call = Pay(Max(S - K, 0), 1.0)", "payoff = call"];
//! let config = ScriptConfig::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
//! let compiled = McScript::new(&["S"], vec![spot], &script, config).unwrap();
//!
//! let paths = PathSet::repeated(Arc::new(ConstantPath::new(100.0, 0.0)), 8);
//! let npv = compiled.npv(&paths, &["payoff"]).unwrap();
//! assert_eq!(npv, vec![10.0]);
//! ```

pub mod ast;
pub mod compiler;
pub mod config;
pub mod dates;
pub(crate) mod dialect;
pub mod error;
pub(crate) mod legacy;
pub mod lexer;
pub mod log;
pub mod parser;
pub mod symbols;

pub use ast::{ExprKind, Expression};
pub use compiler::ExpressionCompiler;
pub use config::{Dialect, LEGACY_SENTINEL, ScriptConfig};
pub use error::ScriptError;
pub use log::{LogEntry, LogKind, ScriptLog};
pub use parser::{MAX_NESTING, ParsedLine, parse_line};
pub use symbols::{Binding, SymbolTable};

use crate::mc::Simulation;
use crate::payoff::{PathContext, Payoff, PayoffRef, normalize_times};
use dialect::{CompiledLine, LineCompiler, PrimaryDialect, ScriptState};
use legacy::LegacyDialect;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Name that, when bound, is always the script result.
pub const RESULT_NAME: &str = "payoff";

/// A compiled payoff script.
///
/// Holds every named payoff (initial bindings plus script lines), the textual
/// syntax trees, the diagnostics log and the designated result. Immutable
/// after construction and safe to share between threads.
#[derive(Debug, Clone)]
pub struct McScript {
    symbols: SymbolTable,
    expressions: Vec<String>,
    log: ScriptLog,
    result: PayoffRef,
    dialect: Dialect,
}

impl McScript {
    /// Compiles `script` on top of the initial `names`/`payoffs` bindings.
    ///
    /// # Errors
    ///
    /// [`ScriptError::Configuration`] when the initial lists differ in length,
    /// an initial name repeats while overwrite is disabled, or no payoff is
    /// bound after the whole script. Errors on individual script lines are
    /// logged instead.
    pub fn new<S, L>(
        names: &[S],
        payoffs: Vec<PayoffRef>,
        script: &[L],
        config: ScriptConfig,
    ) -> Result<Self, ScriptError>
    where
        S: AsRef<str>,
        L: AsRef<str>,
    {
        if names.len() != payoffs.len() {
            return Err(ScriptError::Configuration(format!(
                "{} names but {} payoffs",
                names.len(),
                payoffs.len()
            )));
        }

        let mut state = ScriptState::new(config.valuation_date);
        for (name, payoff) in names.iter().zip(payoffs) {
            let name = name.as_ref();
            let kind = match state.symbols.insert_or_replace(name, payoff, config.overwrite)? {
                Binding::Inserted => LogKind::Insert,
                Binding::Replaced => LogKind::Replace,
            };
            state.log.push(kind, None, format!("'{name}'"));
        }

        let dialect = Dialect::detect(script);
        match dialect {
            Dialect::Primary => compile_lines(&PrimaryDialect, &mut state, script, 0, config),
            Dialect::Legacy => {
                compile_lines(&LegacyDialect::new()?, &mut state, script, 1, config)
            }
        }

        let result = match state.symbols.find(RESULT_NAME) {
            Some(p) => p.clone(),
            None => match state.symbols.last() {
                Some((_, p)) => p.clone(),
                None => {
                    return Err(ScriptError::Configuration(
                        "no payoffs after compiling script".to_string(),
                    ));
                }
            },
        };

        tracing::info!(
            ?dialect,
            lines = script.len(),
            payoffs = state.symbols.len(),
            errors = state.log.errors().count(),
            "script compiled"
        );

        Ok(Self {
            symbols: state.symbols,
            expressions: state.expressions,
            log: state.log,
            result,
            dialect,
        })
    }

    /// All named payoffs, in write order.
    pub fn payoffs(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Payoff bound to `name`, if any.
    pub fn payoff(&self, name: &str) -> Option<&PayoffRef> {
        self.symbols.find(name)
    }

    /// Textual syntax trees, `L<line>:<tree>`, one per parsed line.
    ///
    /// Always empty for the legacy dialect, which has no syntax tree.
    pub fn expressions(&self) -> &[String] {
        &self.expressions
    }

    pub fn log(&self) -> &ScriptLog {
        &self.log
    }

    /// The designated result: `payoff` if bound, else the last written name.
    pub fn result(&self) -> &PayoffRef {
        &self.result
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Union of the observation times of the named payoffs.
    pub fn observation_times<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<f64>, ScriptError> {
        let mut times: Vec<f64> = self
            .symbols
            .resolve_all(names)?
            .iter()
            .flat_map(|p| p.observation_times())
            .collect();
        normalize_times(&mut times);
        Ok(times)
    }

    /// Monte Carlo average of each named payoff's discounted value.
    ///
    /// Every name is resolved before the first path is touched.
    pub fn npv<S: AsRef<str>>(
        &self,
        simulation: &dyn Simulation,
        names: &[S],
    ) -> Result<Vec<f64>, ScriptError> {
        let payoffs = self.symbols.resolve_all(names)?;
        let n_paths = checked_path_count(simulation)?;

        let mut sums = vec![0.0; payoffs.len()];
        for n in 0..n_paths {
            let path = simulation.path(n);
            let ctx = PathContext::new(path.as_ref());
            for (sum, payoff) in sums.iter_mut().zip(&payoffs) {
                *sum += payoff.discounted_at(&ctx);
            }
        }
        Ok(sums.into_iter().map(|s| s / n_paths as f64).collect())
    }

    /// Parallel variant of [`McScript::npv`]; paths are split across the
    /// rayon pool, each with its own evaluation context.
    #[cfg(feature = "parallel")]
    pub fn npv_parallel<S: AsRef<str>>(
        &self,
        simulation: &dyn Simulation,
        names: &[S],
    ) -> Result<Vec<f64>, ScriptError> {
        let payoffs = self.symbols.resolve_all(names)?;
        let n_paths = checked_path_count(simulation)?;

        let sums = (0..n_paths)
            .into_par_iter()
            .map(|n| {
                let path = simulation.path(n);
                let ctx = PathContext::new(path.as_ref());
                payoffs
                    .iter()
                    .map(|p| p.discounted_at(&ctx))
                    .collect::<Vec<f64>>()
            })
            .reduce(
                || vec![0.0; payoffs.len()],
                |mut acc, values| {
                    for (a, v) in acc.iter_mut().zip(values) {
                        *a += v;
                    }
                    acc
                },
            );
        Ok(sums.into_iter().map(|s| s / n_paths as f64).collect())
    }
}

impl Payoff for McScript {
    fn observation_time(&self) -> f64 {
        self.result.observation_time()
    }

    fn at(&self, ctx: &PathContext<'_>) -> f64 {
        self.result.at(ctx)
    }

    fn observation_times(&self) -> Vec<f64> {
        self.result.observation_times()
    }
}

fn checked_path_count(simulation: &dyn Simulation) -> Result<usize, ScriptError> {
    match simulation.n_paths() {
        0 => Err(ScriptError::InvalidInput(
            "simulation has no paths".to_string(),
        )),
        n => Ok(n),
    }
}

/// Runs `compiler` over `script[skip..]` and binds each compiled line.
fn compile_lines<C, L>(
    compiler: &C,
    state: &mut ScriptState,
    script: &[L],
    skip: usize,
    config: ScriptConfig,
) where
    C: LineCompiler,
    L: AsRef<str>,
{
    for (line, text) in script.iter().enumerate().skip(skip) {
        if let Some(compiled) = compiler.compile_line(state, line, text.as_ref()) {
            bind(state, line, compiled, config.overwrite);
        }
    }
}

fn bind(state: &mut ScriptState, line: usize, compiled: CompiledLine, overwrite: bool) {
    let CompiledLine { name, payoff, text } = compiled;
    match state.symbols.insert_or_replace(&name, payoff, overwrite) {
        Ok(Binding::Inserted) => {
            tracing::debug!(line, %name, "inserted");
            state.log.insert(line, format!("'{text}'"));
        }
        Ok(Binding::Replaced) => {
            tracing::debug!(line, %name, "replaced");
            state.log.replace(line, format!("'{text}'"));
        }
        Err(_) => state.log.error(line, format!("Cannot replace '{name}'")),
    }
}
