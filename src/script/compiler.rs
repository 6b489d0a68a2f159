//! Expression compiler: syntax tree -> payoff DAG.
//!
//! Identifiers resolve to the payoff already bound in the symbol table, so a
//! name referenced twice shares one node. Because only previously bound names
//! can be referenced, the resulting graph is acyclic by construction.

use crate::payoff::{
    Axpy, Cache, Division, FixedAmount, IfThenElse, Logical, LogicalOp, Max, Min, Mult, Pay,
    PayoffAt, PayoffRef,
};
use crate::script::ScriptError;
use crate::script::ast::{ExprKind, Expression};
use crate::script::dates::{date_to_time, parse_number};
use crate::script::log::ScriptLog;
use crate::script::parser::MAX_NESTING;
use crate::script::symbols::SymbolTable;
use chrono::NaiveDate;
use std::sync::Arc;

/// Compiles right-hand sides of assignments for one script line at a time.
pub struct ExpressionCompiler<'a> {
    symbols: &'a SymbolTable,
    valuation_date: NaiveDate,
    log: &'a mut ScriptLog,
    depth: usize,
}

impl<'a> ExpressionCompiler<'a> {
    pub fn new(
        symbols: &'a SymbolTable,
        valuation_date: NaiveDate,
        log: &'a mut ScriptLog,
    ) -> Self {
        Self {
            symbols,
            valuation_date,
            log,
            depth: 0,
        }
    }

    /// Compiles `tree`, reporting failures against script line `line`.
    ///
    /// Nodes built for a failing tree are dropped; nothing is bound.
    pub fn compile(
        &mut self,
        tree: Option<&Expression>,
        line: usize,
    ) -> Result<PayoffRef, ScriptError> {
        let tree = tree.ok_or_else(|| ScriptError::compile(line, "Empty expression tree."))?;
        self.compile_node(tree, line)
    }

    fn compile_node(&mut self, tree: &Expression, line: usize) -> Result<PayoffRef, ScriptError> {
        if self.depth >= MAX_NESTING {
            return Err(ScriptError::compile(line, "expression nested too deeply"));
        }
        self.depth += 1;
        let payoff = self.build_node(tree, line);
        self.depth -= 1;
        payoff
    }

    fn build_node(&mut self, tree: &Expression, line: usize) -> Result<PayoffRef, ScriptError> {
        check_arity(tree, line)?;
        let payoff: PayoffRef = match tree.kind {
            ExprKind::Number => {
                let amount = self.number(&tree.leaves[0], line)?;
                Arc::new(FixedAmount::new(amount))
            }
            ExprKind::Identifier => self.lookup(&tree.leaves[0], line)?,
            ExprKind::UnaryPlus => self.compile_node(&tree.children[0], line)?,
            ExprKind::UnaryMinus => {
                let x = self.compile_node(&tree.children[0], line)?;
                Arc::new(Axpy::new(-1.0, x, None))
            }
            ExprKind::Plus => {
                let (x, y) = self.pair(tree, line)?;
                Arc::new(Axpy::new(1.0, x, Some(y)))
            }
            ExprKind::Minus => {
                let (x, y) = self.pair(tree, line)?;
                Arc::new(Axpy::new(-1.0, y, Some(x)))
            }
            ExprKind::Mult => {
                let (x, y) = self.pair(tree, line)?;
                Arc::new(Mult::new(x, y))
            }
            ExprKind::Division => {
                let (x, y) = self.pair(tree, line)?;
                Arc::new(Division::new(x, y))
            }
            ExprKind::IfThenElse => {
                let c = self.compile_node(&tree.children[0], line)?;
                let (x, y) = (
                    self.compile_node(&tree.children[1], line)?,
                    self.compile_node(&tree.children[2], line)?,
                );
                Arc::new(IfThenElse::new(c, x, y))
            }
            ExprKind::Min => {
                let (x, y) = self.pair(tree, line)?;
                Arc::new(Min::new(x, y))
            }
            ExprKind::Max => {
                let (x, y) = self.pair(tree, line)?;
                Arc::new(Max::new(x, y))
            }
            ExprKind::Logical => {
                let op: LogicalOp = tree.leaves[0]
                    .parse()
                    .map_err(|msg: String| ScriptError::compile(line, msg))?;
                let (x, y) = self.pair(tree, line)?;
                Arc::new(Logical::new(x, y, op))
            }
            ExprKind::Pay => {
                let t = self.number(&tree.leaves[0], line)?;
                Arc::new(Pay::new(self.compile_node(&tree.children[0], line)?, t))
            }
            ExprKind::PayWithDate => {
                let t = self.date(&tree.leaves[0], line)?;
                Arc::new(Pay::new(self.compile_node(&tree.children[0], line)?, t))
            }
            ExprKind::Cache => Arc::new(Cache::new(self.compile_node(&tree.children[0], line)?)),
            ExprKind::PayoffAt => {
                let t = self.number(&tree.leaves[0], line)?;
                Arc::new(PayoffAt::new(self.compile_node(&tree.children[0], line)?, t))
            }
            ExprKind::PayoffAtWithDate => {
                let t = self.date(&tree.leaves[0], line)?;
                Arc::new(PayoffAt::new(self.compile_node(&tree.children[0], line)?, t))
            }
            ExprKind::Assignment => {
                return Err(ScriptError::compile(
                    line,
                    "assignment is only allowed at the top level",
                ));
            }
        };
        Ok(payoff)
    }

    fn pair(
        &mut self,
        tree: &Expression,
        line: usize,
    ) -> Result<(PayoffRef, PayoffRef), ScriptError> {
        let x = self.compile_node(&tree.children[0], line)?;
        let y = self.compile_node(&tree.children[1], line)?;
        Ok((x, y))
    }

    fn lookup(&mut self, name: &str, line: usize) -> Result<PayoffRef, ScriptError> {
        match self.symbols.find(name) {
            Some(p) => {
                tracing::debug!(line, name, "identifier resolved");
                self.log.payoff(line, format!("'{name}' is in map"));
                Ok(p.clone())
            }
            None => Err(ScriptError::compile(line, format!("'{name}' is no payoff"))),
        }
    }

    fn number(&self, text: &str, line: usize) -> Result<f64, ScriptError> {
        parse_number(text)
            .ok_or_else(|| ScriptError::compile(line, format!("cannot convert {text} to number.")))
    }

    fn date(&self, text: &str, line: usize) -> Result<f64, ScriptError> {
        date_to_time(text, self.valuation_date)
            .ok_or_else(|| ScriptError::compile(line, format!("cannot convert {text} to date.")))
    }
}

pub(crate) fn check_arity(tree: &Expression, line: usize) -> Result<(), ScriptError> {
    let (children, leaves) = tree.kind.arity();
    if tree.children.len() != children {
        return Err(ScriptError::compile(
            line,
            format!(
                "{} expects {children} child expressions, but {} found.",
                tree.kind,
                tree.children.len()
            ),
        ));
    }
    if tree.leaves.len() != leaves {
        return Err(ScriptError::compile(
            line,
            format!(
                "{} expects {leaves} leafs, but {} found.",
                tree.kind,
                tree.leaves.len()
            ),
        ));
    }
    Ok(())
}
