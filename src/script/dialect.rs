//! Line compilers: one statement line in, one named payoff out.
//!
//! Both grammars implement [`LineCompiler`]. A line compiler reports every
//! failure into the script log and returns `None`; it never aborts the script.

use crate::payoff::PayoffRef;
use crate::script::ast::{ExprKind, Expression};
use crate::script::compiler::{ExpressionCompiler, check_arity};
use crate::script::log::ScriptLog;
use crate::script::parser::parse_line;
use crate::script::symbols::SymbolTable;
use chrono::NaiveDate;

/// Mutable state threaded through the lines of one script.
#[derive(Debug)]
pub(crate) struct ScriptState {
    pub symbols: SymbolTable,
    pub log: ScriptLog,
    pub expressions: Vec<String>,
    pub valuation_date: NaiveDate,
}

impl ScriptState {
    pub fn new(valuation_date: NaiveDate) -> Self {
        Self {
            symbols: SymbolTable::new(),
            log: ScriptLog::new(),
            expressions: Vec::new(),
            valuation_date,
        }
    }
}

/// A successfully compiled statement awaiting binding.
#[derive(Debug, Clone)]
pub(crate) struct CompiledLine {
    pub name: String,
    pub payoff: PayoffRef,
    /// Statement text as echoed in the log.
    pub text: String,
}

pub(crate) trait LineCompiler {
    fn compile_line(
        &self,
        state: &mut ScriptState,
        line: usize,
        text: &str,
    ) -> Option<CompiledLine>;
}

/// Recursive grammar: line parser followed by the expression compiler.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PrimaryDialect;

impl PrimaryDialect {
    /// Validates an assignment tree and compiles its right-hand side.
    pub fn compile_tree(
        &self,
        state: &mut ScriptState,
        line: usize,
        tree: Option<&Expression>,
        text: &str,
    ) -> Option<CompiledLine> {
        let Some(tree) = tree else {
            state.log.error(line, "Empty expression tree.");
            return None;
        };
        if tree.kind != ExprKind::Assignment {
            state.log.error(line, "Assignment expected.");
            return None;
        }
        if let Err(e) = check_arity(tree, line) {
            state.log.error(line, e.reason());
            return None;
        }

        let compiled = ExpressionCompiler::new(&state.symbols, state.valuation_date, &mut state.log)
            .compile(tree.children.first(), line);
        let payoff = match compiled {
            Ok(p) => p,
            Err(e) => {
                state.log.error(line, e.reason());
                return None;
            }
        };

        let name = &tree.leaves[0];
        if name.is_empty() {
            state.log.error(line, "Non-empty identifier expected.");
            return None;
        }
        Some(CompiledLine {
            name: name.clone(),
            payoff,
            text: text.to_string(),
        })
    }
}

impl LineCompiler for PrimaryDialect {
    fn compile_line(
        &self,
        state: &mut ScriptState,
        line: usize,
        text: &str,
    ) -> Option<CompiledLine> {
        let parsed = parse_line(text);
        if let Some(tree) = &parsed.tree {
            state.expressions.push(format!("L{line}:{tree}"));
        }
        if let Some(e) = parsed.error {
            state.log.error(line, e.to_string());
            return None;
        }
        self.compile_tree(state, line, parsed.tree.as_ref(), text)
    }
}
