//! Deprecated non-recursive grammar, selected by a `NonRecursive` first line.
//!
//! Kept for backward compatibility and debugging only. Each operand must be a
//! number literal or an already bound name; operators and functions cannot be
//! nested. Do not extend this grammar; new syntax belongs in the parser.
//!
//! ```text
//! line      = name '=' expr                      name = [a-zA-Z][a-zA-Z0-9]*
//! expr      = ('+'|'-') operand
//!           | operand binop operand              binop = + - * == != <= < >= > && ||
//!           | fname '(' operand ',' operand ',' operand ')'    IfThenElse
//!           | fname '(' operand ',' operand ')'                Min | Max | Pay
//!           | fname '(' operand ')'                            Cache
//!           | operand
//! ```
//!
//! Whitespace is removed before matching and alternatives are tried top to
//! bottom; the first match wins.

use crate::payoff::{
    Axpy, Cache, FixedAmount, IfThenElse, Logical, LogicalOp, Max, Min, Mult, Pay, PayoffRef,
};
use crate::script::ScriptError;
use crate::script::dates::parse_number;
use crate::script::dialect::{CompiledLine, LineCompiler, ScriptState};
use regex::Regex;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub(crate) struct LegacyDialect {
    assignment: Regex,
    unary: Regex,
    binary: Regex,
    function3: Regex,
    function2: Regex,
    function1: Regex,
}

impl LegacyDialect {
    pub fn new() -> Result<Self, ScriptError> {
        let re = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ScriptError::Configuration(e.to_string()))
        };
        Ok(Self {
            assignment: re(r"^([a-zA-Z][a-zA-Z0-9]*)=(.+)$")?,
            unary: re(r"^(\+|-)(.+)$")?,
            binary: re(r"^(.+)(\+|-|\*|==|!=|<=|<|>=|>|&&|\|\|)(.+)$")?,
            function3: re(r"^([a-zA-Z]+)\((.+),(.+),(.+)\)$")?,
            function2: re(r"^([a-zA-Z]+)\((.+),(.+)\)$")?,
            function1: re(r"^([a-zA-Z]+)\((.+)\)$")?,
        })
    }

    fn expression(
        &self,
        state: &mut ScriptState,
        line: usize,
        expr: &str,
    ) -> Result<PayoffRef, ScriptError> {
        if let Some(c) = self.unary.captures(expr) {
            return unary_operator(state, line, &c[1], &c[2]);
        }
        if let Some(c) = self.binary.captures(expr) {
            return binary_operator(state, line, &c[2], &c[1], &c[3]);
        }
        if let Some(c) = self.function3.captures(expr) {
            return function3(state, line, &c[1], [&c[2], &c[3], &c[4]]);
        }
        if let Some(c) = self.function2.captures(expr) {
            return function2(state, line, &c[1], &c[2], &c[3]);
        }
        if let Some(c) = self.function1.captures(expr) {
            return function1(state, line, &c[1], &c[2]);
        }
        operand(state, line, expr)
    }
}

impl LineCompiler for LegacyDialect {
    fn compile_line(
        &self,
        state: &mut ScriptState,
        line: usize,
        text: &str,
    ) -> Option<CompiledLine> {
        let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let Some(c) = self.assignment.captures(&stripped) else {
            state
                .log
                .error(line, format!("'{stripped}' is no valid assignment"));
            return None;
        };
        let (name, expr) = (c[1].to_string(), c[2].to_string());

        match self.expression(state, line, &expr) {
            Ok(payoff) => Some(CompiledLine {
                name,
                payoff,
                text: stripped,
            }),
            Err(e) => {
                state.log.error(
                    line,
                    format!("'{expr}' is no valid expression: {}", e.reason()),
                );
                None
            }
        }
    }
}

/// Number literal or bound name.
fn operand(state: &mut ScriptState, line: usize, text: &str) -> Result<PayoffRef, ScriptError> {
    if let Some(amount) = parse_number(text) {
        state.log.payoff(line, format!("'{amount}' is fixed amount"));
        return Ok(Arc::new(FixedAmount::new(amount)));
    }
    match state.symbols.find(text) {
        Some(p) => {
            let p = p.clone();
            state.log.payoff(line, format!("'{text}' is in map"));
            Ok(p)
        }
        None => Err(ScriptError::compile(line, format!("'{text}' is no payoff"))),
    }
}

fn unary_operator(
    state: &mut ScriptState,
    line: usize,
    op: &str,
    x: &str,
) -> Result<PayoffRef, ScriptError> {
    let p = operand(state, line, x)?;
    match op {
        "+" => Ok(p),
        "-" => Ok(Arc::new(Axpy::new(-1.0, p, None))),
        _ => Err(ScriptError::compile(
            line,
            format!("'{op}' is no valid unary operator name"),
        )),
    }
}

fn binary_operator(
    state: &mut ScriptState,
    line: usize,
    op: &str,
    x: &str,
    y: &str,
) -> Result<PayoffRef, ScriptError> {
    let p1 = operand(state, line, x)?;
    let p2 = operand(state, line, y)?;
    match op {
        "+" => Ok(Arc::new(Axpy::new(1.0, p1, Some(p2)))),
        "-" => Ok(Arc::new(Axpy::new(-1.0, p2, Some(p1)))),
        "*" => Ok(Arc::new(Mult::new(p1, p2))),
        _ => {
            let op: LogicalOp = op.parse().map_err(|msg: String| ScriptError::compile(line, msg))?;
            Ok(Arc::new(Logical::new(p1, p2, op)))
        }
    }
}

fn function3(
    state: &mut ScriptState,
    line: usize,
    name: &str,
    args: [&str; 3],
) -> Result<PayoffRef, ScriptError> {
    let p1 = operand(state, line, args[0])?;
    let p2 = operand(state, line, args[1])?;
    let p3 = operand(state, line, args[2])?;
    match name {
        "IfThenElse" => Ok(Arc::new(IfThenElse::new(p1, p2, p3))),
        _ => Err(ScriptError::compile(
            line,
            format!("'{name}' is no valid function name"),
        )),
    }
}

fn function2(
    state: &mut ScriptState,
    line: usize,
    name: &str,
    x: &str,
    y: &str,
) -> Result<PayoffRef, ScriptError> {
    let p1 = operand(state, line, x)?;
    let p2 = operand(state, line, y)?;
    match name {
        "Min" => Ok(Arc::new(Min::new(p1, p2))),
        "Max" => Ok(Arc::new(Max::new(p1, p2))),
        // A numeric second argument is the payment time; otherwise the
        // second payoff's observation time is used.
        "Pay" => {
            let t = parse_number(y).unwrap_or_else(|| p2.observation_time());
            Ok(Arc::new(Pay::new(p1, t)))
        }
        _ => Err(ScriptError::compile(
            line,
            format!("'{name}' is no valid binary function name"),
        )),
    }
}

fn function1(
    state: &mut ScriptState,
    line: usize,
    name: &str,
    x: &str,
) -> Result<PayoffRef, ScriptError> {
    let p = operand(state, line, x)?;
    match name {
        "Cache" => Ok(Arc::new(Cache::new(p))),
        _ => Err(ScriptError::compile(
            line,
            format!("'{name}' is no valid unary function name"),
        )),
    }
}
