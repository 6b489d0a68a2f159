//! Syntax tree produced by the line parser.
//!
//! The tree is deliberately untyped: every node is a kind tag plus ordered
//! children plus ordered leaf strings. The compiler validates each kind's
//! arity before acting on it, so trees built by hand are handled safely.

use std::fmt;

/// Node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Number,
    Identifier,
    UnaryPlus,
    UnaryMinus,
    Plus,
    Minus,
    Mult,
    Division,
    IfThenElse,
    Min,
    Max,
    Logical,
    Pay,
    PayWithDate,
    Cache,
    PayoffAt,
    PayoffAtWithDate,
    Assignment,
}

impl ExprKind {
    /// Fixed `(children, leaves)` arity of the kind.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Self::Number | Self::Identifier => (0, 1),
            Self::UnaryPlus | Self::UnaryMinus | Self::Cache => (1, 0),
            Self::Plus
            | Self::Minus
            | Self::Mult
            | Self::Division
            | Self::Min
            | Self::Max => (2, 0),
            Self::IfThenElse => (3, 0),
            Self::Logical => (2, 1),
            Self::Pay
            | Self::PayWithDate
            | Self::PayoffAt
            | Self::PayoffAtWithDate
            | Self::Assignment => (1, 1),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Number => "Number",
            Self::Identifier => "Identifier",
            Self::UnaryPlus => "UnaryPlus",
            Self::UnaryMinus => "UnaryMinus",
            Self::Plus => "Plus",
            Self::Minus => "Minus",
            Self::Mult => "Mult",
            Self::Division => "Division",
            Self::IfThenElse => "IfThenElse",
            Self::Min => "Min",
            Self::Max => "Max",
            Self::Logical => "Logical",
            Self::Pay => "Pay",
            Self::PayWithDate => "PayWithDate",
            Self::Cache => "Cache",
            Self::PayoffAt => "PayoffAt",
            Self::PayoffAtWithDate => "PayoffAtWithDate",
            Self::Assignment => "Assignment",
        }
    }
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One syntax tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExprKind,
    pub children: Vec<Expression>,
    pub leaves: Vec<String>,
}

impl Expression {
    pub fn new(kind: ExprKind, children: Vec<Expression>, leaves: Vec<String>) -> Self {
        Self {
            kind,
            children,
            leaves,
        }
    }

    pub fn leaf(kind: ExprKind, text: impl Into<String>) -> Self {
        Self::new(kind, Vec::new(), vec![text.into()])
    }

    pub fn number(text: impl Into<String>) -> Self {
        Self::leaf(ExprKind::Number, text)
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self::leaf(ExprKind::Identifier, name)
    }

    pub fn unary(kind: ExprKind, operand: Expression) -> Self {
        Self::new(kind, vec![operand], Vec::new())
    }

    pub fn binary(kind: ExprKind, lhs: Expression, rhs: Expression) -> Self {
        Self::new(kind, vec![lhs, rhs], Vec::new())
    }

    pub fn logical(op: impl Into<String>, lhs: Expression, rhs: Expression) -> Self {
        Self::new(ExprKind::Logical, vec![lhs, rhs], vec![op.into()])
    }

    pub fn assignment(name: impl Into<String>, rhs: Expression) -> Self {
        Self::new(ExprKind::Assignment, vec![rhs], vec![name.into()])
    }
}

/// Textual form `Kind[leaf,...](child, ...)`; empty parts are omitted.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.leaves.is_empty() {
            write!(f, "[{}]", self.leaves.join(","))?;
        }
        if !self.children.is_empty() {
            f.write_str("(")?;
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{child}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}
