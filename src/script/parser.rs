//! Recursive-descent parser for one script line.
//!
//! Produces an untyped [`Expression`] tree. Operator precedence, lowest first:
//! `||`, `&&`, comparisons, `+ -`, `* /`, unary `+ -`. Binary operators are
//! left-associative; comparisons do not chain.

use crate::script::ScriptError;
use crate::script::ast::{ExprKind, Expression};
use crate::script::lexer::{Span, Token, TokenKind, tokenize};

/// Outcome of parsing one line.
///
/// A tree may be present even when `error` is set, e.g. a complete statement
/// followed by stray tokens. A blank line yields neither.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub tree: Option<Expression>,
    pub error: Option<ScriptError>,
}

impl ParsedLine {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Parse one line into a syntax tree.
pub fn parse_line(line: &str) -> ParsedLine {
    let tokens = match tokenize(line) {
        Ok(tokens) => tokens,
        Err(e) => {
            return ParsedLine {
                tree: None,
                error: Some(e),
            };
        }
    };
    if tokens.is_empty() {
        return ParsedLine {
            tree: None,
            error: None,
        };
    }

    let mut p = Parser::new(tokens, line.len());
    match parse_statement(&mut p) {
        Ok(tree) => {
            let error = p.peek().map(|tok| ScriptError::Parse {
                message: format!("unexpected '{}' after end of statement", tok.kind.text()),
                column: tok.span.start,
            });
            ParsedLine {
                tree: Some(tree),
                error,
            }
        }
        Err(e) => ParsedLine {
            tree: None,
            error: Some(e),
        },
    }
}

/// Deepest nesting of parentheses, calls and unary operators in one line.
pub const MAX_NESTING: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    line_len: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>, line_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            line_len,
            depth: 0,
        }
    }

    /// Enters one nesting level; fails once [`MAX_NESTING`] is exceeded.
    fn descend(&mut self) -> Result<(), ScriptError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_at(
                self.current_span(),
                "expression nested too deeply".to_string(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &TokenKind) -> Result<Span, ScriptError> {
        match self.peek() {
            Some(tok) if &tok.kind == expected => {
                let span = tok.span;
                self.pos += 1;
                Ok(span)
            }
            Some(tok) => Err(self.error_at(
                tok.span,
                format!("expected '{}', got '{}'", expected.text(), tok.kind.text()),
            )),
            None => Err(self.error_at(
                self.eof_span(),
                format!("expected '{}', got end of line", expected.text()),
            )),
        }
    }

    fn current_span(&self) -> Span {
        self.peek().map(|t| t.span).unwrap_or_else(|| self.eof_span())
    }

    fn eof_span(&self) -> Span {
        Span::new(self.line_len, self.line_len)
    }

    fn error_at(&self, span: Span, message: String) -> ScriptError {
        ScriptError::Parse {
            message,
            column: span.start,
        }
    }
}

fn parse_statement(p: &mut Parser) -> Result<Expression, ScriptError> {
    if let (Some(TokenKind::Ident(name)), Some(TokenKind::Eq)) = (p.peek_kind(), p.peek_kind_at(1))
    {
        let name = name.clone();
        p.advance();
        p.advance();
        let rhs = parse_expr(p)?;
        return Ok(Expression::assignment(name, rhs));
    }
    parse_expr(p)
}

fn parse_expr(p: &mut Parser) -> Result<Expression, ScriptError> {
    p.descend()?;
    let expr = parse_or(p);
    p.ascend();
    expr
}

// Each chained operator deepens the left-nested tree by one level, so it is
// counted against the nesting limit until the chain ends.
fn parse_or(p: &mut Parser) -> Result<Expression, ScriptError> {
    let mut left = parse_and(p)?;
    let mut chained = 0;
    while matches!(p.peek_kind(), Some(TokenKind::OrOr)) {
        p.advance();
        p.descend()?;
        chained += 1;
        let right = parse_and(p)?;
        left = Expression::logical("||", left, right);
    }
    p.depth -= chained;
    Ok(left)
}

fn parse_and(p: &mut Parser) -> Result<Expression, ScriptError> {
    let mut left = parse_comparison(p)?;
    let mut chained = 0;
    while matches!(p.peek_kind(), Some(TokenKind::AndAnd)) {
        p.advance();
        p.descend()?;
        chained += 1;
        let right = parse_comparison(p)?;
        left = Expression::logical("&&", left, right);
    }
    p.depth -= chained;
    Ok(left)
}

fn parse_comparison(p: &mut Parser) -> Result<Expression, ScriptError> {
    let left = parse_additive(p)?;
    let op = match p.peek_kind() {
        Some(
            kind @ (TokenKind::EqEq
            | TokenKind::Ne
            | TokenKind::Lt
            | TokenKind::Le
            | TokenKind::Gt
            | TokenKind::Ge),
        ) => kind.text().to_string(),
        _ => return Ok(left),
    };
    p.advance();
    p.descend()?;
    let right = parse_additive(p);
    p.ascend();
    Ok(Expression::logical(op, left, right?))
}

fn parse_additive(p: &mut Parser) -> Result<Expression, ScriptError> {
    let mut left = parse_multiplicative(p)?;
    let mut chained = 0;
    loop {
        let kind = match p.peek_kind() {
            Some(TokenKind::Plus) => ExprKind::Plus,
            Some(TokenKind::Minus) => ExprKind::Minus,
            _ => break,
        };
        p.advance();
        p.descend()?;
        chained += 1;
        let right = parse_multiplicative(p)?;
        left = Expression::binary(kind, left, right);
    }
    p.depth -= chained;
    Ok(left)
}

fn parse_multiplicative(p: &mut Parser) -> Result<Expression, ScriptError> {
    let mut left = parse_unary(p)?;
    let mut chained = 0;
    loop {
        let kind = match p.peek_kind() {
            Some(TokenKind::Star) => ExprKind::Mult,
            Some(TokenKind::Slash) => ExprKind::Division,
            _ => break,
        };
        p.advance();
        p.descend()?;
        chained += 1;
        let right = parse_unary(p)?;
        left = Expression::binary(kind, left, right);
    }
    p.depth -= chained;
    Ok(left)
}

fn parse_unary(p: &mut Parser) -> Result<Expression, ScriptError> {
    let kind = match p.peek_kind() {
        Some(TokenKind::Plus) => ExprKind::UnaryPlus,
        Some(TokenKind::Minus) => ExprKind::UnaryMinus,
        _ => return parse_primary(p),
    };
    p.advance();
    p.descend()?;
    let operand = parse_unary(p);
    p.ascend();
    Ok(Expression::unary(kind, operand?))
}

fn parse_primary(p: &mut Parser) -> Result<Expression, ScriptError> {
    let span = p.current_span();
    match p.peek_kind().cloned() {
        Some(TokenKind::Number(text)) => {
            p.advance();
            Ok(Expression::number(text))
        }
        Some(TokenKind::LParen) => {
            p.advance();
            let expr = parse_expr(p)?;
            p.expect(&TokenKind::RParen)?;
            Ok(expr)
        }
        Some(TokenKind::Ident(name)) => {
            p.advance();
            if matches!(p.peek_kind(), Some(TokenKind::LParen)) {
                p.advance();
                parse_call(p, &name, span)
            } else {
                Ok(Expression::identifier(name))
            }
        }
        Some(TokenKind::Date(text)) => Err(p.error_at(
            span,
            format!("date '{text}' is only allowed as a payment or observation time"),
        )),
        Some(other) => Err(p.error_at(
            span,
            format!("expected expression, got '{}'", other.text()),
        )),
        None => Err(p.error_at(span, "expected expression, got end of line".to_string())),
    }
}

/// Parses the arguments of `name(` up to and including the closing `)`.
fn parse_call(p: &mut Parser, name: &str, span: Span) -> Result<Expression, ScriptError> {
    match name {
        "IfThenElse" => {
            let args = parse_args(p, name, 3, span)?;
            Ok(Expression::new(ExprKind::IfThenElse, args, Vec::new()))
        }
        "Min" | "Max" => {
            let args = parse_args(p, name, 2, span)?;
            let kind = if name == "Min" { ExprKind::Min } else { ExprKind::Max };
            Ok(Expression::new(kind, args, Vec::new()))
        }
        "Cache" => {
            let args = parse_args(p, name, 1, span)?;
            Ok(Expression::new(ExprKind::Cache, args, Vec::new()))
        }
        "Pay" | "PayoffAt" => {
            let payoff = parse_expr(p)?;
            p.expect(&TokenKind::Comma)?;
            let time_span = p.current_span();
            let (numeric, dated) = if name == "Pay" {
                (ExprKind::Pay, ExprKind::PayWithDate)
            } else {
                (ExprKind::PayoffAt, ExprKind::PayoffAtWithDate)
            };
            // A signed numeric time folds its sign into the leaf.
            let sign = match p.peek_kind() {
                Some(TokenKind::Minus) => Some("-"),
                Some(TokenKind::Plus) => Some(""),
                _ => None,
            };
            if sign.is_some() {
                p.advance();
            }
            let (kind, leaf) = match (sign, p.peek_kind().cloned()) {
                (_, Some(TokenKind::Number(text))) => {
                    (numeric, format!("{}{text}", sign.unwrap_or("")))
                }
                (None, Some(TokenKind::Date(text))) => (dated, text),
                _ => {
                    return Err(p.error_at(
                        time_span,
                        format!("{name} expects a number or date as its time argument"),
                    ));
                }
            };
            p.advance();
            p.expect(&TokenKind::RParen)?;
            Ok(Expression::new(kind, vec![payoff], vec![leaf]))
        }
        _ => Err(p.error_at(span, format!("unknown function '{name}'"))),
    }
}

fn parse_args(
    p: &mut Parser,
    name: &str,
    count: usize,
    span: Span,
) -> Result<Vec<Expression>, ScriptError> {
    let mut args = Vec::with_capacity(count);
    if !matches!(p.peek_kind(), Some(TokenKind::RParen)) {
        args.push(parse_expr(p)?);
        while matches!(p.peek_kind(), Some(TokenKind::Comma)) {
            p.advance();
            args.push(parse_expr(p)?);
        }
    }
    p.expect(&TokenKind::RParen)?;
    if args.len() != count {
        return Err(p.error_at(
            span,
            format!("{name} expects {count} arguments, got {}", args.len()),
        ));
    }
    Ok(args)
}
