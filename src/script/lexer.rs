//! Tokenizer for a single script line.

use crate::script::ScriptError;

/// Column range of a token within its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Token types. Literals keep their source text; conversion to numbers and
/// dates happens in the compiler.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(String),
    /// Digits followed by letters, e.g. `15Jan2020`.
    Date(String),
    Ident(String),

    LParen,
    RParen,
    Comma,
    Eq,     // =
    EqEq,   // ==
    Ne,     // !=
    Lt,     // <
    Le,     // <=
    Gt,     // >
    Ge,     // >=
    AndAnd, // &&
    OrOr,   // ||
    Plus,
    Minus,
    Star,
    Slash,
}

impl TokenKind {
    /// Source spelling, used in parser messages and as the logical leaf.
    pub fn text(&self) -> &str {
        match self {
            Self::Number(s) | Self::Date(s) | Self::Ident(s) => s,
            Self::LParen => "(",
            Self::RParen => ")",
            Self::Comma => ",",
            Self::Eq => "=",
            Self::EqEq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
        }
    }
}

/// Tokenize one line. Whitespace separates tokens and is otherwise ignored.
pub fn tokenize(line: &str) -> Result<Vec<Token>, ScriptError> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let ch = bytes[pos];
        if ch.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        let start = pos;

        if ch.is_ascii_digit()
            || (ch == b'.' && pos + 1 < bytes.len() && bytes[pos + 1].is_ascii_digit())
        {
            let (kind, end) = lex_number_or_date(line, pos);
            tokens.push(Token {
                kind,
                span: Span::new(start, end),
            });
            pos = end;
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == b'_' {
            let end = lex_ident_end(bytes, pos);
            tokens.push(Token {
                kind: TokenKind::Ident(line[pos..end].to_string()),
                span: Span::new(start, end),
            });
            pos = end;
            continue;
        }

        if pos + 1 < bytes.len() {
            let kind = match &bytes[pos..pos + 2] {
                b"==" => Some(TokenKind::EqEq),
                b"!=" => Some(TokenKind::Ne),
                b"<=" => Some(TokenKind::Le),
                b">=" => Some(TokenKind::Ge),
                b"&&" => Some(TokenKind::AndAnd),
                b"||" => Some(TokenKind::OrOr),
                _ => None,
            };
            if let Some(kind) = kind {
                tokens.push(Token {
                    kind,
                    span: Span::new(start, start + 2),
                });
                pos += 2;
                continue;
            }
        }

        let kind = match ch {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b',' => TokenKind::Comma,
            b'=' => TokenKind::Eq,
            b'<' => TokenKind::Lt,
            b'>' => TokenKind::Gt,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            _ => {
                let c = line[pos..].chars().next().unwrap_or('?');
                return Err(ScriptError::Parse {
                    message: format!("unexpected character '{c}'"),
                    column: start,
                });
            }
        };
        tokens.push(Token {
            kind,
            span: Span::new(start, start + 1),
        });
        pos += 1;
    }

    Ok(tokens)
}

fn lex_ident_end(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
        pos += 1;
    }
    pos
}

fn lex_digits_end(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    pos
}

/// Lexes `digits[.digits][e[+-]digits]`, or a date-like `digits letters...`
/// run when letters follow the leading integer directly.
fn lex_number_or_date(line: &str, start: usize) -> (TokenKind, usize) {
    let bytes = line.as_bytes();
    let mut pos = lex_digits_end(bytes, start);
    let integer_only = pos > start;

    if integer_only
        && pos < bytes.len()
        && bytes[pos].is_ascii_alphabetic()
        && !is_exponent(bytes, pos)
    {
        let end = lex_ident_end(bytes, pos);
        return (TokenKind::Date(line[start..end].to_string()), end);
    }

    if pos < bytes.len() && bytes[pos] == b'.' {
        pos = lex_digits_end(bytes, pos + 1);
    }
    if is_exponent(bytes, pos) {
        pos += 1;
        if bytes[pos] == b'+' || bytes[pos] == b'-' {
            pos += 1;
        }
        pos = lex_digits_end(bytes, pos);
    }
    (TokenKind::Number(line[start..pos].to_string()), pos)
}

fn is_exponent(bytes: &[u8], pos: usize) -> bool {
    if pos >= bytes.len() || !matches!(bytes[pos], b'e' | b'E') {
        return false;
    }
    match bytes.get(pos + 1) {
        Some(d) if d.is_ascii_digit() => true,
        Some(b'+' | b'-') => bytes.get(pos + 2).is_some_and(u8::is_ascii_digit),
        _ => false,
    }
}
