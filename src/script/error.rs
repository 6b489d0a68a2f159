//! Error types for script compilation and valuation.

use thiserror::Error;

/// Errors produced while building or querying a compiled script.
///
/// `Parse` and `Compile` are per-line and recoverable: the orchestrator logs
/// them and moves on. `Configuration` aborts construction of the script.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// The script as a whole cannot produce a usable result.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The line parser rejected the text.
    #[error("parse error at column {column}: {message}")]
    Parse { message: String, column: usize },
    /// The expression compiler rejected a syntax tree.
    #[error("compile error on line {line}: {message}")]
    Compile { line: usize, message: String },
    /// A requested payoff name is not bound.
    #[error("payoff '{0}' not found")]
    UnknownPayoff(String),
    /// Invalid simulation or path input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ScriptError {
    pub(crate) fn compile(line: usize, message: impl Into<String>) -> Self {
        Self::Compile {
            line,
            message: message.into(),
        }
    }

    /// Human-readable reason without the variant prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::Configuration(msg) | Self::UnknownPayoff(msg) | Self::InvalidInput(msg) => msg,
            Self::Parse { message, .. } | Self::Compile { message, .. } => message,
        }
    }
}
