//! Append-only diagnostics log for script compilation.

use std::fmt;

/// Category of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// A new name was bound.
    Insert,
    /// An existing name was re-bound.
    Replace,
    /// An operand resolved to a payoff (symbol hit or literal).
    Payoff,
    /// A line or binding was rejected.
    Error,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "Insert",
            Self::Replace => "Replace",
            Self::Payoff => "Payoff",
            Self::Error => "Error",
        })
    }
}

/// One diagnostic message.
///
/// `line` is the 0-based script line; `None` marks an initial binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub kind: LogKind,
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} line {line}: {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptLog {
    entries: Vec<LogEntry>,
}

impl ScriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: LogKind, line: Option<usize>, message: impl Into<String>) {
        self.entries.push(LogEntry {
            kind,
            line,
            message: message.into(),
        });
    }

    pub fn insert(&mut self, line: usize, message: impl Into<String>) {
        self.push(LogKind::Insert, Some(line), message);
    }

    pub fn replace(&mut self, line: usize, message: impl Into<String>) {
        self.push(LogKind::Replace, Some(line), message);
    }

    pub fn payoff(&mut self, line: usize, message: impl Into<String>) {
        self.push(LogKind::Payoff, Some(line), message);
    }

    pub fn error(&mut self, line: usize, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(line, %message, "script line rejected");
        self.push(LogKind::Error, Some(line), message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Entries recorded for script line `line`.
    pub fn for_line(&self, line: usize) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.line == Some(line))
    }

    pub fn errors(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.kind == LogKind::Error)
    }

    /// Rendered messages, one per entry.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }
}

impl<'a> IntoIterator for &'a ScriptLog {
    type Item = &'a LogEntry;
    type IntoIter = std::slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
