//! Script compilation settings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// First script line that selects the legacy regex grammar.
pub const LEGACY_SENTINEL: &str = "NonRecursive";

/// Settings that, together with the script and its initial bindings, fully
/// determine the compiled result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Reference date for converting date tokens to year fractions.
    pub valuation_date: NaiveDate,
    /// Whether a name may be re-bound, both for initial bindings and script lines.
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
}

fn default_overwrite() -> bool {
    true
}

impl ScriptConfig {
    pub fn new(valuation_date: NaiveDate) -> Self {
        Self {
            valuation_date,
            overwrite: true,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Script grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    /// Recursive grammar driven by the line parser.
    Primary,
    /// Deprecated non-recursive regex grammar, kept for debugging.
    Legacy,
}

impl Dialect {
    /// Picks the dialect from the first script line.
    pub fn detect<S: AsRef<str>>(script: &[S]) -> Self {
        match script.first() {
            Some(first) if first.as_ref() == LEGACY_SENTINEL => Self::Legacy,
            _ => Self::Primary,
        }
    }
}
