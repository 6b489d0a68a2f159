//! Name -> payoff bindings.

use crate::payoff::PayoffRef;
use crate::script::ScriptError;
use indexmap::IndexMap;

/// Outcome of a successful [`SymbolTable::insert_or_replace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Inserted,
    Replaced,
}

/// Symbol table for named payoffs.
///
/// Lookup is by exact, case-sensitive name. Entries are kept in write order:
/// a replaced name moves to the end, so [`SymbolTable::last`] is always the
/// most recently written binding.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: IndexMap<String, PayoffRef>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<&PayoffRef> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Binds `name` if it is free; returns `false` and leaves the table
    /// untouched otherwise.
    pub fn insert(&mut self, name: &str, payoff: PayoffRef) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        self.entries.insert(name.to_string(), payoff);
        true
    }

    /// Binds `name`, replacing an existing binding only when `overwrite` is set.
    pub fn insert_or_replace(
        &mut self,
        name: &str,
        payoff: PayoffRef,
        overwrite: bool,
    ) -> Result<Binding, ScriptError> {
        if self.insert(name, payoff.clone()) {
            return Ok(Binding::Inserted);
        }
        if !overwrite {
            return Err(ScriptError::Configuration(format!(
                "overwrite of '{name}' not allowed"
            )));
        }
        self.entries.shift_remove(name);
        self.entries.insert(name.to_string(), payoff);
        Ok(Binding::Replaced)
    }

    /// Most recently written binding.
    pub fn last(&self) -> Option<(&str, &PayoffRef)> {
        self.entries.last().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PayoffRef)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolves every name or fails on the first unknown one.
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<PayoffRef>, ScriptError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.find(name)
                    .cloned()
                    .ok_or_else(|| ScriptError::UnknownPayoff(name.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payoff::FixedAmount;
    use std::sync::Arc;

    fn fixed(v: f64) -> PayoffRef {
        Arc::new(FixedAmount::new(v))
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut table = SymbolTable::new();
        assert!(table.insert("X", fixed(1.0)));
        assert!(table.insert("x", fixed(2.0)));
        assert_eq!(table.len(), 2);
        assert!(table.find("X").is_some());
        assert!(table.find("Y").is_none());
    }

    #[test]
    fn insert_keeps_existing_binding() {
        let mut table = SymbolTable::new();
        let first = fixed(1.0);
        assert!(table.insert("a", first.clone()));
        assert!(!table.insert("a", fixed(2.0)));
        assert!(Arc::ptr_eq(table.find("a").unwrap(), &first));
    }

    #[test]
    fn insert_or_replace_respects_overwrite_flag() {
        let mut table = SymbolTable::new();
        assert_eq!(table.insert_or_replace("a", fixed(1.0), false), Ok(Binding::Inserted));
        let err = table.insert_or_replace("a", fixed(2.0), false).unwrap_err();
        assert!(matches!(err, ScriptError::Configuration(_)));

        let second = fixed(2.0);
        assert_eq!(
            table.insert_or_replace("a", second.clone(), true),
            Ok(Binding::Replaced)
        );
        assert!(Arc::ptr_eq(table.find("a").unwrap(), &second));
    }

    #[test]
    fn replace_moves_name_to_the_end() {
        let mut table = SymbolTable::new();
        table.insert("a", fixed(1.0));
        table.insert("b", fixed(2.0));
        assert_eq!(table.last().map(|(n, _)| n), Some("b"));
        table.insert_or_replace("a", fixed(3.0), true).unwrap();
        assert_eq!(table.last().map(|(n, _)| n), Some("a"));
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn resolve_all_fails_on_first_unknown() {
        let mut table = SymbolTable::new();
        table.insert("a", fixed(1.0));
        assert_eq!(table.resolve_all(&["a", "a"]).unwrap().len(), 2);
        assert_eq!(
            table.resolve_all(&["a", "b", "c"]).unwrap_err(),
            ScriptError::UnknownPayoff("b".to_string())
        );
    }
}
