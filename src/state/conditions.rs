use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Diagnostic kind that blocks automated decisions
pub const ERROR_KIND: &str = "ERROR";

/// Kind used for non-fatal conditions raised by this crate
pub const WARNING_KIND: &str = "WARN";

/// A single diagnostic raised about the monitored target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// "ERROR" is fatal, any other value is treated as a warning
    pub kind: String,
    pub desc: String,
    /// Subsystem that raised the diagnostic
    pub from: String,
}

impl Diagnostic {
    pub fn new(kind: impl Into<String>, desc: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            desc: desc.into(),
            from: from.into(),
        }
    }

    pub fn error(desc: impl Into<String>, from: impl Into<String>) -> Self {
        Self::new(ERROR_KIND, desc, from)
    }

    pub fn warning(desc: impl Into<String>, from: impl Into<String>) -> Self {
        Self::new(WARNING_KIND, desc, from)
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.kind == ERROR_KIND
    }
}

/// Set of diagnostics keyed by an opaque code.
///
/// The first record stored for a key wins: later inserts with the same key
/// are dropped, not merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionSet {
    entries: HashMap<String, Diagnostic>,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `diagnostic` under `key` unless the key is already present.
    /// Returns true if the record was stored.
    pub fn insert(&mut self, key: impl Into<String>, diagnostic: Diagnostic) -> bool {
        match self.entries.entry(key.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(diagnostic);
                true
            }
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if any stored diagnostic has the ERROR kind
    pub fn has_errors(&self) -> bool {
        self.entries.values().any(Diagnostic::is_error)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Diagnostic)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
