//! Presence tracking for the constraint solver (spec §4.9).
//!
//! "Present" is a narrower notion than "has a stored value": an owner is
//! present iff the *user* supplied at least one occurrence on argv (or via
//! `--opt=value` / attached short). Values sourced from environment,
//! default, or missing are **not** present for constraint purposes, even
//! though they do produce a stored [`crate::value::StoredValue`]. Tracking
//! this separately from the values map is exactly the pattern the teacher
//! uses for `ConfigSources` (`crates/procenv/src/lib.rs`) to keep
//! provenance bookkeeping out of the value accumulation path.

use std::collections::HashMap;

/// Records, per owner, how many times the user supplied an occurrence on
/// argv and at which argv indices, during a single parse.
#[derive(Clone, Debug, Default)]
pub struct PresenceTracker {
    occurrences: HashMap<String, Vec<usize>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self { occurrences: HashMap::new() }
    }

    /// Records one user-provided occurrence of `owner` at argv index `idx`.
    pub fn record(&mut self, owner: &str, idx: usize) {
        self.occurrences.entry(owner.to_string()).or_default().push(idx);
    }

    /// True iff the user supplied at least one occurrence of `owner`.
    pub fn is_present(&self, owner: &str) -> bool {
        self.occurrences.get(owner).is_some_and(|v| !v.is_empty())
    }

    /// Number of user-provided occurrences of `owner` (drives the
    /// "duplicate" check in spec §4.9 item 2).
    pub fn occurrence_count(&self, owner: &str) -> usize {
        self.occurrences.get(owner).map_or(0, Vec::len)
    }

    /// The argv indices `owner` was observed at, in occurrence order. Lets a
    /// caller replay `onValue`-style callbacks after parsing completes
    /// without the tokenizer itself threading callback invocation through
    /// its main loop.
    pub fn indices(&self, owner: &str) -> &[usize] {
        self.occurrences.get(owner).map_or(&[], Vec::as_slice)
    }

    /// Clears all recorded presence, e.g. when re-parsing the same
    /// instance (spec §5 "Shared-resource policy").
    pub fn clear(&mut self) {
        self.occurrences.clear();
    }
}
