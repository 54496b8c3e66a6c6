//! Novelty detection: which matched records have not been alerted before.
//!
//! Seen keys are scoped per tracked entity. A row that matches two targets is
//! judged separately against each target's own seen set.

use std::collections::BTreeSet;

use warnwatch_common::Record;

use crate::identity::derive_key;

/// Prefix of the per-entity seen-key field in persisted state.
pub const SEEN_KEY_PREFIX: &str = "seen_";

/// Result of one `detect_new` pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Detection {
    /// Records whose key was not already seen, in input order.
    pub new_records: Vec<Record>,
    /// Input seen set plus every key discovered in this pass.
    pub seen: BTreeSet<String>,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.new_records.is_empty()
    }
}

/// Classify `records` against `seen`. A key repeated within the batch is
/// reported only on its first occurrence.
pub fn detect_new(records: &[Record], seen: &BTreeSet<String>) -> Detection {
    let mut updated = seen.clone();
    let mut new_records = Vec::new();

    for record in records {
        if updated.insert(derive_key(record)) {
            new_records.push(record.clone());
        }
    }

    Detection {
        new_records,
        seen: updated,
    }
}

/// Persisted field name for an entity's seen set: `seen_` plus the lowercased
/// name with every run of non-alphanumeric characters collapsed to `_`.
pub fn entity_state_key(entity: &str) -> String {
    let mut sanitized = String::with_capacity(entity.len());
    for c in entity.trim().chars() {
        if c.is_ascii_alphanumeric() {
            sanitized.push(c.to_ascii_lowercase());
        } else if !sanitized.ends_with('_') {
            sanitized.push('_');
        }
    }
    let sanitized = sanitized.trim_matches('_');
    format!("{SEEN_KEY_PREFIX}{sanitized}")
}
