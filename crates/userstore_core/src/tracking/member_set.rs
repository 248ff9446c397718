//! Set-valued child attribute with a persisted baseline.
//!
//! # Invariants
//! - Members are trimmed, non-empty and unique; order is irrelevant.
//! - `pending()` depends only on net membership, never on the history of
//!   `insert`/`remove` calls.

use serde::{Serialize, Serializer};
use std::collections::BTreeSet;

/// Minimal row operations that bring a persisted set to a desired set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetDiff {
    pub to_insert: Vec<String>,
    pub to_delete: Vec<String>,
}

impl SetDiff {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_delete.is_empty()
    }
}

/// Computes `desired - persisted` (inserts) and `persisted - desired` (deletes).
pub fn diff_sets(persisted: &BTreeSet<String>, desired: &BTreeSet<String>) -> SetDiff {
    SetDiff {
        to_insert: desired.difference(persisted).cloned().collect(),
        to_delete: persisted.difference(desired).cloned().collect(),
    }
}

/// Normalizes one member token; blank input yields `None`.
pub fn normalize_member(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// In-memory set plus the snapshot last written to the child table.
#[derive(Debug, Clone, Default)]
pub struct MemberSet {
    current: BTreeSet<String>,
    persisted: BTreeSet<String>,
}

impl MemberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set hydrated from storage: current and persisted are equal.
    pub fn from_persisted(members: impl IntoIterator<Item = String>) -> Self {
        let current: BTreeSet<String> = members
            .into_iter()
            .filter_map(|member| normalize_member(&member))
            .collect();
        Self {
            persisted: current.clone(),
            current,
        }
    }

    /// Adds `member`; returns `false` when already present or blank.
    pub fn insert(&mut self, member: &str) -> bool {
        match normalize_member(member) {
            Some(value) => self.current.insert(value),
            None => false,
        }
    }

    /// Removes `member`; returns `false` when absent.
    pub fn remove(&mut self, member: &str) -> bool {
        self.current.remove(member.trim())
    }

    pub fn contains(&self, member: &str) -> bool {
        self.current.contains(member.trim())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.current.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Row operations needed to persist the current membership.
    pub fn pending(&self) -> SetDiff {
        diff_sets(&self.persisted, &self.current)
    }

    pub fn has_pending(&self) -> bool {
        self.current != self.persisted
    }

    /// Re-baselines the persisted snapshot after a successful commit.
    pub fn mark_persisted(&mut self) {
        self.persisted = self.current.clone();
    }
}

impl PartialEq for MemberSet {
    fn eq(&self, other: &Self) -> bool {
        self.current == other.current
    }
}

impl Eq for MemberSet {}

impl Serialize for MemberSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.current.iter())
    }
}
