//! Shadow-snapshot dirty tracker for scalar attributes.

use crate::query::{Field, FieldValue};
use std::collections::BTreeMap;

/// Baseline of scalar values captured when an entity was loaded or committed.
///
/// A tracker without baseline belongs to a transient entity: every
/// attribute counts as changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeTracker<F: Field> {
    baseline: Option<BTreeMap<F, FieldValue>>,
}

impl<F: Field> ChangeTracker<F> {
    /// Tracker for an entity that has never been persisted.
    pub fn transient() -> Self {
        Self { baseline: None }
    }

    /// Tracker whose baseline equals `values`, so the entity starts clean.
    pub fn baselined(values: Vec<(F, FieldValue)>) -> Self {
        Self {
            baseline: Some(values.into_iter().collect()),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.baseline.is_none()
    }

    /// Returns the attributes in `current` that differ from the baseline.
    pub fn changes(&self, current: Vec<(F, FieldValue)>) -> Vec<(F, FieldValue)> {
        match &self.baseline {
            None => current,
            Some(baseline) => current
                .into_iter()
                .filter(|(field, value)| baseline.get(field) != Some(value))
                .collect(),
        }
    }

    pub fn changed_fields(&self, current: Vec<(F, FieldValue)>) -> Vec<F> {
        self.changes(current)
            .into_iter()
            .map(|(field, _)| field)
            .collect()
    }

    pub fn is_dirty(&self, current: Vec<(F, FieldValue)>) -> bool {
        self.is_transient() || !self.changes(current).is_empty()
    }

    /// Re-baselines on `current`; called once the values are persisted.
    pub fn rebaseline(&mut self, current: Vec<(F, FieldValue)>) {
        self.baseline = Some(current.into_iter().collect());
    }
}
