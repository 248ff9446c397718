//! Store-independent predicate expressions over entity scalar attributes.
//!
//! # Responsibility
//! - Describe filters as an explicit expression tree (`Equals`, `And`, `Or`).
//! - Stay free of SQL; each backend renders the tree on its own.
//!
//! # Invariants
//! - Only equality leaves exist; no ranges, patterns or negation.

use std::fmt::Debug;

/// Scalar value carried by entity attributes and predicate leaves.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Named scalar attribute of a persisted entity.
pub trait Field: Copy + Eq + Ord + Debug + 'static {
    /// Storage column backing this attribute.
    fn column(self) -> &'static str;
    /// Attribute name used in diagnostics.
    fn name(self) -> &'static str;
}

/// Composable boolean filter over the fields `F` of one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query<F> {
    /// Matches every row.
    All,
    Equals(F, FieldValue),
    And(Box<Query<F>>, Box<Query<F>>),
    Or(Box<Query<F>>, Box<Query<F>>),
}

impl<F: Field> Query<F> {
    pub fn all() -> Self {
        Self::All
    }

    /// Leaf predicate: `field == value`.
    pub fn eq(field: F, value: impl Into<FieldValue>) -> Self {
        Self::Equals(field, value.into())
    }

    pub fn and(self, other: Query<F>) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Query<F>) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Matches `field` against any of `values`; `None` for an empty list.
    ///
    /// The `Or` tree is balanced, so its depth grows with `log2(values)`.
    pub fn any_of<V: Into<FieldValue>>(
        field: F,
        values: impl IntoIterator<Item = V>,
    ) -> Option<Self> {
        Self::balanced_or(
            values
                .into_iter()
                .map(|value| Self::eq(field, value))
                .collect(),
        )
    }

    fn balanced_or(mut terms: Vec<Self>) -> Option<Self> {
        match terms.len() {
            0 => None,
            1 => terms.pop(),
            len => {
                let right = terms.split_off(len / 2);
                Some(Self::balanced_or(terms)?.or(Self::balanced_or(right)?))
            }
        }
    }

    /// Nesting depth of the expression; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Self::All | Self::Equals(..) => 1,
            Self::And(left, right) | Self::Or(left, right) => 1 + left.depth().max(right.depth()),
        }
    }

    /// Evaluates the predicate against in-memory attribute values.
    ///
    /// Fields missing from `values` never match.
    pub fn matches(&self, values: &[(F, FieldValue)]) -> bool {
        match self {
            Self::All => true,
            Self::Equals(field, expected) => values
                .iter()
                .any(|(candidate, value)| candidate == field && value == expected),
            Self::And(left, right) => left.matches(values) && right.matches(values),
            Self::Or(left, right) => left.matches(values) || right.matches(values),
        }
    }
}
