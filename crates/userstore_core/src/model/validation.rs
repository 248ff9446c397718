//! Stage-time validation rules shared by the aggregates.

use once_cell::sync::Lazy;
use regex::Regex;

static ALIAS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("valid alias regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Local invariant violation detected before anything is staged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{entity}.{field} cannot be empty")]
    EmptyField {
        entity: &'static str,
        field: &'static str,
    },
    /// The address itself is not echoed back to keep it out of logs.
    #[error("email address is not in `local@domain` form")]
    InvalidEmail,
    #[error("invalid section alias `{0}`")]
    InvalidSection(String),
    #[error("invalid user type alias `{0}`")]
    InvalidAlias(String),
    #[error("user type reference must be a positive id, got {0}")]
    InvalidUserType(i64),
}

/// Returns whether `value` is a valid section or user-type alias.
pub fn is_valid_alias(value: &str) -> bool {
    ALIAS_RE.is_match(value)
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

pub(crate) fn require_non_empty(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { entity, field });
    }
    Ok(())
}
