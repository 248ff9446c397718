//! SQLite rendering of predicate trees.

use crate::query::{Field, FieldValue, Query};
use rusqlite::types::Value;
use std::collections::BTreeSet;

/// Most `?` placeholders one `IN (...)` list carries.
pub(crate) const MAX_IN_BINDS: usize = 500;

/// Renders `query` as a parenthesized `WHERE` clause body with positional
/// `?` placeholders, appending bind values in placeholder order.
///
/// A disjunction of equalities on one field renders as `column IN (...)`
/// lists of at most [`MAX_IN_BINDS`] values, so wide `any_of` filters stay
/// within SQLite's expression depth limit.
pub(crate) fn render_where<F: Field>(query: &Query<F>, binds: &mut Vec<Value>) -> String {
    if let Some((field, values)) = single_field_disjunction(query) {
        return render_in(field.column(), &values, binds);
    }
    match query {
        Query::All => "1 = 1".to_string(),
        Query::Equals(field, value) => {
            binds.push(to_sql_value(value));
            format!("{} = ?", field.column())
        }
        Query::And(left, right) => {
            let left = render_where(left, binds);
            let right = render_where(right, binds);
            format!("({left} AND {right})")
        }
        Query::Or(left, right) => {
            let left = render_where(left, binds);
            let right = render_where(right, binds);
            format!("({left} OR {right})")
        }
    }
}

/// Flattens an `Or` tree whose leaves all compare the same field.
///
/// Returns the field and its distinct values in ascending order, or `None`
/// when the tree contains `All`, `And` or more than one field.
pub(crate) fn single_field_disjunction<F: Field>(
    query: &Query<F>,
) -> Option<(F, Vec<FieldValue>)> {
    let mut field = None;
    let mut values = BTreeSet::new();
    let mut pending = vec![query];
    while let Some(node) = pending.pop() {
        match node {
            Query::Equals(candidate, value) => {
                if *field.get_or_insert(*candidate) != *candidate {
                    return None;
                }
                values.insert(value);
            }
            Query::Or(left, right) => {
                pending.push(&**right);
                pending.push(&**left);
            }
            Query::All | Query::And(..) => return None,
        }
    }
    Some((field?, values.into_iter().cloned().collect()))
}

/// `column = ?` for one value, otherwise `column IN (...)` per chunk.
pub(crate) fn render_in(
    column: &str,
    values: &[FieldValue],
    binds: &mut Vec<Value>,
) -> String {
    if let [value] = values {
        binds.push(to_sql_value(value));
        return format!("{column} = ?");
    }
    let mut lists = values
        .chunks(MAX_IN_BINDS)
        .map(|chunk| {
            binds.extend(chunk.iter().map(to_sql_value));
            format!("{column} IN ({})", placeholders(chunk.len()))
        })
        .collect::<Vec<_>>();
    match lists.len() {
        0 => "1 = 0".to_string(),
        1 => lists.remove(0),
        _ => format!("({})", lists.join(" OR ")),
    }
}

pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

pub(crate) fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) => Value::Text(text.clone()),
        FieldValue::Integer(number) => Value::Integer(*number),
        FieldValue::Bool(flag) => Value::Integer(i64::from(*flag)),
    }
}
