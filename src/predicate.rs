//! Field visibility predicates.
//!
//! DESIGN
//! ======
//! Filter forms show some fields only when others hold certain values. The
//! condition is data, not code: a small tagged expression tree that
//! serializes as `{"op": "eq", "field": "kind", "value": "user"}` and is
//! evaluated against the current form values. Field paths are dotted
//! (`"owner.role"`) and resolved the same way response fields are.
//!
//! Because the tree is plain data, the fields a rule reads are known
//! statically, so a host can re-evaluate only the rules whose dependencies
//! changed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fetch::normalize::{is_falsy, lookup};
use crate::query::ListQuery;

/// A boolean condition over form values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Predicate {
    Always,
    Eq { field: String, value: Value },
    Ne { field: String, value: Value },
    In { field: String, values: Vec<Value> },
    /// The field is present and truthy.
    Truthy { field: String },
    /// The field is missing, null, an empty string, or an empty array.
    Empty { field: String },
    Gt { field: String, value: f64 },
    Lt { field: String, value: f64 },
    Not { inner: Box<Predicate> },
    All { predicates: Vec<Predicate> },
    Any { predicates: Vec<Predicate> },
}

impl Predicate {
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq { field: field.into(), value: value.into() }
    }

    #[must_use]
    pub fn truthy(field: impl Into<String>) -> Self {
        Self::Truthy { field: field.into() }
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not { inner: Box::new(self) }
    }

    /// Evaluate against the current form values.
    #[must_use]
    pub fn evaluate(&self, values: &ListQuery) -> bool {
        match self {
            Self::Always => true,
            Self::Eq { field, value } => field_value(values, field).is_some_and(|v| loosely_equal(v, value)),
            Self::Ne { field, value } => !field_value(values, field).is_some_and(|v| loosely_equal(v, value)),
            Self::In { field, values: options } => {
                field_value(values, field).is_some_and(|v| options.iter().any(|o| loosely_equal(v, o)))
            }
            Self::Truthy { field } => field_value(values, field).is_some_and(|v| !is_falsy(v)),
            Self::Empty { field } => field_value(values, field).is_none_or(is_blank),
            Self::Gt { field, value } => number(values, field).is_some_and(|n| n > *value),
            Self::Lt { field, value } => number(values, field).is_some_and(|n| n < *value),
            Self::Not { inner } => !inner.evaluate(values),
            Self::All { predicates } => predicates.iter().all(|p| p.evaluate(values)),
            Self::Any { predicates } => predicates.iter().any(|p| p.evaluate(values)),
        }
    }

    /// Every field path this predicate reads.
    #[must_use]
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        self.collect_dependencies(&mut fields);
        fields
    }

    fn collect_dependencies(&self, fields: &mut BTreeSet<String>) {
        match self {
            Self::Always => {}
            Self::Eq { field, .. }
            | Self::Ne { field, .. }
            | Self::In { field, .. }
            | Self::Truthy { field }
            | Self::Empty { field }
            | Self::Gt { field, .. }
            | Self::Lt { field, .. } => {
                fields.insert(field.clone());
            }
            Self::Not { inner } => inner.collect_dependencies(fields),
            Self::All { predicates } | Self::Any { predicates } => {
                for predicate in predicates {
                    predicate.collect_dependencies(fields);
                }
            }
        }
    }
}

/// Visibility rule for one form field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRule {
    pub field: String,
    pub visible_when: Predicate,
}

/// Fields whose rule holds for `values`, in rule order.
#[must_use]
pub fn visible_fields<'a>(rules: &'a [FieldRule], values: &ListQuery) -> Vec<&'a str> {
    rules
        .iter()
        .filter(|rule| rule.visible_when.evaluate(values))
        .map(|rule| rule.field.as_str())
        .collect()
}

/// Fields whose visibility may change when `changed` changes.
#[must_use]
pub fn affected_by<'a>(rules: &'a [FieldRule], changed: &str) -> Vec<&'a str> {
    rules
        .iter()
        .filter(|rule| rule.visible_when.dependencies().contains(changed))
        .map(|rule| rule.field.as_str())
        .collect()
}

// =============================================================================
// HELPERS
// =============================================================================

fn field_value<'a>(values: &'a ListQuery, path: &str) -> Option<&'a Value> {
    let (head, rest) = path.split_once('.').map_or((path, None), |(h, r)| (h, Some(r)));
    let root = values.get(head)?;
    match rest {
        Some(rest) => lookup(root, rest),
        None => Some(root),
    }
}

fn number(values: &ListQuery, path: &str) -> Option<f64> {
    match field_value(values, path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// JSON equality, except numbers compare by value (`1 == 1.0`).
#[allow(clippy::float_cmp)]
fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
#[path = "predicate_test.rs"]
mod tests;
