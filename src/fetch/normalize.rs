//! Response normalization.
//!
//! Servers wrap list payloads every which way (`{data: {list, total}}`,
//! `{result: {records, count}}`, a bare array). The descriptor names an
//! optional dotted extraction path plus the four field paths; this module
//! pulls a [`ListResponse`] out of whatever came back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dotted field paths for the four normalized fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseFields {
    pub list: String,
    pub total: String,
    pub page: String,
    pub page_size: String,
}

impl Default for ResponseFields {
    fn default() -> Self {
        Self { list: "list".to_owned(), total: "total".to_owned(), page: "page".to_owned(), page_size: "pageSize".to_owned() }
    }
}

/// Normalized page of rows.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub items: Vec<Value>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Values used when the payload omits page or page size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fallback {
    pub page: u64,
    pub page_size: u64,
}

/// Walk a dotted path. Numeric segments index into arrays. An empty path is
/// the value itself.
#[must_use]
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// JavaScript-style falsiness for an extracted payload.
#[must_use]
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Read a non-negative integer from a JSON number or numeric string.
#[must_use]
pub fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extract a [`ListResponse`] from a raw payload.
///
/// Returns `None` when the extracted payload is missing or falsy; callers
/// keep their previous state in that case. A bare array is taken as the row
/// list. Missing `total` falls back to the row count; page and page size
/// fall back to `fallback` and are never below 1.
#[must_use]
pub fn normalize(
    raw: &Value,
    extraction_path: Option<&str>,
    fields: &ResponseFields,
    fallback: Fallback,
) -> Option<ListResponse> {
    let payload = lookup(raw, extraction_path.unwrap_or_default())?;
    if is_falsy(payload) {
        return None;
    }

    let items = match payload {
        Value::Array(items) => items.clone(),
        other => lookup(other, &fields.list)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    };
    let field = |path: &str| lookup(payload, path).and_then(as_count);

    let total = field(&fields.total).unwrap_or(items.len() as u64);
    let page = field(&fields.page).unwrap_or(fallback.page).max(1);
    let page_size = field(&fields.page_size).unwrap_or(fallback.page_size).max(1);

    Some(ListResponse { items, total, page, page_size })
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
