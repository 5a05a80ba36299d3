//! Query codec — address-bar params <-> typed list query.
//!
//! DESIGN
//! ======
//! The address bar carries everything as flat strings. `decode` lifts the
//! keys a list declares as parseable into JSON values (numbers, arrays,
//! booleans); everything else stays a string. `encode` is the inverse used
//! when filters, pagination, or reset write state back, and returns `None`
//! when the result would not change the address bar so callers never emit
//! a redundant navigation.
//!
//! Keys starting with `__` are internal. They survive round trips but are
//! hidden from the caller-visible query.
//!
//! ERROR HANDLING
//! ==============
//! Malformed segments never surface: a value that fails to parse as JSON is
//! kept as the raw string.

pub mod location;

use std::collections::BTreeMap;

use reqwest::Url;
use serde_json::{Map, Value};

pub use location::{Location, MemoryLocation};

/// Marker prefix for internal keys hidden from the visible query.
pub const RESERVED_PREFIX: &str = "__";

/// Raw values treated as "absent" by [`decode`].
const EMPTY_MARKERS: [&str; 3] = ["", "null", "undefined"];

/// Scratch base used to borrow `Url`'s form-urlencoding for bare query strings.
const QUERY_BASE: &str = "http://localhost/";

/// Flat string view of the address-bar query.
pub type RawParams = BTreeMap<String, String>;

/// Typed list query: parameter name to scalar, array, or JSON value.
pub type ListQuery = Map<String, Value>;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The address could not be parsed as a URL.
    #[error("invalid address: {0}")]
    InvalidUrl(String),
}

// =============================================================================
// DECODE
// =============================================================================

/// Both views of a decoded address-bar query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedQuery {
    /// Caller-visible query; reserved keys removed.
    pub visible: ListQuery,
    /// Every decoded key, reserved ones included.
    pub full: ListQuery,
}

/// Return whether `key` is an internal (reserved) parameter.
#[must_use]
pub fn is_reserved(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// Decode raw params into a typed query.
///
/// Entries whose value is empty, `"null"`, or `"undefined"` are dropped.
/// Keys listed in `parseable` are JSON-decoded (comma-separated values
/// become arrays); non-listed keys pass through as strings.
#[must_use]
pub fn decode<S: AsRef<str>>(raw: &RawParams, parseable: &[S]) -> ListQuery {
    let mut query = ListQuery::new();
    for (key, value) in raw {
        if EMPTY_MARKERS.contains(&value.as_str()) {
            continue;
        }
        let decoded = if parseable.iter().any(|k| k.as_ref() == key) {
            parse_value(value)
        } else {
            Value::String(value.clone())
        };
        query.insert(key.clone(), decoded);
    }
    query
}

/// Decode raw params and split off the caller-visible view.
#[must_use]
pub fn decode_view<S: AsRef<str>>(raw: &RawParams, parseable: &[S]) -> DecodedQuery {
    let full = decode(raw, parseable);
    let visible = full
        .iter()
        .filter(|(key, _)| !is_reserved(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    DecodedQuery { visible, full }
}

fn parse_value(raw: &str) -> Value {
    let segments: Vec<&str> = raw.split(',').collect();
    let parsed = if segments.len() > 1 {
        segments
            .iter()
            .map(|segment| serde_json::from_str::<Value>(segment))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    } else {
        serde_json::from_str::<Value>(raw)
    };
    parsed.unwrap_or_else(|_| Value::String(raw.to_owned()))
}

// =============================================================================
// ENCODE
// =============================================================================

/// Encode a query patch against the previous raw params.
///
/// With `replace`, the patch becomes the whole new state. Otherwise keys
/// absent from the patch are kept, and `null` entries in the patch remove
/// their key rather than being written literally.
///
/// Returns `None` when the result equals `previous`.
#[must_use]
pub fn encode(patch: &ListQuery, previous: &RawParams, replace: bool) -> Option<RawParams> {
    let mut next = if replace { RawParams::new() } else { previous.clone() };
    for (key, value) in patch {
        match render_value(value) {
            Some(text) => {
                next.insert(key.clone(), text);
            }
            None => {
                next.remove(key);
            }
        }
    }
    (next != *previous).then_some(next)
}

/// Render one query value as its address-bar string; `None` for `null`.
#[must_use]
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(items.iter().map(render_segment).collect::<Vec<_>>().join(",")),
        other => Some(other.to_string()),
    }
}

fn render_segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// =============================================================================
// QUERY STRINGS
// =============================================================================

/// Read the raw params carried by a URL's query string.
#[must_use]
pub fn params_from_url(url: &Url) -> RawParams {
    url.query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Overwrite a URL's query string with `params`. Empty params clear it.
pub fn write_params(url: &mut Url, params: &RawParams) {
    if params.is_empty() {
        url.set_query(None);
        return;
    }
    url.query_pairs_mut().clear().extend_pairs(params.iter());
}

/// Parse a bare query string (leading `?` optional).
///
/// # Errors
///
/// Returns [`QueryError::InvalidUrl`] if the string cannot be attached to a URL.
pub fn parse_query_string(query: &str) -> Result<RawParams, QueryError> {
    let mut url = scratch_url()?;
    url.set_query(Some(query.trim_start_matches('?')));
    Ok(params_from_url(&url))
}

/// Form-urlencode raw params into a query string without the leading `?`.
///
/// # Errors
///
/// Returns [`QueryError::InvalidUrl`] if the scratch URL cannot be built.
pub fn to_query_string(params: &RawParams) -> Result<String, QueryError> {
    let mut url = scratch_url()?;
    write_params(&mut url, params);
    Ok(url.query().unwrap_or_default().to_owned())
}

fn scratch_url() -> Result<Url, QueryError> {
    Url::parse(QUERY_BASE).map_err(|e| QueryError::InvalidUrl(e.to_string()))
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
