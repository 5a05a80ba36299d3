//! Preference store — per-list display preferences with expiration.
//!
//! DESIGN
//! ======
//! Each list instance persists column widths, hidden columns, row density,
//! and saved quick filters under a caller-supplied cache key. A blob is the
//! JSON envelope `{"savedAt": <unix ms>, "data": <record>}`; reads past the
//! TTL behave as if nothing was stored and purge the stale blob.
//!
//! Writes load the current record, merge a patch over it field by field
//! (shallow), and write the whole envelope back with a fresh timestamp.
//! Hidden columns are stored rather than visible ones so a column added to
//! the declaration later shows up by default.
//!
//! TRADE-OFFS
//! ==========
//! Writes are synchronous and last-write-wins. Two processes sharing a cache
//! key can clobber each other; there is no cross-instance coordination.

pub mod storage;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::columns::ColumnDescriptor;
use crate::error::ErrorCode;
use crate::query::{self, ListQuery, QueryError, RawParams};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};

pub const MIN_COLUMN_WIDTH: u32 = 50;
pub const MAX_COLUMN_WIDTH: u32 = 400;
pub const DEFAULT_PREFS_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("preference serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Query(#[from] QueryError),

    /// A saved filter already encodes the same query.
    #[error("a quick filter with these conditions already exists: {existing_label}")]
    DuplicateFilterQuery { existing_label: String },

    /// A saved filter already uses this label.
    #[error("a quick filter named \"{label}\" already exists")]
    DuplicateFilterLabel { label: String },

    #[error("quick filter label must not be empty")]
    EmptyFilterLabel,
}

impl ErrorCode for PrefsError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Storage(_) => "E_PREFS_STORAGE",
            Self::Serde(_) => "E_PREFS_SERDE",
            Self::Query(_) => "E_PREFS_QUERY",
            Self::DuplicateFilterQuery { .. } => "E_FILTER_DUPLICATE_QUERY",
            Self::DuplicateFilterLabel { .. } => "E_FILTER_DUPLICATE_LABEL",
            Self::EmptyFilterLabel => "E_FILTER_EMPTY_LABEL",
        }
    }

    fn user_facing(&self) -> bool {
        matches!(
            self,
            Self::DuplicateFilterQuery { .. } | Self::DuplicateFilterLabel { .. } | Self::EmptyFilterLabel
        )
    }
}

// =============================================================================
// RECORD
// =============================================================================

/// Row density of the rendered list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    Compact,
    #[default]
    Normal,
    Large,
}

/// A named, saved encoded query string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFilter {
    pub query_string: String,
    pub label: String,
}

/// Persisted display preferences for one list instance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferenceRecord {
    /// Column key to width in pixels, always within the clamp range.
    pub column_widths: BTreeMap<String, u32>,
    pub hidden_columns: BTreeSet<String>,
    pub density: Density,
    pub saved_filters: Vec<SavedFilter>,
}

/// Shallow partial update; `Some` fields replace the stored field wholesale.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreferencePatch {
    pub column_widths: Option<BTreeMap<String, u32>>,
    pub hidden_columns: Option<BTreeSet<String>>,
    pub density: Option<Density>,
    pub saved_filters: Option<Vec<SavedFilter>>,
}

impl PreferenceRecord {
    fn merge(mut self, patch: PreferencePatch) -> Self {
        if let Some(widths) = patch.column_widths {
            self.column_widths = widths;
        }
        if let Some(hidden) = patch.hidden_columns {
            self.hidden_columns = hidden;
        }
        if let Some(density) = patch.density {
            self.density = density;
        }
        if let Some(filters) = patch.saved_filters {
            self.saved_filters = filters;
        }
        self
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    saved_at: i64,
    data: PreferenceRecord,
}

/// Clamp a requested column width into `[MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH]`.
#[must_use]
pub fn clamp_column_width(px: i64) -> u32 {
    let clamped = px.clamp(i64::from(MIN_COLUMN_WIDTH), i64::from(MAX_COLUMN_WIDTH));
    u32::try_from(clamped).unwrap_or(MIN_COLUMN_WIDTH)
}

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

// =============================================================================
// STORE
// =============================================================================

/// Reads and writes [`PreferenceRecord`]s through a [`Storage`] backend.
#[derive(Clone)]
pub struct PreferenceStore {
    storage: Arc<dyn Storage>,
    ttl: Duration,
    filter_skip_keys: Vec<String>,
}

impl PreferenceStore {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage, ttl: DEFAULT_PREFS_TTL, filter_skip_keys: vec!["page".to_owned(), "pageSize".to_owned()] }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Keys left out of saved quick filters (pagination by default).
    #[must_use]
    pub fn with_filter_skip_keys(mut self, keys: Vec<String>) -> Self {
        self.filter_skip_keys = keys;
        self
    }

    /// Load the record for `cache_key`; `None` when absent or expired.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::Storage`] if the backend read fails.
    pub fn load(&self, cache_key: &str) -> Result<Option<PreferenceRecord>, PrefsError> {
        self.load_at(cache_key, now_ms())
    }

    pub(crate) fn load_at(&self, cache_key: &str, now: i64) -> Result<Option<PreferenceRecord>, PrefsError> {
        let Some(raw) = self.storage.get(cache_key)? else {
            return Ok(None);
        };
        let envelope: Envelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, %cache_key, "discarding unreadable preference blob");
                return Ok(None);
            }
        };
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        if now.saturating_sub(envelope.saved_at) > ttl_ms {
            self.storage.remove(cache_key)?;
            return Ok(None);
        }
        Ok(Some(envelope.data))
    }

    /// Merge `patch` over the stored record and reset its expiration.
    ///
    /// # Errors
    ///
    /// Returns a [`PrefsError`] if the backend or serialization fails.
    pub fn save(&self, cache_key: &str, patch: PreferencePatch) -> Result<PreferenceRecord, PrefsError> {
        self.save_at(cache_key, patch, now_ms())
    }

    pub(crate) fn save_at(
        &self,
        cache_key: &str,
        patch: PreferencePatch,
        now: i64,
    ) -> Result<PreferenceRecord, PrefsError> {
        let current = self.load_at(cache_key, now)?.unwrap_or_default();
        let record = current.merge(patch);
        let raw = serde_json::to_string(&Envelope { saved_at: now, data: record.clone() })?;
        self.storage.set(cache_key, &raw)?;
        Ok(record)
    }

    /// Drop every stored preference for `cache_key`.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::Storage`] if the backend write fails.
    pub fn clear(&self, cache_key: &str) -> Result<(), PrefsError> {
        Ok(self.storage.remove(cache_key)?)
    }

    /// Store a width for `column`, clamped to the allowed range.
    ///
    /// # Errors
    ///
    /// Returns a [`PrefsError`] if the backend or serialization fails.
    pub fn set_column_width(&self, cache_key: &str, column: &str, px: i64) -> Result<PreferenceRecord, PrefsError> {
        let mut widths = self.load(cache_key)?.unwrap_or_default().column_widths;
        widths.insert(column.to_owned(), clamp_column_width(px));
        self.save(cache_key, PreferencePatch { column_widths: Some(widths), ..PreferencePatch::default() })
    }

    /// Record which declared columns the user keeps visible.
    ///
    /// The complement of `visible_keys` within `columns` is stored as the
    /// hidden set. Fixed columns are never stored as hidden.
    ///
    /// # Errors
    ///
    /// Returns a [`PrefsError`] if the backend or serialization fails.
    pub fn set_hidden_columns<S: AsRef<str>>(
        &self,
        cache_key: &str,
        columns: &[ColumnDescriptor],
        visible_keys: &[S],
    ) -> Result<PreferenceRecord, PrefsError> {
        let hidden: BTreeSet<String> = columns
            .iter()
            .filter(|column| !column.fixed)
            .filter(|column| !visible_keys.iter().any(|k| k.as_ref() == column.key))
            .map(|column| column.key.clone())
            .collect();
        self.save(cache_key, PreferencePatch { hidden_columns: Some(hidden), ..PreferencePatch::default() })
    }

    /// Store the row density.
    ///
    /// # Errors
    ///
    /// Returns a [`PrefsError`] if the backend or serialization fails.
    pub fn set_density(&self, cache_key: &str, density: Density) -> Result<PreferenceRecord, PrefsError> {
        self.save(cache_key, PreferencePatch { density: Some(density), ..PreferencePatch::default() })
    }

    /// Canonical query string for a quick filter.
    ///
    /// Reserved keys and skip keys are left out; keys are emitted sorted so
    /// construction order does not matter.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::Query`] if the query string cannot be built.
    pub fn filter_query_string(&self, query: &ListQuery) -> Result<String, PrefsError> {
        let params: RawParams = query
            .iter()
            .filter(|(key, _)| !query::is_reserved(key) && !self.filter_skip_keys.iter().any(|s| s == *key))
            .filter_map(|(key, value)| query::render_value(value).map(|text| (key.clone(), text)))
            .collect();
        Ok(query::to_query_string(&params)?)
    }

    /// Save `query` as a quick filter named `label`.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::DuplicateFilterQuery`] when an existing filter
    /// encodes the same query, [`PrefsError::DuplicateFilterLabel`] when the
    /// label is taken, or a storage/serialization error.
    pub fn save_filter(
        &self,
        cache_key: &str,
        query: &ListQuery,
        label: &str,
    ) -> Result<PreferenceRecord, PrefsError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(PrefsError::EmptyFilterLabel);
        }
        let query_string = self.filter_query_string(query)?;
        let mut filters = self.load(cache_key)?.unwrap_or_default().saved_filters;

        if let Some(existing) = filters.iter().find(|f| f.query_string == query_string) {
            return Err(PrefsError::DuplicateFilterQuery { existing_label: existing.label.clone() });
        }
        if filters.iter().any(|f| f.label == label) {
            return Err(PrefsError::DuplicateFilterLabel { label: label.to_owned() });
        }

        filters.push(SavedFilter { query_string, label: label.to_owned() });
        self.save(cache_key, PreferencePatch { saved_filters: Some(filters), ..PreferencePatch::default() })
    }

    /// Remove the quick filter named `label`. Unknown labels are a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`PrefsError`] if the backend or serialization fails.
    pub fn remove_filter(&self, cache_key: &str, label: &str) -> Result<PreferenceRecord, PrefsError> {
        let mut filters = self.load(cache_key)?.unwrap_or_default().saved_filters;
        filters.retain(|f| f.label != label);
        self.save(cache_key, PreferencePatch { saved_filters: Some(filters), ..PreferencePatch::default() })
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
