//! List coordinator — one rendered list's state, end to end.
//!
//! SYSTEM CONTEXT
//! ==============
//! The host forwards navigation events, filter submits, pagination, and row
//! clicks. The coordinator keeps four pieces consistent:
//! - the address bar (through [`Location`]),
//! - persisted display preferences (through [`PreferenceStore`]),
//! - the debounced request state (through [`FetchOrchestrator`]),
//! - the cross-page selection (through [`SelectionTracker`]).
//!
//! Filter submits and resets rewrite the address bar in replace mode and
//! refetch from page 1. Pagination merges into the address bar and keeps the
//! active filters. Internal `__` keys in the address bar survive both.
//!
//! ERROR HANDLING
//! ==============
//! Every operation is all-or-nothing. Rejections meant for the user (the
//! selection limit, duplicate quick filters) reach the notifier once and
//! are returned to the caller. Everything else is logged and the previous
//! state kept.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::columns::{self, ColumnDescriptor};
use crate::config::CoordinatorConfig;
use crate::error::{ConfigError, ErrorCode};
use crate::fetch::{FetchDescriptor, FetchError, FetchOrchestrator, ListState};
use crate::notify::{Notice, Notifier};
use crate::prefs::{Density, PreferenceRecord, PreferenceStore, PrefsError, SavedFilter, Storage};
use crate::query::{self, DecodedQuery, ListQuery, Location, RawParams};
use crate::selection::{SelectionError, SelectionState, SelectionTracker, SharedSelection};

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ErrorCode for CoordinatorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Fetch(e) => e.error_code(),
        }
    }
}

pub struct ListCoordinator {
    config: CoordinatorConfig,
    columns: Vec<ColumnDescriptor>,
    prefs: PreferenceStore,
    location: Arc<dyn Location>,
    notifier: Arc<dyn Notifier>,
    selection: SharedSelection,
    fetcher: FetchOrchestrator,
}

impl ListCoordinator {
    /// Assemble a coordinator. Nothing is fetched until the first
    /// [`ListCoordinator::on_navigation`].
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Config`] for duplicate column keys and
    /// [`CoordinatorError::Fetch`] if the remote client cannot be built.
    pub fn new(
        config: CoordinatorConfig,
        columns: Vec<ColumnDescriptor>,
        descriptor: FetchDescriptor,
        storage: Arc<dyn Storage>,
        location: Arc<dyn Location>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, CoordinatorError> {
        columns::validate_columns(&columns)?;
        let selection = SelectionTracker::new(config.selection.clone(), notifier.clone()).into_shared();
        let fetcher = FetchOrchestrator::new(config.fetch.clone(), descriptor, Some(selection.clone()))?;
        let prefs = PreferenceStore::new(storage)
            .with_ttl(config.prefs_ttl)
            .with_filter_skip_keys(config.pagination_keys());

        info!(
            cache_key = %config.cache_key,
            columns = columns.len(),
            configured = fetcher.is_configured(),
            "list coordinator ready"
        );
        Ok(Self { config, columns, prefs, location, notifier, selection, fetcher })
    }

    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    #[must_use]
    pub fn cache_key(&self) -> &str {
        &self.config.cache_key
    }

    /// Declared columns, in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    // =========================================================================
    // QUERY + FETCH
    // =========================================================================

    /// Decode the address bar into its visible and full query views.
    #[must_use]
    pub fn query(&self) -> DecodedQuery {
        query::decode_view(&self.location.current(), &self.config.parseable_keys)
    }

    /// Re-read the address bar and fetch in merge mode.
    pub fn on_navigation(&self) -> Option<JoinHandle<()>> {
        self.fetcher.fetch(self.query().visible, false)
    }

    /// Replace the filter state with `filters` and refetch from page 1.
    pub fn submit_filters(&self, filters: ListQuery) -> Option<JoinHandle<()>> {
        let current = self.location.current();
        let visible: ListQuery = filters.into_iter().filter(|(key, _)| !query::is_reserved(key)).collect();

        let mut patch = visible.clone();
        patch.extend(reserved_entries(&current));
        self.write_location(&patch, &current, true);

        self.fetcher.fetch(visible, true)
    }

    /// Move to `page` with `page_size`, keeping the active filters.
    pub fn change_page(&self, page: u64, page_size: u64) -> Option<JoinHandle<()>> {
        let settings = self.fetcher.settings();
        let mut patch = ListQuery::new();
        patch.insert(settings.page_param.clone(), Value::from(page.max(1)));
        patch.insert(settings.page_size_param.clone(), Value::from(page_size.max(1)));

        let current = self.location.current();
        self.write_location(&patch, &current, false);
        self.selection.page_replaced();

        let mut params = self.query().visible;
        params.extend(patch);
        self.fetcher.fetch(params, false)
    }

    /// Drop every visible filter and refetch from page 1.
    pub fn reset(&self) -> Option<JoinHandle<()>> {
        let current = self.location.current();
        let reserved: ListQuery = reserved_entries(&current).collect();
        self.write_location(&reserved, &current, true);
        self.fetcher.fetch(ListQuery::new(), true)
    }

    /// Reissue the last request immediately and clear the selection.
    pub async fn refresh(&self) {
        self.fetcher.refresh().await;
    }

    /// Snapshot of the list state.
    #[must_use]
    pub fn state(&self) -> ListState {
        self.fetcher.state()
    }

    /// Receiver notified on every list state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.fetcher.subscribe()
    }

    fn write_location(&self, patch: &ListQuery, current: &RawParams, replace: bool) {
        match query::encode(patch, current, replace) {
            Some(next) => self.location.navigate(next),
            None => debug!(cache_key = %self.config.cache_key, "address bar unchanged; navigation skipped"),
        }
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Select or deselect one row.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::LimitExceeded`] when the selection limit
    /// would be exceeded; the user has already been notified.
    pub fn select(&self, row: &Value, selected: bool) -> Result<(), SelectionError> {
        self.selection.select(row, selected)
    }

    /// Select or deselect every row on the current page.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::LimitExceeded`] when the selection limit
    /// would be exceeded; the user has already been notified.
    pub fn select_all(&self, selected: bool) -> Result<(), SelectionError> {
        let rows = self.fetcher.state().items;
        self.selection.select_all(selected, &rows)
    }

    #[must_use]
    pub fn selection(&self) -> SelectionState {
        self.selection.state()
    }

    /// Shared tracker, for registering observers.
    #[must_use]
    pub fn selection_handle(&self) -> SharedSelection {
        self.selection.clone()
    }

    // =========================================================================
    // PREFERENCES
    // =========================================================================

    /// Stored preferences, or defaults when none are stored or readable.
    #[must_use]
    pub fn preferences(&self) -> PreferenceRecord {
        match self.prefs.load(&self.config.cache_key) {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, cache_key = %self.config.cache_key, "failed to load preferences; using defaults");
                PreferenceRecord::default()
            }
        }
    }

    /// Declared columns with hidden ones removed and widths overridden.
    #[must_use]
    pub fn visible_columns(&self) -> Vec<ColumnDescriptor> {
        columns::visible_columns(&self.columns, Some(&self.preferences()))
    }

    /// Persist a column width, clamped to the allowed range.
    ///
    /// # Errors
    ///
    /// Returns a [`PrefsError`] if the preference cannot be stored.
    pub fn resize_column(&self, column: &str, px: i64) -> Result<PreferenceRecord, PrefsError> {
        self.report(self.prefs.set_column_width(&self.config.cache_key, column, px))
    }

    /// Persist which columns stay visible; every other non-fixed column is hidden.
    ///
    /// # Errors
    ///
    /// Returns a [`PrefsError`] if the preference cannot be stored.
    pub fn set_visible_columns<S: AsRef<str>>(&self, keys: &[S]) -> Result<PreferenceRecord, PrefsError> {
        self.report(self.prefs.set_hidden_columns(&self.config.cache_key, &self.columns, keys))
    }

    /// Persist the row density.
    ///
    /// # Errors
    ///
    /// Returns a [`PrefsError`] if the preference cannot be stored.
    pub fn set_density(&self, density: Density) -> Result<PreferenceRecord, PrefsError> {
        self.report(self.prefs.set_density(&self.config.cache_key, density))
    }

    /// Save the current visible query as a quick filter.
    ///
    /// # Errors
    ///
    /// Returns a duplicate or empty-label [`PrefsError`] (after notifying),
    /// or a storage error.
    pub fn save_filter(&self, label: &str) -> Result<PreferenceRecord, PrefsError> {
        let visible = self.query().visible;
        self.report(self.prefs.save_filter(&self.config.cache_key, &visible, label))
    }

    #[must_use]
    pub fn saved_filters(&self) -> Vec<SavedFilter> {
        self.preferences().saved_filters
    }

    /// Submit the quick filter named `label`. `None` for unknown labels.
    pub fn apply_filter(&self, label: &str) -> Option<JoinHandle<()>> {
        let Some(saved) = self.saved_filters().into_iter().find(|f| f.label == label) else {
            debug!(%label, "no quick filter with this label");
            return None;
        };
        let raw = match query::parse_query_string(&saved.query_string) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, %label, "unreadable quick filter");
                return None;
            }
        };
        self.submit_filters(query::decode(&raw, &self.config.parseable_keys))
    }

    /// Delete the quick filter named `label`.
    ///
    /// # Errors
    ///
    /// Returns a [`PrefsError`] if the preference cannot be stored.
    pub fn remove_filter(&self, label: &str) -> Result<PreferenceRecord, PrefsError> {
        self.report(self.prefs.remove_filter(&self.config.cache_key, label))
    }

    /// Forget every stored preference for this list.
    ///
    /// # Errors
    ///
    /// Returns a [`PrefsError`] if the backend fails.
    pub fn clear_preferences(&self) -> Result<(), PrefsError> {
        self.report(self.prefs.clear(&self.config.cache_key))
    }

    fn report<T, E: ErrorCode>(&self, result: Result<T, E>) -> Result<T, E> {
        if let Err(e) = &result {
            if e.user_facing() {
                self.notifier.notify(Notice::from_error(e));
            } else {
                warn!(error = %e, code = e.error_code(), cache_key = %self.config.cache_key, "preference update failed");
            }
        }
        result
    }
}

/// Reserved address-bar entries, kept as raw strings.
fn reserved_entries(current: &RawParams) -> impl Iterator<Item = (String, Value)> + '_ {
    current
        .iter()
        .filter(|(key, _)| query::is_reserved(key))
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
