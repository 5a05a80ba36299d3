//! Coordinator configuration.
//!
//! Defaults cover the common admin list: 300 ms debounce, 20 rows per page,
//! preferences kept for 30 days, unbounded multi-select keyed by `id`.
//! `from_env` overrides them from `PAGELIST_*` variables:
//! - `PAGELIST_DEBOUNCE_MS`
//! - `PAGELIST_PAGE_SIZE`
//! - `PAGELIST_PREFS_TTL_DAYS`
//! - `PAGELIST_MAX_SELECTION`
//! - `PAGELIST_SELECTION_MODE`: `multi` (default) or `single`
//! - `PAGELIST_ROW_KEY`

use std::time::Duration;

use crate::error::ConfigError;
use crate::fetch::{DEFAULT_PAGE_SIZE, FetchSettings};
use crate::query::ListQuery;
use crate::selection::{SelectionMode, SelectionRules};

const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_PREFS_TTL_DAYS: u64 = 30;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Clone, Debug, PartialEq)]
pub struct CoordinatorConfig {
    /// Identifies this list's persisted preferences.
    pub cache_key: String,
    pub fetch: FetchSettings,
    pub prefs_ttl: Duration,
    pub selection: SelectionRules,
    /// Address-bar keys decoded as JSON instead of kept as strings.
    pub parseable_keys: Vec<String>,
}

impl CoordinatorConfig {
    #[must_use]
    pub fn new(cache_key: impl Into<String>) -> Self {
        let fetch = FetchSettings {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            init_page_size: DEFAULT_PAGE_SIZE,
            ..FetchSettings::default()
        };
        let parseable_keys = vec![fetch.page_param.clone(), fetch.page_size_param.clone()];
        Self {
            cache_key: cache_key.into(),
            fetch,
            prefs_ttl: Duration::from_secs(DEFAULT_PREFS_TTL_DAYS * SECS_PER_DAY),
            selection: SelectionRules::default(),
            parseable_keys,
        }
    }

    /// Build a config from `PAGELIST_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for an unknown selection mode.
    pub fn from_env(cache_key: impl Into<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new(cache_key);
        config.fetch.debounce = Duration::from_millis(env_parse("PAGELIST_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS));
        config.fetch.init_page_size = env_parse("PAGELIST_PAGE_SIZE", DEFAULT_PAGE_SIZE).max(1);
        let ttl_days: u64 = env_parse("PAGELIST_PREFS_TTL_DAYS", DEFAULT_PREFS_TTL_DAYS);
        config.prefs_ttl = Duration::from_secs(ttl_days.saturating_mul(SECS_PER_DAY));
        config.selection.max = std::env::var("PAGELIST_MAX_SELECTION")
            .ok()
            .and_then(|v| v.parse::<usize>().ok());
        config.selection.mode = parse_selection_mode(std::env::var("PAGELIST_SELECTION_MODE").ok().as_deref())?;
        if let Ok(row_key) = std::env::var("PAGELIST_ROW_KEY") {
            config.selection.row_key = row_key;
        }
        Ok(config)
    }

    #[must_use]
    pub fn debounce(mut self, window: Duration) -> Self {
        self.fetch.debounce = window;
        self
    }

    #[must_use]
    pub fn page_size(mut self, size: u64) -> Self {
        self.fetch.init_page_size = size.max(1);
        self
    }

    #[must_use]
    pub fn prefs_ttl(mut self, ttl: Duration) -> Self {
        self.prefs_ttl = ttl;
        self
    }

    #[must_use]
    pub fn default_data(mut self, data: ListQuery) -> Self {
        self.fetch.default_data = data;
        self
    }

    /// Add keys to decode as JSON; pagination keys are always included.
    #[must_use]
    pub fn parseable_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for key in keys {
            let key = key.into();
            if !self.parseable_keys.contains(&key) {
                self.parseable_keys.push(key);
            }
        }
        self
    }

    #[must_use]
    pub fn selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection.mode = mode;
        self
    }

    #[must_use]
    pub fn row_key(mut self, key: impl Into<String>) -> Self {
        self.selection.row_key = key.into();
        self
    }

    #[must_use]
    pub fn max_selection(mut self, max: usize) -> Self {
        self.selection.max = Some(max);
        self
    }

    /// Message shown when the selection limit is hit; `{max}` is substituted.
    #[must_use]
    pub fn limit_message(mut self, message: impl Into<String>) -> Self {
        self.selection.limit_message = Some(message.into());
        self
    }

    #[must_use]
    pub fn clear_selection_on_page_change(mut self, clear: bool) -> Self {
        self.selection.clear_on_page_change = clear;
        self
    }

    /// Keys left out of saved quick filters.
    #[must_use]
    pub fn pagination_keys(&self) -> Vec<String> {
        vec![self.fetch.page_param.clone(), self.fetch.page_size_param.clone()]
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_selection_mode(raw: Option<&str>) -> Result<SelectionMode, ConfigError> {
    match raw.unwrap_or("multi") {
        "multi" => Ok(SelectionMode::Multi),
        "single" => Ok(SelectionMode::Single),
        other => Err(ConfigError::InvalidEnv { var: "PAGELIST_SELECTION_MODE", value: other.to_owned() }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
