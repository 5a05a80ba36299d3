//! Address-bar abstraction.
//!
//! SYSTEM CONTEXT
//! ==============
//! The coordinator never talks to a router directly. A host binds its router
//! (browser history, TUI state, test double) behind [`Location`]; the
//! in-memory implementation backs tests and the demo binary.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::Url;

use super::{QueryError, RawParams, params_from_url, write_params};

/// Source and sink of address-bar query state.
pub trait Location: Send + Sync {
    /// Current raw query params.
    fn current(&self) -> RawParams;

    /// Replace the query params, producing one navigation event.
    fn navigate(&self, params: RawParams);
}

/// `Location` backed by an owned URL.
pub struct MemoryLocation {
    url: Mutex<Url>,
    navigations: AtomicUsize,
}

impl MemoryLocation {
    /// Build a location from an absolute href.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidUrl`] if `href` is not a valid absolute URL.
    pub fn parse(href: &str) -> Result<Self, QueryError> {
        let url = Url::parse(href).map_err(|e| QueryError::InvalidUrl(e.to_string()))?;
        Ok(Self { url: Mutex::new(url), navigations: AtomicUsize::new(0) })
    }

    /// Full current href.
    #[must_use]
    pub fn href(&self) -> String {
        self.lock().to_string()
    }

    /// Number of navigation events emitted so far.
    #[must_use]
    pub fn navigation_count(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Url> {
        self.url.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Location for MemoryLocation {
    fn current(&self) -> RawParams {
        params_from_url(&self.lock())
    }

    fn navigate(&self, params: RawParams) {
        write_params(&mut self.lock(), &params);
        self.navigations.fetch_add(1, Ordering::SeqCst);
    }
}
