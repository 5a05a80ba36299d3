//! Fetch orchestrator — debounced list loading.
//!
//! DESIGN
//! ======
//! `fetch` bumps a generation counter and spawns a task that sleeps for the
//! quiescence window; when it wakes, it only proceeds if no newer call has
//! bumped the counter since. Rapid calls therefore coalesce to the last one.
//!
//! Request params are assembled when the task fires:
//! - merge mode: default data, then the current page/pageSize, then caller
//!   params (caller wins);
//! - replace mode: default data, then the initial page/pageSize, then caller
//!   params, so stale page numbers never leak into filter submits or resets.
//!
//! State is published through a `tokio::sync::watch` channel. The loading
//! flag is held by a drop guard, so it is released on success, failure, and
//! panic alike.
//!
//! TRADE-OFFS
//! ==========
//! Debouncing suppresses queued calls but never aborts one already in
//! flight. Two overlapping requests both complete and the later state write
//! wins, even if it carries the older response. Callers needing strict
//! ordering must tag requests themselves.

pub mod normalize;
pub mod source;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::query::ListQuery;
use crate::selection::SharedSelection;
pub use normalize::{Fallback, ListResponse, ResponseFields, normalize};
pub use source::{FetchError, HttpMethod, ListSource, RemoteEndpoint, RemoteSource, from_fn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const INITIAL_PAGE: u64 = 1;

// =============================================================================
// DESCRIPTORS
// =============================================================================

/// Where list data comes from and how to read the payload.
///
/// Exactly one of `remote` and `local` must be set; otherwise fetching is a
/// silent no-op.
#[derive(Clone, Default)]
pub struct FetchDescriptor {
    pub remote: Option<RemoteEndpoint>,
    pub local: Option<Arc<dyn ListSource>>,
    pub fields: ResponseFields,
    /// Dotted path to the object holding the list fields, e.g. `"data"`.
    pub extraction_path: Option<String>,
}

impl FetchDescriptor {
    #[must_use]
    pub fn remote(endpoint: RemoteEndpoint) -> Self {
        Self { remote: Some(endpoint), ..Self::default() }
    }

    #[must_use]
    pub fn local(source: Arc<dyn ListSource>) -> Self {
        Self { local: Some(source), ..Self::default() }
    }

    #[must_use]
    pub fn fields(mut self, fields: ResponseFields) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn extraction_path(mut self, path: impl Into<String>) -> Self {
        self.extraction_path = Some(path.into());
        self
    }
}

/// Pagination defaults and debounce window.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchSettings {
    pub debounce: Duration,
    pub init_page_size: u64,
    pub page_param: String,
    pub page_size_param: String,
    /// Static request data merged under every request.
    pub default_data: ListQuery,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            init_page_size: DEFAULT_PAGE_SIZE,
            page_param: "page".to_owned(),
            page_size_param: "pageSize".to_owned(),
            default_data: ListQuery::new(),
        }
    }
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    /// The last request failed; rows and pagination are from before it.
    Error,
}

/// Published list state.
#[derive(Clone, Debug, PartialEq)]
pub struct ListState {
    pub items: Vec<Value>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub status: FetchStatus,
    /// Params of the last request that completed without error.
    pub last_params: Option<ListQuery>,
    pub last_error: Option<String>,
}

impl ListState {
    fn initial(settings: &FetchSettings) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: INITIAL_PAGE,
            page_size: settings.init_page_size,
            status: FetchStatus::Idle,
            last_params: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// Debounced fetcher for one list instance. Cheap to clone.
#[derive(Clone)]
pub struct FetchOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    settings: FetchSettings,
    source: Option<Arc<dyn ListSource>>,
    fields: ResponseFields,
    extraction_path: Option<String>,
    generation: AtomicU64,
    in_flight: AtomicUsize,
    state: watch::Sender<ListState>,
    selection: Option<SharedSelection>,
}

impl FetchOrchestrator {
    /// Build an orchestrator; a remote endpoint gets a `reqwest`-backed source.
    ///
    /// `selection`, when given, is cleared by [`FetchOrchestrator::refresh`].
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::HttpClientBuild`] if the remote client fails to build.
    pub fn new(
        settings: FetchSettings,
        descriptor: FetchDescriptor,
        selection: Option<SharedSelection>,
    ) -> Result<Self, FetchError> {
        let source: Option<Arc<dyn ListSource>> = match (descriptor.remote, descriptor.local) {
            (Some(endpoint), None) => Some(Arc::new(RemoteSource::new(endpoint)?)),
            (None, Some(local)) => Some(local),
            (Some(_), Some(_)) => {
                warn!("fetch descriptor sets both a remote endpoint and a local source; fetching disabled");
                None
            }
            (None, None) => None,
        };
        let (state, _) = watch::channel(ListState::initial(&settings));
        Ok(Self {
            inner: Arc::new(Inner {
                settings,
                source,
                fields: descriptor.fields,
                extraction_path: descriptor.extraction_path,
                generation: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                state,
                selection,
            }),
        })
    }

    #[must_use]
    pub fn settings(&self) -> &FetchSettings {
        &self.inner.settings
    }

    /// Whether a data source is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.source.is_some()
    }

    /// Snapshot of the current list state.
    #[must_use]
    pub fn state(&self) -> ListState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.inner.state.subscribe()
    }

    /// Assemble request params for `params` in merge or replace mode.
    #[must_use]
    pub fn build_params(&self, params: &ListQuery, replace: bool) -> ListQuery {
        let settings = &self.inner.settings;
        let (page, page_size) = if replace {
            (INITIAL_PAGE, settings.init_page_size)
        } else {
            let state = self.inner.state.borrow();
            (state.page, state.page_size)
        };

        let mut request = settings.default_data.clone();
        request.insert(settings.page_param.clone(), Value::from(page));
        request.insert(settings.page_size_param.clone(), Value::from(page_size));
        for (key, value) in params {
            request.insert(key.clone(), value.clone());
        }
        request
    }

    /// Schedule a debounced fetch.
    ///
    /// Returns `None` when no source is configured. The handle resolves once
    /// the call has either run or been superseded by a newer one.
    pub fn fetch(&self, params: ListQuery, replace: bool) -> Option<JoinHandle<()>> {
        if !self.is_configured() {
            debug!("no list source configured; fetch skipped");
            return None;
        }
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let this = self.clone();
        Some(tokio::spawn(async move {
            tokio::time::sleep(this.inner.settings.debounce).await;
            if this.inner.generation.load(Ordering::SeqCst) != generation {
                debug!(generation, "fetch superseded within debounce window");
                return;
            }
            let request = this.build_params(&params, replace);
            this.execute(request).await;
        }))
    }

    /// Reissue the last successful request verbatim, then clear the selection.
    pub async fn refresh(&self) {
        let last = self.inner.state.borrow().last_params.clone();
        match last {
            Some(request) => {
                self.execute(request).await;
            }
            None => debug!("refresh before any successful fetch; nothing to reissue"),
        }
        if let Some(selection) = &self.inner.selection {
            selection.clear();
        }
    }

    /// Run one request immediately. Returns `true` if it completed without error.
    pub async fn execute(&self, request: ListQuery) -> bool {
        let Some(source) = self.inner.source.clone() else {
            return false;
        };
        let _loading = LoadingGuard::enter(&self.inner);

        match source.fetch(&request).await {
            Ok(raw) => {
                self.apply_response(&raw, request);
                true
            }
            Err(e) => {
                warn!(error = %e, "list fetch failed; keeping previous state");
                let message = e.to_string();
                self.inner.state.send_modify(|state| {
                    state.last_error = Some(message);
                });
                false
            }
        }
    }

    fn apply_response(&self, raw: &Value, request: ListQuery) {
        let settings = &self.inner.settings;
        let fallback = Fallback {
            page: request
                .get(&settings.page_param)
                .and_then(normalize::as_count)
                .unwrap_or(INITIAL_PAGE),
            page_size: settings.init_page_size,
        };
        let normalized = normalize(raw, self.inner.extraction_path.as_deref(), &self.inner.fields, fallback);

        self.inner.state.send_modify(|state| {
            state.last_params = Some(request);
            state.last_error = None;
            match normalized {
                Some(response) => {
                    state.items = response.items;
                    state.total = response.total;
                    state.page = response.page;
                    state.page_size = response.page_size;
                }
                None => debug!("empty list response; keeping previous rows"),
            }
        });
    }
}

/// Holds the loading flag for the duration of one request.
struct LoadingGuard<'a> {
    inner: &'a Inner,
}

impl<'a> LoadingGuard<'a> {
    fn enter(inner: &'a Inner) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        inner.state.send_modify(|state| state.status = FetchStatus::Loading);
        Self { inner }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.state.send_modify(|state| {
                state.status = if state.last_error.is_some() { FetchStatus::Error } else { FetchStatus::Idle };
            });
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
