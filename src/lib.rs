//! Paginated list state coordinator.
//!
//! Keeps one data list's query, pagination, preferences, and selection
//! consistent while the user filters, pages, and selects rows:
//! - [`query`] translates between address-bar params and a typed list query.
//! - [`prefs`] persists per-list display preferences with expiration.
//! - [`fetch`] debounces and issues list requests, normalizing responses.
//! - [`selection`] tracks a cross-page row selection with a size limit.
//! - [`coordinator`] wires them together for one list instance.
//!
//! [`predicate`] and [`registry`] support hosts that build filter forms and
//! need to reach lists from elsewhere in the application.

pub mod columns;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetch;
pub mod notify;
pub mod predicate;
pub mod prefs;
pub mod query;
pub mod registry;
pub mod selection;

pub use columns::ColumnDescriptor;
pub use config::CoordinatorConfig;
pub use coordinator::{CoordinatorError, ListCoordinator};
pub use error::ErrorCode;
pub use fetch::{FetchDescriptor, FetchOrchestrator, ListState};
pub use notify::{LogNotifier, Notice, Notifier};
pub use prefs::{PreferenceRecord, PreferenceStore};
pub use query::{ListQuery, Location, MemoryLocation};
pub use registry::ListRegistry;
pub use selection::{SelectionState, SelectionTracker};
