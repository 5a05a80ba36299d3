//! Observable selection holder.
//!
//! Commits a new [`SelectionState`] only when the pure operation succeeds
//! and actually changes something, then fires the id and record observers.
//! Rejections go to the notifier exactly once and leave both the state and
//! the observers untouched.
//!
//! The state lock is released before observers or the notifier run, so a
//! callback may read or mutate the same tracker.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::{RowId, SelectionError, SelectionRules, SelectionState};
use crate::notify::{Notice, Notifier};

/// Selection tracker shared between the coordinator and the fetch orchestrator.
pub type SharedSelection = Arc<SelectionTracker>;

type IdsObserver = Arc<dyn Fn(&[RowId]) + Send + Sync>;
type RecordsObserver = Arc<dyn Fn(&[Value]) + Send + Sync>;

pub struct SelectionTracker {
    rules: SelectionRules,
    state: Mutex<SelectionState>,
    notifier: Arc<dyn Notifier>,
    on_ids: Mutex<Vec<IdsObserver>>,
    on_records: Mutex<Vec<RecordsObserver>>,
}

impl SelectionTracker {
    #[must_use]
    pub fn new(rules: SelectionRules, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            rules,
            state: Mutex::new(SelectionState::new()),
            notifier,
            on_ids: Mutex::new(Vec::new()),
            on_records: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn into_shared(self) -> SharedSelection {
        Arc::new(self)
    }

    #[must_use]
    pub fn rules(&self) -> &SelectionRules {
        &self.rules
    }

    /// Snapshot of the current selection.
    #[must_use]
    pub fn state(&self) -> SelectionState {
        self.lock_state().clone()
    }

    /// Register an observer for the selected id list.
    pub fn on_ids(&self, observer: impl Fn(&[RowId]) + Send + Sync + 'static) {
        lock(&self.on_ids).push(Arc::new(observer));
    }

    /// Register an observer for the selected row snapshots.
    pub fn on_records(&self, observer: impl Fn(&[Value]) + Send + Sync + 'static) {
        lock(&self.on_records).push(Arc::new(observer));
    }

    /// Select or deselect one row.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::LimitExceeded`] (after notifying) when the
    /// selection limit would be exceeded.
    pub fn select(&self, row: &Value, selected: bool) -> Result<(), SelectionError> {
        self.update(|state, rules| state.select(row, selected, rules))
    }

    /// Select or deselect every row of the current page.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::LimitExceeded`] (after notifying) when the
    /// selection limit would be exceeded.
    pub fn select_all(&self, selected: bool, page_rows: &[Value]) -> Result<(), SelectionError> {
        self.update(|state, rules| state.select_all(selected, page_rows, rules))
    }

    /// Drop the whole selection.
    pub fn clear(&self) {
        // Infallible; the result only carries the rejection type.
        let _ = self.update(|_, _| Ok(SelectionState::new()));
    }

    /// Hook for the host replacing the visible page; clears only when the
    /// rules opt in.
    pub fn page_replaced(&self) {
        if self.rules.clear_on_page_change {
            self.clear();
        }
    }

    fn update<F>(&self, op: F) -> Result<(), SelectionError>
    where
        F: FnOnce(&SelectionState, &SelectionRules) -> Result<SelectionState, SelectionError>,
    {
        let committed = {
            let mut state = self.lock_state();
            match op(&state, &self.rules) {
                Ok(next) if next == *state => None,
                Ok(next) => {
                    *state = next;
                    Some(state.clone())
                }
                Err(err) => {
                    drop(state);
                    self.notifier.notify(Notice::from_error(&err));
                    return Err(err);
                }
            }
        };
        if let Some(state) = committed {
            self.fire(&state);
        }
        Ok(())
    }

    fn fire(&self, state: &SelectionState) {
        let ids_observers = lock(&self.on_ids).clone();
        for observer in &ids_observers {
            observer(state.ids());
        }
        let records_observers = lock(&self.on_records).clone();
        if !records_observers.is_empty() {
            let records = state.records();
            for observer in &records_observers {
                observer(&records);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SelectionState> {
        lock(&self.state)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
