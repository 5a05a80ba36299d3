//! Cross-page row selection.
//!
//! DESIGN
//! ======
//! [`SelectionState`] is a value: every operation returns a new state or a
//! rejection and never edits the receiver. A rejected mutation never
//! replaces the current state. The id list and record map always hold the
//! same ids.
//!
//! Rows are matched by a caller-chosen key field, not by identity, so a
//! selection survives the rows being re-fetched or the user paging away and
//! back. [`SelectionTracker`] wraps the state with observers and the
//! user-facing rejection message.

pub mod tracker;

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::error::ErrorCode;
pub use tracker::{SelectionTracker, SharedSelection};

/// Row identifier derived from the configured key field.
pub type RowId = String;

pub const DEFAULT_ROW_KEY: &str = "id";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// The mutation would push the selection past its maximum size.
    #[error("{message}")]
    LimitExceeded { max: usize, message: String },
}

impl ErrorCode for SelectionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::LimitExceeded { .. } => "E_SELECTION_LIMIT",
        }
    }

    fn user_facing(&self) -> bool {
        true
    }
}

// =============================================================================
// RULES
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionMode {
    /// Radio semantics: at most one row.
    Single,
    #[default]
    Multi,
}

/// How selections are identified and constrained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionRules {
    pub mode: SelectionMode,
    /// Row field holding the identifier.
    pub row_key: String,
    /// Maximum number of selected rows; `None` is unbounded.
    pub max: Option<usize>,
    /// Message shown when `max` would be exceeded. `{max}` is substituted.
    pub limit_message: Option<String>,
    /// Clear the selection when the host replaces the page.
    pub clear_on_page_change: bool,
}

impl Default for SelectionRules {
    fn default() -> Self {
        Self {
            mode: SelectionMode::Multi,
            row_key: DEFAULT_ROW_KEY.to_owned(),
            max: None,
            limit_message: None,
            clear_on_page_change: false,
        }
    }
}

impl SelectionRules {
    fn check(&self, proposed: &SelectionState) -> Result<(), SelectionError> {
        match self.max {
            Some(max) if proposed.len() > max => Err(SelectionError::LimitExceeded { max, message: self.message(max) }),
            _ => Ok(()),
        }
    }

    fn message(&self, max: usize) -> String {
        match &self.limit_message {
            Some(template) => template.replace("{max}", &max.to_string()),
            None => format!("at most {max} rows can be selected"),
        }
    }
}

/// Extract the identifier of `row` from field `key`.
///
/// Strings are used verbatim and numbers by their JSON text; any other
/// shape (or a missing field) has no identifier.
#[must_use]
pub fn row_id(row: &Value, key: &str) -> Option<RowId> {
    match row.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Selected ids (in selection order) and a snapshot of each selected row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionState {
    ids: Vec<RowId>,
    records: BTreeMap<RowId, Value>,
}

impl SelectionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ids(&self) -> &[RowId] {
        &self.ids
    }

    /// Row snapshots in selection order.
    #[must_use]
    pub fn records(&self) -> Vec<Value> {
        self.ids
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }

    #[must_use]
    pub fn record(&self, id: &str) -> Option<&Value> {
        self.records.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Select or deselect one row.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::LimitExceeded`] if selecting would exceed
    /// `rules.max`. Deselecting never fails.
    pub fn select(&self, row: &Value, selected: bool, rules: &SelectionRules) -> Result<Self, SelectionError> {
        let Some(id) = row_id(row, &rules.row_key) else {
            warn!(row_key = %rules.row_key, "ignoring selection of row without identifier");
            return Ok(self.clone());
        };

        if !selected {
            return Ok(self.without(std::slice::from_ref(&id)));
        }

        let proposed = match rules.mode {
            SelectionMode::Single => Self::new().with(id, row.clone()),
            SelectionMode::Multi => self.clone().with(id, row.clone()),
        };
        rules.check(&proposed)?;
        Ok(proposed)
    }

    /// Select or deselect every row of the current page.
    ///
    /// Selections made on other pages are preserved. Deselecting removes
    /// every row of `page_rows`, including rows picked one by one before
    /// the page was selected. In single mode this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::LimitExceeded`] if the union would exceed
    /// `rules.max`.
    pub fn select_all(&self, selected: bool, page_rows: &[Value], rules: &SelectionRules) -> Result<Self, SelectionError> {
        if rules.mode == SelectionMode::Single {
            return Ok(self.clone());
        }

        let keyed: Vec<(RowId, &Value)> = page_rows
            .iter()
            .filter_map(|row| row_id(row, &rules.row_key).map(|id| (id, row)))
            .collect();

        if !selected {
            let ids: Vec<RowId> = keyed.into_iter().map(|(id, _)| id).collect();
            return Ok(self.without(&ids));
        }

        let proposed = keyed
            .into_iter()
            .fold(self.clone(), |state, (id, row)| state.with(id, row.clone()));
        rules.check(&proposed)?;
        Ok(proposed)
    }

    fn with(mut self, id: RowId, row: Value) -> Self {
        if !self.records.contains_key(&id) {
            self.ids.push(id.clone());
        }
        self.records.insert(id, row);
        self
    }

    fn without(&self, ids: &[RowId]) -> Self {
        Self {
            ids: self.ids.iter().filter(|id| !ids.contains(id)).cloned().collect(),
            records: self
                .records
                .iter()
                .filter(|(id, _)| !ids.contains(id))
                .map(|(id, row)| (id.clone(), row.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
