//! Column descriptors and the visible-column projection.
//!
//! DESIGN
//! ======
//! The declared column set is immutable for the lifetime of a coordinator.
//! What the host renders is derived on demand from that set plus the stored
//! [`PreferenceRecord`]: hidden keys are skipped (unless the column is
//! fixed) and stored widths override declared ones.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::prefs::{PreferenceRecord, clamp_column_width};

/// One declared list column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    /// Unique key within a list; also the row field it displays by default.
    pub key: String,
    pub title: String,
    /// Host-side renderer name; opaque to the coordinator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    /// Fixed columns cannot be hidden (e.g. an "actions" column).
    #[serde(default)]
    pub fixed: bool,
}

impl ColumnDescriptor {
    #[must_use]
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self { key: key.into(), title: title.into(), renderer: None, width: None, tooltip: None, fixed: false }
    }

    #[must_use]
    pub fn width(mut self, px: u32) -> Self {
        self.width = Some(px);
        self
    }

    #[must_use]
    pub fn tooltip(mut self, text: impl Into<String>) -> Self {
        self.tooltip = Some(text.into());
        self
    }

    #[must_use]
    pub fn renderer(mut self, name: impl Into<String>) -> Self {
        self.renderer = Some(name.into());
        self
    }

    #[must_use]
    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }
}

/// Reject a declaration with repeated keys.
///
/// # Errors
///
/// Returns [`ConfigError::DuplicateColumn`] naming the first repeated key.
pub fn validate_columns(columns: &[ColumnDescriptor]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for column in columns {
        if !seen.insert(column.key.as_str()) {
            return Err(ConfigError::DuplicateColumn(column.key.clone()));
        }
    }
    Ok(())
}

/// Columns to render, in declaration order, with stored widths applied.
#[must_use]
pub fn visible_columns(columns: &[ColumnDescriptor], prefs: Option<&PreferenceRecord>) -> Vec<ColumnDescriptor> {
    let Some(prefs) = prefs else {
        return columns.to_vec();
    };
    columns
        .iter()
        .filter(|column| column.fixed || !prefs.hidden_columns.contains(&column.key))
        .map(|column| {
            let mut column = column.clone();
            if let Some(&px) = prefs.column_widths.get(&column.key) {
                column.width = Some(clamp_column_width(i64::from(px)));
            }
            column
        })
        .collect()
}

#[cfg(test)]
#[path = "columns_test.rs"]
mod tests;
