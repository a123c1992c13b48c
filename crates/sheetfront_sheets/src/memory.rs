use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sheetfront_error::{FrontError, Result};

use crate::api::{SheetsApi, ValueRenderOption};
use crate::range::{A1Range, MAX_COLUMNS, RangeSpan};
use crate::value::CellValue;

#[derive(Debug, Default)]
struct MemoryState {
    tabs: HashMap<String, Vec<Vec<CellValue>>>,
    appends: usize,
}

/// Spreadsheet held in memory.
///
/// Follows the range behavior of the remote API closely enough to stand in
/// for it. Clones share the same tabs.
#[derive(Debug, Clone, Default)]
pub struct MemorySheets {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tab(self, name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        self.add_tab(name, rows);
        self
    }

    /// Add a tab, replacing any existing tab with the same name.
    pub fn add_tab(&self, name: impl Into<String>, rows: Vec<Vec<CellValue>>) {
        self.state.lock().tabs.insert(name.into(), rows);
    }

    /// Get a copy of all rows in a tab.
    pub fn tab_rows(&self, name: &str) -> Option<Vec<Vec<CellValue>>> {
        self.state.lock().tabs.get(name).cloned()
    }

    /// Number of successful append calls.
    pub fn append_count(&self) -> usize {
        self.state.lock().appends
    }
}

fn unknown_tab(range: &A1Range) -> FrontError {
    FrontError::new(format!("Unable to parse range: {range}"))
}

fn render(value: &CellValue, render: ValueRenderOption) -> CellValue {
    match (render, value) {
        (ValueRenderOption::Formatted, CellValue::Number(_) | CellValue::Bool(_)) => {
            CellValue::String(value.to_string().to_uppercase())
        }
        _ => value.clone(),
    }
}

/// Drop trailing empty cells and rows the same way the remote API does.
fn trim(mut rows: Vec<Vec<CellValue>>) -> Vec<Vec<CellValue>> {
    for row in rows.iter_mut() {
        while row.last().is_some_and(|c| c.is_empty()) {
            row.pop();
        }
    }
    while rows.last().is_some_and(|r| r.is_empty()) {
        rows.pop();
    }
    rows
}

#[async_trait]
impl SheetsApi for MemorySheets {
    async fn get_values(
        &self,
        range: &A1Range,
        render_opt: ValueRenderOption,
    ) -> Result<Vec<Vec<CellValue>>> {
        let state = self.state.lock();
        let tab = state.tabs.get(&range.sheet).ok_or_else(|| unknown_tab(range))?;

        let take_rows = match range.span {
            RangeSpan::Columns => tab.len(),
            RangeSpan::HeaderRow | RangeSpan::Origin => 1,
        };
        let take_cols = match range.span {
            RangeSpan::Columns | RangeSpan::HeaderRow => MAX_COLUMNS,
            RangeSpan::Origin => 1,
        };

        let rows = tab
            .iter()
            .take(take_rows)
            .map(|row| {
                row.iter()
                    .take(take_cols)
                    .map(|v| render(v, render_opt))
                    .collect()
            })
            .collect();

        Ok(trim(rows))
    }

    async fn update_values(&self, range: &A1Range, rows: Vec<Vec<CellValue>>) -> Result<()> {
        let mut state = self.state.lock();
        let tab = state
            .tabs
            .get_mut(&range.sheet)
            .ok_or_else(|| unknown_tab(range))?;

        for (row_idx, row) in rows.into_iter().enumerate() {
            if tab.len() <= row_idx {
                tab.resize(row_idx + 1, Vec::new());
            }
            let existing = &mut tab[row_idx];
            for (col_idx, value) in row.into_iter().enumerate() {
                if existing.len() <= col_idx {
                    existing.resize(col_idx + 1, CellValue::Empty);
                }
                existing[col_idx] = value;
            }
        }

        Ok(())
    }

    async fn append_values(&self, range: &A1Range, rows: Vec<Vec<CellValue>>) -> Result<()> {
        let mut state = self.state.lock();
        let tab = state
            .tabs
            .get_mut(&range.sheet)
            .ok_or_else(|| unknown_tab(range))?;

        // New rows go after the last row that has any value.
        let populated = tab
            .iter()
            .rposition(|row| row.iter().any(|c| !c.is_empty()))
            .map(|idx| idx + 1)
            .unwrap_or(0);
        tab.truncate(populated);
        tab.extend(rows);
        state.appends += 1;

        Ok(())
    }
}
