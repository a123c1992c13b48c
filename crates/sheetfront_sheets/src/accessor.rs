use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use sheetfront_error::Result;
use tracing::debug;

use crate::api::{SheetsApi, ValueRenderOption};
use crate::range::A1Range;
use crate::value::{CellValue, Record};

/// Header written to tabs that don't have one yet.
pub const DEFAULT_HEADER: [&str; 5] = ["id", "category", "title", "content", "date"];

/// Reads and appends rows on a spreadsheet, treating each tab as a table
/// whose first row holds the column names.
///
/// Nothing is cached, every call reads the header from the sheet.
#[derive(Debug, Clone)]
pub struct SheetAccessor {
    api: Arc<dyn SheetsApi>,
}

impl SheetAccessor {
    pub fn new(api: Arc<dyn SheetsApi>) -> Self {
        SheetAccessor { api }
    }

    /// Read up to `limit` records from a tab, in sheet order.
    pub async fn read_rows(&self, sheet: &str, limit: usize) -> Result<Vec<Record>> {
        let rows = self
            .api
            .get_values(&A1Range::columns(sheet), ValueRenderOption::Unformatted)
            .await?;

        Ok(records_from_rows(rows, limit))
    }

    /// Append a row built from `fields`, ordered by the tab's header.
    ///
    /// Writes the default header first if the tab has none. Calling this
    /// twice appends two rows.
    pub async fn append_row(&self, sheet: &str, fields: &Record) -> Result<()> {
        self.append_row_at(sheet, fields, Utc::now()).await
    }

    /// Same as `append_row`, using `now` for generated `id` and `date`
    /// values.
    pub async fn append_row_at(
        &self,
        sheet: &str,
        fields: &Record,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let header = self
            .api
            .get_values(&A1Range::header_row(sheet), ValueRenderOption::Formatted)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let columns: Vec<String> = if header.is_empty() {
            DEFAULT_HEADER.iter().map(|c| c.to_string()).collect()
        } else {
            header.iter().map(CellValue::to_key).collect()
        };

        let row = build_row(&columns, fields, now);

        if header.is_empty() {
            debug!(%sheet, "writing default header");
            let header_row = columns.iter().map(|c| CellValue::from(c.as_str())).collect();
            self.api
                .update_values(&A1Range::origin(sheet), vec![header_row])
                .await?;
        }

        debug!(%sheet, columns = columns.len(), "appending row");
        self.api
            .append_values(&A1Range::columns(sheet), vec![row])
            .await
    }
}

/// Turn rows into records using the first row as the header.
pub fn records_from_rows(rows: Vec<Vec<CellValue>>, limit: usize) -> Vec<Record> {
    let mut rows = rows.into_iter();
    let header: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(CellValue::to_key).collect(),
        None => return Vec::new(),
    };

    rows.take(limit)
        .map(|row| {
            let mut cells = row.into_iter();
            header
                .iter()
                .map(|name| (name.clone(), cells.next().unwrap_or(CellValue::Empty)))
                .collect()
        })
        .collect()
}

/// Build a row in column order. `id` and `date` are always generated.
pub fn build_row(columns: &[String], fields: &Record, now: DateTime<Utc>) -> Vec<CellValue> {
    columns
        .iter()
        .map(|col| match col.as_str() {
            "id" => CellValue::from(now.timestamp_millis()),
            "date" => CellValue::from(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            other => fields
                .get(other)
                .cloned()
                .unwrap_or_else(|| CellValue::from("")),
        })
        .collect()
}
