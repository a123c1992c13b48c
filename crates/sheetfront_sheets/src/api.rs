use std::fmt::Debug;

use async_trait::async_trait;
use sheetfront_error::Result;

use crate::range::A1Range;
use crate::value::CellValue;

/// How values should be rendered when read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueRenderOption {
    /// Values formatted the way they're displayed in the sheet.
    #[default]
    Formatted,
    /// Raw values, numbers stay numbers.
    Unformatted,
}

impl ValueRenderOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueRenderOption::Formatted => "FORMATTED_VALUE",
            ValueRenderOption::Unformatted => "UNFORMATTED_VALUE",
        }
    }
}

/// Values operations of a spreadsheet.
///
/// All writes use raw input, values are stored as given without being parsed
/// as formulas or dates.
#[async_trait]
pub trait SheetsApi: Debug + Send + Sync {
    /// Read the values of a range as rows.
    ///
    /// Trailing empty rows and cells are omitted, an empty range returns no
    /// rows.
    async fn get_values(
        &self,
        range: &A1Range,
        render: ValueRenderOption,
    ) -> Result<Vec<Vec<CellValue>>>;

    /// Overwrite the cells starting at `range` with `rows`.
    async fn update_values(&self, range: &A1Range, rows: Vec<Vec<CellValue>>) -> Result<()>;

    /// Insert `rows` after the last row of the table found in `range`.
    async fn append_values(&self, range: &A1Range, rows: Vec<Vec<CellValue>>) -> Result<()>;
}
