//! Read and append rows on Google Sheets tabs.
//!
//! The first row of a tab is treated as its header, every following row is
//! turned into a [`Record`] keyed by the header's column names.

pub mod accessor;
pub mod api;
pub mod client;
pub mod memory;
pub mod range;
pub mod value;

pub use accessor::SheetAccessor;
pub use api::{SheetsApi, ValueRenderOption};
pub use value::{CellValue, Record};
