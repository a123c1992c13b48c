use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One row keyed by column name, in header order.
pub type Record = IndexMap<String, CellValue>;

/// Value of a single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text used when this cell is a header column name.
    pub fn to_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Bool(v) => write!(f, "{v}"),
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::String(v) => write!(f, "{v}"),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value.into())
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl<T> From<Option<T>> for CellValue
where
    T: Into<CellValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => CellValue::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_sheet_row() {
        let row: Vec<CellValue> = serde_json::from_str(r#"[1, 2.5, "x", true, null]"#).unwrap();
        assert_eq!(
            vec![
                CellValue::from(1),
                CellValue::Number(serde_json::Number::from_f64(2.5).unwrap()),
                CellValue::from("x"),
                CellValue::from(true),
                CellValue::Empty,
            ],
            row
        );
    }

    #[test]
    fn serialize_keeps_integers() {
        let row = vec![CellValue::from(1700000000000), CellValue::Empty];
        assert_eq!("[1700000000000,null]", serde_json::to_string(&row).unwrap());
    }

    #[test]
    fn header_keys() {
        assert_eq!("title", CellValue::from("title").to_key());
        assert_eq!("2024", CellValue::from(2024).to_key());
        assert_eq!("", CellValue::Empty.to_key());
    }
}
