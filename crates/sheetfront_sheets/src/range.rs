use std::fmt;

/// Cells of a tab addressed by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpan {
    /// Every populated row in columns A through Z.
    Columns,
    /// First row, columns A through Z.
    HeaderRow,
    /// Top left cell, used as the anchor for writes.
    Origin,
}

impl RangeSpan {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeSpan::Columns => "A:Z",
            RangeSpan::HeaderRow => "A1:Z1",
            RangeSpan::Origin => "A1",
        }
    }
}

/// Number of columns covered by the A:Z ranges.
pub const MAX_COLUMNS: usize = 26;

/// A range in A1 notation, e.g. `Sheet1!A1:Z1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: String,
    pub span: RangeSpan,
}

impl A1Range {
    pub fn new(sheet: impl Into<String>, span: RangeSpan) -> Self {
        A1Range {
            sheet: sheet.into(),
            span,
        }
    }

    pub fn columns(sheet: impl Into<String>) -> Self {
        Self::new(sheet, RangeSpan::Columns)
    }

    pub fn header_row(sheet: impl Into<String>) -> Self {
        Self::new(sheet, RangeSpan::HeaderRow)
    }

    pub fn origin(sheet: impl Into<String>) -> Self {
        Self::new(sheet, RangeSpan::Origin)
    }
}

/// Whether a tab name would parse as a cell reference on its own, in either A1
/// (`AB12`) or R1C1 (`R1C1`, `R2`, `C`) notation.
fn looks_like_cell_ref(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    let bytes = upper.as_bytes();

    let letters = bytes.iter().take_while(|b| b.is_ascii_alphabetic()).count();
    let digits = bytes.len() - letters;
    if (1..=3).contains(&letters)
        && digits > 0
        && bytes[letters..].iter().all(|b| b.is_ascii_digit())
    {
        return true;
    }

    let mut rest = bytes;
    for axis in [b'R', b'C'] {
        if let Some((_, tail)) = rest.split_first().filter(|(first, _)| **first == axis) {
            let n = tail.iter().take_while(|b| b.is_ascii_digit()).count();
            rest = &tail[n..];
        }
    }
    rest.is_empty()
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plain = !self.sheet.is_empty()
            && self
                .sheet
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !self.sheet.starts_with(|c: char| c.is_ascii_digit())
            && !looks_like_cell_ref(&self.sheet);

        if plain {
            write!(f, "{}!{}", self.sheet, self.span.as_str())
        } else {
            write!(
                f,
                "'{}'!{}",
                self.sheet.replace('\'', "''"),
                self.span.as_str()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_sheet_names() {
        assert_eq!("Sheet1!A:Z", A1Range::columns("Sheet1").to_string());
        assert_eq!("Sheet1!A1:Z1", A1Range::header_row("Sheet1").to_string());
        assert_eq!("my_tab!A1", A1Range::origin("my_tab").to_string());
    }

    #[test]
    fn quoted_sheet_names() {
        assert_eq!("'My Tab'!A:Z", A1Range::columns("My Tab").to_string());
        assert_eq!("'Bob''s'!A1", A1Range::origin("Bob's").to_string());
        assert_eq!("'Señal'!A:Z", A1Range::columns("Señal").to_string());
    }

    #[test]
    fn cell_like_names_quoted() {
        assert_eq!("'A1'!A:Z", A1Range::columns("A1").to_string());
        assert_eq!("'ab12'!A1", A1Range::origin("ab12").to_string());
        assert_eq!("'R1C1'!A1", A1Range::origin("R1C1").to_string());
        assert_eq!("'R2'!A:Z", A1Range::columns("R2").to_string());
        assert_eq!("'C'!A:Z", A1Range::columns("C").to_string());
        assert_eq!("'2024'!A:Z", A1Range::columns("2024").to_string());

        assert_eq!("Sheet1!A:Z", A1Range::columns("Sheet1").to_string());
        assert_eq!("Rc_1!A:Z", A1Range::columns("Rc_1").to_string());
        assert_eq!("Notes!A:Z", A1Range::columns("Notes").to_string());
    }
}
