use serde::{Deserialize, Serialize};
use std::fmt;

/// Last column read by header and bulk row scans (column Z)
pub const MAX_SCAN_COL: u32 = 26;

/// Cell reference (1-indexed, matching A1 notation)
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub const fn new(row: u32, col: u32) -> Self {
        CellRef { row, col }
    }

    /// Create from A1 notation (e.g., "A1" -> (1, 1), "B2" -> (2, 2))
    pub fn from_a1(notation: &str) -> Option<Self> {
        let notation = notation.trim();
        let split = notation
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(notation.len());
        let (col_str, row_str) = notation.split_at(split);

        let col = col_from_label(col_str)?;
        if row_str.is_empty() || !row_str.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let row: u32 = row_str.parse().ok()?;
        if row == 0 {
            return None;
        }

        Some(CellRef { row, col })
    }

    /// Convert to A1 notation (e.g., (1, 1) -> "A1")
    pub fn to_a1(&self) -> String {
        format!("{}{}", col_to_label(self.col), self.row)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

/// Convert a 1-indexed column to its label (1 -> A, 26 -> Z, 27 -> AA, ...).
///
/// Column 0 has no label and yields an empty string.
pub fn col_to_label(col: u32) -> String {
    let mut label = String::new();
    let mut n = col;

    while n > 0 {
        n -= 1;
        label.insert(0, char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }

    label
}

/// Convert a column label (A, B, ..., Z, AA, AB, ...) to its 1-indexed column
pub fn col_from_label(label: &str) -> Option<u32> {
    if label.is_empty() {
        return None;
    }

    let mut col: u32 = 0;
    for c in label.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
    }

    Some(col)
}

/// A sheet-qualified rectangular range such as `Sheet1!A2:Z`.
///
/// Row bounds are optional so that open-ended ranges (`A2:Z`, `A:Z`) can be
/// expressed; a missing `last_row` means "to the end of the sheet".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetRange {
    pub sheet: String,
    pub first_col: u32,
    pub last_col: u32,
    pub first_row: Option<u32>,
    pub last_row: Option<u32>,
}

impl SheetRange {
    /// A single cell
    pub fn cell(sheet: impl Into<String>, row: u32, col: u32) -> Self {
        SheetRange {
            sheet: sheet.into(),
            first_col: col,
            last_col: col,
            first_row: Some(row),
            last_row: Some(row),
        }
    }

    /// Rows `start..=end` across columns A-Z, or `start..` when `end` is `None`
    pub fn rows(sheet: impl Into<String>, start: u32, end: Option<u32>) -> Self {
        SheetRange {
            sheet: sheet.into(),
            first_col: 1,
            last_col: MAX_SCAN_COL,
            first_row: Some(start),
            last_row: end,
        }
    }

    /// The header row, `A1:Z1`
    pub fn header(sheet: impl Into<String>) -> Self {
        Self::rows(sheet, 1, Some(1))
    }

    /// Whole columns A-Z with no row bounds, used as the append target
    pub fn columns(sheet: impl Into<String>) -> Self {
        SheetRange {
            sheet: sheet.into(),
            first_col: 1,
            last_col: MAX_SCAN_COL,
            first_row: None,
            last_row: None,
        }
    }

    /// Check if this range addresses exactly one cell
    pub fn is_single_cell(&self) -> bool {
        self.first_col == self.last_col && self.first_row.is_some() && self.first_row == self.last_row
    }

    /// Render the A1 part without the sheet prefix
    pub fn to_a1(&self) -> String {
        let start = endpoint(self.first_col, self.first_row);
        if self.is_single_cell() {
            start
        } else {
            format!("{}:{}", start, endpoint(self.last_col, self.last_row))
        }
    }
}

fn endpoint(col: u32, row: Option<u32>) -> String {
    match row {
        Some(row) => format!("{}{}", col_to_label(col), row),
        None => col_to_label(col),
    }
}

/// Sheet names need quoting unless they are a plain identifier that cannot be
/// mistaken for a cell reference.
fn needs_quotes(sheet: &str) -> bool {
    let mut chars = sheet.chars();
    let plain = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    // ZZZ is the widest column the service addresses
    !plain || CellRef::from_a1(sheet).is_some_and(|cell| cell.col <= 18_278)
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if needs_quotes(&self.sheet) {
            write!(f, "'{}'!{}", self.sheet.replace('\'', "''"), self.to_a1())
        } else {
            write!(f, "{}!{}", self.sheet, self.to_a1())
        }
    }
}
