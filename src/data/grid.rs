//! Positional access to a fetched sheet
//!
//! A [`Grid`] is the rectangular (possibly ragged) set of cell strings parsed
//! from a sheet export. Lookups use spreadsheet coordinates: a single column
//! letter and a 1-based row number. Lookups never fail; anything outside the
//! data, or blank, reads as the empty string.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing a column letter or cell reference
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellRefError {
    /// Not a single letter A-Z
    #[error("Invalid column '{0}': expected a single letter A-Z")]
    InvalidColumn(String),

    /// Row number missing, zero or not a number
    #[error("Invalid row '{0}': expected a number starting at 1")]
    InvalidRow(String),
}

/// A spreadsheet column, `A` through `Z`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column(u8);

impl Column {
    /// Maps a letter to a column, case-insensitively
    ///
    /// Returns `None` for anything other than A-Z. Multi-letter columns (AA,
    /// AB, ...) are not supported.
    pub fn from_letter(letter: char) -> Option<Column> {
        let upper = letter.to_ascii_uppercase();
        upper
            .is_ascii_uppercase()
            .then(|| Column(upper as u8 - b'A'))
    }

    /// Zero-based column index (`A` = 0)
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// The column letter in uppercase
    pub fn letter(self) -> char {
        char::from(b'A' + self.0)
    }
}

impl FromStr for Column {
    type Err = CellRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) => {
                Column::from_letter(letter).ok_or_else(|| CellRefError::InvalidColumn(s.to_string()))
            }
            _ => Err(CellRefError::InvalidColumn(s.to_string())),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A single cell coordinate such as `G13`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub column: Column,
    /// 1-based row number
    pub row: u32,
}

impl CellRef {
    pub fn new(column: Column, row: u32) -> Self {
        Self { column, row }
    }
}

impl FromStr for CellRef {
    type Err = CellRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(trimmed.len());
        let (letters, digits) = trimmed.split_at(split);

        let column: Column = letters.parse()?;
        let row = digits
            .parse::<u32>()
            .ok()
            .filter(|row| *row >= 1)
            .ok_or_else(|| CellRefError::InvalidRow(s.to_string()))?;

        Ok(CellRef { column, row })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

/// Row-major cell values from a sheet export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Creates a grid from rows of cell values
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Parses CSV text into a grid
    ///
    /// Every record becomes a row, including the first: row 1 of the grid is
    /// row 1 of the sheet. Records may have differing lengths.
    pub fn from_csv(text: &str) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { rows })
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the trimmed value at `column`, 1-based `row`
    ///
    /// Out-of-range coordinates (including row 0) yield `""`.
    pub fn cell_value(&self, column: Column, row: u32) -> &str {
        let Some(row_index) = row.checked_sub(1) else {
            return "";
        };

        usize::try_from(row_index)
            .ok()
            .and_then(|index| self.rows.get(index))
            .and_then(|cells| cells.get(column.index()))
            .map_or("", |value| value.trim())
    }

    /// Returns the trimmed value at a cell reference
    pub fn cell(&self, cell: CellRef) -> &str {
        self.cell_value(cell.column, cell.row)
    }

    /// Returns the non-empty values in `column` for rows `row_start..=row_end`
    ///
    /// Values come back in ascending row order with blanks removed, so the
    /// position in the result is not the row offset. Rows past the end of the
    /// grid are never visited.
    pub fn cell_range(&self, column: Column, row_start: u32, row_end: u32) -> Vec<&str> {
        let last_row = u32::try_from(self.rows.len()).unwrap_or(u32::MAX);
        (row_start..=row_end.min(last_row))
            .map(|row| self.cell_value(column, row))
            .filter(|value| !value.is_empty())
            .collect()
    }
}
