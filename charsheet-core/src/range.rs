//! A1-notation column addresses and rectangular cell ranges.
//!
//! Columns are stored as 0-based offsets (`A` = 0, `Z` = 25, `AA` = 26) and
//! rows as 1-based sheet row numbers, matching how ranges are written in
//! spreadsheet APIs: `'Character Sheet'!B1:C40`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest column label accepted (`ZZZ` is column 18278).
const MAX_COLUMN_LETTERS: usize = 3;

/// Errors that can occur when parsing A1 notation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeParseError {
    #[error("Invalid column letters: '{0}'")]
    InvalidColumn(String),

    #[error("Invalid cell reference: '{0}'")]
    InvalidCell(String),

    #[error("Range is missing a sheet name: '{0}'")]
    MissingSheet(String),

    #[error("Range corners are out of order: '{0}'")]
    Inverted(String),
}

/// A single column, independent of any row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnAddress(u32);

impl ColumnAddress {
    /// Create a column address from a 0-based offset.
    pub fn from_offset(offset: u32) -> Self {
        Self(offset)
    }

    /// The 0-based column offset.
    pub fn offset(&self) -> u32 {
        self.0
    }

    /// Parse column letters such as `B` or `AA` (case-insensitive).
    pub fn parse(letters: &str) -> Result<Self, RangeParseError> {
        let trimmed = letters.trim();
        if trimmed.is_empty()
            || trimmed.len() > MAX_COLUMN_LETTERS
            || !trimmed.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(RangeParseError::InvalidColumn(letters.to_string()));
        }

        let number = trimmed
            .chars()
            .map(|c| c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)
            .fold(0u32, |acc, digit| acc * 26 + digit);

        Ok(Self(number - 1))
    }

    /// Column letters for this address.
    pub fn letters(&self) -> String {
        let mut n = u64::from(self.0) + 1;
        let mut letters = Vec::new();
        while n > 0 {
            n -= 1;
            letters.push((b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        letters.iter().rev().collect()
    }
}

impl fmt::Display for ColumnAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letters())
    }
}

impl FromStr for ColumnAddress {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ColumnAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.letters())
    }
}

impl<'de> Deserialize<'de> for ColumnAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A rectangular block of cells on one sheet tab. Both corners are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRange {
    pub sheet: String,
    pub start_column: ColumnAddress,
    pub start_row: u32,
    pub end_column: ColumnAddress,
    pub end_row: u32,
}

impl GridRange {
    /// Build a range from two corners, in any order.
    pub fn new(
        sheet: impl Into<String>,
        start_column: ColumnAddress,
        start_row: u32,
        end_column: ColumnAddress,
        end_row: u32,
    ) -> Self {
        Self {
            sheet: sheet.into(),
            start_column: start_column.min(end_column),
            start_row: start_row.min(end_row),
            end_column: start_column.max(end_column),
            end_row: start_row.max(end_row),
        }
    }

    /// Number of rows covered.
    pub fn row_count(&self) -> usize {
        self.end_row.saturating_sub(self.start_row) as usize + 1
    }

    /// Number of columns covered.
    pub fn column_count(&self) -> usize {
        self.end_column.offset().saturating_sub(self.start_column.offset()) as usize + 1
    }

    /// Parse `Sheet!A1:C20`, `'My Tab'!B2` and similar.
    pub fn parse(input: &str) -> Result<Self, RangeParseError> {
        let (sheet_part, cells) = input
            .rsplit_once('!')
            .ok_or_else(|| RangeParseError::MissingSheet(input.to_string()))?;

        let sheet = unquote_sheet_name(sheet_part);
        if sheet.is_empty() {
            return Err(RangeParseError::MissingSheet(input.to_string()));
        }

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (parse_cell(start)?, parse_cell(end)?),
            None => {
                let cell = parse_cell(cells)?;
                (cell, cell)
            }
        };

        if end.0 < start.0 || end.1 < start.1 {
            return Err(RangeParseError::Inverted(input.to_string()));
        }

        Ok(Self::new(sheet, start.0, start.1, end.0, end.1))
    }
}

impl fmt::Display for GridRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}!{}{}:{}{}",
            quote_sheet_name(&self.sheet),
            self.start_column,
            self.start_row,
            self.end_column,
            self.end_row
        )
    }
}

impl FromStr for GridRange {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for GridRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GridRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Quote a sheet name for A1 notation unless it is a plain identifier.
pub fn quote_sheet_name(sheet: &str) -> String {
    let plain = !sheet.is_empty()
        && !sheet.starts_with(|c: char| c.is_ascii_digit())
        && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if plain {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

fn unquote_sheet_name(sheet: &str) -> String {
    match sheet
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
    {
        Some(inner) => inner.replace("''", "'"),
        None => sheet.to_string(),
    }
}

fn parse_cell(cell: &str) -> Result<(ColumnAddress, u32), RangeParseError> {
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| RangeParseError::InvalidCell(cell.to_string()))?;
    let (letters, digits) = cell.split_at(split);

    let column =
        ColumnAddress::parse(letters).map_err(|_| RangeParseError::InvalidCell(cell.to_string()))?;
    let row: u32 = digits
        .parse()
        .map_err(|_| RangeParseError::InvalidCell(cell.to_string()))?;
    if row == 0 {
        return Err(RangeParseError::InvalidCell(cell.to_string()));
    }

    Ok((column, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(ColumnAddress::from_offset(0).letters(), "A");
        assert_eq!(ColumnAddress::from_offset(11).letters(), "L");
        assert_eq!(ColumnAddress::from_offset(25).letters(), "Z");
        assert_eq!(ColumnAddress::from_offset(26).letters(), "AA");
        assert_eq!(ColumnAddress::from_offset(701).letters(), "ZZ");
        assert_eq!(ColumnAddress::from_offset(702).letters(), "AAA");
        assert_eq!(ColumnAddress::from_offset(u32::MAX).letters(), "MWLQKWV");
    }

    #[test]
    fn test_parse_column() {
        assert_eq!(ColumnAddress::parse("A").unwrap().offset(), 0);
        assert_eq!(ColumnAddress::parse("l").unwrap().offset(), 11);
        assert_eq!(ColumnAddress::parse("AA").unwrap().offset(), 26);
        assert_eq!(ColumnAddress::parse("zz").unwrap().offset(), 701);
    }

    #[test]
    fn test_parse_column_rejects_garbage() {
        assert!(ColumnAddress::parse("").is_err());
        assert!(ColumnAddress::parse("A1").is_err());
        assert!(ColumnAddress::parse("ABCD").is_err());
        assert!(ColumnAddress::parse("-").is_err());
    }

    #[test]
    fn test_range_display() {
        let range = GridRange::new(
            "Sheet1",
            ColumnAddress::from_offset(0),
            1,
            ColumnAddress::from_offset(2),
            40,
        );
        assert_eq!(range.to_string(), "Sheet1!A1:C40");

        let range = GridRange::new(
            "Character Sheet",
            ColumnAddress::from_offset(1),
            3,
            ColumnAddress::from_offset(1),
            9,
        );
        assert_eq!(range.to_string(), "'Character Sheet'!B3:B9");
    }

    #[test]
    fn test_new_orders_corners() {
        let range = GridRange::new(
            "Stats",
            ColumnAddress::from_offset(2),
            9,
            ColumnAddress::from_offset(0),
            3,
        );
        assert_eq!(range.to_string(), "Stats!A3:C9");
        assert_eq!(range.row_count(), 7);
        assert_eq!(range.column_count(), 3);

        let wide = GridRange::new(
            "Stats",
            ColumnAddress::from_offset(0),
            1,
            ColumnAddress::from_offset(u32::MAX),
            u32::MAX,
        );
        assert_eq!(wide.row_count(), u32::MAX as usize);
        assert_eq!(wide.column_count(), u32::MAX as usize + 1);
    }

    #[test]
    fn test_quote_sheet_name() {
        assert_eq!(quote_sheet_name("Stats"), "Stats");
        assert_eq!(quote_sheet_name("My Tab"), "'My Tab'");
        assert_eq!(quote_sheet_name("Geralt's"), "'Geralt''s'");
        assert_eq!(quote_sheet_name("2024"), "'2024'");
    }

    #[test]
    fn test_parse_range() {
        let range = GridRange::parse("'Geralt''s Sheet'!B2:L30").unwrap();
        assert_eq!(range.sheet, "Geralt's Sheet");
        assert_eq!(range.start_column.letters(), "B");
        assert_eq!(range.start_row, 2);
        assert_eq!(range.end_column.letters(), "L");
        assert_eq!(range.end_row, 30);
        assert_eq!(range.row_count(), 29);
        assert_eq!(range.column_count(), 11);

        let single = GridRange::parse("Stats!C7").unwrap();
        assert_eq!(single.row_count(), 1);
        assert_eq!(single.column_count(), 1);
    }

    #[test]
    fn test_parse_range_errors() {
        assert!(matches!(
            GridRange::parse("A1:B2"),
            Err(RangeParseError::MissingSheet(_))
        ));
        assert!(matches!(
            GridRange::parse("Stats!A0"),
            Err(RangeParseError::InvalidCell(_))
        ));
        assert!(matches!(
            GridRange::parse("Stats!C5:A1"),
            Err(RangeParseError::Inverted(_))
        ));
    }

    #[test]
    fn test_column_serde() {
        let json = serde_json::to_string(&ColumnAddress::from_offset(27)).unwrap();
        assert_eq!(json, "\"AB\"");
        let back: ColumnAddress = serde_json::from_str("\"ab\"").unwrap();
        assert_eq!(back.offset(), 27);
    }
}
