//! Conversion between raw cell grids and records.
//!
//! `decode` is total: any grid produces a record. `encode` produces a write
//! that covers only the schema's editable columns, so label and formula
//! cells can never be overwritten by a save.

use serde::Serialize;

use crate::error::EncodeError;
use crate::range::GridRange;
use crate::record::{FieldValue, Record, RecordEntry};
use crate::schema::{ColumnSchema, Role};

/// Untyped cell values, row-major, relative to the top-left of the read
/// range. Rows may be shorter than the range; missing cells are empty.
pub type RawGrid = Vec<Vec<String>>;

/// A single range write.
///
/// `None` cells are sent as `null`, which leaves the remote cell as it is.
/// They fill rows inside the written span that are not part of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WritePayload {
    pub range: GridRange,
    pub values: Vec<Vec<Option<String>>>,
}

impl WritePayload {
    /// Number of cells that will be overwritten.
    pub fn written_cells(&self) -> usize {
        self.values.iter().flatten().filter(|c| c.is_some()).count()
    }
}

/// Build a record from a grid read over `schema.read_range()`.
///
/// Rows whose label cell is blank are padding and are skipped.
pub fn decode(grid: &RawGrid, schema: &ColumnSchema) -> Record {
    let label_column = schema
        .label_field()
        .column
        .map(|c| schema.grid_offset(c))
        .unwrap_or(0);

    let columns: Vec<(&str, Role, usize)> = schema
        .fields()
        .iter()
        .filter_map(|f| {
            f.column
                .map(|c| (f.key.as_str(), f.role, schema.grid_offset(c)))
        })
        .collect();

    let entries = grid
        .iter()
        .take(schema.row_count())
        .enumerate()
        .filter_map(|(row, cells)| {
            let label = cell(cells, label_column).trim();
            if label.is_empty() {
                return None;
            }

            let values = columns
                .iter()
                .map(|&(key, role, offset)| {
                    let value = cell(cells, offset).to_string();
                    (key.to_string(), FieldValue::for_role(role, value))
                })
                .collect();

            Some(RecordEntry::new(label.to_string(), row, values))
        })
        .collect();

    Record::from_entries(entries)
}

/// Build the single write that saves a record's editable values.
///
/// The written rows span from the first to the last entry's source row.
/// Every entry writes all of its editable cells, including empty ones.
pub fn encode(record: &Record, schema: &ColumnSchema) -> Result<WritePayload, EncodeError> {
    let rows = record.entries().iter().map(|e| e.row());
    let (first, last) = match (rows.clone().min(), rows.max()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(EncodeError::EmptyRecord),
    };

    let editable = schema.editable_fields();
    let mut values: Vec<Vec<Option<String>>> = vec![vec![None; editable.len()]; last - first + 1];

    for entry in record.entries() {
        values[entry.row() - first] = editable
            .iter()
            .map(|field| match entry.get(&field.key) {
                Some(FieldValue::Editable(v)) => Some(v.clone()),
                _ => None,
            })
            .collect();
    }

    let (start_column, end_column) = schema.editable_span();
    let range = GridRange::new(
        schema.sheet(),
        start_column,
        schema.first_row() + first as u32,
        end_column,
        schema.first_row() + last as u32,
    );

    Ok(WritePayload { range, values })
}

fn cell(cells: &[String], offset: usize) -> &str {
    cells.get(offset).map(String::as_str).unwrap_or("")
}
