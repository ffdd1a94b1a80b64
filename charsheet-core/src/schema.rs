//! Static column layout of a character sheet.
//!
//! Each row of the sheet is one field of the record. The schema says which
//! column holds the row's label, which columns the user may edit, and which
//! columns are computed by the spreadsheet itself.
//!
//! ```text
//!      A (label)   B (editable)   C (formula)
//!   1  Name        Geralt         =B1
//!   2  Level       5              =B2*2
//! ```
//!
//! Every column position in the crate is looked up through the schema by
//! field key. The schema is validated once and is immutable afterwards.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::range::{ColumnAddress, GridRange};

/// How a column is treated on read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Human-entered row label; identifies the field. Never written.
    Label,
    /// User-editable value. The only role ever written back.
    Editable,
    /// Spreadsheet-computed output. Never written.
    Formula,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Label => write!(f, "label"),
            Role::Editable => write!(f, "editable"),
            Role::Formula => write!(f, "formula"),
        }
    }
}

/// One column of the layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub key: String,
    pub role: Role,
    pub column: Option<ColumnAddress>,
}

impl FieldDefinition {
    pub fn new(key: impl Into<String>, role: Role, column: ColumnAddress) -> Self {
        Self {
            key: key.into(),
            role,
            column: Some(column),
        }
    }

    /// A field declared without a column. Rejected by schema validation.
    pub fn unplaced(key: impl Into<String>, role: Role) -> Self {
        Self {
            key: key.into(),
            role,
            column: None,
        }
    }
}

/// Validated column layout plus the row bounds of the read range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    sheet: String,
    first_row: u32,
    last_row: u32,
    fields: Vec<FieldDefinition>,
}

impl ColumnSchema {
    /// Validate and build a schema.
    ///
    /// `first_row` and `last_row` are 1-based and inclusive.
    pub fn new(
        sheet: impl Into<String>,
        first_row: u32,
        last_row: u32,
        fields: Vec<FieldDefinition>,
    ) -> Result<Self, SchemaError> {
        let mut seen_keys = HashSet::new();
        for field in &fields {
            if !seen_keys.insert(field.key.as_str()) {
                return Err(SchemaError::DuplicateKey(field.key.clone()));
            }
        }

        for field in &fields {
            if field.column.is_none() {
                return Err(SchemaError::MissingColumn(field.key.clone()));
            }
        }

        match fields.iter().filter(|f| f.role == Role::Label).count() {
            0 => return Err(SchemaError::MissingRole(Role::Label)),
            1 => {}
            _ => return Err(SchemaError::DuplicateRole(Role::Label)),
        }
        if !fields.iter().any(|f| f.role == Role::Editable) {
            return Err(SchemaError::MissingRole(Role::Editable));
        }

        let mut placed: Vec<(ColumnAddress, &str)> = fields
            .iter()
            .filter_map(|f| f.column.map(|c| (c, f.key.as_str())))
            .collect();
        placed.sort();
        for pair in placed.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(SchemaError::ColumnConflict {
                    first: pair[0].1.to_string(),
                    second: pair[1].1.to_string(),
                    column: pair[0].0.letters(),
                });
            }
        }

        let mut editable: Vec<ColumnAddress> = fields
            .iter()
            .filter(|f| f.role == Role::Editable)
            .filter_map(|f| f.column)
            .collect();
        editable.sort();
        for pair in editable.windows(2) {
            if pair[1].offset() != pair[0].offset() + 1 {
                return Err(SchemaError::NonContiguousEditable(pair[1].letters()));
            }
        }

        if first_row == 0 || last_row < first_row {
            return Err(SchemaError::InvalidRows {
                first: first_row,
                last: last_row,
            });
        }

        Ok(Self {
            sheet: sheet.into(),
            first_row,
            last_row,
            fields,
        })
    }

    /// Start building a schema for the given sheet tab.
    pub fn builder(sheet: impl Into<String>) -> ColumnSchemaBuilder {
        ColumnSchemaBuilder::new(sheet)
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn first_row(&self) -> u32 {
        self.first_row
    }

    pub fn last_row(&self) -> u32 {
        self.last_row
    }

    /// Number of sheet rows covered by the read range.
    pub fn row_count(&self) -> usize {
        (self.last_row - self.first_row + 1) as usize
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Look up a field by key.
    pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Fields with the given role, in declaration order.
    pub fn fields_by_role(&self, role: Role) -> impl Iterator<Item = &FieldDefinition> + '_ {
        self.fields.iter().filter(move |f| f.role == role)
    }

    /// Column of the field with the given key.
    pub fn address_for(&self, key: &str) -> Option<ColumnAddress> {
        self.field(key).and_then(|f| f.column)
    }

    /// The single label field.
    pub fn label_field(&self) -> &FieldDefinition {
        self.fields
            .iter()
            .find(|f| f.role == Role::Label)
            .unwrap_or(&self.fields[0])
    }

    /// Editable fields ordered by column, which is the order of cells in a
    /// written row.
    pub fn editable_fields(&self) -> Vec<&FieldDefinition> {
        let mut editable: Vec<&FieldDefinition> = self.fields_by_role(Role::Editable).collect();
        editable.sort_by_key(|f| f.column);
        editable
    }

    /// The range read on load: every schema column, every schema row.
    pub fn read_range(&self) -> GridRange {
        let (start, end) = self.column_span(self.fields.iter());
        GridRange::new(&self.sheet, start, self.first_row, end, self.last_row)
    }

    /// First and last editable column.
    pub fn editable_span(&self) -> (ColumnAddress, ColumnAddress) {
        self.column_span(self.fields_by_role(Role::Editable))
    }

    /// Position of a column within a row of the read range.
    pub(crate) fn grid_offset(&self, column: ColumnAddress) -> usize {
        let (start, _) = self.column_span(self.fields.iter());
        (column.offset() - start.offset()) as usize
    }

    fn column_span<'a>(
        &self,
        fields: impl Iterator<Item = &'a FieldDefinition>,
    ) -> (ColumnAddress, ColumnAddress) {
        let columns: Vec<ColumnAddress> = fields.filter_map(|f| f.column).collect();
        let start = columns.iter().min().copied().unwrap_or(ColumnAddress::from_offset(0));
        let end = columns.iter().max().copied().unwrap_or(start);
        (start, end)
    }
}

/// Builder for [`ColumnSchema`] taking column letters.
///
/// Letter parse errors are reported by [`ColumnSchemaBuilder::build`].
#[derive(Debug, Clone)]
pub struct ColumnSchemaBuilder {
    sheet: String,
    first_row: u32,
    last_row: u32,
    fields: Vec<FieldDefinition>,
    error: Option<SchemaError>,
}

impl ColumnSchemaBuilder {
    fn new(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            first_row: 1,
            last_row: 100,
            fields: Vec::new(),
            error: None,
        }
    }

    /// Row bounds of the read range (1-based, inclusive). Defaults to 1..=100.
    pub fn rows(mut self, first_row: u32, last_row: u32) -> Self {
        self.first_row = first_row;
        self.last_row = last_row;
        self
    }

    pub fn label(self, key: &str, letters: &str) -> Self {
        self.column(key, Role::Label, letters)
    }

    pub fn editable(self, key: &str, letters: &str) -> Self {
        self.column(key, Role::Editable, letters)
    }

    pub fn formula(self, key: &str, letters: &str) -> Self {
        self.column(key, Role::Formula, letters)
    }

    /// Add a field with column letters.
    pub fn column(mut self, key: &str, role: Role, letters: &str) -> Self {
        match ColumnAddress::parse(letters) {
            Ok(column) => self.fields.push(FieldDefinition::new(key, role, column)),
            Err(_) => {
                self.error.get_or_insert(SchemaError::InvalidColumn {
                    key: key.to_string(),
                    letters: letters.to_string(),
                });
            }
        }
        self
    }

    /// Add a prepared field definition.
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Result<ColumnSchema, SchemaError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        ColumnSchema::new(self.sheet, self.first_row, self.last_row, self.fields)
    }
}
