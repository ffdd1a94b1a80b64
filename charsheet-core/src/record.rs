//! Structured records decoded from a sheet.

use serde::{Deserialize, Serialize};

use crate::error::FieldError;
use crate::schema::Role;

/// Reference to one remote spreadsheet in the collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordHandle {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

impl RecordHandle {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

impl std::fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}

/// A cell value tagged with the role of its column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Label(String),
    Editable(String),
    Formula(String),
}

impl FieldValue {
    pub(crate) fn for_role(role: Role, value: String) -> Self {
        match role {
            Role::Label => FieldValue::Label(value),
            Role::Editable => FieldValue::Editable(value),
            Role::Formula => FieldValue::Formula(value),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            FieldValue::Label(_) => Role::Label,
            FieldValue::Editable(_) => Role::Editable,
            FieldValue::Formula(_) => Role::Formula,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Label(v) | FieldValue::Editable(v) | FieldValue::Formula(v) => v,
        }
    }
}

/// One labelled row of the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordEntry {
    label: String,
    row: usize,
    values: Vec<(String, FieldValue)>,
}

impl RecordEntry {
    pub(crate) fn new(label: String, row: usize, values: Vec<(String, FieldValue)>) -> Self {
        Self { label, row, values }
    }

    /// Trimmed label text; the entry's lookup key.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Offset of the source row within the read range.
    pub fn row(&self) -> usize {
        self.row
    }

    /// All values keyed by schema field key, in schema order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// First editable value of the row.
    pub fn editable(&self) -> Option<&str> {
        self.first_of(Role::Editable)
    }

    /// First formula value of the row.
    pub fn formula(&self) -> Option<&str> {
        self.first_of(Role::Formula)
    }

    /// Set an editable value by field key.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), FieldError> {
        let slot = self
            .values
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or_else(|| FieldError::UnknownField(key.to_string()))?;

        match slot {
            FieldValue::Editable(current) => {
                *current = value.into();
                Ok(())
            }
            _ => Err(FieldError::NotEditable(key.to_string())),
        }
    }

    /// Set the row's first editable value.
    pub fn set_editable(&mut self, value: impl Into<String>) -> Result<(), FieldError> {
        match self
            .values
            .iter_mut()
            .find(|(_, v)| matches!(v, FieldValue::Editable(_)))
        {
            Some((_, slot)) => {
                *slot = FieldValue::Editable(value.into());
                Ok(())
            }
            None => Err(FieldError::NotEditable(self.label.clone())),
        }
    }

    fn first_of(&self, role: Role) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, v)| v.role() == role)
            .map(|(_, v)| v.as_str())
    }
}

/// A character sheet: labelled rows in the order they appear in the sheet.
///
/// Entries come only from decoding. They can be edited or removed but never
/// added or reordered, so encoding always writes each value back to the row
/// it was read from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    entries: Vec<RecordEntry>,
}

impl Record {
    pub(crate) fn from_entries(entries: Vec<RecordEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RecordEntry] {
        &self.entries
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label())
    }

    /// First entry with the given label. Labels are matched exactly, then
    /// case-insensitively.
    pub fn get(&self, label: &str) -> Option<&RecordEntry> {
        self.position(label).map(|i| &self.entries[i])
    }

    pub fn get_mut(&mut self, label: &str) -> Option<&mut RecordEntry> {
        self.position(label).map(move |i| &mut self.entries[i])
    }

    /// Set an editable value on the row with the given label.
    pub fn set(&mut self, label: &str, key: &str, value: impl Into<String>) -> Result<(), FieldError> {
        self.get_mut(label)
            .ok_or_else(|| FieldError::UnknownLabel(label.to_string()))?
            .set(key, value)
    }

    /// Drop a row from the record. Its cells are left untouched on save.
    pub fn remove(&mut self, label: &str) -> Option<RecordEntry> {
        self.position(label).map(|i| self.entries.remove(i))
    }

    /// Label → first editable value, in row order.
    pub fn editable_map(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .filter_map(|e| e.editable().map(|v| (e.label(), v)))
            .collect()
    }

    fn position(&self, label: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.label == label)
            .or_else(|| {
                self.entries
                    .iter()
                    .position(|e| e.label.eq_ignore_ascii_case(label))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str, row: usize, value: &str, formula: &str) -> RecordEntry {
        RecordEntry::new(
            label.to_string(),
            row,
            vec![
                ("stat".to_string(), FieldValue::Label(label.to_string())),
                ("value".to_string(), FieldValue::Editable(value.to_string())),
                ("total".to_string(), FieldValue::Formula(formula.to_string())),
            ],
        )
    }

    fn record() -> Record {
        Record::from_entries(vec![
            entry("Name", 0, "Geralt", "=B1"),
            entry("Level", 1, "5", "=B2*2"),
        ])
    }

    #[test]
    fn test_lookup() {
        let record = record();
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("Name").unwrap().editable(), Some("Geralt"));
        assert_eq!(record.get("level").unwrap().formula(), Some("=B2*2"));
        assert!(record.get("Profession").is_none());
        assert_eq!(record.labels().collect::<Vec<_>>(), vec!["Name", "Level"]);
    }

    #[test]
    fn test_set_editable() {
        let mut record = record();
        record.set("Name", "value", "Yennefer").unwrap();
        assert_eq!(record.get("Name").unwrap().editable(), Some("Yennefer"));

        record
            .get_mut("Level")
            .unwrap()
            .set_editable("6")
            .unwrap();
        assert_eq!(
            record.editable_map(),
            vec![("Name", "Yennefer"), ("Level", "6")]
        );
    }

    #[test]
    fn test_set_rejects_non_editable() {
        let mut record = record();
        assert_eq!(
            record.set("Name", "total", "=1"),
            Err(FieldError::NotEditable("total".to_string()))
        );
        assert_eq!(
            record.set("Name", "stat", "Alias"),
            Err(FieldError::NotEditable("stat".to_string()))
        );
        assert_eq!(
            record.set("Name", "nope", "x"),
            Err(FieldError::UnknownField("nope".to_string()))
        );
        assert_eq!(
            record.set("Age", "value", "90"),
            Err(FieldError::UnknownLabel("Age".to_string()))
        );
        assert_eq!(record.get("Name").unwrap().formula(), Some("=B1"));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut record = Record::from_entries(vec![
            entry("Name", 0, "Geralt", ""),
            entry("Race", 1, "Human", ""),
            entry("Level", 2, "5", ""),
        ]);
        let removed = record.remove("Race").unwrap();
        assert_eq!(removed.row(), 1);
        assert_eq!(record.labels().collect::<Vec<_>>(), vec!["Name", "Level"]);
    }

    #[test]
    fn test_handle_serializes_name() {
        let handle = RecordHandle::new("abc", "Witcher Character Sheet - Ciri");
        let json = serde_json::to_value(&handle).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["name"], "Witcher Character Sheet - Ciri");
    }
}
