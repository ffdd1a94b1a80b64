//! Remote document service boundary.
//!
//! The store talks to the remote only through [`SheetsTransport`]. Two
//! implementations ship with the crate:
//!
//! - [`GoogleTransport`]: Drive v3 and Sheets v4 over HTTPS
//! - [`MemoryTransport`]: an in-process emulation for tests and offline use
//!
//! Every method receives the bearer token for that call and keeps no
//! credential state between calls.

mod google;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::codec::{RawGrid, WritePayload};
use crate::range::GridRange;

pub use google::{GoogleTransport, DRIVE_API_URL, SHEETS_API_URL};
pub use memory::{MemoryTransport, TransportCall, TransportOp};

/// MIME type of a native spreadsheet document.
pub const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// A failed remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    pub message: String,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// A failure with no response (connection, DNS, decoding).
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

/// A document as reported by the discovery endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl RemoteFile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mime_type: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: Some(mime_type.to_string()),
        }
    }

    /// A native spreadsheet document.
    pub fn spreadsheet(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, SPREADSHEET_MIME_TYPE)
    }
}

/// Server-side filter for document discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    pub name_contains: String,
    pub mime_type: String,
    pub page_size: u32,
}

impl FileQuery {
    /// Whether a document satisfies the filter. The name check ignores
    /// case, as Drive's `name contains` does. A document without a reported
    /// type does not match.
    pub fn matches(&self, file: &RemoteFile) -> bool {
        file.name
            .to_lowercase()
            .contains(&self.name_contains.to_lowercase())
            && file.mime_type.as_deref() == Some(self.mime_type.as_str())
    }

    /// Drive query language rendering of the filter.
    pub fn to_drive_query(&self) -> String {
        format!(
            "name contains '{}' and mimeType='{}' and trashed=false",
            escape_query_literal(&self.name_contains),
            escape_query_literal(&self.mime_type)
        )
    }
}

fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// How written values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueInputOption {
    /// Stored exactly as given.
    Raw,
    /// Parsed as if typed into the UI (numbers, dates, formulas).
    #[default]
    UserEntered,
}

impl ValueInputOption {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            ValueInputOption::Raw => "RAW",
            ValueInputOption::UserEntered => "USER_ENTERED",
        }
    }
}

/// How read values are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueRenderOption {
    /// Display text, as seen in the UI.
    #[default]
    Formatted,
    /// Computed values without formatting.
    Unformatted,
    /// Formula source text for formula cells.
    Formula,
}

impl ValueRenderOption {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            ValueRenderOption::Formatted => "FORMATTED_VALUE",
            ValueRenderOption::Unformatted => "UNFORMATTED_VALUE",
            ValueRenderOption::Formula => "FORMULA",
        }
    }
}

/// Remote calls used by the record store.
#[async_trait]
pub trait SheetsTransport: Send + Sync {
    /// One page of documents matching the query, in server order.
    async fn list_files(
        &self,
        token: &str,
        query: &FileQuery,
    ) -> Result<Vec<RemoteFile>, TransportError>;

    /// Duplicate a document under a new name.
    async fn copy_file(
        &self,
        token: &str,
        source_id: &str,
        name: &str,
    ) -> Result<RemoteFile, TransportError>;

    /// Cell values of a range. Trailing empty rows and cells may be omitted.
    async fn read_range(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &GridRange,
        render: ValueRenderOption,
    ) -> Result<RawGrid, TransportError>;

    /// Overwrite a range in one call. `None` cells are left unchanged.
    async fn write_range(
        &self,
        token: &str,
        spreadsheet_id: &str,
        payload: &WritePayload,
        input: ValueInputOption,
    ) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: SheetsTransport + ?Sized> SheetsTransport for std::sync::Arc<T> {
    async fn list_files(
        &self,
        token: &str,
        query: &FileQuery,
    ) -> Result<Vec<RemoteFile>, TransportError> {
        (**self).list_files(token, query).await
    }

    async fn copy_file(
        &self,
        token: &str,
        source_id: &str,
        name: &str,
    ) -> Result<RemoteFile, TransportError> {
        (**self).copy_file(token, source_id, name).await
    }

    async fn read_range(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &GridRange,
        render: ValueRenderOption,
    ) -> Result<RawGrid, TransportError> {
        (**self).read_range(token, spreadsheet_id, range, render).await
    }

    async fn write_range(
        &self,
        token: &str,
        spreadsheet_id: &str,
        payload: &WritePayload,
        input: ValueInputOption,
    ) -> Result<(), TransportError> {
        (**self).write_range(token, spreadsheet_id, payload, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> FileQuery {
        FileQuery {
            name_contains: "Witcher Character Sheet".to_string(),
            mime_type: SPREADSHEET_MIME_TYPE.to_string(),
            page_size: 100,
        }
    }

    #[test]
    fn test_query_matches() {
        let q = query();
        assert!(q.matches(&RemoteFile::spreadsheet("1", "Witcher Character Sheet - Ciri")));
        assert!(!q.matches(&RemoteFile::spreadsheet("2", "Shopping list")));
        assert!(q.matches(&RemoteFile::spreadsheet("4", "witcher character sheet - Eskel")));
        assert!(q.matches(&RemoteFile::spreadsheet("5", "WITCHER CHARACTER SHEET - Lambert")));
        assert!(!q.matches(&RemoteFile::new(
            "3",
            "Witcher Character Sheet notes",
            "application/vnd.google-apps.document"
        )));
    }

    #[test]
    fn test_drive_query() {
        assert_eq!(
            query().to_drive_query(),
            "name contains 'Witcher Character Sheet' and \
             mimeType='application/vnd.google-apps.spreadsheet' and trashed=false"
        );

        let mut q = query();
        q.name_contains = "Vesemir's Sheets".to_string();
        assert!(q.to_drive_query().starts_with("name contains 'Vesemir\\'s Sheets'"));
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(
            TransportError::http(404, "File not found").to_string(),
            "HTTP 404: File not found"
        );
        assert_eq!(
            TransportError::network("connection refused").to_string(),
            "connection refused"
        );
    }

    #[test]
    fn test_option_api_strings() {
        assert_eq!(ValueInputOption::default().as_api_str(), "USER_ENTERED");
        assert_eq!(ValueInputOption::Raw.as_api_str(), "RAW");
        assert_eq!(ValueRenderOption::Formula.as_api_str(), "FORMULA");
    }
}
