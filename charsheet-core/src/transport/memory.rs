//! In-process transport that behaves like the remote service.
//!
//! Documents live in memory as sparse cell maps. Reads trim trailing empty
//! rows and cells the way the Sheets API does, writes skip `None` cells, and
//! every call is logged so tests can assert on what reached the "network".

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    FileQuery, RemoteFile, SheetsTransport, TransportError, ValueInputOption, ValueRenderOption,
};
use crate::codec::{RawGrid, WritePayload};
use crate::range::GridRange;

/// Kind of remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportOp {
    List,
    Copy,
    Read,
    Write,
}

/// A logged call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportCall {
    pub op: TransportOp,
    /// Document id, or the query text for listings.
    pub target: String,
    /// Range in A1 notation, for reads and writes.
    pub range: Option<String>,
    pub token: String,
}

/// Cells keyed by (sheet, row, column offset).
type Cells = BTreeMap<(String, u32, u32), String>;

#[derive(Debug, Clone)]
struct StoredFile {
    file: RemoteFile,
    cells: Cells,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: Vec<StoredFile>,
    next_id: u32,
    calls: Vec<TransportCall>,
    failures: HashMap<TransportOp, TransportError>,
}

impl MemoryState {
    fn file(&self, id: &str) -> Result<&StoredFile, TransportError> {
        self.files
            .iter()
            .find(|f| f.file.id == id)
            .ok_or_else(|| not_found(id))
    }

    fn file_mut(&mut self, id: &str) -> Result<&mut StoredFile, TransportError> {
        self.files
            .iter_mut()
            .find(|f| f.file.id == id)
            .ok_or_else(|| not_found(id))
    }

    fn record(&mut self, call: TransportCall) -> Result<(), TransportError> {
        let op = call.op;
        self.calls.push(call);
        match self.failures.get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// In-memory stand-in for the remote document service.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: Mutex<MemoryState>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document. Documents are listed in insertion order.
    pub fn with_file(mut self, file: RemoteFile) -> Self {
        self.state.get_mut().files.push(StoredFile {
            file,
            cells: Cells::new(),
        });
        self
    }

    /// Fill cells of an existing document starting at column A of `first_row`.
    /// Empty strings leave cells blank.
    pub fn with_grid<R, C>(mut self, id: &str, sheet: &str, first_row: u32, grid: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let state = self.state.get_mut();
        if let Some(stored) = state.files.iter_mut().find(|f| f.file.id == id) {
            for (r, row) in grid.into_iter().enumerate() {
                for (c, value) in row.into_iter().enumerate() {
                    let value: String = value.into();
                    if !value.is_empty() {
                        stored
                            .cells
                            .insert((sheet.to_string(), first_row + r as u32, c as u32), value);
                    }
                }
            }
        }
        self
    }

    /// Make every subsequent call of `op` fail with `error`.
    pub async fn fail(&self, op: TransportOp, error: TransportError) {
        self.state.lock().await.failures.insert(op, error);
    }

    /// Stop injecting failures.
    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    /// All calls made so far, oldest first.
    pub async fn calls(&self) -> Vec<TransportCall> {
        self.state.lock().await.calls.clone()
    }

    /// Number of calls of the given kind made so far.
    pub async fn call_count(&self, op: TransportOp) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.op == op)
            .count()
    }

    /// Current contents of a range, padded to its full size. Not logged.
    pub async fn snapshot(&self, id: &str, range: &GridRange) -> Option<RawGrid> {
        let state = self.state.lock().await;
        let stored = state.file(id).ok()?;
        Some(read_cells(&stored.cells, range, false))
    }

    /// All documents, including ones that no query would match. Not logged.
    pub async fn files(&self) -> Vec<RemoteFile> {
        self.state
            .lock()
            .await
            .files
            .iter()
            .map(|f| f.file.clone())
            .collect()
    }
}

#[async_trait]
impl SheetsTransport for MemoryTransport {
    async fn list_files(
        &self,
        token: &str,
        query: &FileQuery,
    ) -> Result<Vec<RemoteFile>, TransportError> {
        let mut state = self.state.lock().await;
        state.record(TransportCall {
            op: TransportOp::List,
            target: query.to_drive_query(),
            range: None,
            token: token.to_string(),
        })?;

        Ok(state
            .files
            .iter()
            .filter(|f| query.matches(&f.file))
            .take(query.page_size as usize)
            .map(|f| f.file.clone())
            .collect())
    }

    async fn copy_file(
        &self,
        token: &str,
        source_id: &str,
        name: &str,
    ) -> Result<RemoteFile, TransportError> {
        let mut state = self.state.lock().await;
        state.record(TransportCall {
            op: TransportOp::Copy,
            target: source_id.to_string(),
            range: None,
            token: token.to_string(),
        })?;

        let source = state.file(source_id)?.clone();
        state.next_id += 1;
        let file = RemoteFile {
            id: format!("new{}", state.next_id),
            name: name.to_string(),
            mime_type: source.file.mime_type.clone(),
        };
        state.files.push(StoredFile {
            file: file.clone(),
            cells: source.cells,
        });

        Ok(file)
    }

    async fn read_range(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &GridRange,
        _render: ValueRenderOption,
    ) -> Result<RawGrid, TransportError> {
        let mut state = self.state.lock().await;
        state.record(TransportCall {
            op: TransportOp::Read,
            target: spreadsheet_id.to_string(),
            range: Some(range.to_string()),
            token: token.to_string(),
        })?;

        let stored = state.file(spreadsheet_id)?;
        Ok(read_cells(&stored.cells, range, true))
    }

    async fn write_range(
        &self,
        token: &str,
        spreadsheet_id: &str,
        payload: &WritePayload,
        _input: ValueInputOption,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        state.record(TransportCall {
            op: TransportOp::Write,
            target: spreadsheet_id.to_string(),
            range: Some(payload.range.to_string()),
            token: token.to_string(),
        })?;

        let range = &payload.range;
        if payload.values.len() > range.row_count()
            || payload.values.iter().any(|r| r.len() > range.column_count())
        {
            return Err(TransportError::http(
                400,
                format!("Requested writing beyond range {}", range),
            ));
        }

        let stored = state.file_mut(spreadsheet_id)?;
        for (r, row) in payload.values.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let Some(value) = value else { continue };
                let key = (
                    range.sheet.clone(),
                    range.start_row + r as u32,
                    range.start_column.offset() + c as u32,
                );
                if value.is_empty() {
                    stored.cells.remove(&key);
                } else {
                    stored.cells.insert(key, value.clone());
                }
            }
        }

        Ok(())
    }
}

fn not_found(id: &str) -> TransportError {
    TransportError::http(404, format!("File not found: {}.", id))
}

/// Grid of a range. With `trim`, trailing empty cells and rows are dropped.
fn read_cells(cells: &Cells, range: &GridRange, trim: bool) -> RawGrid {
    let mut grid: RawGrid = (range.start_row..=range.end_row)
        .map(|row| {
            let mut values: Vec<String> = (range.start_column.offset()
                ..=range.end_column.offset())
                .map(|col| {
                    cells
                        .get(&(range.sheet.clone(), row, col))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect();
            if trim {
                while values.last().is_some_and(|v| v.is_empty()) {
                    values.pop();
                }
            }
            values
        })
        .collect();

    if trim {
        while grid.last().is_some_and(|r| r.is_empty()) {
            grid.pop();
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SPREADSHEET_MIME_TYPE;

    fn query(label: &str) -> FileQuery {
        FileQuery {
            name_contains: label.to_string(),
            mime_type: SPREADSHEET_MIME_TYPE.to_string(),
            page_size: 100,
        }
    }

    fn transport() -> MemoryTransport {
        MemoryTransport::new()
            .with_file(RemoteFile::spreadsheet("s1", "Sheet One"))
            .with_grid(
                "s1",
                "Main",
                1,
                vec![vec!["Name", "Geralt", "=B1"], vec!["", "", ""], vec!["Level", "5"]],
            )
    }

    #[tokio::test]
    async fn test_read_trims_like_remote() {
        let transport = transport();
        let range = GridRange::parse("Main!A1:C10").unwrap();
        let grid = transport
            .read_range("tok", "s1", &range, ValueRenderOption::Formula)
            .await
            .unwrap();

        assert_eq!(
            grid,
            vec![
                vec!["Name".to_string(), "Geralt".to_string(), "=B1".to_string()],
                vec![],
                vec!["Level".to_string(), "5".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn test_write_skips_none_and_clears_empty() {
        let transport = transport();
        let payload = WritePayload {
            range: GridRange::parse("Main!B1:B3").unwrap(),
            values: vec![vec![Some(String::new())], vec![None], vec![Some("6".to_string())]],
        };
        transport
            .write_range("tok", "s1", &payload, ValueInputOption::Raw)
            .await
            .unwrap();

        let snapshot = transport
            .snapshot("s1", &GridRange::parse("Main!A1:C3").unwrap())
            .await
            .unwrap();
        assert_eq!(snapshot[0], vec!["Name", "", "=B1"]);
        assert_eq!(snapshot[1], vec!["", "", ""]);
        assert_eq!(snapshot[2], vec!["Level", "6", ""]);
    }

    #[tokio::test]
    async fn test_write_beyond_range_rejected() {
        let transport = transport();
        let payload = WritePayload {
            range: GridRange::parse("Main!B1:B1").unwrap(),
            values: vec![vec![Some("a".to_string()), Some("b".to_string())]],
        };
        let err = transport
            .write_range("tok", "s1", &payload, ValueInputOption::Raw)
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(400));
    }

    #[tokio::test]
    async fn test_copy_assigns_sequential_ids() {
        let transport = transport();
        let first = transport.copy_file("tok", "s1", "Copy A").await.unwrap();
        let second = transport.copy_file("tok", "s1", "Copy B").await.unwrap();
        assert_eq!(first.id, "new1");
        assert_eq!(second.id, "new2");
        assert_eq!(first.mime_type.as_deref(), Some(SPREADSHEET_MIME_TYPE));

        let missing = transport.copy_file("tok", "nope", "X").await.unwrap_err();
        assert_eq!(missing.status, Some(404));
    }

    #[tokio::test]
    async fn test_list_applies_query_and_page_size() {
        let transport = MemoryTransport::new()
            .with_file(RemoteFile::spreadsheet("a", "Party - Geralt"))
            .with_file(RemoteFile::spreadsheet("b", "Budget"))
            .with_file(RemoteFile::spreadsheet("c", "Party - Ciri"));

        let files = transport.list_files("tok", &query("Party")).await.unwrap();
        assert_eq!(
            files.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "c"]
        );

        let mut small = query("Party");
        small.page_size = 1;
        assert_eq!(transport.list_files("tok", &small).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures_are_logged() {
        let transport = transport();
        transport
            .fail(TransportOp::Read, TransportError::http(503, "Backend Error"))
            .await;

        let range = GridRange::parse("Main!A1:C10").unwrap();
        let err = transport
            .read_range("tok", "s1", &range, ValueRenderOption::Formatted)
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(503));
        assert_eq!(transport.call_count(TransportOp::Read).await, 1);

        transport.clear_failures().await;
        assert!(transport
            .read_range("tok", "s1", &range, ValueRenderOption::Formatted)
            .await
            .is_ok());
    }
}
