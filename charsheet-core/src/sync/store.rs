//! The record store: list, create, load and save over a remote transport.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::index::{CollectionIndex, DEFAULT_PAGE_SIZE};
use crate::codec::{self, WritePayload};
use crate::credential::{CredentialProvider, Operation};
use crate::error::{AuthError, RemoteError, SyncError};
use crate::record::{Record, RecordHandle};
use crate::schema::ColumnSchema;
use crate::transport::{SheetsTransport, ValueInputOption, ValueRenderOption};

/// Collection label used by the character sheet template.
pub const DEFAULT_COLLECTION_LABEL: &str = "Witcher Character Sheet";
/// Template document copied for new records.
pub const DEFAULT_TEMPLATE_ID: &str = "1mUHQy9NsT1FFWfer78xGyPePQI21gAgXqos_fjAQTAQ";

/// Store settings that are not part of the column layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Substring that names of collection documents contain.
    pub collection_label: String,
    /// Document duplicated by `create_record`.
    pub template_id: String,
    /// Maximum number of documents returned by one listing.
    pub page_size: u32,
    pub value_input: ValueInputOption,
    pub value_render: ValueRenderOption,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection_label: DEFAULT_COLLECTION_LABEL.to_string(),
            template_id: DEFAULT_TEMPLATE_ID.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            value_input: ValueInputOption::default(),
            value_render: ValueRenderOption::default(),
        }
    }
}

/// Spreadsheet-backed record store.
///
/// Holds no per-record state: every load reads the remote, every save
/// writes it, and nothing is retried. Operations on different handles may
/// run concurrently. Saves to the same handle must not overlap; use
/// [`RecordSession`](crate::RecordSession) to have the borrow checker
/// enforce that.
#[derive(Debug)]
pub struct RecordStore<T> {
    transport: T,
    schema: ColumnSchema,
    index: CollectionIndex,
    config: StoreConfig,
}

impl<T: SheetsTransport> RecordStore<T> {
    pub fn new(transport: T, schema: ColumnSchema, config: StoreConfig) -> Self {
        let index = CollectionIndex::new(config.collection_label.clone(), config.page_size);
        Self {
            transport,
            schema,
            index,
            config,
        }
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn index(&self) -> &CollectionIndex {
        &self.index
    }

    /// Documents in the collection. An empty collection is not an error.
    pub async fn list_records(
        &self,
        creds: &dyn CredentialProvider,
    ) -> Result<Vec<RecordHandle>, SyncError> {
        let token = authorize(creds, Operation::List)?;

        let handles = self
            .index
            .enumerate(&self.transport, &token)
            .await
            .map_err(RemoteError::ListFailed)?;

        tracing::debug!("Listed {} record(s)", handles.len());
        Ok(handles)
    }

    /// Create a record by copying the template document.
    ///
    /// The new document is named `"{collection_label} - {display_name}"` so
    /// that later listings find it.
    pub async fn create_record(
        &self,
        creds: &dyn CredentialProvider,
        display_name: &str,
    ) -> Result<RecordHandle, SyncError> {
        let token = authorize(creds, Operation::Create)?;
        let name = self.document_name(display_name);

        let file = self
            .transport
            .copy_file(&token, &self.config.template_id, &name)
            .await
            .map_err(RemoteError::CreateFailed)?;

        tracing::info!("Created record '{}' ({})", file.name, file.id);
        Ok(RecordHandle::new(file.id, file.name))
    }

    /// Read and decode a record. Always reads the remote.
    pub async fn load_record(
        &self,
        creds: &dyn CredentialProvider,
        handle: &RecordHandle,
    ) -> Result<Record, SyncError> {
        let token = authorize(creds, Operation::Read)?;
        let range = self.schema.read_range();

        let grid = self
            .transport
            .read_range(&token, &handle.id, &range, self.config.value_render)
            .await
            .map_err(RemoteError::ReadFailed)?;

        let record = codec::decode(&grid, &self.schema);
        tracing::debug!(
            "Loaded {} field(s) from {} rows of {} ({})",
            record.len(),
            grid.len(),
            handle.id,
            range
        );
        Ok(record)
    }

    /// Write a record's editable values in a single range write.
    ///
    /// Either the whole editable range is written or an error is returned.
    pub async fn save_record(
        &self,
        creds: &dyn CredentialProvider,
        handle: &RecordHandle,
        record: &Record,
    ) -> Result<(), SyncError> {
        let token = authorize(creds, Operation::Write)?;
        let payload: WritePayload = codec::encode(record, &self.schema)?;

        self.transport
            .write_range(&token, &handle.id, &payload, self.config.value_input)
            .await
            .map_err(RemoteError::WriteFailed)?;

        tracing::info!(
            "Saved {} cell(s) to {} ({})",
            payload.written_cells(),
            handle.display_name,
            payload.range
        );
        Ok(())
    }

    fn document_name(&self, display_name: &str) -> String {
        format!("{} - {}", self.config.collection_label, display_name.trim())
    }
}

/// Token for one call, or the reason no call may be made.
fn authorize(creds: &dyn CredentialProvider, operation: Operation) -> Result<String, AuthError> {
    let credential = creds
        .credential()
        .filter(|c| !c.token().trim().is_empty())
        .ok_or(AuthError::MissingCredential)?;

    if credential.is_expired_at(Utc::now()) {
        return Err(AuthError::Expired);
    }
    if !credential.permits(operation) {
        return Err(AuthError::InsufficientScope(operation));
    }

    Ok(credential.token().to_string())
}
