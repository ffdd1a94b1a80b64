//! Charsheet Core Library
//!
//! Spreadsheet-backed character records: column layouts, the grid codec,
//! and the store that lists, creates, loads and saves records remotely.

pub mod codec;
pub mod credential;
pub mod error;
pub mod range;
pub mod record;
pub mod schema;
pub mod session;
pub mod sync;
pub mod transport;

pub use codec::{decode, encode, RawGrid, WritePayload};
pub use credential::{scopes, Credential, CredentialProvider, Operation, SignedOut};
pub use error::{
    AuthError, EncodeError, FieldError, RemoteError, SchemaError, SessionError, SyncError,
};
pub use range::{ColumnAddress, GridRange, RangeParseError};
pub use record::{FieldValue, Record, RecordEntry, RecordHandle};
pub use schema::{ColumnSchema, ColumnSchemaBuilder, FieldDefinition, Role};
pub use session::{RecordSession, SessionState};
pub use sync::{
    CollectionIndex, RecordStore, StoreConfig, DEFAULT_COLLECTION_LABEL, DEFAULT_PAGE_SIZE,
    DEFAULT_TEMPLATE_ID,
};
pub use transport::{
    FileQuery, GoogleTransport, MemoryTransport, RemoteFile, SheetsTransport, TransportError,
    ValueInputOption, ValueRenderOption,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
