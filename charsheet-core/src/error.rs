//! Error types for the record sync engine.
//!
//! Schema errors are raised once at startup. Auth and remote errors are per
//! call and are never retried internally. Decoding never fails.

use thiserror::Error;

use crate::credential::Operation;
use crate::schema::Role;
use crate::session::SessionState;
use crate::transport::TransportError;

/// Credential problems detected before any remote call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("No access token available. Sign in first.")]
    MissingCredential,

    #[error("Access token has expired. Sign in again.")]
    Expired,

    #[error("Access token lacks the scope required to {0}")]
    InsufficientScope(Operation),
}

/// A remote call that was attempted and failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Failed to create record from template: {0}")]
    CreateFailed(TransportError),

    #[error("Failed to read record: {0}")]
    ReadFailed(TransportError),

    #[error("Failed to write record: {0}")]
    WriteFailed(TransportError),

    #[error("Failed to list records: {0}")]
    ListFailed(TransportError),
}

/// Invalid column layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Duplicate field key: {0}")]
    DuplicateKey(String),

    #[error("Field '{0}' has no column")]
    MissingColumn(String),

    #[error("Schema has no {0} field")]
    MissingRole(Role),

    #[error("Schema has more than one {0} field")]
    DuplicateRole(Role),

    #[error("Fields '{first}' and '{second}' share column {column}")]
    ColumnConflict {
        first: String,
        second: String,
        column: String,
    },

    #[error("Editable columns must be adjacent, found a gap before column {0}")]
    NonContiguousEditable(String),

    #[error("Invalid column for field '{key}': {letters}")]
    InvalidColumn { key: String, letters: String },

    #[error("Invalid row bounds: {first}..={last}")]
    InvalidRows { first: u32, last: u32 },
}

/// A record that cannot be turned into a write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Record has no fields to write")]
    EmptyRecord,
}

/// An in-memory edit that the record does not allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("No field labelled '{0}'")]
    UnknownLabel(String),

    #[error("Unknown field key: {0}")]
    UnknownField(String),

    #[error("Field '{0}' is not editable")]
    NotEditable(String),
}

/// A session action attempted from the wrong state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },
}

/// Any failure surfaced by the record store or a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Session(#[from] SessionError),
}
