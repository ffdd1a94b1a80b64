//! Per-record load/edit/save cycle.
//!
//! # Session States
//!
//! 1. **Unloaded** - nothing read yet
//! 2. **Loading** / **Saving** - a remote call is in flight
//! 3. **Loaded** - the record matches what was last read or written
//! 4. **Editing** - the record has local changes
//! 5. **LoadError** / **SaveError** - the last call failed; retry by calling
//!    `load` or `save` again
//!
//! A session borrows itself mutably for every call, so two saves of the same
//! record can never overlap through one session.

use std::fmt;

use crate::credential::CredentialProvider;
use crate::error::{SessionError, SyncError};
use crate::record::{Record, RecordHandle};
use crate::sync::RecordStore;
use crate::transport::SheetsTransport;

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unloaded,
    Loading,
    Loaded,
    Editing,
    Saving,
    LoadError,
    SaveError,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Unloaded => "unloaded",
            SessionState::Loading => "loading",
            SessionState::Loaded => "loaded",
            SessionState::Editing => "editing",
            SessionState::Saving => "saving",
            SessionState::LoadError => "load failed",
            SessionState::SaveError => "save failed",
        };
        write!(f, "{}", s)
    }
}

/// One caller's view of one record.
#[derive(Debug)]
pub struct RecordSession<'s, T> {
    store: &'s RecordStore<T>,
    handle: RecordHandle,
    state: SessionState,
    record: Option<Record>,
    last_error: Option<SyncError>,
}

impl<'s, T: SheetsTransport> RecordSession<'s, T> {
    pub fn new(store: &'s RecordStore<T>, handle: RecordHandle) -> Self {
        Self {
            store,
            handle,
            state: SessionState::Unloaded,
            record: None,
            last_error: None,
        }
    }

    pub fn handle(&self) -> &RecordHandle {
        &self.handle
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The record as last loaded and edited, if any load succeeded.
    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    /// Error of the last failed load or save.
    pub fn last_error(&self) -> Option<&SyncError> {
        self.last_error.as_ref()
    }

    /// Whether there are local changes that have not been saved.
    pub fn is_dirty(&self) -> bool {
        matches!(self.state, SessionState::Editing | SessionState::SaveError)
    }

    /// Read the record from the remote, discarding local changes.
    ///
    /// Allowed from any state. On failure the previously loaded record, if
    /// any, is kept until a retry succeeds.
    pub async fn load(&mut self, creds: &dyn CredentialProvider) -> Result<&Record, SyncError> {
        self.state = SessionState::Loading;

        match self.store.load_record(creds, &self.handle).await {
            Ok(record) => {
                self.state = SessionState::Loaded;
                self.last_error = None;
                Ok(&*self.record.insert(record))
            }
            Err(e) => {
                tracing::debug!("Load of {} failed: {}", self.handle, e);
                self.state = SessionState::LoadError;
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Loaded record contents.
    pub fn current(&self) -> Result<&Record, SessionError> {
        self.record.as_ref().ok_or(SessionError::InvalidState {
            action: "read record",
            state: self.state,
        })
    }

    /// Mutable access to the record. Marks the session as edited.
    pub fn edit(&mut self) -> Result<&mut Record, SessionError> {
        self.check_editable("edit")?;
        self.mark_edited();
        self.record.as_mut().ok_or(SessionError::InvalidState {
            action: "edit",
            state: self.state,
        })
    }

    /// Set one editable value. A rejected edit leaves the state unchanged.
    pub fn set(
        &mut self,
        label: &str,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), SyncError> {
        self.check_editable("edit")?;
        if let Some(record) = self.record.as_mut() {
            record.set(label, key, value)?;
        }
        self.mark_edited();
        Ok(())
    }

    fn check_editable(&self, action: &'static str) -> Result<(), SessionError> {
        match (self.state, &self.record) {
            (
                SessionState::Loaded | SessionState::Editing | SessionState::SaveError,
                Some(_),
            ) => Ok(()),
            (state, _) => Err(SessionError::InvalidState { action, state }),
        }
    }

    fn mark_edited(&mut self) {
        if self.state == SessionState::Loaded {
            self.state = SessionState::Editing;
        }
    }

    /// Write local changes back.
    ///
    /// Allowed only with unsaved edits. On failure the edits are kept and the
    /// session can retry.
    pub async fn save(&mut self, creds: &dyn CredentialProvider) -> Result<(), SyncError> {
        let record = match (self.state, self.record.as_ref()) {
            (SessionState::Editing | SessionState::SaveError, Some(record)) => record,
            (state, _) => {
                return Err(SessionError::InvalidState {
                    action: "save",
                    state,
                }
                .into())
            }
        };

        self.state = SessionState::Saving;
        match self.store.save_record(creds, &self.handle, record).await {
            Ok(()) => {
                self.state = SessionState::Loaded;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                tracing::debug!("Save of {} failed: {}", self.handle, e);
                self.state = SessionState::SaveError;
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{Credential, SignedOut};
    use crate::error::{AuthError, FieldError, RemoteError};
    use crate::schema::ColumnSchema;
    use crate::sync::StoreConfig;
    use crate::transport::{MemoryTransport, RemoteFile, TransportError, TransportOp};

    fn store() -> RecordStore<MemoryTransport> {
        let schema = ColumnSchema::builder("Sheet1")
            .rows(1, 10)
            .label("stat", "A")
            .editable("value", "B")
            .build()
            .unwrap();
        let transport = MemoryTransport::new()
            .with_file(RemoteFile::spreadsheet("ciri", "Witcher Character Sheet - Ciri"))
            .with_grid(
                "ciri",
                "Sheet1",
                1,
                vec![vec!["Name", "Ciri"], vec!["Level", "3"]],
            );
        RecordStore::new(transport, schema, StoreConfig::default())
    }

    fn handle() -> RecordHandle {
        RecordHandle::new("ciri", "Witcher Character Sheet - Ciri")
    }

    fn creds() -> Credential {
        Credential::new("tok")
    }

    #[tokio::test]
    async fn test_edit_and_save_require_a_load() {
        let store = store();
        let mut session = RecordSession::new(&store, handle());
        assert_eq!(session.state(), SessionState::Unloaded);
        assert!(session.record().is_none());

        assert_eq!(
            session.set("Level", "value", "4").unwrap_err(),
            SyncError::Session(SessionError::InvalidState {
                action: "edit",
                state: SessionState::Unloaded,
            })
        );
        assert!(matches!(
            session.save(&creds()).await,
            Err(SyncError::Session(_))
        ));
        assert!(session.current().is_err());
        assert_eq!(store.transport().calls().await.len(), 0);
    }

    #[tokio::test]
    async fn test_full_cycle() {
        let store = store();
        let mut session = RecordSession::new(&store, handle());

        let record = session.load(&creds()).await.unwrap();
        assert_eq!(record.get("Level").unwrap().editable(), Some("3"));
        assert_eq!(session.state(), SessionState::Loaded);
        assert!(!session.is_dirty());

        // Nothing to save yet.
        assert!(session.save(&creds()).await.is_err());

        session.set("Level", "value", "4").unwrap();
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.is_dirty());

        session.save(&creds()).await.unwrap();
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(store.transport().call_count(TransportOp::Write).await, 1);

        let reloaded = session.load(&creds()).await.unwrap();
        assert_eq!(reloaded.get("Level").unwrap().editable(), Some("4"));
    }

    #[tokio::test]
    async fn test_save_failure_keeps_edits_for_retry() {
        let store = store();
        let mut session = RecordSession::new(&store, handle());
        session.load(&creds()).await.unwrap();
        session.set("Name", "value", "Zireael").unwrap();

        store
            .transport()
            .fail(TransportOp::Write, TransportError::http(503, "Backend Error"))
            .await;
        let err = session.save(&creds()).await.unwrap_err();
        assert!(matches!(err, SyncError::Remote(RemoteError::WriteFailed(_))));
        assert_eq!(session.state(), SessionState::SaveError);
        assert_eq!(session.last_error(), Some(&err));
        assert_eq!(
            session.current().unwrap().get("Name").unwrap().editable(),
            Some("Zireael")
        );

        store.transport().clear_failures().await;
        session.save(&creds()).await.unwrap();
        assert_eq!(session.state(), SessionState::Loaded);
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_rejected_set_keeps_session_clean() {
        let store = store();
        let mut session = RecordSession::new(&store, handle());
        session.load(&creds()).await.unwrap();

        assert_eq!(
            session.set("Intelligence", "value", "1").unwrap_err(),
            SyncError::Field(FieldError::UnknownLabel("Intelligence".to_string()))
        );
        assert_eq!(
            session.set("Name", "stat", "Zireael").unwrap_err(),
            SyncError::Field(FieldError::NotEditable("stat".to_string()))
        );
        assert_eq!(session.state(), SessionState::Loaded);
        assert!(!session.is_dirty());

        assert!(matches!(
            session.save(&creds()).await,
            Err(SyncError::Session(SessionError::InvalidState {
                state: SessionState::Loaded,
                ..
            }))
        ));
        assert_eq!(store.transport().call_count(TransportOp::Write).await, 0);
    }

    #[tokio::test]
    async fn test_load_failure_then_retry() {
        let store = store();
        let mut session = RecordSession::new(&store, handle());

        let err = session.load(&SignedOut).await.unwrap_err();
        assert_eq!(err, SyncError::Auth(AuthError::MissingCredential));
        assert_eq!(session.state(), SessionState::LoadError);
        assert!(session.edit().is_err());

        session.load(&creds()).await.unwrap();
        assert_eq!(session.state(), SessionState::Loaded);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::SaveError.to_string(), "save failed");
        assert_eq!(
            SessionError::InvalidState {
                action: "save",
                state: SessionState::Unloaded,
            }
            .to_string(),
            "Cannot save while unloaded"
        );
    }
}
