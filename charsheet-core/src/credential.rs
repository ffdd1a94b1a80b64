//! Bearer credentials supplied by the caller.
//!
//! The engine never acquires, refreshes, or stores tokens. Every store
//! operation asks its [`CredentialProvider`] for a credential and uses the
//! token for that one call.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth scopes understood by the scope check.
pub mod scopes {
    pub const DRIVE: &str = "https://www.googleapis.com/auth/drive";
    pub const DRIVE_FILE: &str = "https://www.googleapis.com/auth/drive.file";
    pub const DRIVE_READONLY: &str = "https://www.googleapis.com/auth/drive.readonly";
    pub const DRIVE_METADATA_READONLY: &str =
        "https://www.googleapis.com/auth/drive.metadata.readonly";
    pub const SPREADSHEETS: &str = "https://www.googleapis.com/auth/spreadsheets";
    pub const SPREADSHEETS_READONLY: &str =
        "https://www.googleapis.com/auth/spreadsheets.readonly";
}

/// Remote operation a credential is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    Read,
    Write,
}

impl Operation {
    /// Scopes that each grant this operation.
    pub fn accepted_scopes(&self) -> &'static [&'static str] {
        match self {
            Operation::List => &[
                scopes::DRIVE,
                scopes::DRIVE_FILE,
                scopes::DRIVE_READONLY,
                scopes::DRIVE_METADATA_READONLY,
            ],
            Operation::Create => &[scopes::DRIVE, scopes::DRIVE_FILE],
            Operation::Read => &[
                scopes::SPREADSHEETS,
                scopes::SPREADSHEETS_READONLY,
                scopes::DRIVE,
                scopes::DRIVE_FILE,
                scopes::DRIVE_READONLY,
            ],
            Operation::Write => &[scopes::SPREADSHEETS, scopes::DRIVE, scopes::DRIVE_FILE],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::List => write!(f, "list records"),
            Operation::Create => write!(f, "create records"),
            Operation::Read => write!(f, "read records"),
            Operation::Write => write!(f, "write records"),
        }
    }
}

/// An opaque bearer token with optional freshness and scope information.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scopes: Option<Vec<String>>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
            scopes: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Record the scopes the token was granted. Without this, scopes are
    /// not checked locally and the remote decides.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    /// Whether the declared scopes (if any) permit the operation.
    pub fn permits(&self, operation: Operation) -> bool {
        match &self.scopes {
            None => true,
            Some(granted) => operation
                .accepted_scopes()
                .iter()
                .any(|accepted| granted.iter().any(|g| g == accepted)),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Source of the bearer credential for each call.
pub trait CredentialProvider: Send + Sync {
    /// The current credential, or `None` when the user is not signed in.
    fn credential(&self) -> Option<Credential>;
}

impl CredentialProvider for Credential {
    fn credential(&self) -> Option<Credential> {
        Some(self.clone())
    }
}

impl CredentialProvider for Option<Credential> {
    fn credential(&self) -> Option<Credential> {
        self.clone()
    }
}

/// A provider that never has a credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignedOut;

impl CredentialProvider for SignedOut {
    fn credential(&self) -> Option<Credential> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let fresh = Credential::new("tok").with_expiry(now + Duration::minutes(5));
        let stale = Credential::new("tok").with_expiry(now - Duration::seconds(1));
        let forever = Credential::new("tok");

        assert!(!fresh.is_expired_at(now));
        assert!(stale.is_expired_at(now));
        assert!(!forever.is_expired_at(now));
    }

    #[test]
    fn test_unknown_scopes_permit_everything() {
        let cred = Credential::new("tok");
        assert!(cred.permits(Operation::Create));
        assert!(cred.permits(Operation::Write));
    }

    #[test]
    fn test_readonly_scopes() {
        let cred = Credential::new("tok")
            .with_scopes([scopes::SPREADSHEETS_READONLY, scopes::DRIVE_METADATA_READONLY]);
        assert!(cred.permits(Operation::List));
        assert!(cred.permits(Operation::Read));
        assert!(!cred.permits(Operation::Write));
        assert!(!cred.permits(Operation::Create));
    }

    #[test]
    fn test_debug_redacts_token() {
        let cred = Credential::new("super-secret");
        let debug = format!("{:?}", cred);
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_providers() {
        assert!(SignedOut.credential().is_none());
        assert!(None::<Credential>.credential().is_none());
        assert_eq!(
            Credential::new("abc").credential().unwrap().token(),
            "abc"
        );
    }
}
