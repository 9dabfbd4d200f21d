//! Credential store adapters.
//!
//! A store answers one question: does this exact username/password pair
//! exist? Passwords are compared as stored, without hashing or normalization.
//!
//! # Invariants
//! - `FileCredentialStore` reads its file on every lookup. Nothing is cached,
//!   so changes to the file are visible on the next call.
//! - A store that cannot be read or parsed reports `StoreError`, never `false`.

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One stored identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub username: String,
    pub password: String,
}

impl CredentialRecord {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

/// Error returned when the backing store cannot be consulted.
#[derive(Debug)]
pub enum StoreError {
    /// The store could not be read.
    Io(std::io::Error),
    /// The store content is not a list of credential records.
    Parse(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read credential store: {e}"),
            Self::Parse(e) => write!(f, "malformed credential store: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
        }
    }
}

/// Backing store of credential records.
pub trait CredentialStore: Send + Sync {
    /// Returns `true` iff a record with exactly this username and password exists.
    fn lookup(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// Credential store backed by a JSON file holding an array of records.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the full record listing.
    ///
    /// # Errors
    /// `StoreError::Io` if the file cannot be read, `StoreError::Parse` if it is
    /// not a JSON array of records.
    pub async fn load(&self) -> Result<Vec<CredentialRecord>, StoreError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(StoreError::Io)?;
        serde_json::from_slice(&bytes).map_err(StoreError::Parse)
    }
}

impl CredentialStore for FileCredentialStore {
    async fn lookup(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let records = self.load().await?;
        Ok(records.iter().any(|record| record.matches(username, password)))
    }
}

/// Credential store holding its records in memory.
///
/// For hosts that manage identities elsewhere and hand the unit a snapshot.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    records: Vec<CredentialRecord>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub const fn new(records: Vec<CredentialRecord>) -> Self {
        Self { records }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    async fn lookup(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        Ok(self
            .records
            .iter()
            .any(|record| record.matches(username, password)))
    }
}
