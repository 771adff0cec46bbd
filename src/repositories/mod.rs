pub mod account_repository;
pub mod appwrite_client;
pub mod document_repository;
pub mod query;

pub use account_repository::{AccountRepository, AppwriteAccountRepository};
pub use appwrite_client::{AppwriteClient, SESSION_STORAGE_KEY};
pub use document_repository::{AppwriteDocumentRepository, DocumentRepository};
pub use query::Query;

use serde::Deserialize;
use std::fmt;

/// Error body returned by the BaaS.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: u16,
    /// Machine-readable tag such as `user_session_already_exists`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0}")]
    Remote(RemoteError),
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Timeout after {0}ms")]
    Timeout(u64),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<RemoteError> for RepositoryError {
    fn from(err: RemoteError) -> Self {
        RepositoryError::Remote(err)
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::InvalidResponse(err.to_string())
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
