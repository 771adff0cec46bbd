use crate::config::ConfigError;
use crate::repositories::{RemoteError, RepositoryError};
use crate::storage::StorageError;
use thiserror::Error;

// Type alias for Result with our AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Generic message shown when a failure carries nothing better.
pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred. Please try again.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("You are already logged in. Please logout first.")]
    AlreadyLoggedIn,

    #[error("Account creation failed")]
    AccountCreationFailed,

    #[error("Signed in, but the session resolved to no identity")]
    MissingIdentity,

    /// The account exists remotely but its profile document could not be
    /// written. The account is left in place.
    #[error("Registration incomplete: profile for account {user_id} could not be created: {source}")]
    ProfileCreation {
        user_id: String,
        #[source]
        source: RepositoryError,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// How a failure should be treated by callers.
///
/// | Kind             | Treatment                                         |
/// |------------------|---------------------------------------------------|
/// | NotAuthenticated | Expected state: resolve to "no identity", no log  |
/// | SessionConflict  | Offer "clear sessions and retry"                  |
/// | NotFound         | Resolve to `None` where the operation allows it   |
/// | Other            | Log, reset loading, show the message              |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotAuthenticated,
    SessionConflict,
    NotFound,
    Other,
}

const SESSION_CONFLICT_TYPES: &[&str] = &["user_session_already_exists"];
const UNAUTHORIZED_TYPES: &[&str] = &["general_unauthorized_scope", "user_unauthorized"];
const SESSION_CONFLICT_PHRASES: &[&str] = &["session is active", "already logged in"];
const UNAUTHORIZED_PHRASES: &[&str] = &["guests", "missing scope"];

/// Classifies a remote failure.
///
/// The structured `type` tag wins when present. Message phrasing is only
/// consulted as a fallback for servers that omit or rename the tag. Session
/// conflicts are reported with HTTP 401 too, so they are checked before the
/// status code.
pub fn classify_remote(err: &RemoteError) -> ErrorKind {
    if let Some(tag) = err.kind.as_deref() {
        if SESSION_CONFLICT_TYPES.contains(&tag) {
            return ErrorKind::SessionConflict;
        }
        if UNAUTHORIZED_TYPES.contains(&tag) {
            return ErrorKind::NotAuthenticated;
        }
        if tag.ends_with("_not_found") {
            return ErrorKind::NotFound;
        }
    }

    let message = err.message.to_ascii_lowercase();
    if SESSION_CONFLICT_PHRASES
        .iter()
        .any(|phrase| message.contains(phrase))
    {
        return ErrorKind::SessionConflict;
    }

    // A bare 401 only means "no session" when the server gave no tag. Tagged
    // 401s such as user_invalid_credentials or user_blocked are real failures.
    let untagged_401 = err.kind.is_none() && err.code == 401;
    if untagged_401 || UNAUTHORIZED_PHRASES.iter().any(|p| message.contains(p)) {
        return ErrorKind::NotAuthenticated;
    }

    if err.code == 404 {
        return ErrorKind::NotFound;
    }

    ErrorKind::Other
}

impl RepositoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::Remote(remote) => classify_remote(remote),
            _ => ErrorKind::Other,
        }
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Repository(err) => err.kind(),
            AppError::AlreadyLoggedIn => ErrorKind::SessionConflict,
            _ => ErrorKind::Other,
        }
    }

    pub fn is_session_conflict(&self) -> bool {
        self.kind() == ErrorKind::SessionConflict
    }

    pub fn is_not_authenticated(&self) -> bool {
        self.kind() == ErrorKind::NotAuthenticated
    }

    /// Message suitable for a blocking alert.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            message
        }
    }
}
