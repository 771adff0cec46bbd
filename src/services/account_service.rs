use crate::error::{AppError, ErrorKind, Result};
use crate::models::{Account, Session};
use crate::repositories::{AccountRepository, RepositoryError};
use std::sync::Arc;
use tracing::{debug, error};

/// Account and session accessors over the BaaS.
pub struct AccountService {
    repository: Arc<dyn AccountRepository>,
}

impl AccountService {
    pub fn new(repository: Arc<dyn AccountRepository>) -> Self {
        Self { repository }
    }

    /// Creates an account with a fresh id. An active session is ended first,
    /// since signing the new account in would otherwise conflict with it.
    pub async fn create_account(&self, email: &str, password: &str, name: &str) -> Result<Account> {
        if self.get_current_user().await?.is_some() {
            debug!("Ending active session before creating a new account");
            self.sign_out().await?;
        }

        let user_id = uuid::Uuid::new_v4().simple().to_string();
        let account = self
            .repository
            .create(&user_id, email, password, name)
            .await
            .map_err(|e| {
                error!("Error creating account: {}", e);
                AppError::from(e)
            })?;

        if account.id.is_empty() {
            return Err(AppError::AccountCreationFailed);
        }

        Ok(account)
    }

    /// Starts an email/password session.
    ///
    /// When the server refuses because a session is already active and that
    /// session still resolves to an identity, fails with
    /// [`AppError::AlreadyLoggedIn`]; otherwise the remote error is returned
    /// as is. Both classify as a session conflict.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        match self.repository.create_email_session(email, password).await {
            Ok(session) => Ok(session),
            Err(err) if err.kind() == ErrorKind::SessionConflict => {
                if self.get_current_user().await.ok().flatten().is_some() {
                    Err(AppError::AlreadyLoggedIn)
                } else {
                    Err(err.into())
                }
            }
            Err(err) => {
                error!("Error signing in: {}", err);
                Err(err.into())
            }
        }
    }

    /// The identity behind the current session, or `None` for guests.
    pub async fn get_current_user(&self) -> Result<Option<Account>> {
        match self.repository.get().await {
            Ok(account) => Ok(Some(account)),
            Err(err) if is_not_authenticated(&err) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Ends the current session. Having no session is not an error.
    pub async fn sign_out(&self) -> Result<()> {
        match self.repository.delete_session("current").await {
            Ok(()) => Ok(()),
            Err(err) if is_not_authenticated(&err) => {
                debug!("No active session to end");
                Ok(())
            }
            Err(err) => {
                error!("Error signing out: {}", err);
                Err(err.into())
            }
        }
    }

    /// Ends every session of the current user. Having none is not an error.
    pub async fn clear_all_sessions(&self) -> Result<()> {
        match self.repository.delete_sessions().await {
            Ok(()) => Ok(()),
            Err(err) if is_not_authenticated(&err) => Ok(()),
            Err(err) => {
                error!("Error clearing sessions: {}", err);
                Err(err.into())
            }
        }
    }
}

fn is_not_authenticated(err: &RepositoryError) -> bool {
    err.kind() == ErrorKind::NotAuthenticated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::account_repository::MockAccountRepository;
    use crate::repositories::RemoteError;
    use mockall::predicate::*;

    fn remote(code: u16, kind: &str, message: &str) -> RepositoryError {
        RepositoryError::Remote(RemoteError {
            message: message.to_string(),
            code,
            kind: Some(kind.to_string()),
        })
    }

    fn guest_error() -> RepositoryError {
        remote(
            401,
            "general_unauthorized_scope",
            "User (role: guests) missing scope (account)",
        )
    }

    fn conflict_error() -> RepositoryError {
        remote(
            401,
            "user_session_already_exists",
            "Creation of a session is prohibited when a session is active.",
        )
    }

    fn account() -> Account {
        Account {
            id: "acc-1".to_string(),
            email: "test@example.com".to_string(),
            name: "Test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_current_user_guest_is_none() {
        let mut mock_repo = MockAccountRepository::new();
        mock_repo
            .expect_get()
            .times(1)
            .returning(|| Box::pin(async move { Err(guest_error()) }));

        let service = AccountService::new(Arc::new(mock_repo));

        let result = service.get_current_user().await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_get_current_user_propagates_server_errors() {
        let mut mock_repo = MockAccountRepository::new();
        mock_repo
            .expect_get()
            .times(1)
            .returning(|| Box::pin(async move { Err(remote(500, "general_unknown", "Server Error")) }));

        let service = AccountService::new(Arc::new(mock_repo));

        let result = service.get_current_user().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_sign_out_without_session_succeeds() {
        let mut mock_repo = MockAccountRepository::new();
        mock_repo
            .expect_delete_session()
            .with(eq("current"))
            .times(1)
            .returning(|_| Box::pin(async move { Err(guest_error()) }));

        let service = AccountService::new(Arc::new(mock_repo));

        assert!(service.sign_out().await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_in_conflict_with_live_identity() {
        let mut mock_repo = MockAccountRepository::new();
        mock_repo
            .expect_create_email_session()
            .with(eq("test@example.com"), eq("password123"))
            .times(1)
            .returning(|_, _| Box::pin(async move { Err(conflict_error()) }));
        mock_repo
            .expect_get()
            .times(1)
            .returning(|| Box::pin(async move { Ok(account()) }));

        let service = AccountService::new(Arc::new(mock_repo));

        let result = service.sign_in("test@example.com", "password123").await;
        assert!(matches!(result, Err(AppError::AlreadyLoggedIn)));
    }

    #[tokio::test]
    async fn test_sign_in_conflict_without_identity_keeps_remote_error() {
        let mut mock_repo = MockAccountRepository::new();
        mock_repo
            .expect_create_email_session()
            .times(1)
            .returning(|_, _| Box::pin(async move { Err(conflict_error()) }));
        mock_repo
            .expect_get()
            .times(1)
            .returning(|| Box::pin(async move { Err(guest_error()) }));

        let service = AccountService::new(Arc::new(mock_repo));

        let err = service
            .sign_in("test@example.com", "password123")
            .await
            .expect_err("sign in should fail");
        assert!(matches!(err, AppError::Repository(_)));
        assert!(err.is_session_conflict());
    }

    #[tokio::test]
    async fn test_create_account_ends_existing_session_first() {
        let mut mock_repo = MockAccountRepository::new();
        mock_repo
            .expect_get()
            .times(1)
            .returning(|| Box::pin(async move { Ok(account()) }));
        mock_repo
            .expect_delete_session()
            .with(eq("current"))
            .times(1)
            .returning(|_| Box::pin(async move { Ok(()) }));
        mock_repo
            .expect_create()
            .with(always(), eq("new@example.com"), eq("password123"), eq("New"))
            .times(1)
            .returning(|user_id, email, _, name| {
                let account = Account {
                    id: user_id.to_string(),
                    email: email.to_string(),
                    name: name.to_string(),
                };
                Box::pin(async move { Ok(account) })
            });

        let service = AccountService::new(Arc::new(mock_repo));

        let account = service
            .create_account("new@example.com", "password123", "New")
            .await
            .expect("account created");
        assert_eq!(account.email, "new@example.com");
        assert!(!account.id.is_empty());
    }
}
