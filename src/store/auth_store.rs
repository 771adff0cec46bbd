use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::state::StateCell;
use crate::error::{AppError, Result};
use crate::models::{RegisterData, User};
use crate::services::{AccountService, ProfileService};

/// Storage key of the persisted auth state.
pub const AUTH_STORAGE_KEY: &str = "auth-storage";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_logged_in: bool,
    pub is_loading: bool,
    pub has_hydrated: bool,
}

impl AuthState {
    pub fn set_user(&mut self, user: Option<User>) {
        self.is_logged_in = user.is_some();
        self.user = user;
    }

    pub fn signed_in(&mut self, user: User) {
        self.set_user(Some(user));
        self.is_loading = false;
    }

    pub fn signed_out(&mut self) {
        self.set_user(None);
        self.is_loading = false;
    }

    pub fn persisted(&self) -> PersistedAuth {
        PersistedAuth {
            user: self.user.clone(),
            is_logged_in: self.is_logged_in,
        }
    }

    /// Restores persisted fields. The login flag is derived from the user so
    /// a hand-edited file cannot break the invariant.
    pub fn restore(&mut self, persisted: PersistedAuth) {
        if persisted.is_logged_in != persisted.user.is_some() {
            warn!("Persisted login flag disagrees with persisted user; trusting the user");
        }
        self.set_user(persisted.user);
    }
}

/// The subset of [`AuthState`] that survives restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAuth {
    pub user: Option<User>,
    pub is_logged_in: bool,
}

/// Single source of truth for the signed-in identity.
///
/// Operations are not guarded against running concurrently; callers keep
/// their triggers disabled while `is_loading` is set.
pub struct AuthStore {
    state: StateCell<AuthState>,
    accounts: Arc<AccountService>,
    profiles: Arc<ProfileService>,
}

impl AuthStore {
    pub fn new(accounts: Arc<AccountService>, profiles: Arc<ProfileService>) -> Self {
        Self {
            state: StateCell::new(AuthState::default()),
            accounts,
            profiles,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.get()
    }

    pub fn user(&self) -> Option<User> {
        self.state.read(|s| s.user.clone())
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.read(|s| s.is_logged_in)
    }

    pub fn is_loading(&self) -> bool {
        self.state.read(|s| s.is_loading)
    }

    pub fn has_hydrated(&self) -> bool {
        self.state.read(|s| s.has_hydrated)
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub(crate) fn cell(&self) -> &StateCell<AuthState> {
        &self.state
    }

    pub fn set_user(&self, user: Option<User>) {
        self.state.update(|s| s.set_user(user));
    }

    pub fn set_has_hydrated(&self, has_hydrated: bool) {
        self.state.update(|s| s.has_hydrated = has_hydrated);
    }

    pub(crate) fn restore(&self, persisted: PersistedAuth) {
        self.state.update(|s| s.restore(persisted));
    }

    fn set_loading(&self, is_loading: bool) {
        self.state.update(|s| s.is_loading = is_loading);
    }

    /// Signs in and loads the merged identity. Session conflicts are returned
    /// to the caller, who may `clear_sessions` and retry.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        self.set_loading(true);

        match self.sign_in_and_load(email, password).await {
            Ok(user) => {
                info!(user_id = %user.id, "Logged in");
                self.state.update(|s| s.signed_in(user));
                Ok(())
            }
            Err(e) => {
                error!("Login error: {}", e);
                self.set_loading(false);
                Err(e)
            }
        }
    }

    async fn sign_in_and_load(&self, email: &str, password: &str) -> Result<User> {
        self.accounts.sign_in(email, password).await?;

        let loaded = self
            .fetch_remote_user()
            .await
            .and_then(|user| user.ok_or(AppError::MissingIdentity));
        if loaded.is_err() {
            self.end_unused_session().await;
        }
        loaded
    }

    /// Ends a session opened by a sign-in whose follow-up failed. The store
    /// stays signed out, so leaving the session open would make the next
    /// login conflict with it.
    async fn end_unused_session(&self) {
        match self.accounts.sign_out().await {
            Ok(()) => debug!("Ended session left by a failed sign-in"),
            Err(e) => warn!("Failed to end session left by a failed sign-in: {}", e),
        }
    }

    /// Creates the account, signs in, and writes the profile document.
    ///
    /// A failure after the account exists is not compensated: the account is
    /// kept and [`AppError::ProfileCreation`] names it. The session opened
    /// for it is ended, so a later login works with an identity that has no
    /// profile fields.
    pub async fn register(&self, data: RegisterData) -> Result<()> {
        data.validate().map_err(AppError::Validation)?;
        self.set_loading(true);

        match self.create_and_sign_in(&data).await {
            Ok(user) => {
                info!(user_id = %user.id, "Registered");
                self.state.update(|s| s.signed_in(user));
                Ok(())
            }
            Err(e) => {
                error!("Registration error: {}", e);
                self.set_loading(false);
                Err(e)
            }
        }
    }

    async fn create_and_sign_in(&self, data: &RegisterData) -> Result<User> {
        let account = self
            .accounts
            .create_account(&data.email, &data.password, &data.name)
            .await?;
        self.accounts.sign_in(&data.email, &data.password).await?;

        let profile = data.profile();
        match self.profiles.create_user_profile(&account.id, &profile).await {
            Ok(_) => Ok(profile.into_user(account.id)),
            Err(e) => {
                self.end_unused_session().await;
                match e {
                    AppError::Repository(source) => Err(AppError::ProfileCreation {
                        user_id: account.id,
                        source,
                    }),
                    e => Err(e),
                }
            }
        }
    }

    /// Ends the remote session and forgets the identity. The local identity
    /// is dropped even when the remote call fails; the error is still
    /// returned so the caller can report it.
    pub async fn logout(&self) -> Result<()> {
        self.set_loading(true);

        let result = self.accounts.sign_out().await;
        self.state.update(AuthState::signed_out);

        match result {
            Ok(()) => {
                info!("Logged out");
                Ok(())
            }
            Err(e) => {
                error!("Logout error: {}", e);
                Err(e)
            }
        }
    }

    /// Ends every remote session and forgets the identity.
    pub async fn clear_sessions(&self) -> Result<()> {
        self.set_loading(true);

        match self.accounts.clear_all_sessions().await {
            Ok(()) => {
                info!("Cleared all sessions");
                self.state.update(AuthState::signed_out);
                Ok(())
            }
            Err(e) => {
                error!("Clear sessions error: {}", e);
                self.set_loading(false);
                Err(e)
            }
        }
    }

    /// Revalidates the local identity against the remote session. Never
    /// fails: anything but a confirmed identity signs the store out, and only
    /// unexpected failures are logged.
    pub async fn check_auth_state(&self, show_loading: bool) {
        if show_loading {
            self.set_loading(true);
        }

        match self.fetch_remote_user().await {
            Ok(Some(user)) => self.state.update(|s| s.signed_in(user)),
            Ok(None) => self.state.update(AuthState::signed_out),
            Err(e) => {
                if !e.is_not_authenticated() {
                    error!("Auth check error: {}", e);
                }
                self.state.update(AuthState::signed_out);
            }
        }
    }

    async fn fetch_remote_user(&self) -> Result<Option<User>> {
        let Some(account) = self.accounts.get_current_user().await? else {
            return Ok(None);
        };
        let profile = self.profiles.get_user_profile(&account.id).await?;
        Ok(Some(User::from_account(&account, profile)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    fn user() -> User {
        User {
            id: "u1".to_string(),
            email: "a@example.com".to_string(),
            name: "A".to_string(),
            role: Some(UserRole::Patient),
            phone: None,
            specialization: None,
            license_number: None,
            date_of_birth: None,
            address: None,
        }
    }

    #[test]
    fn test_login_flag_follows_user() {
        let mut state = AuthState {
            is_loading: true,
            ..Default::default()
        };

        state.signed_in(user());
        assert!(state.is_logged_in);
        assert!(!state.is_loading);

        state.signed_out();
        assert!(!state.is_logged_in);
        assert!(state.user.is_none());
    }

    #[test]
    fn test_restore_derives_login_flag() {
        let mut state = AuthState::default();
        state.restore(PersistedAuth {
            user: None,
            is_logged_in: true,
        });
        assert!(!state.is_logged_in);

        state.restore(PersistedAuth {
            user: Some(user()),
            is_logged_in: false,
        });
        assert!(state.is_logged_in);
    }

    #[test]
    fn test_persisted_excludes_transient_flags() {
        let state = AuthState {
            user: Some(user()),
            is_logged_in: true,
            is_loading: true,
            has_hydrated: true,
        };
        let value = serde_json::to_value(state.persisted()).expect("serializes");
        assert_eq!(value["isLoggedIn"], true);
        assert!(value.get("isLoading").is_none());
        assert!(value.get("hasHydrated").is_none());
    }
}
