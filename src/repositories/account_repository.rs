use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use super::{AppwriteClient, RepositoryResult};
use crate::models::{Account, Session};

/// Account and session primitives of the BaaS.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait AccountRepository: Send + Sync {
    async fn create(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> RepositoryResult<Account>;
    async fn create_email_session(&self, email: &str, password: &str)
        -> RepositoryResult<Session>;
    /// The identity behind the current session.
    async fn get(&self) -> RepositoryResult<Account>;
    /// Deletes one session; `"current"` names the session in use.
    async fn delete_session(&self, session_id: &str) -> RepositoryResult<()>;
    async fn delete_sessions(&self) -> RepositoryResult<()>;
}

pub struct AppwriteAccountRepository {
    client: AppwriteClient,
}

impl AppwriteAccountRepository {
    pub fn new(client: AppwriteClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AccountRepository for AppwriteAccountRepository {
    async fn create(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> RepositoryResult<Account> {
        let body = json!({
            "userId": user_id,
            "email": email,
            "password": password,
            "name": name,
        });
        self.client
            .request(Method::POST, "/account", &[], Some(body))
            .await
    }

    async fn create_email_session(
        &self,
        email: &str,
        password: &str,
    ) -> RepositoryResult<Session> {
        let body = json!({ "email": email, "password": password });
        self.client
            .request(Method::POST, "/account/sessions/email", &[], Some(body))
            .await
    }

    async fn get(&self) -> RepositoryResult<Account> {
        self.client.request(Method::GET, "/account", &[], None).await
    }

    async fn delete_session(&self, session_id: &str) -> RepositoryResult<()> {
        let path = format!("/account/sessions/{}", urlencoding::encode(session_id));
        self.client.request_empty(Method::DELETE, &path, None).await
    }

    async fn delete_sessions(&self) -> RepositoryResult<()> {
        self.client
            .request_empty(Method::DELETE, "/account/sessions", None)
            .await
    }
}
