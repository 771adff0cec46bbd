//! In-memory stand-in for the BaaS, shared by unit and integration tests.
//!
//! [`FakeBackend`] implements both repository traits over plain collections
//! and reproduces the error bodies the real server sends for the cases the
//! stores care about: guests, session conflicts, bad credentials, duplicates
//! and missing documents.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::CollectionIds;
use crate::models::{Account, Document, DocumentList, Session};
use crate::repositories::{
    AccountRepository, DocumentRepository, Query, RemoteError, RepositoryResult,
};
use crate::storage::KeyValueStorage;
use crate::AppContext;

pub const TEST_DATABASE_ID: &str = "test-db";
pub const TEST_USERS_COLLECTION_ID: &str = "users";
pub const TEST_CATEGORIES_COLLECTION_ID: &str = "categories";

pub fn test_collections() -> CollectionIds {
    CollectionIds {
        database_id: TEST_DATABASE_ID.to_string(),
        users: TEST_USERS_COLLECTION_ID.to_string(),
        categories: TEST_CATEGORIES_COLLECTION_ID.to_string(),
    }
}

fn remote(code: u16, kind: &str, message: &str) -> RemoteError {
    RemoteError {
        message: message.to_string(),
        code,
        kind: Some(kind.to_string()),
    }
}

/// What the server answers a request made without a session.
pub fn guest_error() -> RemoteError {
    remote(
        401,
        "general_unauthorized_scope",
        "User (role: guests) missing scope (account)",
    )
}

/// What the server answers a sign-in while a session is active.
pub fn session_conflict_error() -> RemoteError {
    remote(
        401,
        "user_session_already_exists",
        "Creation of a session is prohibited when a session is active.",
    )
}

pub fn invalid_credentials_error() -> RemoteError {
    remote(
        401,
        "user_invalid_credentials",
        "Invalid credentials. Please check the email and password.",
    )
}

pub fn server_error() -> RemoteError {
    remote(500, "general_unknown", "Server Error")
}

fn user_exists_error() -> RemoteError {
    remote(
        409,
        "user_already_exists",
        "A user with the same id, email, or phone already exists in this project.",
    )
}

fn document_exists_error() -> RemoteError {
    remote(
        409,
        "document_already_exists",
        "Document with the requested ID already exists.",
    )
}

fn document_not_found_error() -> RemoteError {
    remote(
        404,
        "document_not_found",
        "Document with the requested ID could not be found.",
    )
}

fn session_not_found_error() -> RemoteError {
    remote(
        404,
        "user_session_not_found",
        "The current user session could not be found.",
    )
}

fn unauthorized_error() -> RemoteError {
    remote(
        401,
        "user_unauthorized",
        "The current user is not authorized to perform the requested action.",
    )
}

#[derive(Debug, Clone)]
struct FakeAccount {
    account: Account,
    password: String,
}

#[derive(Debug, Clone)]
struct FakeSession {
    id: String,
    user_id: String,
}

#[derive(Default)]
struct Inner {
    accounts: Vec<FakeAccount>,
    session: Option<FakeSession>,
    documents: HashMap<String, Vec<Document>>,
    failures: HashMap<&'static str, VecDeque<RemoteError>>,
    calls: HashMap<&'static str, usize>,
    next_id: u64,
}

impl Inner {
    /// Counts the call and pops a queued failure for `operation`, if any.
    fn enter(&mut self, operation: &'static str) -> RepositoryResult<()> {
        *self.calls.entry(operation).or_insert(0) += 1;
        match self
            .failures
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }

    fn current_account(&self) -> Option<&Account> {
        let session = self.session.as_ref()?;
        self.accounts
            .iter()
            .map(|a| &a.account)
            .find(|a| a.id == session.user_id)
    }
}

/// In-memory BaaS with one device session at a time.
#[derive(Default)]
pub struct FakeBackend {
    inner: Mutex<Inner>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an account and returns its id.
    pub fn seed_account(&self, email: &str, password: &str, name: &str) -> String {
        let mut inner = self.lock();
        let id = inner.next_id("user-");
        inner.accounts.push(FakeAccount {
            account: Account {
                id: id.clone(),
                email: email.to_string(),
                name: name.to_string(),
            },
            password: password.to_string(),
        });
        id
    }

    /// Adds a document to `collection_id`. `data` must be a JSON object.
    pub fn seed_document(&self, collection_id: &str, document_id: &str, data: Value) {
        let document = Document {
            id: document_id.to_string(),
            data: match data {
                Value::Object(map) => map,
                _ => Default::default(),
            },
        };
        self.lock()
            .documents
            .entry(collection_id.to_string())
            .or_default()
            .push(document);
    }

    /// Opens a session for `user_id` as if a sign-in had happened earlier.
    pub fn seed_session(&self, user_id: &str) {
        let mut inner = self.lock();
        let id = inner.next_id("session-");
        inner.session = Some(FakeSession {
            id,
            user_id: user_id.to_string(),
        });
    }

    /// Drops the session server-side, as an expiry would. Returns whether
    /// there was one.
    pub fn expire_session(&self) -> bool {
        self.lock().session.take().is_some()
    }

    pub fn has_active_session(&self) -> bool {
        self.lock().session.is_some()
    }

    pub fn account_count(&self) -> usize {
        self.lock().accounts.len()
    }

    pub fn documents(&self, collection_id: &str) -> Vec<Document> {
        self.lock()
            .documents
            .get(collection_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes the next call of `operation` fail with `error`. Operations are
    /// named after the repository methods, e.g. `"list_documents"`.
    pub fn fail_next(&self, operation: &'static str, error: RemoteError) {
        self.lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.lock().calls.get(operation).copied().unwrap_or(0)
    }
}

/// Builds an [`AppContext`] whose repositories are both `backend`.
pub fn app_context(backend: &Arc<FakeBackend>, storage: Arc<dyn KeyValueStorage>) -> AppContext {
    AppContext::new(
        backend.clone(),
        backend.clone(),
        storage,
        test_collections(),
    )
}

fn matches(document: &Document, query: &Query) -> bool {
    let Some(attribute) = query.attribute.as_deref() else {
        return true;
    };
    let value = document.attribute(attribute);

    match query.method {
        "equal" => value.is_some_and(|v| query.values.contains(v)),
        "search" => {
            let Some(text) = value.and_then(Value::as_str) else {
                return false;
            };
            let text = text.to_lowercase();
            query
                .values
                .iter()
                .filter_map(Value::as_str)
                .any(|needle| text.contains(&needle.to_lowercase()))
        }
        _ => true,
    }
}

#[async_trait]
impl AccountRepository for FakeBackend {
    async fn create(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> RepositoryResult<Account> {
        let mut inner = self.lock();
        inner.enter("create")?;

        if inner
            .accounts
            .iter()
            .any(|a| a.account.id == user_id || a.account.email.eq_ignore_ascii_case(email))
        {
            return Err(user_exists_error().into());
        }

        let account = Account {
            id: user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
        };
        inner.accounts.push(FakeAccount {
            account: account.clone(),
            password: password.to_string(),
        });
        Ok(account)
    }

    async fn create_email_session(
        &self,
        email: &str,
        password: &str,
    ) -> RepositoryResult<Session> {
        let mut inner = self.lock();
        inner.enter("create_email_session")?;

        if inner.session.is_some() {
            return Err(session_conflict_error().into());
        }

        let user_id = inner
            .accounts
            .iter()
            .find(|a| a.account.email.eq_ignore_ascii_case(email) && a.password == password)
            .map(|a| a.account.id.clone())
            .ok_or_else(invalid_credentials_error)?;

        let id = inner.next_id("session-");
        inner.session = Some(FakeSession {
            id: id.clone(),
            user_id: user_id.clone(),
        });
        Ok(Session { id, user_id })
    }

    async fn get(&self) -> RepositoryResult<Account> {
        let mut inner = self.lock();
        inner.enter("get")?;
        inner
            .current_account()
            .cloned()
            .ok_or_else(|| guest_error().into())
    }

    async fn delete_session(&self, session_id: &str) -> RepositoryResult<()> {
        let mut inner = self.lock();
        inner.enter("delete_session")?;

        let Some(session) = inner.session.as_ref() else {
            return Err(guest_error().into());
        };
        if session_id != "current" && session_id != session.id {
            return Err(session_not_found_error().into());
        }
        inner.session = None;
        Ok(())
    }

    async fn delete_sessions(&self) -> RepositoryResult<()> {
        let mut inner = self.lock();
        inner.enter("delete_sessions")?;

        if inner.session.take().is_none() {
            return Err(guest_error().into());
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for FakeBackend {
    async fn list_documents(
        &self,
        _database_id: &str,
        collection_id: &str,
        queries: Vec<Query>,
    ) -> RepositoryResult<DocumentList> {
        let mut inner = self.lock();
        inner.enter("list_documents")?;

        let mut documents: Vec<Document> = inner
            .documents
            .get(collection_id)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| queries.iter().all(|q| matches(doc, q)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let total = documents.len() as u64;

        let limit = queries
            .iter()
            .filter(|q| q.method == "limit")
            .filter_map(|q| q.values.first().and_then(Value::as_u64))
            .min();
        if let Some(limit) = limit {
            documents.truncate(limit as usize);
        }

        Ok(DocumentList { total, documents })
    }

    async fn get_document(
        &self,
        _database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> RepositoryResult<Document> {
        let mut inner = self.lock();
        inner.enter("get_document")?;

        inner
            .documents
            .get(collection_id)
            .and_then(|docs| docs.iter().find(|d| d.id == document_id))
            .cloned()
            .ok_or_else(|| document_not_found_error().into())
    }

    async fn create_document(
        &self,
        _database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> RepositoryResult<Document> {
        let mut inner = self.lock();
        inner.enter("create_document")?;

        if inner.session.is_none() {
            return Err(unauthorized_error().into());
        }

        let collection = inner.documents.entry(collection_id.to_string()).or_default();
        if collection.iter().any(|d| d.id == document_id) {
            return Err(document_exists_error().into());
        }

        let document = Document {
            id: document_id.to_string(),
            data: match data {
                Value::Object(map) => map,
                _ => Default::default(),
            },
        };
        collection.push(document.clone());
        Ok(document)
    }
}
