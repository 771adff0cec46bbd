use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use super::{AppwriteClient, Query, RepositoryResult};
use crate::models::{Document, DocumentList};

/// Generic document primitives of the hosted database.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait DocumentRepository: Send + Sync {
    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: Vec<Query>,
    ) -> RepositoryResult<DocumentList>;
    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> RepositoryResult<Document>;
    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> RepositoryResult<Document>;
}

pub struct AppwriteDocumentRepository {
    client: AppwriteClient,
}

impl AppwriteDocumentRepository {
    pub fn new(client: AppwriteClient) -> Self {
        Self { client }
    }

    fn documents_path(database_id: &str, collection_id: &str) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            urlencoding::encode(database_id),
            urlencoding::encode(collection_id)
        )
    }
}

#[async_trait]
impl DocumentRepository for AppwriteDocumentRepository {
    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: Vec<Query>,
    ) -> RepositoryResult<DocumentList> {
        let path = Self::documents_path(database_id, collection_id);
        self.client
            .request(Method::GET, &path, &queries, None)
            .await
    }

    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> RepositoryResult<Document> {
        let path = format!(
            "{}/{}",
            Self::documents_path(database_id, collection_id),
            urlencoding::encode(document_id)
        );
        self.client.request(Method::GET, &path, &[], None).await
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> RepositoryResult<Document> {
        let path = Self::documents_path(database_id, collection_id);
        let body = json!({ "documentId": document_id, "data": data });
        self.client
            .request(Method::POST, &path, &[], Some(body))
            .await
    }
}
