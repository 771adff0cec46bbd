use crate::config::CollectionIds;
use crate::error::{ErrorKind, Result};
use crate::models::category::CategoryDocument;
use crate::models::{Category, Doctor, Document};
use crate::repositories::{DocumentRepository, Query, RepositoryError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const CATEGORY_PAGE_SIZE: u32 = 100;
pub const DOCTOR_PAGE_SIZE: u32 = 100;
/// Doctors scanned when counting specialists per specialty.
pub const SPECIALTY_COUNT_PAGE_SIZE: u32 = 1000;

const DOCTOR_ROLE: &str = "doctor";

/// Read-only accessors for specialties and doctors.
pub struct DirectoryService {
    repository: Arc<dyn DocumentRepository>,
    collections: CollectionIds,
}

impl DirectoryService {
    pub fn new(repository: Arc<dyn DocumentRepository>, collections: CollectionIds) -> Self {
        Self {
            repository,
            collections,
        }
    }

    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        let list = self
            .repository
            .list_documents(
                &self.collections.database_id,
                &self.collections.categories,
                vec![Query::limit(CATEGORY_PAGE_SIZE)],
            )
            .await?;

        Ok(decode_all::<CategoryDocument>(&list.documents)
            .into_iter()
            .map(Category::from)
            .collect())
    }

    /// Doctors matching `query` by name, optionally limited to one specialty.
    /// A blank query matches every doctor.
    pub async fn search_doctors(
        &self,
        query: &str,
        specialty: Option<&str>,
    ) -> Result<Vec<Doctor>> {
        let mut queries = vec![Query::equal("userType", DOCTOR_ROLE)];
        if let Some(specialty) = specialty.map(str::trim).filter(|s| !s.is_empty()) {
            queries.push(Query::equal("speciality", specialty));
        }
        let query = query.trim();
        if !query.is_empty() {
            queries.push(Query::search("name", query));
        }
        queries.push(Query::limit(DOCTOR_PAGE_SIZE));

        let list = self
            .repository
            .list_documents(
                &self.collections.database_id,
                &self.collections.users,
                queries,
            )
            .await?;

        debug!(total = list.total, "Doctor search returned");
        Ok(decode_all(&list.documents))
    }

    pub async fn get_doctor_by_id(&self, doctor_id: &str) -> Result<Option<Doctor>> {
        let document = match self
            .repository
            .get_document(
                &self.collections.database_id,
                &self.collections.users,
                doctor_id,
            )
            .await
        {
            Ok(document) => document,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let doctor: Doctor = document.decode().map_err(RepositoryError::from)?;
        match doctor.user_type.as_deref() {
            Some(role) if role != DOCTOR_ROLE => Ok(None),
            _ => Ok(Some(doctor)),
        }
    }

    /// Live number of doctors per specialty name.
    pub async fn get_specialty_counts(&self) -> Result<HashMap<String, u32>> {
        let list = self
            .repository
            .list_documents(
                &self.collections.database_id,
                &self.collections.users,
                vec![
                    Query::equal("userType", DOCTOR_ROLE),
                    Query::limit(SPECIALTY_COUNT_PAGE_SIZE),
                ],
            )
            .await?;

        if list.total > list.documents.len() as u64 {
            warn!(
                total = list.total,
                scanned = list.documents.len(),
                "Specialty counts only cover the first page of doctors"
            );
        }

        let mut counts = HashMap::new();
        for doctor in decode_all::<Doctor>(&list.documents) {
            if let Some(speciality) = doctor.speciality.filter(|s| !s.is_empty()) {
                *counts.entry(speciality).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

/// Decodes every document, skipping (and logging) the malformed ones.
fn decode_all<T: serde::de::DeserializeOwned>(documents: &[Document]) -> Vec<T> {
    documents
        .iter()
        .filter_map(|doc| match doc.decode() {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(document_id = %doc.id, "Skipping malformed document: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentList;
    use crate::repositories::document_repository::MockDocumentRepository;
    use crate::repositories::RemoteError;
    use mockall::predicate::*;
    use serde_json::{json, Value};

    fn collections() -> CollectionIds {
        CollectionIds {
            database_id: "db".to_string(),
            users: "users".to_string(),
            categories: "categories".to_string(),
        }
    }

    fn document(value: Value) -> Document {
        serde_json::from_value(value).expect("valid document")
    }

    fn list(documents: Vec<Document>) -> DocumentList {
        DocumentList {
            total: documents.len() as u64,
            documents,
        }
    }

    #[tokio::test]
    async fn test_get_categories_maps_documents() {
        let mut mock_repo = MockDocumentRepository::new();
        mock_repo
            .expect_list_documents()
            .with(eq("db"), eq("categories"), always())
            .times(1)
            .returning(|_, _, _| {
                let docs = list(vec![
                    document(json!({
                        "$id": "c1",
                        "$collectionId": "categories",
                        "name": "Cardiology",
                        "icon_name": "heartbeat",
                        "color": "#fff"
                    })),
                    document(json!({ "$id": "c2", "name": "Dentist", "icon_name": "teeth",
                        "color": "#000", "specialist_count": 3 })),
                ]);
                Box::pin(async move { Ok(docs) })
            });

        let service = DirectoryService::new(Arc::new(mock_repo), collections());

        let categories = service.get_categories().await.expect("categories");
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].id, "c1");
        assert_eq!(categories[0].specialist_count, 0);
        assert_eq!(categories[1].specialist_count, 3);
    }

    #[tokio::test]
    async fn test_search_doctors_builds_filters() {
        let mut mock_repo = MockDocumentRepository::new();
        let expected = vec![
            Query::equal("userType", "doctor"),
            Query::equal("speciality", "Cardiology"),
            Query::search("name", "grey"),
            Query::limit(DOCTOR_PAGE_SIZE),
        ];
        mock_repo
            .expect_list_documents()
            .with(eq("db"), eq("users"), eq(expected))
            .times(1)
            .returning(|_, _, _| Box::pin(async move { Ok(list(vec![])) }));

        let service = DirectoryService::new(Arc::new(mock_repo), collections());

        let doctors = service
            .search_doctors(" grey ", Some("Cardiology"))
            .await
            .expect("search");
        assert!(doctors.is_empty());
    }

    #[tokio::test]
    async fn test_get_doctor_by_id_not_found_is_none() {
        let mut mock_repo = MockDocumentRepository::new();
        mock_repo
            .expect_get_document()
            .with(eq("db"), eq("users"), eq("missing"))
            .times(1)
            .returning(|_, _, _| {
                Box::pin(async move {
                    Err(RepositoryError::Remote(RemoteError {
                        message: "Document with the requested ID could not be found.".to_string(),
                        code: 404,
                        kind: Some("document_not_found".to_string()),
                    }))
                })
            });

        let service = DirectoryService::new(Arc::new(mock_repo), collections());

        let result = service.get_doctor_by_id("missing").await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_specialty_counts_group_by_speciality() {
        let mut mock_repo = MockDocumentRepository::new();
        mock_repo
            .expect_list_documents()
            .times(1)
            .returning(|_, _, _| {
                let docs = list(vec![
                    document(json!({ "$id": "d1", "name": "A", "speciality": "Cardiology" })),
                    document(json!({ "$id": "d2", "name": "B", "speciality": "Cardiology" })),
                    document(json!({ "$id": "d3", "name": "C", "speciality": "Dentist" })),
                    document(json!({ "$id": "d4", "name": "D" })),
                ]);
                Box::pin(async move { Ok(docs) })
            });

        let service = DirectoryService::new(Arc::new(mock_repo), collections());

        let counts = service.get_specialty_counts().await.expect("counts");
        assert_eq!(counts.get("Cardiology"), Some(&2));
        assert_eq!(counts.get("Dentist"), Some(&1));
        assert_eq!(counts.len(), 2);
    }
}
