use crate::config::CollectionIds;
use crate::error::{ErrorKind, Result};
use crate::models::{Document, NewProfile, UserProfile};
use crate::repositories::{DocumentRepository, Query, RepositoryError};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, warn};

/// Profile documents in the users collection, keyed by account id.
pub struct ProfileService {
    repository: Arc<dyn DocumentRepository>,
    collections: CollectionIds,
}

impl ProfileService {
    pub fn new(repository: Arc<dyn DocumentRepository>, collections: CollectionIds) -> Self {
        Self {
            repository,
            collections,
        }
    }

    pub async fn create_user_profile(
        &self,
        user_id: &str,
        profile: &NewProfile,
    ) -> Result<Document> {
        let mut data = serde_json::to_value(profile).map_err(RepositoryError::from)?;
        if let Value::Object(map) = &mut data {
            map.insert("userId".to_string(), Value::String(user_id.to_string()));
        }

        let document_id = uuid::Uuid::new_v4().simple().to_string();
        self.repository
            .create_document(
                &self.collections.database_id,
                &self.collections.users,
                &document_id,
                data,
            )
            .await
            .map_err(|e| {
                error!("Error creating user profile: {}", e);
                e.into()
            })
    }

    /// The profile of `user_id`, or `None` when there is none or it cannot be
    /// read without a session.
    pub async fn get_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let result = self
            .repository
            .list_documents(
                &self.collections.database_id,
                &self.collections.users,
                vec![Query::equal("userId", user_id), Query::limit(1)],
            )
            .await;

        let list = match result {
            Ok(list) => list,
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotAuthenticated) => {
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        match list.documents.first().map(Document::decode::<UserProfile>) {
            Some(Ok(profile)) => Ok(Some(profile)),
            Some(Err(e)) => {
                warn!(user_id, "Ignoring malformed profile document: {}", e);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
