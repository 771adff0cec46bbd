pub mod config;
pub mod error;
pub mod models;
pub mod navigation;
pub mod repositories;
pub mod services;
pub mod storage;
pub mod store;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use std::sync::Arc;
use tracing::info;

use crate::config::{BackendConfig, CollectionIds};
use crate::repositories::{
    AccountRepository, AppwriteAccountRepository, AppwriteClient, AppwriteDocumentRepository,
    DocumentRepository,
};
use crate::services::{AccountService, DirectoryService, ProfileService};
use crate::storage::KeyValueStorage;
use crate::store::{
    persist_on_change, rehydrate, AuthState, AuthStore, CategoriesStore, PersistedAuth,
    RecentlyViewedState, RecentlyViewedStore, AUTH_STORAGE_KEY, RECENTLY_VIEWED_STORAGE_KEY,
};

/// Every service and store of the app, wired once at start.
#[derive(Clone)]
pub struct AppContext {
    pub account_service: Arc<AccountService>,
    pub profile_service: Arc<ProfileService>,
    pub directory_service: Arc<DirectoryService>,
    pub auth_store: Arc<AuthStore>,
    pub categories_store: Arc<CategoriesStore>,
    pub recently_viewed_store: Arc<RecentlyViewedStore>,
    pub storage: Arc<dyn KeyValueStorage>,
}

impl AppContext {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        documents: Arc<dyn DocumentRepository>,
        storage: Arc<dyn KeyValueStorage>,
        collections: CollectionIds,
    ) -> Self {
        Self::with_recently_viewed(
            accounts,
            documents,
            storage,
            collections,
            RecentlyViewedStore::new(),
        )
    }

    /// Like [`AppContext::new`] with a caller-built recently-viewed store,
    /// for example one with a fixed clock.
    pub fn with_recently_viewed(
        accounts: Arc<dyn AccountRepository>,
        documents: Arc<dyn DocumentRepository>,
        storage: Arc<dyn KeyValueStorage>,
        collections: CollectionIds,
        recently_viewed: RecentlyViewedStore,
    ) -> Self {
        let account_service = Arc::new(AccountService::new(accounts));
        let profile_service = Arc::new(ProfileService::new(
            documents.clone(),
            collections.clone(),
        ));
        let directory_service = Arc::new(DirectoryService::new(documents, collections));

        Self {
            auth_store: Arc::new(AuthStore::new(
                account_service.clone(),
                profile_service.clone(),
            )),
            categories_store: Arc::new(CategoriesStore::new(directory_service.clone())),
            recently_viewed_store: Arc::new(recently_viewed),
            account_service,
            profile_service,
            directory_service,
            storage,
        }
    }

    /// Wires the Appwrite repositories. The session credential shares
    /// `storage` with the stores.
    pub fn from_config(config: &BackendConfig, storage: Arc<dyn KeyValueStorage>) -> Self {
        let client = AppwriteClient::new(config).with_cookie_storage(storage.clone());
        info!(endpoint = client.endpoint(), "Using Appwrite backend");

        Self::new(
            Arc::new(AppwriteAccountRepository::new(client.clone())),
            Arc::new(AppwriteDocumentRepository::new(client)),
            storage,
            config.collections.clone(),
        )
    }

    /// Restores persisted state, starts persisting every later change, and
    /// marks the auth store hydrated. Call once, before routing.
    pub fn hydrate(&self) {
        if self.auth_store.has_hydrated() {
            return;
        }

        if let Some(persisted) =
            rehydrate::<PersistedAuth>(self.storage.as_ref(), AUTH_STORAGE_KEY)
        {
            self.auth_store.restore(persisted);
        }
        if let Some(persisted) =
            rehydrate::<RecentlyViewedState>(self.storage.as_ref(), RECENTLY_VIEWED_STORAGE_KEY)
        {
            self.recently_viewed_store.restore(persisted);
        }

        persist_on_change(
            self.auth_store.cell(),
            self.storage.clone(),
            AUTH_STORAGE_KEY,
            AuthState::persisted,
        );
        persist_on_change(
            self.recently_viewed_store.cell(),
            self.storage.clone(),
            RECENTLY_VIEWED_STORAGE_KEY,
            RecentlyViewedState::clone,
        );

        self.auth_store.set_has_hydrated(true);
        info!(
            logged_in = self.auth_store.is_logged_in(),
            recent = self.recently_viewed_store.len(),
            "Hydrated local state"
        );
    }
}
