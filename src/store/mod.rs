pub mod auth_store;
pub mod categories_store;
pub mod persist;
pub mod recently_viewed_store;
pub mod state;

pub use auth_store::{AuthState, AuthStore, PersistedAuth, AUTH_STORAGE_KEY};
pub use categories_store::{CategoriesState, CategoriesStore};
pub use persist::{persist_on_change, rehydrate, PERSIST_VERSION};
pub use recently_viewed_store::{
    RecentlyViewedState, RecentlyViewedStore, DEFAULT_RECENT_LIMIT, MAX_RECENT_DOCTORS,
    RECENTLY_VIEWED_STORAGE_KEY,
};
pub use state::StateCell;
