use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::state::StateCell;
use crate::error::Result;
use crate::models::Category;
use crate::services::DirectoryService;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoriesState {
    pub categories: Vec<Category>,
    pub loading: bool,
    pub error: Option<String>,
}

impl CategoriesState {
    /// Replaces every `specialist_count` with the live count for its name.
    /// Names without doctors become zero.
    pub fn apply_counts(&mut self, counts: &HashMap<String, u32>) {
        for category in &mut self.categories {
            category.specialist_count = counts.get(&category.name).copied().unwrap_or(0);
        }
    }
}

/// Cached specialty list. Not persisted.
pub struct CategoriesStore {
    state: StateCell<CategoriesState>,
    directory: Arc<DirectoryService>,
}

impl CategoriesStore {
    pub fn new(directory: Arc<DirectoryService>) -> Self {
        Self {
            state: StateCell::new(CategoriesState::default()),
            directory,
        }
    }

    pub fn state(&self) -> CategoriesState {
        self.state.get()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.state.read(|s| s.categories.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<CategoriesState> {
        self.state.subscribe()
    }

    /// Loads the category list, then starts a background refresh of the
    /// specialist counts. Returns the handle of that refresh when the list
    /// loaded; the refresh never touches `loading`.
    ///
    /// On failure the previous categories are kept and `error` is set.
    pub async fn fetch_categories(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        self.state.update(|s| {
            s.loading = true;
            s.error = None;
        });

        match self.directory.get_categories().await {
            Ok(categories) => {
                debug!(count = categories.len(), "Fetched categories");
                self.state.update(|s| {
                    s.categories = categories;
                    s.loading = false;
                });

                let store = Arc::clone(self);
                Some(tokio::spawn(async move {
                    if let Err(e) = store.update_specialty_counts().await {
                        warn!("Failed to update specialty counts: {}", e);
                    }
                }))
            }
            Err(e) => {
                error!("Error fetching categories: {}", e);
                self.state.update(|s| {
                    s.error = Some(e.user_message());
                    s.loading = false;
                });
                None
            }
        }
    }

    /// Merges live specialist counts into the cached categories.
    pub async fn update_specialty_counts(&self) -> Result<()> {
        let counts = self.directory.get_specialty_counts().await?;
        self.state.update(|s| s.apply_counts(&counts));
        Ok(())
    }

    /// Cached categories whose name contains `query`, ignoring case. A blank
    /// query matches nothing.
    pub fn search(&self, query: &str) -> Vec<Category> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        self.state.read(|s| {
            s.categories
                .iter()
                .filter(|c| c.name.to_lowercase().contains(&query))
                .cloned()
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, name: &str, count: u32) -> Category {
        Category {
            id: id.to_string(),
            name: name.to_string(),
            icon_name: "icon".to_string(),
            color: "#fff".to_string(),
            specialist_count: count,
        }
    }

    #[test]
    fn test_apply_counts_zeroes_absent_names() {
        let mut state = CategoriesState {
            categories: vec![category("c1", "Cardiology", 1), category("c2", "Dentist", 9)],
            ..Default::default()
        };

        let counts = HashMap::from([("Cardiology".to_string(), 5)]);
        state.apply_counts(&counts);

        assert_eq!(state.categories[0].specialist_count, 5);
        assert_eq!(state.categories[1].specialist_count, 0);
    }
}
