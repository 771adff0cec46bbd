use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use super::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "https://cloud.appwrite.io/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DATA_DIR: &str = ".medicare";

/// Database and collection identifiers the accessors read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionIds {
    pub database_id: String,
    pub users: String,
    pub categories: String,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub endpoint: String,
    pub project_id: String,
    pub collections: CollectionIds,
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = env::var("APPWRITE_ENDPOINT")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "APPWRITE_ENDPOINT",
                reason: format!("'{}' is not an http(s) URL", endpoint),
            });
        }
        if endpoint.starts_with("http://") {
            warn!("APPWRITE_ENDPOINT uses plain http; session cookies travel unencrypted");
        }

        let timeout = match env::var("APPWRITE_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ConfigError::Invalid {
                    key: "APPWRITE_TIMEOUT_SECS",
                    reason: e.to_string(),
                })?,
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id: required("APPWRITE_PROJECT_ID")?,
            collections: CollectionIds {
                database_id: required("APPWRITE_DATABASE_ID")?,
                users: required("APPWRITE_USER_COLLECTION_ID")?,
                categories: required("APPWRITE_CATEGORIES_COLLECTION_ID")?,
            },
            timeout,
        })
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let data_dir = env::var("MEDICARE_DATA_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        Self {
            data_dir: PathBuf::from(data_dir),
        }
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::Missing(key)),
    }
}
