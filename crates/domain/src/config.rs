//! Configuration management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_LOG_FILTER, DEFAULT_MAX_ATTEMPTS, DEFAULT_REFRESH_PATH,
    DEFAULT_SERVICE_NAME, DEFAULT_SIGNIN_PATH, DEFAULT_SIGNUP_PATH, DEFAULT_TIMEOUT_MS,
};
use crate::impl_domain_label_conversions;

/// Client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub auth: AuthEndpoints,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Total attempts for transient transport failures; `1` disables retry
    pub max_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            user_agent: None,
        }
    }
}

/// Paths of the authentication endpoints, relative to `api.base_url`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthEndpoints {
    pub signin_path: String,
    pub signup_path: String,
    pub refresh_path: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            signin_path: DEFAULT_SIGNIN_PATH.to_string(),
            signup_path: DEFAULT_SIGNUP_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
        }
    }
}

/// Where session credentials are persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// OS keychain
    #[default]
    Keychain,
    /// JSON file on disk
    File,
    /// Process memory only
    Memory,
}

impl_domain_label_conversions!(StorageBackend {
    Keychain => "keychain",
    File => "file",
    Memory => "memory",
});

/// Token storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Keychain service name
    pub service_name: String,
    /// File path for the `file` backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            path: None,
        }
    }
}

/// Diagnostics output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: DEFAULT_LOG_FILTER.to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{ "api": { "base_url": "https://api.school.test" } }"#)
                .unwrap();
        assert_eq!(config.api.base_url, "https://api.school.test");
        assert_eq!(config.api.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(config.api.max_attempts, 1);
        assert_eq!(config.auth.signin_path, "/api/v1/auth/signin");
        assert_eq!(config.storage.backend, StorageBackend::Keychain);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_storage_backend_labels() {
        assert_eq!("FILE".parse::<StorageBackend>(), Ok(StorageBackend::File));
        assert_eq!(StorageBackend::Memory.to_string(), "memory");
        assert!("sqlite".parse::<StorageBackend>().is_err());

        let config: StorageConfig =
            serde_json::from_str(r#"{ "backend": "file", "path": "/tmp/s.json" }"#).unwrap();
        assert_eq!(config.backend, StorageBackend::File);
        assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
    }
}
