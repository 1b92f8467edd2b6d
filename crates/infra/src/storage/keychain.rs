//! OS keychain backed store
//!
//! One keychain entry per key under a shared service name
//! (macOS Keychain, Windows Credential Manager, Secret Service on Linux).
//! Keychain calls block, so they run on the blocking pool.

use async_trait::async_trait;
use keyring::Entry;
use lessonhub_core::TokenStore;
use lessonhub_domain::{ApiError, Result};
use tracing::debug;

use crate::errors::InfraError;

#[derive(Debug, Clone)]
pub struct KeychainTokenStore {
    service_name: String,
}

impl KeychainTokenStore {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    async fn with_entry<T, F>(&self, key: &str, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> std::result::Result<T, keyring::Error> + Send + 'static,
    {
        let service = self.service_name.clone();
        let account = key.to_owned();
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &account).map_err(InfraError::from)?;
            operation(entry).map_err(InfraError::from)
        })
        .await
        .map_err(|err| ApiError::storage(format!("keychain task failed: {err}")))?
        .map_err(ApiError::from)
    }
}

#[async_trait]
impl TokenStore for KeychainTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        debug!(service = %self.service_name, key, "Reading keychain entry");
        self.with_entry(key, |entry| match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        debug!(service = %self.service_name, key, "Writing keychain entry");
        let value = value.to_owned();
        self.with_entry(key, move |entry| entry.set_password(&value)).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        debug!(service = %self.service_name, key, "Deleting keychain entry");
        self.with_entry(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err),
        })
        .await
    }
}
