//! [`TokenStore`] implementations
//!
//! - [`KeychainTokenStore`]: OS keychain (default)
//! - [`FileTokenStore`]: JSON map on disk
//! - [`MemoryTokenStore`]: process-local, for tests and ephemeral sessions

mod file;
mod keychain;
mod memory;

use std::sync::Arc;

pub use file::FileTokenStore;
pub use keychain::KeychainTokenStore;
use lessonhub_core::TokenStore;
use lessonhub_domain::{ApiError, Result, StorageBackend, StorageConfig};
pub use memory::MemoryTokenStore;
use tracing::debug;

/// Build the store selected by `config`
///
/// # Errors
/// Returns `Config` when the file backend has no path.
pub fn build_store(config: &StorageConfig) -> Result<Arc<dyn TokenStore>> {
    debug!(backend = %config.backend, "Creating token store");
    let store: Arc<dyn TokenStore> = match config.backend {
        StorageBackend::Keychain => Arc::new(KeychainTokenStore::new(&config.service_name)),
        StorageBackend::File => {
            let path = config.path.clone().ok_or_else(|| {
                ApiError::config("storage.path is required for the file backend")
            })?;
            Arc::new(FileTokenStore::new(path))
        }
        StorageBackend::Memory => Arc::new(MemoryTokenStore::new()),
    };
    Ok(store)
}
