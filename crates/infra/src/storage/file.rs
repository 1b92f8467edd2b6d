//! JSON file backed store
//!
//! The whole map is rewritten on every change: serialized to a sibling
//! temp file, then renamed over the target so a crash never leaves a
//! half-written file behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lessonhub_core::TokenStore;
use lessonhub_domain::{ApiError, Result};
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::InfraError;

type Entries = BTreeMap<String, String>;

#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Entries> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(Entries::new()),
            Ok(text) => serde_json::from_str(&text).map_err(|err| {
                ApiError::storage(format!(
                    "token file {} is not a JSON object: {err}",
                    self.path.display()
                ))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    async fn save(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(InfraError::from)?;
        }

        let json = serde_json::to_vec_pretty(entries)
            .map_err(|err| ApiError::storage(format!("failed to encode token file: {err}")))?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await.map_err(InfraError::from)?;
        tokio::fs::rename(&temp, &self.path).await.map_err(InfraError::from)?;
        debug!(path = %self.path.display(), entries = entries.len(), "Token file written");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_owned(), value.to_owned());
        self.save(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.save(&entries).await
    }
}
