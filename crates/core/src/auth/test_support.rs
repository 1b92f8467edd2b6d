//! In-memory doubles shared by the unit tests of this crate

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use lessonhub_domain::{ApiError, Result};
use parking_lot::Mutex;

use super::ports::TokenStore;

/// Map-backed store that can be told to fail or suspend on removals
#[derive(Debug, Default)]
pub(crate) struct RecordingStore {
    values: Mutex<HashMap<String, String>>,
    fail_removals: AtomicBool,
    yield_on_removal: AtomicBool,
}

impl RecordingStore {
    pub(crate) fn put(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_owned(), value.to_owned());
    }

    pub(crate) fn value(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.values.lock().contains_key(key)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    pub(crate) fn fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }

    /// Make every removal give the scheduler a turn, like a keychain or
    /// file backend would
    pub(crate) fn yield_on_removal(&self, enabled: bool) {
        self.yield_on_removal.store(enabled, Ordering::SeqCst);
    }
}

#[async_trait]
impl TokenStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.yield_on_removal.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(ApiError::storage(format!("cannot remove {key}")));
        }
        self.values.lock().remove(key);
        Ok(())
    }
}
