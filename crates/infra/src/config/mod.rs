//! Configuration loading
//!
//! Reads [`ClientConfig`](lessonhub_domain::ClientConfig) from `LESSONHUB_*`
//! environment variables or from a TOML/JSON file.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
