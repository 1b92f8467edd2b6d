//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Environment variables, when `LESSONHUB_API_BASE_URL` is set
//! 2. Otherwise the first config file found by [`probe_config_paths`]
//! 3. JSON and TOML are both accepted, chosen by file extension
//!
//! ## Environment Variables
//! - `LESSONHUB_API_BASE_URL`: backend origin (required for env loading)
//! - `LESSONHUB_API_TIMEOUT_MS`: per-request deadline in milliseconds
//! - `LESSONHUB_API_MAX_ATTEMPTS`: transport attempts per request
//! - `LESSONHUB_STORAGE_BACKEND`: `keychain`, `file` or `memory`
//! - `LESSONHUB_STORAGE_PATH`: token file for the `file` backend
//! - `LESSONHUB_LOG_FILTER`: default tracing filter
//! - `LESSONHUB_LOG_JSON`: JSON log lines (true/false)
//!
//! Anything not set keeps its default.
//!
//! ## File Locations
//! 1. `./lessonhub.{toml,json}`, then `./config.{toml,json}`
//! 2. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use lessonhub_domain::{ApiError, ClientConfig, Result, StorageBackend};

const FILE_NAMES: [&str; 4] = ["lessonhub.toml", "lessonhub.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `Config` when neither source yields a valid configuration.
pub fn load() -> Result<ClientConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `LESSONHUB_*` variables
///
/// # Errors
/// Returns `Config` when `LESSONHUB_API_BASE_URL` is missing or a value
/// cannot be parsed.
pub fn load_from_env() -> Result<ClientConfig> {
    let mut config = ClientConfig::default();
    config.api.base_url = env_var("LESSONHUB_API_BASE_URL")?;

    if let Some(timeout) = env_parse::<u64>("LESSONHUB_API_TIMEOUT_MS")? {
        config.api.timeout_ms = timeout;
    }
    if let Some(attempts) = env_parse::<u32>("LESSONHUB_API_MAX_ATTEMPTS")? {
        config.api.max_attempts = attempts;
    }
    if let Some(backend) = optional_env("LESSONHUB_STORAGE_BACKEND") {
        config.storage.backend = StorageBackend::from_str(&backend).map_err(ApiError::config)?;
    }
    if let Some(path) = optional_env("LESSONHUB_STORAGE_PATH") {
        config.storage.path = Some(PathBuf::from(path));
    }
    if let Some(filter) = optional_env("LESSONHUB_LOG_FILTER") {
        config.logging.filter = filter;
    }
    config.logging.json = env_bool("LESSONHUB_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `Config` when the file is missing, unreadable, or malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ApiError::config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ApiError::config("No config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ApiError::config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration text, format chosen by the extension of `path`
///
/// # Errors
/// Returns `Config` for an unknown extension or invalid content.
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ApiError::config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ApiError::config(format!("Invalid JSON format: {e}"))),
        other => Err(ApiError::config(format!("Unsupported config format: '{other}'"))),
    }
}

/// First existing config file among the standard locations
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(FILE_NAMES.iter().map(|name| cwd.join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(FILE_NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.is_file())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    optional_env(key)
        .ok_or_else(|| ApiError::config(format!("Missing required environment variable: {key}")))
}

/// Set, non-blank environment variable
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| ApiError::config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use lessonhub_domain::ErrorKind;
    use once_cell::sync::Lazy;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_VARS: [&str; 7] = [
        "LESSONHUB_API_BASE_URL",
        "LESSONHUB_API_TIMEOUT_MS",
        "LESSONHUB_API_MAX_ATTEMPTS",
        "LESSONHUB_STORAGE_BACKEND",
        "LESSONHUB_STORAGE_PATH",
        "LESSONHUB_LOG_FILTER",
        "LESSONHUB_LOG_JSON",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("LESSONHUB_TEST_BOOL_ON", "On");
        std::env::set_var("LESSONHUB_TEST_BOOL_OFF", "0");
        std::env::remove_var("LESSONHUB_TEST_BOOL_MISSING");

        assert!(env_bool("LESSONHUB_TEST_BOOL_ON", false));
        assert!(!env_bool("LESSONHUB_TEST_BOOL_OFF", true));
        assert!(env_bool("LESSONHUB_TEST_BOOL_MISSING", true));

        std::env::remove_var("LESSONHUB_TEST_BOOL_ON");
        std::env::remove_var("LESSONHUB_TEST_BOOL_OFF");
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("LESSONHUB_API_BASE_URL", "https://api.school.test");
        std::env::set_var("LESSONHUB_API_TIMEOUT_MS", "5000");
        std::env::set_var("LESSONHUB_API_MAX_ATTEMPTS", "3");
        std::env::set_var("LESSONHUB_STORAGE_BACKEND", "File");
        std::env::set_var("LESSONHUB_STORAGE_PATH", "/tmp/lessonhub/session.json");
        std::env::set_var("LESSONHUB_LOG_FILTER", "lessonhub=debug");
        std::env::set_var("LESSONHUB_LOG_JSON", "true");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config from env");
        assert_eq!(config.api.base_url, "https://api.school.test");
        assert_eq!(config.api.timeout_ms, 5000);
        assert_eq!(config.api.max_attempts, 3);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/lessonhub/session.json")));
        assert_eq!(config.logging.filter, "lessonhub=debug");
        assert!(config.logging.json);
        assert_eq!(config.auth, Default::default());
    }

    #[test]
    fn test_load_from_env_missing_base_url() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.message.contains("LESSONHUB_API_BASE_URL"));
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("LESSONHUB_API_BASE_URL", "http://localhost:8080");
        std::env::set_var("LESSONHUB_API_TIMEOUT_MS", "soon");

        let result = load_from_env();
        clear_env();

        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.message.contains("LESSONHUB_API_TIMEOUT_MS"));
    }

    #[test]
    fn test_load_from_env_unknown_backend() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("LESSONHUB_API_BASE_URL", "http://localhost:8080");
        std::env::set_var("LESSONHUB_STORAGE_BACKEND", "cloud");

        let result = load_from_env();
        clear_env();

        assert_eq!(result.unwrap_err().kind, ErrorKind::Config);
    }

    #[test]
    fn test_load_from_file_not_found() {
        let err = load_from_file(Some(PathBuf::from("/nonexistent/lessonhub.toml"))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
    }

    #[test]
    fn test_parse_config_toml_partial() {
        let toml_content = r#"
[api]
base_url = "https://api.school.test"

[storage]
backend = "memory"
"#;

        let config = parse_config(toml_content, Path::new("lessonhub.toml")).unwrap();
        assert_eq!(config.api.base_url, "https://api.school.test");
        assert_eq!(config.api.timeout_ms, 30_000);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.auth.refresh_path, "/api/v1/auth/refresh");
    }

    #[test]
    fn test_parse_config_json() {
        let json_content = r#"{ "api": { "base_url": "http://localhost:9000", "timeout_ms": 100 } }"#;
        let config = parse_config(json_content, Path::new("config.json")).unwrap();
        assert_eq!(config.api.timeout_ms, 100);
    }

    #[test]
    fn test_parse_config_invalid_json() {
        let err = parse_config(r#"{ "api": "#, Path::new("config.json")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let err = parse_config("api: {}", Path::new("lessonhub.yaml")).unwrap_err();
        assert!(err.message.contains("yaml"));
    }
}
