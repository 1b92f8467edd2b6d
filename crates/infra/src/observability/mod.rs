//! Tracing subscriber installation
//!
//! `RUST_LOG` wins over the configured filter so a single run can be made
//! verbose without editing config. Output goes to stderr, as JSON lines
//! when `logging.json` is set.

use std::io::IsTerminal;

use lessonhub_domain::{ApiError, LoggingConfig, Result};
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, else from `config.filter`
///
/// # Errors
/// Returns `Config` when the configured directive is invalid.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|err| {
        ApiError::config(format!("Invalid logging.filter '{}': {err}", config.filter))
    })
}

/// Install the global subscriber
///
/// Returns `Ok(false)` when a subscriber was already installed, so tests and
/// embedding applications can call it freely.
///
/// # Errors
/// Returns `Config` when the filter directive is invalid.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    let installed = if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.with_ansi(std::io::stderr().is_terminal()).try_init().is_ok()
    };

    if installed {
        tracing::debug!(filter = %config.filter, json = config.json, "Tracing initialised");
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use lessonhub_domain::ErrorKind;

    use super::*;

    #[test]
    fn invalid_filter_is_config_error() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig { filter: "lessonhub=loud".into(), json: false };
        assert_eq!(env_filter(&config).unwrap_err().kind, ErrorKind::Config);
    }

    #[test]
    fn second_init_reports_existing_subscriber() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config).unwrap());
    }
}
