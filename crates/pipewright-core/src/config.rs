//! Global configuration loading.
//!
//! Reads `config.toml` from the Pipewright home (`~/.pipewright/` unless
//! `PIPEWRIGHT_HOME` is set) into [`GlobalConfig`]. Falls back to defaults
//! when the file is missing or malformed.

use std::path::{Path, PathBuf};

use pipewright_types::config::GlobalConfig;

use crate::registry::{DuplicatePolicy, StrategyRegistry};

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "PIPEWRIGHT_HOME";

/// Resolve the Pipewright home directory.
pub fn pipewright_home() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pipewright")
}

/// Load global configuration from `path`.
///
/// - Missing file: [`GlobalConfig::default()`].
/// - Unreadable or unparseable file: logs a warning, returns the default.
pub fn load_global_config(path: &Path) -> GlobalConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            GlobalConfig::default()
        }
    }
}

/// Empty registry honouring the configured duplicate policy.
pub fn registry_from_config(config: &GlobalConfig) -> StrategyRegistry {
    let policy = if config.registry.reject_duplicates {
        DuplicatePolicy::Reject
    } else {
        DuplicatePolicy::Overwrite
    };
    StrategyRegistry::with_policy(policy)
}
