//! Global configuration types for Pipewright.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls plugin
//! discovery, registry duplicate handling, workflow limits and log format.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.pipewright/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub plugins: PluginConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Plugin discovery settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Extra plugin files or directories, loaded after `PIPEWRIGHT_PLUGINS`.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    /// Family whose newly loaded entries are aliased into the flat
    /// convenience namespace.
    #[serde(default)]
    pub reexport_family: Option<String>,
    /// Fail when no configured path resolves to a plugin source.
    #[serde(default)]
    pub require_any: bool,
}

/// Strategy registry behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Reject re-registration of an existing `(family, name)` instead of
    /// overwriting it.
    #[serde(default)]
    pub reject_duplicates: bool,
}

/// Workflow graph execution limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Maximum supersteps per workflow run.
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,
}

fn default_recursion_limit() -> usize {
    25
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            recursion_limit: default_recursion_limit(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
