//! Plugin manifest and load-summary types.
//!
//! A plugin file is a YAML or TOML manifest declaring strategies. Loading a
//! manifest applies its registrations to the strategy registry; the loader
//! reports one `PluginLoadResult` per distinct file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::Kwargs;

// ---------------------------------------------------------------------------
// StrategyKey
// ---------------------------------------------------------------------------

/// A `(family, name)` registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StrategyKey {
    pub family: String,
    pub name: String,
}

impl StrategyKey {
    pub fn new(family: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            name: name.into(),
        }
    }

    /// Split a `family.name` target on its first dot.
    ///
    /// Returns `None` for bare names (no dot).
    pub fn parse_dotted(target: &str) -> Option<Self> {
        let (family, name) = target.split_once('.')?;
        Some(Self::new(family, name))
    }
}

impl std::fmt::Display for StrategyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.family, self.name)
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// A plugin manifest file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Optional display name for load logs; the file stem stands in when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub strategies: Vec<PluginStrategy>,
}

/// One strategy declared by a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginStrategy {
    pub family: String,
    pub name: String,
    #[serde(flatten)]
    pub backend: StrategyBackend,
}

/// How a plugin strategy is executed.
///
/// Internally tagged by `kind`:
/// ```yaml
/// kind: command
/// program: python3
/// args: ["boost.py"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyBackend {
    /// Spawn a process; kwargs are written to stdin as JSON and stdout is
    /// read back as the return value.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
    /// Bind default kwargs onto an already-registered strategy.
    Preset {
        /// `family.name` or bare name of the wrapped strategy.
        target: String,
        #[serde(default)]
        defaults: Kwargs,
    },
}

// ---------------------------------------------------------------------------
// Load summary
// ---------------------------------------------------------------------------

/// Outcome of loading one plugin source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    Loaded,
    NotFound,
    ImportError,
}

impl std::fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginStatus::Loaded => write!(f, "loaded"),
            PluginStatus::NotFound => write!(f, "not_found"),
            PluginStatus::ImportError => write!(f, "import_error"),
        }
    }
}

/// Informational record of one plugin load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginLoadResult {
    pub path: PathBuf,
    pub status: PluginStatus,
    /// Keys that did not exist in the registry before this source loaded.
    #[serde(default)]
    pub registered: Vec<StrategyKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PluginLoadResult {
    pub fn not_found(path: PathBuf) -> Self {
        Self {
            path,
            status: PluginStatus::NotFound,
            registered: Vec::new(),
            error: None,
        }
    }
}
