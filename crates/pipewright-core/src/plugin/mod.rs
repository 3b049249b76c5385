//! Plugin loading.
//!
//! - `backend` -- command and preset strategy backends
//! - `loader` -- path collection, manifest discovery, per-file fault isolation
//!
//! [`ManifestDirectory`] exposes a directory of manifests as an
//! [`EntrypointSource`], which is how installed plugins under
//! `$PIPEWRIGHT_HOME/plugins` are picked up.

pub mod backend;
pub mod loader;

use std::path::{Path, PathBuf};

use pipewright_types::plugin::PluginStatus;

use crate::registry::{EntrypointSource, StrategyRegistry};

pub use loader::{
    LoadOptions, PLUGINS_ENV, PluginError, collect_plugin_paths, load_manifest_file, load_plugins,
    manifest_label, parse_manifest, plugin_paths_from_env,
};

/// A directory of manifests loaded as one entry point.
#[derive(Debug, Clone)]
pub struct ManifestDirectory {
    name: String,
    dir: PathBuf,
}

impl ManifestDirectory {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }

    /// The installed-plugins directory under the Pipewright home.
    pub fn installed(home: &Path) -> Self {
        Self::new("installed-plugins", home.join("plugins"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl EntrypointSource for ManifestDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    /// A missing directory is not an error; a manifest that fails to load is.
    fn register(&self, registry: &mut StrategyRegistry) -> anyhow::Result<()> {
        if !self.dir.is_dir() {
            tracing::debug!(dir = %self.dir.display(), "no installed plugin directory");
            return Ok(());
        }
        let results = load_plugins(registry, &[self.dir.clone()], &LoadOptions::default())?;
        let failed: Vec<String> = results
            .iter()
            .filter(|r| r.status == PluginStatus::ImportError)
            .map(|r| r.path.display().to_string())
            .collect();
        if !failed.is_empty() {
            anyhow::bail!("{} manifest(s) failed to load: {}", failed.len(), failed.join(", "));
        }
        Ok(())
    }
}
