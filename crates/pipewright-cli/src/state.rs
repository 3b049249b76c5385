//! Shared runtime state for CLI commands.
//!
//! Loads the global config, builds the strategy and node registries, and
//! applies entry points and plugin manifests in a fixed order:
//! built-ins, installed plugins, then `PIPEWRIGHT_PLUGINS` + config + CLI paths.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use pipewright_core::builtin::{register_builtin_nodes, register_builtins};
use pipewright_core::config::{load_global_config, pipewright_home, registry_from_config};
use pipewright_core::plugin::{LoadOptions, ManifestDirectory, load_plugins, plugin_paths_from_env};
use pipewright_core::registry::{EntrypointSource, NodeRegistry, StrategyRegistry};
use pipewright_types::config::GlobalConfig;
use pipewright_types::plugin::PluginLoadResult;

pub struct AppState {
    pub home: PathBuf,
    pub config: GlobalConfig,
    pub strategies: StrategyRegistry,
    pub nodes: NodeRegistry,
    /// One entry per plugin path or manifest applied during init.
    pub plugin_results: Vec<PluginLoadResult>,
}

impl AppState {
    /// Read the config only; registries stay empty until [`AppState::init`].
    pub fn config_only(config_path: Option<&Path>) -> (PathBuf, GlobalConfig) {
        let home = pipewright_home();
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| home.join("config.toml"));
        let config = load_global_config(&path);
        (home, config)
    }

    pub fn init(config_path: Option<&Path>, cli_plugins: &[PathBuf]) -> Result<Self> {
        let (home, config) = Self::config_only(config_path);

        let mut strategies = registry_from_config(&config);
        register_builtins(&mut strategies).context("Failed to register built-in strategies")?;

        let installed = ManifestDirectory::installed(&home);
        let sources: [&dyn EntrypointSource; 1] = [&installed];
        let added = strategies.load_entrypoints(&sources);
        tracing::debug!(added, "entry points applied");

        let mut explicit = config.plugins.paths.clone();
        explicit.extend(cli_plugins.iter().cloned());
        let paths = plugin_paths_from_env(&explicit);
        let options = LoadOptions {
            require_any: config.plugins.require_any,
            reexport_family: config.plugins.reexport_family.clone(),
        };
        let plugin_results = if paths.is_empty() {
            Vec::new()
        } else {
            load_plugins(&mut strategies, &paths, &options)?
        };

        let mut nodes = NodeRegistry::new();
        register_builtin_nodes(&mut nodes);

        Ok(Self {
            home,
            config,
            strategies,
            nodes,
            plugin_results,
        })
    }
}
