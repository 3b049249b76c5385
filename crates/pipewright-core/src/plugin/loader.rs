//! Plugin manifest discovery and loading.
//!
//! Each distinct manifest file is applied to the registry at most once per
//! `load_plugins` call, keyed by canonical path. A manifest that fails to
//! parse or register is recorded as `import_error` and loading continues
//! with the next file.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use pipewright_types::plugin::{
    PluginLoadResult, PluginManifest, PluginStatus, StrategyBackend, StrategyKey,
};

use crate::registry::{Strategy, StrategyRegistry};

use super::backend::{CommandSpec, command_strategy, preset_strategy};

/// Environment variable holding extra plugin paths, separated with the
/// platform path-list separator.
pub const PLUGINS_ENV: &str = "PIPEWRIGHT_PLUGINS";

/// File extensions recognised as plugin manifests.
pub const MANIFEST_EXTENSIONS: [&str; 3] = ["yaml", "yml", "toml"];

// ---------------------------------------------------------------------------
// Errors + options
// ---------------------------------------------------------------------------

/// Systemic loader failures. Per-file problems are reported in the
/// returned [`PluginLoadResult`]s instead.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("none of the {0} plugin path(s) resolved to a plugin manifest")]
    NothingResolved(usize),
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Fail with [`PluginError::NothingResolved`] when no path yields a
    /// manifest.
    pub require_any: bool,
    /// After loading, alias the entries newly registered under this family
    /// into the convenience namespace.
    pub reexport_family: Option<String>,
}

// ---------------------------------------------------------------------------
// Path collection
// ---------------------------------------------------------------------------

/// Merge environment-supplied paths (first) with explicit ones.
///
/// Empty entries in the environment list are skipped.
pub fn collect_plugin_paths(explicit: &[PathBuf], env_value: Option<&OsStr>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = env_value
        .map(|v| {
            std::env::split_paths(v)
                .filter(|p| !p.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default();
    paths.extend(explicit.iter().cloned());
    paths
}

/// [`collect_plugin_paths`] reading `PIPEWRIGHT_PLUGINS` from the process
/// environment.
pub fn plugin_paths_from_env(explicit: &[PathBuf]) -> Vec<PathBuf> {
    let env_value = std::env::var_os(PLUGINS_ENV);
    collect_plugin_paths(explicit, env_value.as_deref())
}

fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MANIFEST_EXTENSIONS.contains(&e))
}

/// Recursively collect manifest files under `dir`, sorted per directory.
fn discover_recursive(dir: &Path, results: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            discover_recursive(&path, results)?;
        } else if is_manifest(&path) {
            results.push(path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load every manifest reachable from `paths` into `registry`.
///
/// Returns one result per missing path and per distinct manifest file, in
/// discovery order. Only a systemic failure (see [`LoadOptions::require_any`])
/// is an `Err`.
pub fn load_plugins(
    registry: &mut StrategyRegistry,
    paths: &[PathBuf],
    options: &LoadOptions,
) -> Result<Vec<PluginLoadResult>, PluginError> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut results = Vec::new();

    for path in paths {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "plugin path not found");
            results.push(PluginLoadResult::not_found(path.clone()));
            continue;
        }

        let files = if path.is_dir() {
            let mut files = Vec::new();
            if let Err(e) = discover_recursive(path, &mut files) {
                tracing::warn!(path = %path.display(), error = %e, "cannot scan plugin directory");
                results.push(import_error(path.clone(), Vec::new(), &anyhow::Error::from(e)));
                continue;
            }
            files
        } else {
            vec![path.clone()]
        };

        for file in files {
            let canonical = match file.canonicalize() {
                Ok(p) => p,
                Err(e) => {
                    results.push(import_error(file, Vec::new(), &anyhow::Error::from(e)));
                    continue;
                }
            };
            if !seen.insert(canonical.clone()) {
                tracing::debug!(path = %canonical.display(), "plugin already loaded in this pass");
                continue;
            }
            results.push(load_manifest_file(registry, &canonical));
        }
    }

    let resolved = results.iter().any(|r| r.status != PluginStatus::NotFound);
    if options.require_any && !resolved {
        return Err(PluginError::NothingResolved(paths.len()));
    }

    if let Some(family) = &options.reexport_family {
        let names: Vec<String> = results
            .iter()
            .flat_map(|r| &r.registered)
            .filter(|key| &key.family == family)
            .map(|key| key.name.clone())
            .collect();
        let aliased = registry.reexport(family, &names);
        if !aliased.is_empty() {
            tracing::info!(family = family.as_str(), count = aliased.len(), "re-exported plugin strategies");
        }
    }

    Ok(results)
}

/// Apply one manifest and report which keys it added.
pub fn load_manifest_file(registry: &mut StrategyRegistry, path: &Path) -> PluginLoadResult {
    let before: HashSet<StrategyKey> = registry.keys().into_iter().collect();
    let outcome = apply_manifest(registry, path);
    let registered: Vec<StrategyKey> = registry
        .keys()
        .into_iter()
        .filter(|k| !before.contains(k))
        .collect();

    match outcome {
        Ok((plugin, declared)) => {
            tracing::debug!(
                plugin = plugin.as_str(),
                path = %path.display(),
                declared,
                added = registered.len(),
                "plugin loaded"
            );
            PluginLoadResult {
                path: path.to_path_buf(),
                status: PluginStatus::Loaded,
                registered,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %format!("{e:#}"), "plugin failed to load");
            import_error(path.to_path_buf(), registered, &e)
        }
    }
}

fn import_error(path: PathBuf, registered: Vec<StrategyKey>, error: &anyhow::Error) -> PluginLoadResult {
    PluginLoadResult {
        path,
        status: PluginStatus::ImportError,
        registered,
        error: Some(format!("{error:#}")),
    }
}

/// Parse a manifest by extension.
pub fn parse_manifest(path: &Path) -> anyhow::Result<PluginManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_toml = path.extension().is_some_and(|e| e == "toml");
    let manifest = if is_toml {
        toml::from_str(&content).with_context(|| format!("invalid TOML manifest {}", path.display()))?
    } else {
        serde_yaml_ng::from_str(&content)
            .with_context(|| format!("invalid YAML manifest {}", path.display()))?
    };
    Ok(manifest)
}

/// Name a manifest for logs: its `name`, else the file stem.
pub fn manifest_label(manifest: &PluginManifest, path: &Path) -> String {
    manifest
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| path.display().to_string())
}

/// Register every strategy in the manifest. Returns the manifest label and
/// how many strategies were declared.
fn apply_manifest(registry: &mut StrategyRegistry, path: &Path) -> anyhow::Result<(String, usize)> {
    let manifest = parse_manifest(path)?;
    let plugin = manifest_label(&manifest, path);
    let workdir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    for decl in &manifest.strategies {
        let key = StrategyKey::new(decl.family.as_str(), decl.name.as_str());
        let strategy: Strategy = match &decl.backend {
            StrategyBackend::Command { program, args, env } => command_strategy(CommandSpec {
                label: key.to_string(),
                program: program.clone(),
                args: args.clone(),
                env: env.clone(),
                workdir: workdir.clone(),
            }),
            StrategyBackend::Preset { target, defaults } => {
                preset_strategy(registry, target, defaults.clone())
                    .with_context(|| format!("preset '{key}' cannot bind '{target}'"))?
            }
        };
        registry
            .register(&decl.family, &decl.name, strategy)
            .with_context(|| format!("cannot register '{key}'"))?;
        tracing::debug!(plugin = plugin.as_str(), strategy = %key, "registered plugin strategy");
    }

    Ok((plugin, manifest.strategies.len()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DuplicatePolicy;
    use pipewright_types::Kwargs;
    use serde_json::{Value, json};

    fn echo_registry() -> StrategyRegistry {
        let mut reg = StrategyRegistry::new();
        reg.register_fn("test", "echo", |kw| Ok(Value::Object(kw))).unwrap();
        reg
    }

    const PRESET_YAML: &str = r#"
strategies:
  - family: extra
    name: tagged
    kind: preset
    target: test.echo
    defaults: { tag: "x" }
"#;

    // -----------------------------------------------------------------------
    // Path collection
    // -----------------------------------------------------------------------

    #[test]
    fn test_env_paths_come_first() {
        let env = std::env::join_paths(["/env/a", "/env/b"]).unwrap();
        let paths = collect_plugin_paths(&[PathBuf::from("/cli/c")], Some(env.as_os_str()));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/env/a"),
                PathBuf::from("/env/b"),
                PathBuf::from("/cli/c")
            ]
        );
    }

    #[test]
    fn test_no_env_value() {
        let paths = collect_plugin_paths(&[PathBuf::from("x.yaml")], None);
        assert_eq!(paths, vec![PathBuf::from("x.yaml")]);
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    #[test]
    fn test_load_preset_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("extra.yaml");
        std::fs::write(&file, PRESET_YAML).unwrap();

        let mut reg = echo_registry();
        let results = load_plugins(&mut reg, &[file], &LoadOptions::default()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, PluginStatus::Loaded);
        assert_eq!(results[0].registered, vec![StrategyKey::new("extra", "tagged")]);

        let out = reg.get("extra", "tagged").unwrap().call(Kwargs::new()).unwrap();
        assert_eq!(out, json!({"tag": "x"}));
    }

    #[test]
    fn test_same_file_twice_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("extra.yaml");
        std::fs::write(&file, PRESET_YAML).unwrap();

        let mut reg = echo_registry();
        let paths = vec![dir.path().to_path_buf(), file.clone(), file];
        let results = load_plugins(&mut reg, &paths, &LoadOptions::default()).unwrap();
        assert_eq!(results.len(), 1);
        let total: usize = results.iter().map(|r| r.registered.len()).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_bad_file_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_bad.yaml"), "strategies: [ {").unwrap();
        std::fs::write(dir.path().join("b_good.yaml"), PRESET_YAML).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut reg = echo_registry();
        let results =
            load_plugins(&mut reg, &[dir.path().to_path_buf()], &LoadOptions::default()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, PluginStatus::ImportError);
        assert!(results[0].error.is_some());
        assert_eq!(results[1].status, PluginStatus::Loaded);
        assert!(reg.contains("extra", "tagged"));
    }

    #[test]
    fn test_preset_with_unknown_target_is_import_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("p.yaml");
        std::fs::write(
            &file,
            "strategies:\n  - { family: x, name: y, kind: preset, target: nope.none }\n",
        )
        .unwrap();

        let mut reg = StrategyRegistry::new();
        let results = load_plugins(&mut reg, &[file], &LoadOptions::default()).unwrap();
        assert_eq!(results[0].status, PluginStatus::ImportError);
        assert!(results[0].error.as_deref().unwrap().contains("nope.none"));
    }

    #[test]
    fn test_duplicate_under_reject_policy_is_import_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("dup.yaml");
        std::fs::write(
            &file,
            "strategies:\n  - { family: test, name: echo, kind: preset, target: test.echo }\n",
        )
        .unwrap();

        let mut reg = StrategyRegistry::with_policy(DuplicatePolicy::Reject);
        reg.register_fn("test", "echo", |kw| Ok(Value::Object(kw))).unwrap();
        let results = load_plugins(&mut reg, &[file], &LoadOptions::default()).unwrap();
        assert_eq!(results[0].status, PluginStatus::ImportError);
    }

    #[test]
    fn test_recursive_directory_scan_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(
            dir.path().join("b.toml"),
            "[[strategies]]\nfamily = \"t\"\nname = \"b\"\nkind = \"preset\"\ntarget = \"test.echo\"\n",
        )
        .unwrap();
        std::fs::write(
            nested.join("a.yml"),
            "strategies:\n  - { family: t, name: a, kind: preset, target: test.echo }\n",
        )
        .unwrap();

        let mut reg = echo_registry();
        let results =
            load_plugins(&mut reg, &[dir.path().to_path_buf()], &LoadOptions::default()).unwrap();
        let names: Vec<&str> = results
            .iter()
            .flat_map(|r| r.registered.iter().map(|k| k.name.as_str()))
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_missing_path_reported_not_found() {
        let mut reg = StrategyRegistry::new();
        let missing = PathBuf::from("/definitely/not/here.yaml");
        let results =
            load_plugins(&mut reg, &[missing.clone()], &LoadOptions::default()).unwrap();
        assert_eq!(results, vec![PluginLoadResult::not_found(missing)]);
    }

    #[test]
    fn test_require_any_fails_when_nothing_resolves() {
        let mut reg = StrategyRegistry::new();
        let options = LoadOptions {
            require_any: true,
            ..Default::default()
        };
        let err = load_plugins(&mut reg, &[PathBuf::from("/nope")], &options).unwrap_err();
        assert!(matches!(err, PluginError::NothingResolved(1)));
    }

    #[test]
    fn test_reexport_is_additive() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("extra.yaml");
        std::fs::write(&file, PRESET_YAML).unwrap();

        let mut reg = echo_registry();
        let options = LoadOptions {
            reexport_family: Some("extra".into()),
            ..Default::default()
        };
        load_plugins(&mut reg, &[file.clone()], &options).unwrap();
        let first = reg.convenience("tagged").unwrap().clone();

        // A new key with the same name under another re-exported family
        // must not replace the alias.
        let other = dir.path().join("other.yaml");
        std::fs::write(&other, PRESET_YAML.replace("family: extra", "family: other")).unwrap();
        let options = LoadOptions {
            reexport_family: Some("other".into()),
            ..Default::default()
        };
        let results = load_plugins(&mut reg, &[other], &options).unwrap();
        assert_eq!(results[0].registered, vec![StrategyKey::new("other", "tagged")]);

        let second = reg.get("other", "tagged").unwrap().clone();
        assert!(!second.same_as(&first));
        assert!(reg.convenience("tagged").unwrap().same_as(&first));
        assert_eq!(reg.convenience_names(), vec!["tagged"]);
    }

    // -----------------------------------------------------------------------
    // Manifest labels
    // -----------------------------------------------------------------------

    #[test]
    fn test_manifest_label_prefers_name_then_stem() {
        let path = Path::new("/plugins/rerankers.yaml");
        let mut manifest = PluginManifest {
            name: Some("fancy-rerankers".into()),
            strategies: Vec::new(),
        };
        assert_eq!(manifest_label(&manifest, path), "fancy-rerankers");
        manifest.name = None;
        assert_eq!(manifest_label(&manifest, path), "rerankers");
        manifest.name = Some("  ".into());
        assert_eq!(manifest_label(&manifest, path), "rerankers");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_manifest_runs_relative_to_manifest_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.json"), "{\"ok\": true}").unwrap();
        let file = dir.path().join("cmd.yaml");
        std::fs::write(
            &file,
            "strategies:\n  - family: util\n    name: data\n    kind: command\n    program: sh\n    args: [\"-c\", \"cat data.json\"]\n",
        )
        .unwrap();

        let mut reg = StrategyRegistry::new();
        load_plugins(&mut reg, &[file], &LoadOptions::default()).unwrap();
        let out = reg.get("util", "data").unwrap().call(Kwargs::new()).unwrap();
        assert_eq!(out, json!({"ok": true}));
    }
}
