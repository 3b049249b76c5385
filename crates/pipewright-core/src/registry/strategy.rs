//! Two-level strategy registry: family -> name -> callable.
//!
//! Both levels are insertion-ordered so bare-name lookup is deterministic
//! (first family registered wins). Introspection methods sort for display.

use std::sync::Arc;

use indexmap::IndexMap;
use pipewright_types::Kwargs;
use pipewright_types::plugin::StrategyKey;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Registry lookup and registration failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown strategy family '{family}' (while looking up '{family}.{name}')")]
    UnknownFamily { family: String, name: String },

    #[error("no strategy named '{name}' in family '{family}' (while looking up '{family}.{name}')")]
    UnknownName { family: String, name: String },

    #[error("no strategy named '{0}' in any family")]
    UnknownBareName(String),

    #[error("strategy '{family}.{name}' is already registered")]
    Duplicate { family: String, name: String },
}

/// Errors raised by a strategy while it runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrategyError {
    #[error("missing required argument '{0}'")]
    MissingArgument(String),

    #[error("invalid argument '{name}': {message}")]
    InvalidArgument { name: String, message: String },

    #[error("{0}")]
    Failed(String),

    /// A strategy this one depends on is not registered.
    #[error(transparent)]
    Unresolved(#[from] RegistryError),
}

pub type StrategyResult = Result<Value, StrategyError>;

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// A registered callable, invoked purely by keyword arguments.
///
/// Cheap to clone; clones share the same underlying function.
#[derive(Clone)]
pub struct Strategy(Arc<dyn Fn(Kwargs) -> StrategyResult + Send + Sync>);

impl Strategy {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Kwargs) -> StrategyResult + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, kwargs: Kwargs) -> StrategyResult {
        (self.0)(kwargs)
    }

    /// Whether two handles point at the same registered function.
    pub fn same_as(&self, other: &Strategy) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Strategy").field(&Arc::as_ptr(&self.0)).finish()
    }
}

/// What to do when `(family, name)` is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Last registration wins (required for plugin hot-reload).
    #[default]
    Overwrite,
    Reject,
}

// ---------------------------------------------------------------------------
// StrategyRegistry
// ---------------------------------------------------------------------------

/// Explicitly owned strategy registry.
///
/// Mutated by built-in registration, plugin loading and entry points; read
/// by the plan executor and workflow compiler. Not internally synchronised:
/// hosts that share one across threads must serialise registration against
/// execution themselves.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    families: IndexMap<String, IndexMap<String, Strategy>>,
    convenience: IndexMap<String, Strategy>,
    duplicates: DuplicatePolicy,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(duplicates: DuplicatePolicy) -> Self {
        Self {
            duplicates,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.duplicates
    }

    /// Bind `strategy` under `(family, name)`.
    ///
    /// Under [`DuplicatePolicy::Overwrite`] this never fails; re-registration
    /// replaces the previous callable in place, keeping its position.
    pub fn register(
        &mut self,
        family: &str,
        name: &str,
        strategy: Strategy,
    ) -> Result<(), RegistryError> {
        let names = self.families.entry(family.to_string()).or_default();
        if names.contains_key(name) && self.duplicates == DuplicatePolicy::Reject {
            return Err(RegistryError::Duplicate {
                family: family.to_string(),
                name: name.to_string(),
            });
        }
        if names.insert(name.to_string(), strategy).is_some() {
            tracing::debug!(family, name, "strategy re-registered, previous binding replaced");
        } else {
            tracing::debug!(family, name, "strategy registered");
        }
        Ok(())
    }

    /// Register a plain closure.
    pub fn register_fn<F>(&mut self, family: &str, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: Fn(Kwargs) -> StrategyResult + Send + Sync + 'static,
    {
        self.register(family, name, Strategy::new(f))
    }

    /// Look up `(family, name)`, distinguishing an unknown family from an
    /// unknown name inside a known family.
    pub fn get(&self, family: &str, name: &str) -> Result<&Strategy, RegistryError> {
        let names = self
            .families
            .get(family)
            .ok_or_else(|| RegistryError::UnknownFamily {
                family: family.to_string(),
                name: name.to_string(),
            })?;
        names.get(name).ok_or_else(|| RegistryError::UnknownName {
            family: family.to_string(),
            name: name.to_string(),
        })
    }

    /// Resolve a plan target: `family.name` splits on the first dot, a bare
    /// name is searched across families in registration order and the first
    /// match wins. Ambiguous bare names are not disambiguated further.
    pub fn resolve(&self, target: &str) -> Result<(StrategyKey, &Strategy), RegistryError> {
        if let Some(key) = StrategyKey::parse_dotted(target) {
            let strategy = self.get(&key.family, &key.name)?;
            return Ok((key, strategy));
        }

        self.families
            .iter()
            .find_map(|(family, names)| {
                names
                    .get(target)
                    .map(|s| (StrategyKey::new(family.as_str(), target), s))
            })
            .ok_or_else(|| RegistryError::UnknownBareName(target.to_string()))
    }

    pub fn contains(&self, family: &str, name: &str) -> bool {
        self.families
            .get(family)
            .is_some_and(|names| names.contains_key(name))
    }

    /// Family names, sorted for display.
    pub fn list_families(&self) -> Vec<&str> {
        let mut families: Vec<&str> = self.families.keys().map(String::as_str).collect();
        families.sort_unstable();
        families
    }

    /// Strategy names within a family, sorted for display.
    pub fn list_names(&self, family: &str) -> Result<Vec<&str>, RegistryError> {
        let names = self
            .families
            .get(family)
            .ok_or_else(|| RegistryError::UnknownFamily {
                family: family.to_string(),
                name: "*".to_string(),
            })?;
        let mut names: Vec<&str> = names.keys().map(String::as_str).collect();
        names.sort_unstable();
        Ok(names)
    }

    /// Every registered key in insertion order. Used to diff the registry
    /// around a plugin load.
    pub fn keys(&self) -> Vec<StrategyKey> {
        self.families
            .iter()
            .flat_map(|(family, names)| {
                names
                    .keys()
                    .map(move |name| StrategyKey::new(family.as_str(), name.as_str()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.families.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -----------------------------------------------------------------------
    // Convenience namespace
    // -----------------------------------------------------------------------

    /// Alias entries of `family` into the flat convenience namespace.
    ///
    /// Additive only: an existing convenience binding with the same name is
    /// kept. Returns the names actually aliased.
    pub fn reexport(&mut self, family: &str, names: &[String]) -> Vec<String> {
        let Some(entries) = self.families.get(family) else {
            return Vec::new();
        };

        let mut aliased = Vec::new();
        for name in names {
            if self.convenience.contains_key(name) {
                tracing::debug!(family, name = name.as_str(), "convenience name taken, skipping");
                continue;
            }
            if let Some(strategy) = entries.get(name) {
                self.convenience.insert(name.clone(), strategy.clone());
                aliased.push(name.clone());
            }
        }
        aliased
    }

    /// Look up a flat convenience alias.
    pub fn convenience(&self, name: &str) -> Option<&Strategy> {
        self.convenience.get(name)
    }

    pub fn convenience_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.convenience.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
