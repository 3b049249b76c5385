//! Optional external discovery of registrations.
//!
//! An entry point is anything the host can enumerate that knows how to add
//! strategies to a registry: an installed-plugins directory, a statically
//! linked extension crate, etc. Failures are logged and swallowed so that
//! a broken extension never makes the registry unusable.

use super::strategy::StrategyRegistry;

/// A host-provided source of additional registrations.
pub trait EntrypointSource {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Apply this source's registrations.
    fn register(&self, registry: &mut StrategyRegistry) -> anyhow::Result<()>;
}

impl StrategyRegistry {
    /// Run every entry point source, ignoring the ones that fail.
    ///
    /// Returns the number of registry entries added across all sources.
    pub fn load_entrypoints(&mut self, sources: &[&dyn EntrypointSource]) -> usize {
        let before = self.len();
        for source in sources {
            match source.register(self) {
                Ok(()) => tracing::debug!(source = source.name(), "entry point loaded"),
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "entry point failed, ignoring");
                }
            }
        }
        self.len().saturating_sub(before)
    }
}
