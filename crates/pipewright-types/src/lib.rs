//! Shared data types for Pipewright.
//!
//! Plans, workflow specs, plugin manifests, load summaries and global
//! configuration. Pure serde types with no behaviour beyond validation
//! helpers; execution lives in `pipewright-core`.

pub mod config;
pub mod plan;
pub mod plugin;
pub mod workflow;

/// Keyword-argument bundle passed to every strategy and node constructor.
pub type Kwargs = serde_json::Map<String, serde_json::Value>;
