//! Strategy and node registries.
//!
//! - `strategy` -- (family, name) -> callable lookup table
//! - `node` -- workflow node constructors keyed by type name
//! - `entrypoint` -- optional host-provided registration sources

pub mod entrypoint;
pub mod node;
pub mod strategy;

pub use entrypoint::EntrypointSource;
pub use node::{FnNode, NodeConstructor, NodeRegistry, WorkflowNode, WorkflowState};
pub use strategy::{
    DuplicatePolicy, RegistryError, Strategy, StrategyError, StrategyRegistry, StrategyResult,
};
