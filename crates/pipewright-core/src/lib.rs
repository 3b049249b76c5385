//! Strategy registry and execution engines for Pipewright.
//!
//! The registry is an explicit object: build one, populate it with
//! [`builtin::register_builtins`], entry points and plugin manifests, then
//! hand it by reference to the plan executor or the workflow compiler.

pub mod builtin;
pub mod config;
pub mod graph;
pub mod plan;
pub mod plugin;
pub mod registry;
