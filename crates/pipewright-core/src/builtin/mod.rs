//! Built-in strategies and workflow nodes.
//!
//! Everything here is an ordinary registration; plugins can overwrite any
//! of it under the default duplicate policy.

pub mod chunking;
pub mod nodes;
pub mod prompt;
pub mod rerank;

use pipewright_types::Kwargs;
use serde_json::{Value, json};

use crate::registry::{NodeRegistry, RegistryError, StrategyError, StrategyRegistry};

/// Register the built-in strategy set.
pub fn register_builtins(registry: &mut StrategyRegistry) -> Result<(), RegistryError> {
    registry.register_fn("chunking", "fixed", chunking::fixed)?;
    registry.register_fn("chunking", "recursive", chunking::recursive)?;
    registry.register_fn("rerank", "identity", rerank::identity)?;
    registry.register_fn("rerank", "bm25_preselect", rerank::bm25_preselect)?;
    registry.register_fn("prompt", "rag", prompt::rag)?;
    registry.register_fn("util", "ping", |_| Ok(json!("pipewright: ok")))?;
    registry.register_fn("util", "hello", |kwargs| {
        let name = opt_str(&kwargs, "name")?.unwrap_or("world");
        Ok(json!(format!("hello, {name}!")))
    })?;
    Ok(())
}

/// Register the built-in node types.
pub fn register_builtin_nodes(registry: &mut NodeRegistry) {
    registry.register("strategy.chunking", nodes::chunking);
    registry.register("strategy.indexing", nodes::indexing);
    registry.register("strategy.retrieve", nodes::retrieve);
    registry.register("strategy.rerank", nodes::rerank);
    registry.register("prompt.rag", nodes::prompt_rag);
    registry.register("llm.chat", nodes::llm_chat);
}

// ---------------------------------------------------------------------------
// Keyword argument helpers
// ---------------------------------------------------------------------------

fn invalid(name: &str, message: impl Into<String>) -> StrategyError {
    StrategyError::InvalidArgument {
        name: name.to_string(),
        message: message.into(),
    }
}

/// Optional string argument; present but not a string is an error.
pub(crate) fn opt_str<'a>(kwargs: &'a Kwargs, name: &str) -> Result<Option<&'a str>, StrategyError> {
    match kwargs.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(invalid(name, "expected a string")),
    }
}

/// Optional non-negative integer, looked up under the first present alias.
pub(crate) fn opt_usize(kwargs: &Kwargs, names: &[&str]) -> Result<Option<usize>, StrategyError> {
    let Some((name, value)) = names
        .iter()
        .find_map(|n| kwargs.get(*n).filter(|v| !v.is_null()).map(|v| (*n, v)))
    else {
        return Ok(None);
    };
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| invalid(name, "expected a non-negative integer"))
}

/// Optional sequence argument.
pub(crate) fn opt_array<'a>(kwargs: &'a Kwargs, name: &str) -> Result<Option<&'a Vec<Value>>, StrategyError> {
    match kwargs.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(invalid(name, "expected a sequence")),
    }
}

/// `text` field of a hit or document mapping, empty when absent.
pub(crate) fn text_of(value: &Value) -> &str {
    value.get("text").and_then(Value::as_str).unwrap_or("")
}
