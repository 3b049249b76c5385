//! Built-in workflow node constructors.
//!
//! Strategy-backed nodes take `name` (the strategy within the node's
//! family) and forward every other parameter to the strategy as kwargs.
//! The strategy is resolved when the node is constructed, so an unknown
//! name fails workflow compilation rather than the run.

use pipewright_types::Kwargs;
use serde_json::{Value, json};

use super::{invalid, opt_str, text_of};
use crate::registry::{
    FnNode, Strategy, StrategyError, StrategyRegistry, WorkflowNode, WorkflowState,
};

type NodeResult = Result<Box<dyn WorkflowNode>, StrategyError>;

/// Default model label for the echo chat backend.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const ECHO_PREVIEW_CHARS: usize = 300;

/// Split `name` off the params and resolve `family.name`.
fn bind(
    registry: &StrategyRegistry,
    family: &str,
    mut params: Kwargs,
    default_name: Option<&str>,
) -> Result<(Strategy, Kwargs), StrategyError> {
    let name = match params.remove("name") {
        Some(Value::String(name)) => name,
        Some(_) => return Err(invalid("name", "expected a string")),
        None => default_name
            .map(str::to_string)
            .ok_or_else(|| StrategyError::MissingArgument("name".to_string()))?,
    };
    let strategy = registry.get(family, &name)?.clone();
    Ok((strategy, params))
}

/// `params` overlaid with the state-derived arguments.
fn with_args(params: &Kwargs, args: impl IntoIterator<Item = (&'static str, Value)>) -> Kwargs {
    let mut kwargs = params.clone();
    for (k, v) in args {
        kwargs.insert(k.to_string(), v);
    }
    kwargs
}

fn state_str(state: &WorkflowState, key: &str) -> Value {
    state.get(key).cloned().unwrap_or_else(|| json!(""))
}

fn state_list(state: &WorkflowState, key: &str) -> Value {
    state.get(key).cloned().unwrap_or_else(|| json!([]))
}

// ---------------------------------------------------------------------------
// strategy.*
// ---------------------------------------------------------------------------

/// `documents` (list of `{text, doc_id?, ...}`) or `document` (string, with
/// `doc_id` from state) to `chunks`. Default strategy: `recursive`.
pub fn chunking(registry: &StrategyRegistry, params: Kwargs) -> NodeResult {
    let (strategy, params) = bind(registry, "chunking", params, Some("recursive"))?;
    Ok(Box::new(FnNode(
        move |mut state: WorkflowState| -> Result<WorkflowState, StrategyError> {
            let docs: Vec<Value> = match state.get("documents") {
                Some(Value::Array(docs)) => docs
                    .iter()
                    .filter(|d| !text_of(d).trim().is_empty())
                    .cloned()
                    .collect(),
                _ => match state.get("document") {
                    Some(Value::String(text)) if !text.trim().is_empty() => {
                        let doc_id = opt_str(&state, "doc_id")?.unwrap_or("doc");
                        vec![json!({"doc_id": doc_id, "text": text})]
                    }
                    _ => Vec::new(),
                },
            };

            let chunks = if docs.is_empty() {
                json!([])
            } else {
                strategy.call(with_args(&params, [("data", Value::Array(docs))]))?
            };
            state.insert("chunks".into(), chunks);
            Ok(state)
        },
    )))
}

/// `chunks` to the indexing strategy; a string result lands in `index_name`.
pub fn indexing(registry: &StrategyRegistry, params: Kwargs) -> NodeResult {
    let (strategy, params) = bind(registry, "indexing", params, None)?;
    Ok(Box::new(FnNode(
        move |mut state: WorkflowState| -> Result<WorkflowState, StrategyError> {
            let result = strategy.call(with_args(&params, [("chunks", state_list(&state, "chunks"))]))?;
            if let Value::String(index_name) = result {
                state.insert("index_name".into(), Value::String(index_name));
            }
            Ok(state)
        },
    )))
}

/// `query` to `retrieved`.
pub fn retrieve(registry: &StrategyRegistry, params: Kwargs) -> NodeResult {
    let (strategy, params) = bind(registry, "retrieve", params, None)?;
    Ok(Box::new(FnNode(
        move |mut state: WorkflowState| -> Result<WorkflowState, StrategyError> {
            let hits = strategy.call(with_args(&params, [("query", state_str(&state, "query"))]))?;
            state.insert("retrieved".into(), hits);
            Ok(state)
        },
    )))
}

/// `query` + `retrieved` to a reranked `retrieved`.
pub fn rerank(registry: &StrategyRegistry, params: Kwargs) -> NodeResult {
    let (strategy, params) = bind(registry, "rerank", params, None)?;
    Ok(Box::new(FnNode(
        move |mut state: WorkflowState| -> Result<WorkflowState, StrategyError> {
            let kwargs = with_args(
                &params,
                [
                    ("query", state_str(&state, "query")),
                    ("hits", state_list(&state, "retrieved")),
                ],
            );
            let hits = strategy.call(kwargs)?;
            state.insert("retrieved".into(), hits);
            Ok(state)
        },
    )))
}

// ---------------------------------------------------------------------------
// prompt / llm
// ---------------------------------------------------------------------------

/// `query` + `retrieved` to `prompt`. Default strategy: `prompt.rag`.
pub fn prompt_rag(registry: &StrategyRegistry, params: Kwargs) -> NodeResult {
    let (strategy, params) = bind(registry, "prompt", params, Some("rag"))?;
    Ok(Box::new(FnNode(
        move |mut state: WorkflowState| -> Result<WorkflowState, StrategyError> {
            let kwargs = with_args(
                &params,
                [
                    ("query", state_str(&state, "query")),
                    ("hits", state_list(&state, "retrieved")),
                ],
            );
            let prompt = strategy.call(kwargs)?;
            state.insert("prompt".into(), prompt);
            Ok(state)
        },
    )))
}

/// `prompt` to `answer` through the echo backend.
pub fn llm_chat(_: &StrategyRegistry, params: Kwargs) -> NodeResult {
    let model = opt_str(&params, "model")?
        .unwrap_or(DEFAULT_CHAT_MODEL)
        .to_string();
    Ok(Box::new(FnNode(
        move |mut state: WorkflowState| -> Result<WorkflowState, StrategyError> {
            let prompt = opt_str(&state, "prompt")?
                .filter(|p| !p.is_empty())
                .ok_or_else(|| StrategyError::MissingArgument("prompt".to_string()))?;
            let preview: String = prompt.chars().take(ECHO_PREVIEW_CHARS).collect();
            let answer = format!("[ECHO:{model}] {preview}");
            state.insert("answer".into(), Value::String(answer));
            Ok(state)
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::register_builtins;
    use crate::registry::RegistryError;

    fn kwargs(value: Value) -> Kwargs {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn registry() -> StrategyRegistry {
        let mut reg = StrategyRegistry::new();
        register_builtins(&mut reg).unwrap();
        reg.register_fn("retrieve", "static", |kw| {
            Ok(json!([{"text": format!("about {}", kw["query"].as_str().unwrap_or(""))}]))
        })
        .unwrap();
        reg.register_fn("indexing", "memory", |kw| {
            let n = kw["chunks"].as_array().map_or(0, Vec::len);
            Ok(json!(format!("mem-{n}")))
        })
        .unwrap();
        reg
    }

    // -----------------------------------------------------------------------
    // Strategy nodes
    // -----------------------------------------------------------------------

    #[test]
    fn test_chunking_node_from_single_document() {
        let node = chunking(&registry(), kwargs(json!({"name": "fixed", "chunk_size": 5, "chunk_overlap": 0}))).unwrap();
        let state = kwargs(json!({"document": "abcdefghij", "doc_id": "d1"}));
        let out = node.call(state).unwrap();
        let chunks = out["chunks"].as_array().unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0]["doc"], json!("d1"));
    }

    #[test]
    fn test_chunking_node_skips_blank_documents() {
        let node = chunking(&registry(), Kwargs::new()).unwrap();
        let state = kwargs(json!({"documents": [{"text": "  "}, {"text": "real text", "doc_id": "r"}]}));
        let out = node.call(state).unwrap();
        let chunks = out["chunks"].as_array().unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0]["doc"], json!("r"));
    }

    #[test]
    fn test_chunking_node_without_input_yields_empty() {
        let node = chunking(&registry(), Kwargs::new()).unwrap();
        let out = node.call(WorkflowState::new()).unwrap();
        assert_eq!(out["chunks"], json!([]));
    }

    #[test]
    fn test_indexing_sets_index_name() {
        let node = indexing(&registry(), kwargs(json!({"name": "memory"}))).unwrap();
        let out = node.call(kwargs(json!({"chunks": [{"text": "a"}, {"text": "b"}]}))).unwrap();
        assert_eq!(out["index_name"], json!("mem-2"));
    }

    #[test]
    fn test_retrieve_then_rerank() {
        let reg = registry();
        let retrieve_node = retrieve(&reg, kwargs(json!({"name": "static"}))).unwrap();
        let rerank_node = rerank(&reg, kwargs(json!({"name": "bm25_preselect", "top_k": 1}))).unwrap();

        let state = retrieve_node.call(kwargs(json!({"query": "budget"}))).unwrap();
        assert_eq!(state["retrieved"][0]["text"], json!("about budget"));
        let state = rerank_node.call(state).unwrap();
        assert_eq!(state["retrieved"].as_array().unwrap().len(), 1);
        assert!(state["retrieved"][0]["score"].is_number());
    }

    #[test]
    fn test_missing_or_unknown_name_fails_construction() {
        let reg = registry();
        assert!(matches!(
            retrieve(&reg, Kwargs::new()),
            Err(StrategyError::MissingArgument(ref n)) if n == "name"
        ));
        assert!(matches!(
            rerank(&reg, kwargs(json!({"name": "nope"}))),
            Err(StrategyError::Unresolved(RegistryError::UnknownName { .. }))
        ));
    }

    // -----------------------------------------------------------------------
    // prompt / llm
    // -----------------------------------------------------------------------

    #[test]
    fn test_prompt_then_echo_chat() {
        let reg = registry();
        let prompt_node = prompt_rag(&reg, Kwargs::new()).unwrap();
        let chat = llm_chat(&reg, kwargs(json!({"model": "tiny"}))).unwrap();

        let state = kwargs(json!({"query": "q", "retrieved": [{"text": "ctx"}]}));
        let state = chat.call(prompt_node.call(state).unwrap()).unwrap();
        assert_eq!(state["prompt"], json!("Context:\nctx\n\nQ: q\nA:"));
        assert_eq!(state["answer"], json!("[ECHO:tiny] Context:\nctx\n\nQ: q\nA:"));
    }

    #[test]
    fn test_chat_truncates_preview() {
        let chat = llm_chat(&registry(), Kwargs::new()).unwrap();
        let long = "x".repeat(400);
        let out = chat.call(kwargs(json!({"prompt": long}))).unwrap();
        let answer = out["answer"].as_str().unwrap();
        assert!(answer.starts_with("[ECHO:gpt-4o-mini] "));
        assert_eq!(answer.chars().filter(|c| *c == 'x').count(), 300);
    }

    #[test]
    fn test_chat_requires_prompt() {
        let chat = llm_chat(&registry(), Kwargs::new()).unwrap();
        assert_eq!(
            chat.call(WorkflowState::new()).unwrap_err(),
            StrategyError::MissingArgument("prompt".into())
        );
    }
}
