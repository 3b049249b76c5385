//! Prompt construction strategies.

use pipewright_types::Kwargs;
use serde_json::json;

use super::{opt_array, opt_str, opt_usize, text_of};
use crate::registry::StrategyResult;

/// Build a retrieval-augmented prompt from `query` and `hits`.
///
/// Hit texts are joined with blank lines; `max_context_chars` truncates the
/// joined context.
pub fn rag(kwargs: Kwargs) -> StrategyResult {
    let query = opt_str(&kwargs, "query")?.unwrap_or("");
    let hits = opt_array(&kwargs, "hits")?.map(Vec::as_slice).unwrap_or_default();
    let max_chars = opt_usize(&kwargs, &["max_context_chars"])?;

    let mut context = hits
        .iter()
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    if let Some(max) = max_chars {
        if let Some((cut, _)) = context.char_indices().nth(max) {
            context.truncate(cut);
        }
    }

    Ok(json!(format!("Context:\n{context}\n\nQ: {query}\nA:")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn kwargs(value: Value) -> Kwargs {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_rag_prompt_layout() {
        let out = rag(kwargs(json!({
            "query": "What is the budget?",
            "hits": [{"text": "Budget is 1000."}, {"text": "People agree."}]
        })))
        .unwrap();
        assert_eq!(
            out,
            json!("Context:\nBudget is 1000.\n\nPeople agree.\n\nQ: What is the budget?\nA:")
        );
    }

    #[test]
    fn test_rag_truncates_context() {
        let out = rag(kwargs(json!({
            "query": "q",
            "hits": [{"text": "abcdefghij"}],
            "max_context_chars": 4
        })))
        .unwrap();
        assert_eq!(out, json!("Context:\nabcd\n\nQ: q\nA:"));
    }

    #[test]
    fn test_rag_without_hits() {
        let out = rag(kwargs(json!({"query": "q"}))).unwrap();
        assert_eq!(out, json!("Context:\n\n\nQ: q\nA:"));
    }
}
