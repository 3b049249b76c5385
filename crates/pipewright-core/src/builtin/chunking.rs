//! Chunking strategies.
//!
//! Both strategies accept `data` as either a single string or a list of
//! document mappings (`{text, doc?, ...}`). Every chunk carries
//! `text`, `start`, `end` (character offsets), `doc`, `chunk_index`, plus
//! the document's other fields.
//!
//! `chunk_size`/`chunk_overlap` also answer to `size`/`overlap`.

use pipewright_types::Kwargs;
use serde_json::{Value, json};
use text_splitter::{ChunkConfig, TextSplitter};

use super::{invalid, opt_str, opt_usize, text_of};
use crate::registry::{StrategyError, StrategyResult};

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
const DEFAULT_DOC_ID: &str = "doc";

/// A document after normalising `data`.
struct SourceDoc {
    doc: String,
    text: String,
    /// Fields copied onto every chunk.
    extra: Kwargs,
}

struct ChunkParams {
    size: usize,
    overlap: usize,
}

fn params(kwargs: &Kwargs) -> Result<ChunkParams, StrategyError> {
    let size = opt_usize(kwargs, &["chunk_size", "size"])?.unwrap_or(DEFAULT_CHUNK_SIZE);
    let overlap = opt_usize(kwargs, &["chunk_overlap", "overlap"])?.unwrap_or(DEFAULT_CHUNK_OVERLAP);
    if size == 0 {
        return Err(invalid("chunk_size", "must be greater than zero"));
    }
    if overlap >= size {
        return Err(invalid(
            "chunk_overlap",
            format!("must be smaller than chunk_size ({size})"),
        ));
    }
    Ok(ChunkParams { size, overlap })
}

fn source_docs(kwargs: &Kwargs) -> Result<Vec<SourceDoc>, StrategyError> {
    let default_doc = opt_str(kwargs, "doc_id")?.unwrap_or(DEFAULT_DOC_ID);
    match kwargs.get("data") {
        Some(Value::String(text)) => Ok(vec![SourceDoc {
            doc: default_doc.to_string(),
            text: text.clone(),
            extra: Kwargs::new(),
        }]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                let Value::Object(map) = item else {
                    return Err(invalid("data", "list items must be mappings with a 'text' field"));
                };
                let doc = map
                    .get("doc")
                    .or_else(|| map.get("doc_id"))
                    .and_then(Value::as_str)
                    .unwrap_or(default_doc)
                    .to_string();
                let extra = map
                    .iter()
                    .filter(|(k, _)| !matches!(k.as_str(), "text" | "doc" | "doc_id"))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Ok(SourceDoc {
                    doc,
                    text: text_of(item).to_string(),
                    extra,
                })
            })
            .collect(),
        Some(_) => Err(invalid("data", "expected a string or a list of documents")),
        None => Err(StrategyError::MissingArgument("data".to_string())),
    }
}

fn chunk_value(source: &SourceDoc, index: usize, text: &str, start: usize, end: usize) -> Value {
    let mut chunk = Kwargs::new();
    chunk.insert("text".into(), json!(text));
    chunk.insert("start".into(), json!(start));
    chunk.insert("end".into(), json!(end));
    chunk.insert("doc".into(), json!(source.doc));
    chunk.insert("chunk_index".into(), json!(index));
    for (k, v) in &source.extra {
        chunk.entry(k.clone()).or_insert_with(|| v.clone());
    }
    Value::Object(chunk)
}

// ---------------------------------------------------------------------------
// chunking.fixed
// ---------------------------------------------------------------------------

/// Fixed-width character windows advancing by `chunk_size - chunk_overlap`.
pub fn fixed(kwargs: Kwargs) -> StrategyResult {
    let params = params(&kwargs)?;
    let step = params.size - params.overlap;

    let mut out = Vec::new();
    for source in source_docs(&kwargs)? {
        let chars: Vec<char> = source.text.chars().collect();
        let mut start = 0;
        let mut index = 0;
        while start < chars.len() {
            let end = (start + params.size).min(chars.len());
            let text: String = chars[start..end].iter().collect();
            out.push(chunk_value(&source, index, &text, start, end));
            index += 1;
            if end == chars.len() {
                break;
            }
            start += step;
        }
    }
    Ok(Value::Array(out))
}

// ---------------------------------------------------------------------------
// chunking.recursive
// ---------------------------------------------------------------------------

/// Boundary-aware chunks: paragraphs, then sentences, then words, then
/// characters, packed up to `chunk_size` characters.
pub fn recursive(kwargs: Kwargs) -> StrategyResult {
    let params = params(&kwargs)?;
    let config = ChunkConfig::new(params.size)
        .with_overlap(params.overlap)
        .map_err(|e| invalid("chunk_overlap", e.to_string()))?;
    let splitter = TextSplitter::new(config);

    let mut out = Vec::new();
    for source in source_docs(&kwargs)? {
        for (index, (byte_offset, text)) in splitter.chunk_indices(&source.text).enumerate() {
            let start = source.text[..byte_offset].chars().count();
            let end = start + text.chars().count();
            out.push(chunk_value(&source, index, text, start, end));
        }
    }
    Ok(Value::Array(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kwargs(value: Value) -> Kwargs {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn chunks(value: Value) -> Vec<Value> {
        match value {
            Value::Array(items) => items,
            other => panic!("expected list, got {other}"),
        }
    }

    // -----------------------------------------------------------------------
    // fixed
    // -----------------------------------------------------------------------

    #[test]
    fn test_fixed_string_windows() {
        let text = "abcdefghij";
        let out = chunks(
            fixed(kwargs(json!({
                "data": text, "chunk_size": 4, "chunk_overlap": 2, "doc_id": "docX"
            })))
            .unwrap(),
        );
        let texts: Vec<&str> = out.iter().map(|c| c["text"].as_str().unwrap()).collect();
        assert_eq!(texts, vec!["abcd", "cdef", "efgh", "ghij"]);
        for (i, c) in out.iter().enumerate() {
            assert_eq!(c["chunk_index"], json!(i));
            assert_eq!(c["doc"], json!("docX"));
            let (start, end) = (c["start"].as_u64().unwrap(), c["end"].as_u64().unwrap());
            assert!(start < end);
            assert!(text.contains(c["text"].as_str().unwrap()));
        }
    }

    #[test]
    fn test_fixed_list_of_docs_keeps_metadata() {
        let out = chunks(
            fixed(kwargs(json!({
                "data": [
                    {"text": "hello world", "doc": "A", "meta": {"a": 1}},
                    {"text": "bye world", "doc": "B", "meta": {"b": 2}}
                ],
                "chunk_size": 5,
                "chunk_overlap": 1,
                "doc_id": "IGNORED"
            })))
            .unwrap(),
        );
        assert!(out.iter().any(|c| c["doc"] == json!("A")));
        assert!(out.iter().any(|c| c["doc"] == json!("B")));
        assert!(out.iter().all(|c| c.get("meta").is_some()));
        assert!(out.iter().all(|c| c["doc"] != json!("IGNORED")));
    }

    #[test]
    fn test_fixed_counts_characters_not_bytes() {
        let out = chunks(fixed(kwargs(json!({"data": "ééééé", "size": 2, "overlap": 0}))).unwrap());
        assert_eq!(out.len(), 3);
        assert_eq!(out[2]["text"], json!("é"));
        assert_eq!(out[2]["end"], json!(5));
    }

    #[test]
    fn test_fixed_empty_text_yields_nothing() {
        let out = chunks(fixed(kwargs(json!({"data": ""}))).unwrap());
        assert!(out.is_empty());
    }

    #[test]
    fn test_bad_arguments() {
        assert_eq!(
            fixed(Kwargs::new()).unwrap_err(),
            StrategyError::MissingArgument("data".into())
        );
        assert!(matches!(
            fixed(kwargs(json!({"data": "x", "chunk_size": 4, "chunk_overlap": 4}))),
            Err(StrategyError::InvalidArgument { .. })
        ));
        assert!(matches!(
            fixed(kwargs(json!({"data": 5}))),
            Err(StrategyError::InvalidArgument { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // recursive
    // -----------------------------------------------------------------------

    #[test]
    fn test_recursive_breaks_text() {
        let out = chunks(
            recursive(kwargs(json!({
                "data": [{"text": "Sentence one. Sentence two. Sentence three.", "doc": "Y"}],
                "chunk_size": 20,
                "chunk_overlap": 5
            })))
            .unwrap(),
        );
        assert!(out.len() >= 2);
        for c in &out {
            assert!(c["text"].as_str().unwrap().chars().count() <= 20);
            assert_eq!(c["doc"], json!("Y"));
        }
    }

    #[test]
    fn test_recursive_offsets_point_into_source() {
        let text = "First paragraph here.\n\nSecond paragraph follows.";
        let out = chunks(recursive(kwargs(json!({"data": text, "size": 30, "overlap": 0}))).unwrap());
        let chars: Vec<char> = text.chars().collect();
        for c in &out {
            let start = c["start"].as_u64().unwrap() as usize;
            let end = c["end"].as_u64().unwrap() as usize;
            let slice: String = chars[start..end].iter().collect();
            assert_eq!(slice, c["text"].as_str().unwrap());
        }
    }
}
