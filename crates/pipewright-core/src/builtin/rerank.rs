//! Rerank strategies over retrieval hits (`{text, metadata?, ...}` mappings).

use std::collections::HashMap;

use pipewright_types::Kwargs;
use serde_json::{Value, json};

use super::{opt_array, opt_usize, text_of};
use crate::registry::{StrategyError, StrategyResult};

pub const DEFAULT_TOP_K: usize = 5;

/// BM25 term-frequency saturation.
const K1: f64 = 1.2;
/// BM25 length normalisation.
const B: f64 = 0.75;

fn hits(kwargs: &Kwargs) -> Result<Vec<Value>, StrategyError> {
    opt_array(kwargs, "hits")?
        .cloned()
        .ok_or_else(|| StrategyError::MissingArgument("hits".to_string()))
}

/// Return the hits unchanged. `top_k` is accepted and ignored.
pub fn identity(kwargs: Kwargs) -> StrategyResult {
    Ok(Value::Array(hits(&kwargs)?))
}

/// Score hits against the query with BM25 over the hit texts and keep the
/// best `top_k`, each annotated with `score`. Ties keep input order.
pub fn bm25_preselect(kwargs: Kwargs) -> StrategyResult {
    let query = match kwargs.get("query") {
        Some(Value::String(q)) => q.as_str(),
        Some(Value::Null) | None => "",
        Some(_) => {
            return Err(StrategyError::InvalidArgument {
                name: "query".into(),
                message: "expected a string".into(),
            });
        }
    };
    let top_k = opt_usize(&kwargs, &["top_k"])?.unwrap_or(DEFAULT_TOP_K);
    let hits = hits(&kwargs)?;

    let docs: Vec<Vec<String>> = hits.iter().map(|h| tokenize(text_of(h))).collect();
    let scores = bm25_scores(&tokenize(query), &docs);

    let mut ranked: Vec<(f64, Value)> = scores.into_iter().zip(hits).collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.truncate(top_k);

    Ok(Value::Array(
        ranked
            .into_iter()
            .map(|(score, mut hit)| {
                if let Value::Object(map) = &mut hit {
                    map.insert("score".into(), json!(score));
                }
                hit
            })
            .collect(),
    ))
}

/// Lowercase alphanumeric runs.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// BM25 score of every document for the query, with Lucene-style IDF
/// (`ln(N / df) + 1`) so common terms never score negative.
fn bm25_scores(query: &[String], docs: &[Vec<String>]) -> Vec<f64> {
    let n = docs.len();
    if n == 0 {
        return Vec::new();
    }
    let total_len: usize = docs.iter().map(Vec::len).sum();
    let avg_len = (total_len as f64 / n as f64).max(1.0);

    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for doc in docs {
        let mut terms: Vec<&str> = doc.iter().map(String::as_str).collect();
        terms.sort_unstable();
        terms.dedup();
        for term in terms {
            *doc_freq.entry(term).or_default() += 1;
        }
    }

    docs.iter()
        .map(|doc| {
            let len = doc.len() as f64;
            query
                .iter()
                .filter_map(|term| {
                    let df = *doc_freq.get(term.as_str())?;
                    let tf = doc.iter().filter(|t| *t == term).count() as f64;
                    if tf == 0.0 {
                        return None;
                    }
                    let idf = (n as f64 / df as f64).ln() + 1.0;
                    Some(idf * (tf * (K1 + 1.0)) / (tf + K1 * (1.0 - B + B * len / avg_len)))
                })
                .sum()
        })
        .collect()
}
