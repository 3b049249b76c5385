//! Per-run plan execution context and reference resolution against it.
//!
//! `ExecutionContext` holds the plan variables and the ordered outputs of the
//! steps that have run so far. It is created fresh per execution and never
//! shared between runs.

use std::collections::HashSet;

use pipewright_types::Kwargs;
use pipewright_types::plan::json_type_name;
use serde::Serialize;
use serde_json::Value;

use super::reference::{self, Accessor, ReferenceError, ReferencePath, Root};

// ---------------------------------------------------------------------------
// ExecutionContext
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionContext {
    /// Variables supplied once at plan start. Always an object.
    variables: Value,
    /// Step outputs in execution order.
    step_outputs: Kwargs,
    /// Every step ID the plan declares, executed or not.
    #[serde(skip)]
    declared: HashSet<String>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(Kwargs::new())
    }
}

impl ExecutionContext {
    pub fn new(variables: Kwargs) -> Self {
        Self {
            variables: Value::Object(variables),
            step_outputs: Kwargs::new(),
            declared: HashSet::new(),
        }
    }

    /// Record the full set of step IDs so a reference to a later step can
    /// be told apart from a reference to a step that does not exist.
    pub fn with_declared_steps<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn variables(&self) -> &Value {
        &self.variables
    }

    pub fn step_outputs(&self) -> &Kwargs {
        &self.step_outputs
    }

    pub fn into_step_outputs(self) -> Kwargs {
        self.step_outputs
    }

    pub fn set_step_output(&mut self, step_id: &str, output: Value) {
        self.step_outputs.insert(step_id.to_string(), output);
    }

    pub fn get_step_output(&self, step_id: &str) -> Option<&Value> {
        self.step_outputs.get(step_id)
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Resolve a value recursively.
    ///
    /// Mappings and sequences are walked element by element; strings that are
    /// exactly one `${{ ... }}` envelope are replaced by the referenced value;
    /// everything else passes through.
    pub fn resolve_value(&self, value: &Value) -> Result<Value, ReferenceError> {
        match value {
            Value::String(s) => match reference::envelope_inner(s) {
                Some(expr) => self.resolve_expr(expr),
                None => Ok(value.clone()),
            },
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => self.resolve_map(map).map(Value::Object),
            other => Ok(other.clone()),
        }
    }

    /// Resolve every entry of an argument bundle, keeping key order.
    pub fn resolve_map(&self, map: &Kwargs) -> Result<Kwargs, ReferenceError> {
        let mut out = Kwargs::with_capacity(map.len());
        for (key, value) in map {
            out.insert(key.clone(), self.resolve_value(value)?);
        }
        Ok(out)
    }

    /// Parse and resolve the text inside an envelope.
    pub fn resolve_expr(&self, expr: &str) -> Result<Value, ReferenceError> {
        let path = reference::parse(expr)?;
        self.resolve_path(&path).cloned()
    }

    /// Walk a parsed path, borrowing from the context.
    pub fn resolve_path(&self, path: &ReferencePath) -> Result<&Value, ReferenceError> {
        let mut current = match &path.root {
            Root::Vars => &self.variables,
            Root::Step(id) => match self.step_outputs.get(id) {
                Some(value) => value,
                None if self.declared.contains(id) => {
                    return Err(ReferenceError::StepNotExecuted(id.clone()));
                }
                None => return Err(ReferenceError::UnknownStep(id.clone())),
            },
        };
        for accessor in &path.accessors {
            current = step_into(current, accessor)?;
        }
        Ok(current)
    }
}

/// Apply one accessor.
///
/// A dotted field looks up a mapping key first; on a sequence a numeric
/// field is taken as an index. `[N]` indexes a sequence, or looks up key
/// `"N"` on a mapping. A quoted key only applies to mappings.
fn step_into<'a>(value: &'a Value, accessor: &Accessor) -> Result<&'a Value, ReferenceError> {
    let found = match (value, accessor) {
        (Value::Object(map), Accessor::Field(key) | Accessor::Key(key)) => map.get(key),
        (Value::Object(map), Accessor::Index(i)) => map.get(&i.to_string()),
        (Value::Array(items), Accessor::Index(i)) => items.get(*i),
        (Value::Array(items), Accessor::Field(field)) => {
            field.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        _ => None,
    };
    found.ok_or_else(|| ReferenceError::Missing {
        segment: accessor.to_string(),
        type_name: json_type_name(value).to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
