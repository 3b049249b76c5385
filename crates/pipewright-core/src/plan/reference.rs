//! `${{ ... }}` reference envelope and path parser.
//!
//! Grammar (closed, no operators or calls):
//!
//! ```text
//! reference := root accessor*
//! root      := ident
//! accessor  := "." ident
//!            | "[" digits "]"
//!            | "[" quote chars quote "]"      quote is ' or "
//! ident     := one or more chars other than . [ ] and whitespace
//! ```
//!
//! `vars` as the root addresses the plan variables; any other root is a
//! step ID.

use std::fmt;

/// Reserved root that addresses plan variables.
pub const VARS_ROOT: &str = "vars";

const ENVELOPE_OPEN: &str = "${{";
const ENVELOPE_CLOSE: &str = "}}";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures while parsing or resolving a reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("invalid reference '{expr}': {message}")]
    Syntax { expr: String, message: String },

    #[error("unknown step '{0}'")]
    UnknownStep(String),

    #[error("step '{0}' is declared later in the plan and has not run yet")]
    StepNotExecuted(String),

    #[error("cannot resolve '{segment}' in {type_name}")]
    Missing { segment: String, type_name: String },
}

// ---------------------------------------------------------------------------
// Path representation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Root {
    Vars,
    Step(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    /// `.name` -- mapping key, or sequence index when numeric.
    Field(String),
    /// `[N]`
    Index(usize),
    /// `['key']` / `["key"]`
    Key(String),
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Field(name) => write!(f, "{name}"),
            Accessor::Index(i) => write!(f, "[{i}]"),
            Accessor::Key(k) => write!(f, "['{k}']"),
        }
    }
}

/// A parsed reference path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePath {
    pub root: Root,
    pub accessors: Vec<Accessor>,
}

impl fmt::Display for ReferencePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            Root::Vars => write!(f, "{VARS_ROOT}")?,
            Root::Step(id) => write!(f, "{id}")?,
        }
        for accessor in &self.accessors {
            match accessor {
                Accessor::Field(_) => write!(f, ".{accessor}")?,
                _ => write!(f, "{accessor}")?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Envelope detection
// ---------------------------------------------------------------------------

/// Return the inner path text if `value` is exactly one reference envelope.
///
/// Only the whole trimmed string counts; embedded `${{ }}` inside other
/// text is a literal.
pub fn envelope_inner(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let inner = trimmed
        .strip_prefix(ENVELOPE_OPEN)?
        .strip_suffix(ENVELOPE_CLOSE)?;
    Some(inner.trim())
}

pub fn is_reference(value: &str) -> bool {
    envelope_inner(value).is_some()
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse the text inside an envelope into a [`ReferencePath`].
pub fn parse(expr: &str) -> Result<ReferencePath, ReferenceError> {
    Parser::new(expr).parse()
}

struct Parser<'a> {
    expr: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(expr: &'a str) -> Self {
        Self {
            expr,
            chars: expr.char_indices().peekable(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ReferenceError {
        ReferenceError::Syntax {
            expr: self.expr.to_string(),
            message: message.into(),
        }
    }

    fn parse(mut self) -> Result<ReferencePath, ReferenceError> {
        self.skip_whitespace();
        let root_name = self.ident().ok_or_else(|| self.error("expected a root name"))?;
        let root = if root_name == VARS_ROOT {
            Root::Vars
        } else {
            Root::Step(root_name)
        };

        let mut accessors = Vec::new();
        loop {
            match self.chars.peek().map(|&(_, c)| c) {
                None => break,
                Some('.') => {
                    self.chars.next();
                    let name = self
                        .ident()
                        .ok_or_else(|| self.error("expected a name after '.'"))?;
                    accessors.push(Accessor::Field(name));
                }
                Some('[') => {
                    self.chars.next();
                    accessors.push(self.bracket()?);
                }
                Some(c) if c.is_whitespace() => {
                    self.skip_whitespace();
                    if self.chars.peek().is_some() {
                        return Err(self.error("unexpected whitespace inside reference"));
                    }
                }
                Some(c) => return Err(self.error(format!("unexpected character '{c}'"))),
            }
        }

        Ok(ReferencePath { root, accessors })
    }

    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn ident(&mut self) -> Option<String> {
        let mut out = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '.' || c == '[' || c == ']' || c.is_whitespace() {
                break;
            }
            out.push(c);
            self.chars.next();
        }
        (!out.is_empty()).then_some(out)
    }

    /// Parse the remainder of a `[...]` accessor (opening bracket consumed).
    fn bracket(&mut self) -> Result<Accessor, ReferenceError> {
        let accessor = match self.chars.peek().map(|&(_, c)| c) {
            Some(quote @ ('\'' | '"')) => {
                self.chars.next();
                let mut key = String::new();
                loop {
                    match self.chars.next() {
                        Some((_, c)) if c == quote => break,
                        Some((_, c)) => key.push(c),
                        None => return Err(self.error("unterminated quoted key")),
                    }
                }
                Accessor::Key(key)
            }
            Some(c) if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&(_, c)) = self.chars.peek() {
                    if !c.is_ascii_digit() {
                        break;
                    }
                    digits.push(c);
                    self.chars.next();
                }
                let index = digits
                    .parse::<usize>()
                    .map_err(|e| self.error(format!("bad index '{digits}': {e}")))?;
                Accessor::Index(index)
            }
            _ => return Err(self.error("expected an index or a quoted key inside '[]'")),
        };

        match self.chars.next() {
            Some((_, ']')) => Ok(accessor),
            _ => Err(self.error("expected ']'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Envelope
    // -----------------------------------------------------------------------

    #[test]
    fn test_envelope_requires_whole_string() {
        assert_eq!(envelope_inner("${{ vars.x }}"), Some("vars.x"));
        assert_eq!(envelope_inner("  ${{a}}  "), Some("a"));
        assert_eq!(envelope_inner("prefix ${{ vars.x }}"), None);
        assert_eq!(envelope_inner("${{ vars.x }} suffix"), None);
        assert_eq!(envelope_inner("{{ vars.x }}"), None);
        assert!(!is_reference("plain text"));
    }

    // -----------------------------------------------------------------------
    // Parser
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_vars_with_fields_and_index() {
        let path = parse("vars.x.y[0]").unwrap();
        assert_eq!(path.root, Root::Vars);
        assert_eq!(
            path.accessors,
            vec![
                Accessor::Field("x".into()),
                Accessor::Field("y".into()),
                Accessor::Index(0),
            ]
        );
    }

    #[test]
    fn test_parse_bare_step_root() {
        let path = parse("retrieve").unwrap();
        assert_eq!(path.root, Root::Step("retrieve".into()));
        assert!(path.accessors.is_empty());
    }

    #[test]
    fn test_parse_quoted_keys() {
        let path = parse(r#"hits[0]['meta']["source file"]"#).unwrap();
        assert_eq!(
            path.accessors,
            vec![
                Accessor::Index(0),
                Accessor::Key("meta".into()),
                Accessor::Key("source file".into()),
            ]
        );
    }

    #[test]
    fn test_parse_step_ids_with_dashes() {
        let path = parse("load-pdf.pages").unwrap();
        assert_eq!(path.root, Root::Step("load-pdf".into()));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", ".x", "a..b", "a[", "a[x]", "a['k", "a[0", "a b", "a]"] {
            let err = parse(bad).unwrap_err();
            assert!(
                matches!(err, ReferenceError::Syntax { .. }),
                "expected syntax error for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_trailing_whitespace_allowed() {
        assert!(parse("a.b   ").is_ok());
    }

    #[test]
    fn test_display_roundtrips_shape() {
        let path = parse("step.items[2]['k']").unwrap();
        assert_eq!(path.to_string(), "step.items[2]['k']");
    }
}
