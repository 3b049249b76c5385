//! Strategy backends a plugin manifest can declare.
//!
//! - `command` spawns a process per call: kwargs go to stdin as JSON, stdout
//!   comes back as the return value.
//! - `preset` binds default kwargs onto a strategy that is already
//!   registered.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use pipewright_types::Kwargs;
use serde_json::Value;

use crate::registry::{RegistryError, Strategy, StrategyError, StrategyRegistry};

// ---------------------------------------------------------------------------
// Command backend
// ---------------------------------------------------------------------------

/// Process invocation captured from a manifest.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Label used in error messages (`family.name`).
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Working directory; the manifest's directory.
    pub workdir: PathBuf,
}

impl CommandSpec {
    /// Programs given as a relative path (`./run.sh`, `bin/tool`) are
    /// anchored at the working directory; bare names go through `PATH`.
    fn program_path(&self) -> PathBuf {
        let program = Path::new(&self.program);
        let has_separator = self.program.contains('/') || self.program.contains('\\');
        if has_separator && program.is_relative() {
            self.workdir.join(program)
        } else {
            program.to_path_buf()
        }
    }

    pub fn run(&self, kwargs: &Kwargs) -> Result<Value, StrategyError> {
        let input = serde_json::to_vec(kwargs)
            .map_err(|e| StrategyError::Failed(format!("{}: cannot encode kwargs: {e}", self.label)))?;

        let mut child = Command::new(self.program_path())
            .args(&self.args)
            .envs(&self.env)
            .current_dir(&self.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                StrategyError::Failed(format!(
                    "{}: failed to spawn '{}': {e}",
                    self.label, self.program
                ))
            })?;

        // stdin is fed from its own thread so a child that writes while it
        // reads cannot fill stdout and stall both ends.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || {
                let result = stdin.write_all(&input);
                drop(stdin);
                result
            })
        });

        let output = child.wait_with_output().map_err(|e| {
            StrategyError::Failed(format!("{}: failed to wait for process: {e}", self.label))
        })?;

        if let Some(writer) = writer {
            match writer.join() {
                // A child that exits without reading stdin closes the pipe;
                // its exit status is what matters.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => {
                    tracing::debug!(strategy = %self.label, error = %e, "stdin write failed");
                }
                Ok(Ok(())) => {}
                Err(_) => {
                    return Err(StrategyError::Failed(format!(
                        "{}: stdin writer panicked",
                        self.label
                    )));
                }
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StrategyError::Failed(format!(
                "{} exited with {}: {}",
                self.label,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| StrategyError::Failed(format!("{}: output is not valid UTF-8", self.label)))?;
        Ok(parse_output(&stdout))
    }
}

/// JSON when stdout parses as JSON, otherwise the trimmed text as a string.
fn parse_output(stdout: &str) -> Value {
    let trimmed = stdout.trim();
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

pub fn command_strategy(spec: CommandSpec) -> Strategy {
    Strategy::new(move |kwargs| spec.run(&kwargs))
}

// ---------------------------------------------------------------------------
// Preset backend
// ---------------------------------------------------------------------------

/// Wrap the strategy at `target` so `defaults` are applied under the
/// caller's kwargs. The target is resolved now, not at call time.
pub fn preset_strategy(
    registry: &StrategyRegistry,
    target: &str,
    defaults: Kwargs,
) -> Result<Strategy, RegistryError> {
    let (_, inner) = registry.resolve(target)?;
    let inner = inner.clone();
    Ok(Strategy::new(move |kwargs| {
        let mut merged = defaults.clone();
        merged.extend(kwargs);
        inner.call(merged)
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
