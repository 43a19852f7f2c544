//! Seams to the external engines. The pipeline only sees these traits; the
//! host-process adapters live in the submodules and tests supply fakes.

use std::path::{Path, PathBuf};

use serde_json::Value;

mod kgx;
mod process;
mod robot;
#[cfg(test)]
pub(crate) mod test_support;

pub use kgx::KgxEngine;
pub use process::HOST_TOOLS_ENV;
pub use robot::RobotEngine;

use process::{EngineProcess, output_excerpt, spawn_engine};

const ENGINE_OUTPUT_EXCERPT_CHARS: usize = 2_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The engine could not be started at all (missing binary, host tools off).
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("engine failed: {0}")]
    Failed(String),
    /// The engine rejected a value in its input; a repair may fix it.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl EngineError {
    #[must_use]
    pub const fn is_repairable(&self) -> bool {
        matches!(self, Self::InvalidValue(_))
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Ontology reasoning and conversion engine.
pub trait Reasoner {
    /// Converts `input` to the graph interchange form at `output`.
    fn relax(&self, input: &Path, output: &Path) -> EngineResult<()>;
    /// Writes `input` minus every axiom using `term` to `output`.
    fn remove_by_term(&self, input: &Path, output: &Path, term: &str) -> EngineResult<PathBuf>;
    fn report(&self, input: &Path, output: &Path) -> EngineResult<()>;
    fn measure(&self, input: &Path, output: &Path) -> EngineResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest<'a> {
    pub inputs: &'a [PathBuf],
    pub input_format: &'a str,
    /// Output base; the engine appends `_nodes.tsv` and `_edges.tsv`.
    pub output: &'a Path,
    pub output_format: &'a str,
    pub knowledge_sources: &'a [(String, String)],
}

/// Graph ETL engine.
pub trait GraphEtl {
    fn transform(&self, request: &TransformRequest<'_>) -> EngineResult<()>;
    /// Returns the findings; an error means validation did not complete.
    fn validate(&self, inputs: &[PathBuf], input_format: &str) -> EngineResult<Value>;
}

pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Runs one engine invocation and folds the host result into an
/// [`EngineResult`] carrying stdout.
///
/// A failed run whose output mentions `invalid_value_marker` is reported as
/// [`EngineError::InvalidValue`] with the matching line.
pub(crate) fn run_engine(
    operation: &str,
    program: &str,
    args: &[String],
    envs: &[(&str, &str)],
    invalid_value_marker: Option<&str>,
) -> EngineResult<String> {
    match spawn_engine(operation, program, args, envs) {
        EngineProcess::Disabled => Err(EngineError::Unavailable(format!(
            "{operation}: engine processes are switched off ({HOST_TOOLS_ENV})"
        ))),
        EngineProcess::NotStarted(error) => Err(EngineError::Unavailable(format!(
            "{operation}: {error}"
        ))),
        EngineProcess::Exited {
            success,
            stdout,
            stderr,
        } => {
            if success {
                return Ok(stdout);
            }
            if let Some(marker) = invalid_value_marker
                && let Some(line) = stderr
                    .lines()
                    .chain(stdout.lines())
                    .filter(|line| line.contains(marker))
                    .last()
            {
                tracing::warn!(operation, line, "engine rejected an input value");
                return Err(EngineError::InvalidValue(line.trim().to_string()));
            }
            let output = output_excerpt(&stdout, &stderr, ENGINE_OUTPUT_EXCERPT_CHARS)
                .unwrap_or_else(|| format!("{operation} exited unsuccessfully"));
            tracing::warn!(operation, output = %output, "engine command failed");
            Err(EngineError::Failed(output))
        }
    }
}
