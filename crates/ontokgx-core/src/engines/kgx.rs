use std::path::PathBuf;

use serde_json::Value;

use crate::config::KgxConfig;

use super::{EngineResult, GraphEtl, TransformRequest, path_arg, run_engine};

/// Marker KGX prints when it rejects a value (usually a malformed CURIE).
const VALUE_ERROR_MARKER: &str = "ValueError";

#[derive(Debug, Clone)]
pub struct KgxEngine {
    program: String,
}

impl KgxEngine {
    #[must_use]
    pub fn new(config: &KgxConfig) -> Self {
        Self {
            program: path_arg(&config.program),
        }
    }
}

fn transform_args(request: &TransformRequest<'_>) -> Vec<String> {
    let mut args = vec![
        "transform".to_string(),
        "--input-format".to_string(),
        request.input_format.to_string(),
        "--output".to_string(),
        path_arg(request.output),
        "--output-format".to_string(),
        request.output_format.to_string(),
        "--stream".to_string(),
    ];
    for (key, value) in request.knowledge_sources {
        args.push("--knowledge-sources".to_string());
        args.push(key.clone());
        args.push(value.clone());
    }
    args.extend(request.inputs.iter().map(|path| path_arg(path)));
    args
}

/// KGX prints findings as JSON when it can; anything else is kept line by
/// line so the log still records it.
fn parse_findings(stdout: &str) -> Value {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Value::Array(Vec::new());
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| {
        Value::Array(
            trimmed
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| Value::String(line.to_string()))
                .collect(),
        )
    })
}

impl GraphEtl for KgxEngine {
    fn transform(&self, request: &TransformRequest<'_>) -> EngineResult<()> {
        let args = transform_args(request);
        run_engine(
            "kgx:transform",
            &self.program,
            &args,
            &[],
            Some(VALUE_ERROR_MARKER),
        )
        .map(|_| ())
    }

    fn validate(&self, inputs: &[PathBuf], input_format: &str) -> EngineResult<Value> {
        let mut args = vec![
            "validate".to_string(),
            "--input-format".to_string(),
            input_format.to_string(),
            "--stream".to_string(),
        ];
        args.extend(inputs.iter().map(|path| path_arg(path)));
        let stdout = run_engine("kgx:validate", &self.program, &args, &[], None)?;
        Ok(parse_findings(&stdout))
    }
}
