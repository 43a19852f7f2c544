use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use super::{EngineError, EngineResult, GraphEtl, Reasoner, TransformRequest};
use crate::metadata::{MetadataSource, OntologyMetadata};

fn io_failure(err: std::io::Error) -> EngineError {
    EngineError::Failed(err.to_string())
}

/// Reasoner double that fails `relax` a scripted number of times.
#[derive(Default)]
pub(crate) struct FakeReasoner {
    relax_failures: RefCell<usize>,
    calls: RefCell<Vec<String>>,
}

impl FakeReasoner {
    pub(crate) fn failing(times: usize) -> Self {
        Self {
            relax_failures: RefCell::new(times),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl Reasoner for FakeReasoner {
    fn relax(&self, input: &Path, output: &Path) -> EngineResult<()> {
        self.record(format!("relax {}", input.display()));
        let mut remaining = self.relax_failures.borrow_mut();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(EngineError::Failed("null comment".to_string()));
        }
        fs::write(output, "{\"graphs\": [{\"nodes\": [{\"id\": \"file:C:/x\"}]}]}\n")
            .map_err(io_failure)
    }

    fn remove_by_term(&self, input: &Path, output: &Path, term: &str) -> EngineResult<PathBuf> {
        self.record(format!("remove {term} {}", input.display()));
        fs::copy(input, output).map_err(io_failure)?;
        Ok(output.to_path_buf())
    }

    fn report(&self, _input: &Path, output: &Path) -> EngineResult<()> {
        self.record("report".to_string());
        fs::write(output, "").map_err(io_failure)
    }

    fn measure(&self, _input: &Path, output: &Path) -> EngineResult<()> {
        self.record("measure".to_string());
        fs::write(output, "").map_err(io_failure)
    }
}

/// Graph ETL double that writes fixed node/edge tables.
pub(crate) struct FakeEtl {
    pub(crate) nodes: String,
    pub(crate) edges: String,
    transform_failures: RefCell<Vec<EngineError>>,
    partial_on_failure: bool,
    validate_error: Option<EngineError>,
    calls: RefCell<Vec<String>>,
    knowledge_sources: RefCell<Vec<(String, String)>>,
}

impl FakeEtl {
    pub(crate) fn new(nodes: &str, edges: &str) -> Self {
        Self {
            nodes: nodes.to_string(),
            edges: edges.to_string(),
            transform_failures: RefCell::new(Vec::new()),
            partial_on_failure: false,
            validate_error: None,
            calls: RefCell::new(Vec::new()),
            knowledge_sources: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn with_transform_failures(self, failures: Vec<EngineError>) -> Self {
        *self.transform_failures.borrow_mut() = failures;
        self
    }

    /// Failing attempts still write the node table first, like a crash
    /// halfway through serialisation.
    pub(crate) fn with_partial_output(mut self) -> Self {
        self.partial_on_failure = true;
        self
    }

    pub(crate) fn with_validate_error(mut self, error: EngineError) -> Self {
        self.validate_error = Some(error);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub(crate) fn knowledge_sources(&self) -> Vec<(String, String)> {
        self.knowledge_sources.borrow().clone()
    }
}

impl GraphEtl for FakeEtl {
    fn transform(&self, request: &TransformRequest<'_>) -> EngineResult<()> {
        let inputs = request
            .inputs
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.calls.borrow_mut().push(format!("transform {inputs}"));
        *self.knowledge_sources.borrow_mut() = request.knowledge_sources.to_vec();

        let base = request.output.display().to_string();
        let mut failures = self.transform_failures.borrow_mut();
        if !failures.is_empty() {
            if self.partial_on_failure {
                fs::write(format!("{base}_nodes.tsv"), &self.nodes).map_err(io_failure)?;
            }
            return Err(failures.remove(0));
        }
        fs::write(format!("{base}_nodes.tsv"), &self.nodes).map_err(io_failure)?;
        fs::write(format!("{base}_edges.tsv"), &self.edges).map_err(io_failure)
    }

    fn validate(&self, inputs: &[PathBuf], _input_format: &str) -> EngineResult<Value> {
        self.calls
            .borrow_mut()
            .push(format!("validate {}", inputs.len()));
        match &self.validate_error {
            Some(err) => Err(err.clone()),
            None => Ok(json!({"ERROR": {}})),
        }
    }
}

pub(crate) struct FakeMetadata {
    pub(crate) metadata: OntologyMetadata,
    calls: RefCell<usize>,
}

impl FakeMetadata {
    pub(crate) fn named(name: &str, submission: &str) -> Self {
        Self {
            metadata: OntologyMetadata {
                name: name.to_string(),
                submission_id: Some(submission.to_string()),
                ..OntologyMetadata::default()
            },
            calls: RefCell::new(0),
        }
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            metadata: OntologyMetadata {
                missing_pages: vec!["latest_submission".to_string()],
                ..OntologyMetadata::default()
            },
            calls: RefCell::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        *self.calls.borrow()
    }
}

impl MetadataSource for FakeMetadata {
    fn fetch(&self, _ontology_id: &str) -> OntologyMetadata {
        *self.calls.borrow_mut() += 1;
        self.metadata.clone()
    }
}
