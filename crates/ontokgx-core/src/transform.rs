//! Graph interchange → node/edge tables through the graph ETL engine.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::engines::{EngineError, GraphEtl, TransformRequest};
use crate::error::Result;
use crate::metadata::{AGGREGATOR, AGGREGATOR_KNOWLEDGE_SOURCE, PRIMARY_KNOWLEDGE_SOURCE};
use crate::retry::{RepairableStage, RetryOutcome, run_with_repair};

pub const INPUT_FORMAT: &str = "obojson";
pub const OUTPUT_FORMAT: &str = "tsv";

/// Stripped in this order; the longer prefix has to go first.
const BAD_IDENTIFIER_PREFIXES: [&str; 2] = ["file:C:", "file:"];
const REPAIRED_SUFFIX: &str = ".repaired";

/// Provenance tags attached to every transformed edge.
#[must_use]
pub fn knowledge_source_tags(primary_source: &str) -> Vec<(String, String)> {
    vec![
        (AGGREGATOR_KNOWLEDGE_SOURCE.to_string(), AGGREGATOR.to_string()),
        (PRIMARY_KNOWLEDGE_SOURCE.to_string(), primary_source.to_string()),
    ]
}

/// Copies `input` to `output` with local-file pseudo identifiers removed
/// from every line.
pub fn remove_bad_identifiers(input: &Path, output: &Path) -> Result<PathBuf> {
    let reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    for line in reader.lines() {
        let mut line = line?;
        for prefix in BAD_IDENTIFIER_PREFIXES {
            if line.contains(prefix) {
                line = line.replace(prefix, "");
            }
        }
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(output.to_path_buf())
}

struct TransformStage<'a> {
    etl: &'a dyn GraphEtl,
    output_base: &'a Path,
    knowledge_sources: &'a [(String, String)],
    scratch: &'a Path,
}

impl RepairableStage for TransformStage<'_> {
    type Output = (PathBuf, PathBuf);

    fn name(&self) -> &'static str {
        "transform"
    }

    fn attempt(&self, input: &Path) -> std::result::Result<Self::Output, EngineError> {
        let inputs = [input.to_path_buf()];
        self.etl.transform(&TransformRequest {
            inputs: &inputs,
            input_format: INPUT_FORMAT,
            output: self.output_base,
            output_format: OUTPUT_FORMAT,
            knowledge_sources: self.knowledge_sources,
        })?;
        let base = self.output_base.display();
        Ok((
            PathBuf::from(format!("{base}_nodes.tsv")),
            PathBuf::from(format!("{base}_edges.tsv")),
        ))
    }

    fn should_repair(&self, error: &EngineError) -> bool {
        error.is_repairable()
    }

    fn repair(&self, input: &Path) -> std::result::Result<PathBuf, String> {
        let name = input
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("converted");
        let repaired = self.scratch.join(format!("{name}{REPAIRED_SUFFIX}"));
        remove_bad_identifiers(input, &repaired).map_err(|err| err.to_string())
    }
}

/// Transforms `converted` into `{output_base}_nodes.tsv` and
/// `{output_base}_edges.tsv`. Only a value-validation failure is repaired.
pub fn transform(
    etl: &dyn GraphEtl,
    converted: &Path,
    output_base: &Path,
    knowledge_sources: &[(String, String)],
    scratch: &Path,
) -> RetryOutcome<(PathBuf, PathBuf)> {
    let stage = TransformStage {
        etl,
        output_base,
        knowledge_sources,
        scratch,
    };
    run_with_repair(&stage, converted)
}
