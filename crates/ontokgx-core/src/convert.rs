//! Dump → graph interchange conversion through the reasoner.

use std::path::{Path, PathBuf};

use crate::engines::{EngineError, Reasoner};
use crate::retry::{RepairableStage, RetryOutcome, run_with_repair};

/// Null-valued comments are the usual reason a relax fails.
pub const COMMENT_TERM: &str = "rdfs:comment";
const NO_COMMENTS_SUFFIX: &str = "nocomments.owl";

struct ConversionStage<'a> {
    reasoner: &'a dyn Reasoner,
    output: &'a Path,
    scratch: &'a Path,
}

impl RepairableStage for ConversionStage<'_> {
    type Output = PathBuf;

    fn name(&self) -> &'static str {
        "relax"
    }

    fn attempt(&self, input: &Path) -> Result<PathBuf, EngineError> {
        self.reasoner.relax(input, self.output)?;
        Ok(self.output.to_path_buf())
    }

    fn should_repair(&self, error: &EngineError) -> bool {
        !matches!(error, EngineError::Unavailable(_))
    }

    fn repair(&self, input: &Path) -> Result<PathBuf, String> {
        let stem = input
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("dump");
        let repaired = self.scratch.join(format!("{stem}{NO_COMMENTS_SUFFIX}"));
        self.reasoner
            .remove_by_term(input, &repaired, COMMENT_TERM)
            .map_err(|err| err.to_string())
    }
}

/// Relaxes `input` into `output`; on failure strips comments into `scratch`
/// and tries once more.
pub fn convert(
    reasoner: &dyn Reasoner,
    input: &Path,
    output: &Path,
    scratch: &Path,
) -> RetryOutcome<PathBuf> {
    let stage = ConversionStage {
        reasoner,
        output,
        scratch,
    };
    run_with_repair(&stage, input)
}
