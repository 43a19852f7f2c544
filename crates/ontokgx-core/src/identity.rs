//! Dump identity: which ontology and submission a raw dump belongs to, and
//! where its transforms live.
//!
//! Every 4store dump starts with one header line naming its source graph, e.g.
//! `# http://data.bioontology.org/ontologies/BTO/submissions/1/download`.
//! The header is the only place the ontology id and version appear, so it is
//! parsed once per file and the result is immutable afterwards.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::DumpRecord;

pub const NAMESPACE: &str = "data.bioontology.org";
pub const TARGET_TYPE: &str = "ontologies";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The header does not mention the namespace at all.
    MalformedHeader,
    /// The header points at something other than an ontology.
    NotOntology { target: String },
    /// The ontology path has no id or version segment.
    IncompletePath,
}

impl SkipReason {
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::MalformedHeader => "header looks wrong".to_string(),
            Self::NotOntology { target } => format!("not an ontology dump (target '{target}')"),
            Self::IncompletePath => "header has no ontology id/version".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityOutcome {
    Parsed(DumpRecord),
    Skipped(SkipReason),
}

#[must_use]
pub fn parse_header(header: &str, path: &Path, transforms_root: &Path) -> IdentityOutcome {
    let Some(after_namespace) = header.trim_end().split(NAMESPACE).nth(1) else {
        return IdentityOutcome::Skipped(SkipReason::MalformedHeader);
    };

    let segments = after_namespace
        .trim_start_matches('/')
        .split('/')
        .collect::<Vec<_>>();
    if segments.first().copied() != Some(TARGET_TYPE) {
        return IdentityOutcome::Skipped(SkipReason::NotOntology {
            target: segments.first().copied().unwrap_or_default().to_string(),
        });
    }

    let ontology_id = segments.get(1).map(|s| s.trim()).unwrap_or_default();
    let version = segments.get(3).map(|s| s.trim()).unwrap_or_default();
    if ontology_id.is_empty() || version.is_empty() {
        return IdentityOutcome::Skipped(SkipReason::IncompletePath);
    }

    IdentityOutcome::Parsed(DumpRecord {
        path: path.to_path_buf(),
        ontology_id: ontology_id.to_string(),
        version: version.to_string(),
        output_dir: transforms_root.join(TARGET_TYPE).join(ontology_id),
        output_base: format!("{ontology_id}_{version}"),
    })
}

/// An opened dump with its header line already consumed.
pub struct DumpReader {
    path: PathBuf,
    header: String,
    body: BufReader<File>,
}

impl std::fmt::Debug for DumpReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpReader")
            .field("path", &self.path)
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl DumpReader {
    pub fn open(path: &Path) -> Result<Self> {
        let mut body = BufReader::new(File::open(path)?);
        let mut header = String::new();
        body.read_line(&mut header)?;
        Ok(Self {
            path: path.to_path_buf(),
            header: header.trim_end().to_string(),
            body,
        })
    }

    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Whether anything follows the header. Reads at most one buffer.
    pub fn has_body(mut self) -> Result<bool> {
        Ok(!self.body.fill_buf()?.is_empty())
    }

    /// Copies everything after the header to `dest` and returns the number
    /// of lines written. Zero means the dump has no content.
    pub fn write_body(mut self, dest: &Path) -> Result<usize> {
        let mut out = BufWriter::new(File::create(dest)?);
        let mut line = Vec::new();
        let mut count = 0usize;
        loop {
            line.clear();
            if self.body.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            out.write_all(&line)?;
            count += 1;
        }
        out.flush()?;
        Ok(count)
    }
}
