use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::{OntoKgxError, Result};

/// 4store names every dump file with a 28-character hash.
pub const DUMP_FILENAME_LEN: usize = 28;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryFilter {
    /// When non-empty, only dumps whose file name matches one of these.
    pub include_only: Vec<String>,
    pub exclude: Vec<String>,
}

struct CompiledFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl CompiledFilter {
    fn new(filter: &DiscoveryFilter) -> Result<Self> {
        Ok(Self {
            include: compile_patterns("include", &filter.include_only)?,
            exclude: compile_patterns("exclude", &filter.exclude)?,
        })
    }

    fn allows(&self, file_name: &str) -> bool {
        if let Some(include) = &self.include
            && !include.is_match(file_name)
        {
            return false;
        }
        if let Some(exclude) = &self.exclude
            && exclude.is_match(file_name)
        {
            return false;
        }
        true
    }
}

fn compile_patterns(label: &str, patterns: &[String]) -> Result<Option<GlobSet>> {
    let mut builder = GlobSetBuilder::new();
    let mut added = 0usize;
    for pattern in patterns {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            continue;
        }
        let glob = Glob::new(trimmed).map_err(|err| {
            OntoKgxError::Validation(format!("invalid {label} pattern '{trimmed}': {err}"))
        })?;
        builder.add(glob);
        added += 1;
    }
    if added == 0 {
        return Ok(None);
    }
    let set = builder
        .build()
        .map_err(|err| OntoKgxError::Validation(format!("invalid {label} patterns: {err}")))?;
    Ok(Some(set))
}

/// Walks `input` recursively and returns every dump file that passes the
/// filter, sorted by path.
pub fn discover_dumps(input: &Path, filter: &DiscoveryFilter) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Err(OntoKgxError::NotFound(format!(
            "cannot find input directory {}",
            input.display()
        )));
    }
    let compiled = CompiledFilter::new(filter)?;

    tracing::info!(input = %input.display(), "looking for dump files");
    if !filter.include_only.is_empty() {
        tracing::info!(count = filter.include_only.len(), "will only include matching files");
    }
    if !filter.exclude.is_empty() {
        tracing::info!(count = filter.exclude.len(), "will exclude matching files");
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(input).follow_links(false) {
        let entry = entry.map_err(|err| OntoKgxError::Io(std::io::Error::other(err)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if file_name.chars().count() != DUMP_FILENAME_LEN || !compiled.allows(file_name) {
            continue;
        }
        found.push(entry.into_path());
    }
    found.sort();
    found.dedup();

    if found.is_empty() {
        return Err(OntoKgxError::NotFound(format!(
            "no dump files found under {}, or none matching filters",
            input.display()
        )));
    }
    tracing::info!(count = found.len(), "dump files found");
    Ok(found)
}
