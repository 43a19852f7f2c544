//! Source type → target type lookup merged from SSSOM mapping tables.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{OntoKgxError, Result};
use crate::tables::{FIELD_DELIMITER, field};

const SUBJECT_ID: &str = "subject_id";
const OBJECT_ID: &str = "object_id";

/// The lookup key for a type or node identifier: its last two `/` segments
/// joined with `:`, or the id itself when it has no `/`.
#[must_use]
pub fn type_key(id: &str) -> String {
    let mut segments = id.trim_end_matches('/').rsplit('/');
    let last = segments.next().unwrap_or_default();
    match segments.next() {
        Some(parent) if !parent.is_empty() => format!("{parent}:{last}"),
        _ => last.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeMap {
    targets: HashMap<String, String>,
}

impl TypeMap {
    /// Merges every file in `dir`, sorted by name; the first mapping for a
    /// subject wins.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(OntoKgxError::NotFound(format!(
                "mapping directory {}",
                dir.display()
            )));
        }
        let mut files = fs::read_dir(dir)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<std::io::Result<Vec<PathBuf>>>()?;
        files.retain(|path| path.is_file());
        files.sort();

        let mut map = Self::default();
        for path in &files {
            let raw = fs::read_to_string(path)?;
            let added = map.merge_sssom(path, &raw)?;
            tracing::debug!(path = %path.display(), added, "merged type mappings");
        }
        tracing::info!(files = files.len(), mappings = map.len(), "loaded type map");
        Ok(map)
    }

    /// Adds the rows of one SSSOM table and returns how many were new.
    pub fn merge_sssom(&mut self, path: &Path, raw: &str) -> Result<usize> {
        let mut lines = raw
            .lines()
            .filter(|line| !line.starts_with('#') && !line.trim().is_empty());
        let Some(header) = lines.next() else {
            return Ok(0);
        };
        let header = header.split(FIELD_DELIMITER).map(str::trim).collect::<Vec<_>>();
        let column = |name: &str| {
            header.iter().position(|heading| *heading == name).ok_or_else(|| {
                OntoKgxError::malformed_table(path, format!("missing '{name}' column"))
            })
        };
        let subject_idx = column(SUBJECT_ID)?;
        let object_idx = column(OBJECT_ID)?;

        let mut added = 0usize;
        for line in lines {
            let row = line
                .split(FIELD_DELIMITER)
                .map(|value| value.trim().to_string())
                .collect::<Vec<_>>();
            let subject = field(&row, subject_idx);
            let object = field(&row, object_idx);
            if subject.is_empty() || object.is_empty() || self.targets.contains_key(subject) {
                continue;
            }
            self.targets.insert(subject.to_string(), object.to_string());
            added += 1;
        }
        Ok(added)
    }

    pub fn insert(&mut self, source: &str, target: &str) {
        self.targets
            .entry(source.to_string())
            .or_insert_with(|| target.to_string());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.targets.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
