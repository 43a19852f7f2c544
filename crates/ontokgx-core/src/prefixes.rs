//! Curated IRI prefix tables.
//!
//! `bioportal-prefixes-curated.tsv`: ontology id, IRI prefix, delimiter,
//! native flag. `bioportal-preferred-prefixes.tsv`: ontology id, preferred
//! prefix. Both start with a header row; `#` lines are comments.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{OntoKgxError, Result};
use crate::tables::FIELD_DELIMITER;

const WILDCARD: char = '*';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixEntry {
    pub iri_prefix: String,
    pub delimiter: String,
    pub is_native: bool,
}

impl PrefixEntry {
    /// `*`-led prefixes match anywhere in the IRI, others only at its start.
    #[must_use]
    pub fn matches(&self, iri: &str) -> bool {
        match self.iri_prefix.strip_prefix(WILDCARD) {
            Some(fragment) => iri.contains(fragment),
            None => iri.starts_with(&self.iri_prefix),
        }
    }

    /// Whatever follows the last delimiter; empty when there is none.
    #[must_use]
    pub fn local_part<'a>(&self, iri: &'a str) -> &'a str {
        iri.rsplit_once(self.delimiter.as_str())
            .map_or("", |(_, local)| local)
    }
}

/// Ontology id → entries in file order. Iteration is by ontology id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixTable {
    entries: BTreeMap<String, Vec<PrefixEntry>>,
}

impl PrefixTable {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = read_table(path)?;
        Self::parse(path, &raw)
    }

    pub fn parse(path: &Path, raw: &str) -> Result<Self> {
        let mut table = Self::default();
        for (line_no, fields) in data_rows(raw) {
            let [ontology_id, iri_prefix, delimiter, native, ..] = fields.as_slice() else {
                return Err(OntoKgxError::malformed_table(
                    path,
                    format!("line {line_no}: expected 4 fields, found {}", fields.len()),
                ));
            };
            if ontology_id.is_empty() || iri_prefix.is_empty() {
                return Err(OntoKgxError::malformed_table(
                    path,
                    format!("line {line_no}: empty ontology id or IRI prefix"),
                ));
            }
            if delimiter.is_empty() {
                tracing::warn!(
                    path = %path.display(),
                    line = line_no,
                    ontology = *ontology_id,
                    "prefix entry has no delimiter; ignoring"
                );
                continue;
            }
            table.push(
                ontology_id,
                PrefixEntry {
                    iri_prefix: (*iri_prefix).to_string(),
                    delimiter: (*delimiter).to_string(),
                    is_native: parse_flag(native),
                },
            );
        }
        tracing::debug!(ontologies = table.entries.len(), "loaded prefix table");
        Ok(table)
    }

    pub fn push(&mut self, ontology_id: &str, entry: PrefixEntry) {
        self.entries
            .entry(ontology_id.to_string())
            .or_default()
            .push(entry);
    }

    #[must_use]
    pub fn entries_for(&self, ontology_id: &str) -> &[PrefixEntry] {
        self.entries.get(ontology_id).map_or(&[], Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PrefixEntry])> {
        self.entries
            .iter()
            .map(|(id, entries)| (id.as_str(), entries.as_slice()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ontology id → canonical short prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferredPrefixTable {
    prefixes: BTreeMap<String, String>,
}

impl PreferredPrefixTable {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = read_table(path)?;
        Self::parse(path, &raw)
    }

    pub fn parse(path: &Path, raw: &str) -> Result<Self> {
        let mut table = Self::default();
        for (line_no, fields) in data_rows(raw) {
            let [ontology_id, prefix, ..] = fields.as_slice() else {
                return Err(OntoKgxError::malformed_table(
                    path,
                    format!("line {line_no}: expected 2 fields, found {}", fields.len()),
                ));
            };
            if ontology_id.is_empty() || prefix.is_empty() {
                continue;
            }
            table
                .prefixes
                .entry((*ontology_id).to_string())
                .or_insert_with(|| (*prefix).to_string());
        }
        Ok(table)
    }

    pub fn insert(&mut self, ontology_id: &str, prefix: &str) {
        self.prefixes
            .insert(ontology_id.to_string(), prefix.to_string());
    }

    /// The preferred prefix, or the ontology id itself.
    #[must_use]
    pub fn prefix_for<'a>(&'a self, ontology_id: &'a str) -> &'a str {
        self.prefixes
            .get(ontology_id)
            .map_or(ontology_id, String::as_str)
    }
}

fn read_table(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            OntoKgxError::NotFound(format!("prefix table {}", path.display()))
        } else {
            OntoKgxError::Io(err)
        }
    })
}

/// Non-comment rows after the header, with 1-based line numbers.
fn data_rows(raw: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with('#'))
        .skip(1)
        .map(|(idx, line)| {
            let fields = line.split(FIELD_DELIMITER).map(str::trim).collect();
            (idx + 1, fields)
        })
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.to_ascii_lowercase().as_str(),
        "true" | "t" | "1" | "yes" | "y"
    )
}
