//! Node category remapping from type assertions and the run's type map.

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::tables::{
    CATEGORY_COLUMN, ID_COLUMN, OBJECT_COLUMN, PREDICATE_COLUMN, SUBJECT_COLUMN, TsvTable, field,
    set_field,
};
use crate::typemap::{TypeMap, type_key};

pub const FALLBACK_CATEGORY: &str = "biolink:NamedThing";
pub const CATEGORY_SEPARATOR: char = '|';

const TYPE_MARKERS: [&str; 2] = ["rdf:type", "#type"];

#[must_use]
pub fn is_type_assertion(predicate: &str) -> bool {
    TYPE_MARKERS
        .iter()
        .any(|marker| predicate.ends_with(marker))
}

/// Dedups categories keeping first occurrence. The fallback category stays
/// only when nothing else remains, and fills an empty field.
#[must_use]
pub fn normalize_categories(raw: &str) -> String {
    let mut categories: Vec<&str> = Vec::new();
    for category in raw.split(CATEGORY_SEPARATOR).map(str::trim) {
        if !category.is_empty() && !categories.contains(&category) {
            categories.push(category);
        }
    }
    if categories.len() > 1 {
        categories.retain(|category| *category != FALLBACK_CATEGORY);
    }
    if categories.is_empty() {
        return FALLBACK_CATEGORY.to_string();
    }
    categories.join("|")
}

/// `key(subject) → key(object)` for every type-assertion edge; the first
/// assertion for a subject is kept.
pub fn collect_type_assertions<'a>(
    edges: impl IntoIterator<Item = (&'a Path, &'a TsvTable)>,
) -> Result<HashMap<String, String>> {
    let mut assertions = HashMap::new();
    for (path, table) in edges {
        let subject_idx = table.require_column(path, SUBJECT_COLUMN)?;
        let predicate_idx = table.require_column(path, PREDICATE_COLUMN)?;
        let object_idx = table.require_column(path, OBJECT_COLUMN)?;
        for row in &table.rows {
            if !is_type_assertion(field(row, predicate_idx)) {
                continue;
            }
            assertions
                .entry(type_key(field(row, subject_idx)))
                .or_insert_with(|| type_key(field(row, object_idx)));
        }
    }
    Ok(assertions)
}

/// Appends mapped categories to each node and normalizes every category
/// field. Returns the number of nodes that received a mapped category.
pub fn remap_node_types(
    path: &Path,
    nodes: &mut TsvTable,
    assertions: &HashMap<String, String>,
    type_map: &TypeMap,
) -> Result<usize> {
    let id_idx = nodes.require_column(path, ID_COLUMN)?;
    let category_idx = nodes.require_column(path, CATEGORY_COLUMN)?;

    let mut remapped = 0usize;
    for row in &mut nodes.rows {
        if row.iter().all(String::is_empty) {
            continue;
        }
        let key = type_key(field(row, id_idx));
        let mapped = assertions
            .get(&key)
            .and_then(|asserted| type_map.get(asserted))
            .or_else(|| type_map.get(&key));

        let current = field(row, category_idx);
        let updated = match mapped {
            Some(target) => {
                remapped += 1;
                normalize_categories(&format!("{current}{CATEGORY_SEPARATOR}{target}"))
            }
            None => normalize_categories(current),
        };
        set_field(row, category_idx, updated);
    }
    Ok(remapped)
}
