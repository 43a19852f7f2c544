use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::metadata::header_has_metadata;
use crate::tables::{EDGES_SUFFIX, NODES_SUFFIX, TsvTable, ID_COLUMN, field};

pub const REPORT_SUFFIX: &str = ".report";
pub const LOG_SUFFIX: &str = ".log";

/// Which durable artifacts an output directory already holds.
///
/// Always recomputed from a directory listing; nothing here is cached between
/// runs, which is what makes re-running over a large corpus idempotent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactState {
    pub has_nodes: bool,
    pub has_edges: bool,
    pub has_report: bool,
    pub has_validation_log: bool,
    pub has_metadata: bool,
    pub has_compact_ids: bool,
    pub table_count: usize,
}

impl ArtifactState {
    /// A finished transform leaves both halves of the pair.
    #[must_use]
    pub const fn has_tables(&self) -> bool {
        self.has_nodes && self.has_edges
    }
}

pub fn inspect_output_dir(output_dir: &Path) -> Result<ArtifactState> {
    let mut state = ArtifactState::default();
    if !output_dir.is_dir() {
        return Ok(state);
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(output_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();

    let mut node_tables = Vec::new();
    for name in &names {
        let is_nodes = name.ends_with(NODES_SUFFIX);
        let is_edges = name.ends_with(EDGES_SUFFIX);
        if is_nodes || is_edges {
            state.table_count += 1;
            state.has_nodes |= is_nodes;
            state.has_edges |= is_edges;
            let path = output_dir.join(name);
            if header_has_metadata(&path)? {
                state.has_metadata = true;
            }
            if is_nodes {
                node_tables.push(path);
            }
        }
        if name.ends_with(REPORT_SUFFIX) {
            state.has_report = true;
        }
        if name.ends_with(LOG_SUFFIX) {
            state.has_validation_log = true;
        }
    }

    state.has_compact_ids = !node_tables.is_empty() && all_ids_compact(&node_tables);
    tracing::debug!(output_dir = %output_dir.display(), ?state, "inspected output directory");
    Ok(state)
}

fn all_ids_compact(node_tables: &[std::path::PathBuf]) -> bool {
    node_tables.iter().all(|path| {
        let Ok(table) = TsvTable::read(path) else {
            return false;
        };
        let Some(id_idx) = table.column(ID_COLUMN) else {
            return false;
        };
        table
            .rows
            .iter()
            .all(|row| !field(row, id_idx).contains("://"))
    })
}
