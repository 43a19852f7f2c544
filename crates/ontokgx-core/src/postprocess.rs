//! In-place rewriting of one output directory's node and edge tables.
//!
//! Everything is computed in memory first. Files are replaced only once the
//! whole directory has been rewritten and edge references still resolve, so
//! a failure never leaves a half-rewritten pair behind.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{PipelineConfig, StageOptions};
use crate::curie::CurieAssigner;
use crate::error::{OntoKgxError, Result};
use crate::prefixes::{PreferredPrefixTable, PrefixTable};
use crate::remap::{collect_type_assertions, remap_node_types};
use crate::tables::{
    GraphTables, ID_COLUMN, OBJECT_COLUMN, SUBJECT_COLUMN, TsvTable, commit_staged, field,
    set_field, stage_write, write_atomic,
};
use crate::typemap::TypeMap;

/// Read-only lookup tables shared by every file of a run.
#[derive(Debug, Clone, Default)]
pub struct RunTables {
    pub prefixes: PrefixTable,
    pub preferred: PreferredPrefixTable,
    pub type_map: TypeMap,
}

impl RunTables {
    /// Loads only the tables the enabled stages need.
    pub fn load(config: &PipelineConfig, options: StageOptions) -> Result<Self> {
        let mut tables = Self::default();
        if options.write_curies {
            tables.prefixes = PrefixTable::load(&config.prefix_table_path())?;
            tables.preferred = PreferredPrefixTable::load(&config.preferred_prefix_path())?;
        }
        if options.remap_types {
            tables.type_map = TypeMap::load_dir(&config.mapping_dir)?;
        }
        Ok(tables)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostProcessPlan {
    pub remap_types: bool,
    pub write_curies: bool,
}

impl PostProcessPlan {
    #[must_use]
    pub const fn is_empty(self) -> bool {
        !self.remap_types && !self.write_curies
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostProcessSummary {
    pub remapped_nodes: usize,
    pub rewritten_ids: usize,
    pub unresolved_ids: usize,
    pub files_written: usize,
}

struct LoadedTable {
    path: PathBuf,
    original: String,
    table: TsvTable,
}

impl LoadedTable {
    fn read(path: &Path) -> Result<Self> {
        let original = fs::read_to_string(path)?;
        let table = TsvTable::parse(path, &original)?;
        Ok(Self {
            path: path.to_path_buf(),
            original,
            table,
        })
    }
}

/// Remaps types (on IRIs) and then assigns CURIEs across every table in
/// `tables`. Nothing is written unless both steps succeed.
pub fn post_process(
    tables: &GraphTables,
    own_id: &str,
    run_tables: &RunTables,
    plan: PostProcessPlan,
) -> Result<PostProcessSummary> {
    let mut summary = PostProcessSummary::default();
    if plan.is_empty() || tables.is_empty() {
        return Ok(summary);
    }

    let mut nodes = tables
        .nodes
        .iter()
        .map(|path| LoadedTable::read(path))
        .collect::<Result<Vec<_>>>()?;
    let mut edges = tables
        .edges
        .iter()
        .map(|path| LoadedTable::read(path))
        .collect::<Result<Vec<_>>>()?;

    let ids_before = node_ids(&nodes)?;

    if plan.remap_types {
        let assertions = collect_type_assertions(
            edges
                .iter()
                .map(|loaded| (loaded.path.as_path(), &loaded.table)),
        )?;
        for loaded in &mut nodes {
            summary.remapped_nodes += remap_node_types(
                &loaded.path,
                &mut loaded.table,
                &assertions,
                &run_tables.type_map,
            )?;
        }
    }

    if plan.write_curies {
        let assigner = CurieAssigner::new(&run_tables.prefixes, &run_tables.preferred);
        let index = assigner.build_index(ids_before.iter().map(String::as_str), own_id);
        summary.rewritten_ids = index.len();
        summary.unresolved_ids = index.unresolved();

        for loaded in &mut nodes {
            let id_idx = loaded.table.require_column(&loaded.path, ID_COLUMN)?;
            for row in &mut loaded.table.rows {
                let rewritten = index.rewrite(field(row, id_idx)).to_string();
                if rewritten != field(row, id_idx) {
                    set_field(row, id_idx, rewritten);
                }
            }
        }
        for loaded in &mut edges {
            let subject_idx = loaded.table.require_column(&loaded.path, SUBJECT_COLUMN)?;
            let object_idx = loaded.table.require_column(&loaded.path, OBJECT_COLUMN)?;
            for row in &mut loaded.table.rows {
                for idx in [subject_idx, object_idx] {
                    let rewritten = index.rewrite(field(row, idx)).to_string();
                    if rewritten != field(row, idx) {
                        set_field(row, idx, rewritten);
                    }
                }
            }
        }

        check_edge_references(&ids_before, &nodes, &edges, |id| {
            index.rewrite(id).to_string()
        })?;
    }

    summary.files_written = write_changed(nodes.iter().chain(edges.iter()))?;
    Ok(summary)
}

fn node_ids(nodes: &[LoadedTable]) -> Result<HashSet<String>> {
    let mut ids = HashSet::new();
    for loaded in nodes {
        let id_idx = loaded.table.require_column(&loaded.path, ID_COLUMN)?;
        ids.extend(
            loaded
                .table
                .rows
                .iter()
                .map(|row| field(row, id_idx))
                .filter(|id| !id.is_empty())
                .map(ToString::to_string),
        );
    }
    Ok(ids)
}

/// Every edge endpoint that named a node before rewriting must name one
/// after it.
fn check_edge_references(
    ids_before: &HashSet<String>,
    nodes: &[LoadedTable],
    edges: &[LoadedTable],
    rewrite: impl Fn(&str) -> String,
) -> Result<()> {
    let ids_after = node_ids(nodes)?;
    let expected_after = ids_before
        .iter()
        .map(|id| rewrite(id))
        .collect::<HashSet<_>>();

    for loaded in edges {
        let subject_idx = loaded.table.require_column(&loaded.path, SUBJECT_COLUMN)?;
        let object_idx = loaded.table.require_column(&loaded.path, OBJECT_COLUMN)?;
        for row in &loaded.table.rows {
            for idx in [subject_idx, object_idx] {
                let reference = field(row, idx);
                if expected_after.contains(reference) && !ids_after.contains(reference) {
                    return Err(OntoKgxError::PostProcess(format!(
                        "edge reference '{reference}' in {} no longer resolves to a node",
                        loaded.path.display()
                    )));
                }
            }
        }
    }
    Ok(())
}

struct StagedTable<'a> {
    staged: PathBuf,
    path: &'a Path,
    original: &'a str,
}

/// Stages every changed table, then commits them together.
fn write_changed<'a>(tables: impl Iterator<Item = &'a LoadedTable>) -> Result<usize> {
    let mut staged = Vec::new();
    for loaded in tables {
        let rendered = loaded.table.render();
        if rendered == loaded.original {
            continue;
        }
        match stage_write(&loaded.path, &rendered) {
            Ok(tmp) => staged.push(StagedTable {
                staged: tmp,
                path: &loaded.path,
                original: &loaded.original,
            }),
            Err(err) => {
                discard_staged(&staged);
                return Err(err);
            }
        }
    }
    commit_all(&staged)
}

/// Renames staged files into place in order. When one rename fails, the
/// tables already replaced get their original content back and the rest of
/// the staged files are removed.
fn commit_all(staged: &[StagedTable<'_>]) -> Result<usize> {
    for (done, table) in staged.iter().enumerate() {
        if let Err(err) = commit_staged(&table.staged, table.path) {
            for committed in &staged[..done] {
                if let Err(restore) = write_atomic(committed.path, committed.original) {
                    tracing::warn!(
                        path = %committed.path.display(),
                        error = %restore,
                        "cannot restore table after failed commit"
                    );
                }
            }
            discard_staged(&staged[done + 1..]);
            return Err(err);
        }
        tracing::debug!(path = %table.path.display(), "rewrote table");
    }
    Ok(staged.len())
}

fn discard_staged(staged: &[StagedTable<'_>]) {
    for table in staged {
        let _ = fs::remove_file(&table.staged);
    }
}
