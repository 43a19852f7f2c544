//! Structural, syntactic and semantic checks over an output directory.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;

use crate::engines::GraphEtl;
use crate::error::{OntoKgxError, Result};
use crate::tables::{FIELD_DELIMITER, GraphTables, TableKind, write_atomic};

/// Rows read per chunk by the syntactic check.
pub const CHUNK_ROWS: usize = 10_000;
const SEMANTIC_INPUT_FORMAT: &str = "tsv";
const TABLE_EXTENSION: &str = "tsv";

/// Fewer than two lines: a header at most, so nothing to validate.
pub fn is_file_too_short(path: &Path) -> Result<bool> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = 0usize;
    for line in reader.split(b'\n') {
        line?;
        lines += 1;
        if lines >= 2 {
            return Ok(false);
        }
    }
    Ok(true)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub nodes: usize,
    pub edges: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableCounts {
    /// Zero nodes and zero edges means the tables are unusable.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.nodes > 0 || self.edges > 0
    }
}

/// Parses every node/edge table in `dir` as strict, unquoted, tab-delimited
/// text and counts data rows per table kind. Any parse error zeroes both
/// counts.
pub fn check_tables(dir: &Path) -> Result<TableCounts> {
    let tables = GraphTables::list(dir)?;
    if tables.is_empty() {
        tracing::warn!(dir = %dir.display(), "no graph tables to parse");
        return Ok(TableCounts {
            error: Some(format!("no graph tables in {}", dir.display())),
            ..TableCounts::default()
        });
    }

    let mut counts = TableCounts::default();
    for path in tables.all() {
        match count_rows(path) {
            Ok(rows) => {
                match TableKind::of(path) {
                    Some(TableKind::Nodes) => counts.nodes += rows,
                    Some(TableKind::Edges) => counts.edges += rows,
                    None => {}
                }
                tracing::debug!(path = %path.display(), rows, "graph table parses");
            }
            Err(OntoKgxError::MalformedTable { path, message }) => {
                tracing::warn!(path = %path, error = %message, "graph table does not parse");
                return Ok(TableCounts {
                    nodes: 0,
                    edges: 0,
                    error: Some(format!("{path}: {message}")),
                });
            }
            Err(err) => return Err(err),
        }
    }
    Ok(counts)
}

fn count_rows(path: &Path) -> Result<usize> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut header = String::new();
    if reader.read_line(&mut header)? == 0 || header.trim_end_matches('\n').is_empty() {
        return Err(OntoKgxError::malformed_table(path, "no columns to parse from file"));
    }
    let width = header.trim_end_matches('\n').split(FIELD_DELIMITER).count();

    let mut rows = 0usize;
    let mut line_no = 1usize;
    let mut chunk = Vec::with_capacity(CHUNK_ROWS);
    let mut lines = reader.lines();
    loop {
        chunk.clear();
        for line in lines.by_ref().take(CHUNK_ROWS) {
            chunk.push(line?);
        }
        if chunk.is_empty() {
            break;
        }
        for line in &chunk {
            line_no += 1;
            if line.is_empty() {
                continue;
            }
            let fields = line.split(FIELD_DELIMITER).count();
            if fields > width {
                return Err(OntoKgxError::malformed_table(
                    path,
                    format!("line {line_no}: expected {width} fields, saw {fields}"),
                ));
            }
            rows += 1;
        }
    }
    Ok(rows)
}

/// Runs the external validator over every table that is long enough and
/// writes its findings to `log_path`. Returns false when validation did not
/// complete.
pub fn semantic_validate(etl: &dyn GraphEtl, dir: &Path, log_path: &Path) -> Result<bool> {
    let mut inputs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some(TABLE_EXTENSION)
        {
            continue;
        }
        if is_file_too_short(&path)? {
            tracing::debug!(path = %path.display(), "table too short for validation");
            continue;
        }
        inputs.push(path);
    }
    inputs.sort();

    if inputs.is_empty() {
        tracing::warn!(dir = %dir.display(), "all tables are blank or very short");
        return Ok(false);
    }

    match etl.validate(&inputs, SEMANTIC_INPUT_FORMAT) {
        Ok(findings) => {
            write_atomic(log_path, &serde_json::to_string_pretty(&findings)?)?;
            tracing::info!(log = %log_path.display(), "wrote validation findings");
            Ok(true)
        }
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "validation did not complete");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::engines::EngineError;
    use crate::engines::test_support::FakeEtl;

    #[test]
    fn too_short_means_fewer_than_two_lines() {
        let temp = tempdir().expect("tempdir");
        for (name, content, expected) in [
            ("empty", "", true),
            ("header", "id\tcategory\n", true),
            ("header-no-newline", "id\tcategory", true),
            ("one-row", "id\tcategory\nA\tB\n", false),
            ("unterminated", "id\nA", false),
        ] {
            let path = temp.path().join(name);
            fs::write(&path, content).expect("write");
            assert_eq!(is_file_too_short(&path).expect("check"), expected, "{name}");
        }
    }

    #[test]
    fn counts_rows_per_table_kind() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("BTO_1_nodes.tsv"), "id\tcategory\nA\tx\nB\ty\n\n").expect("n");
        fs::write(temp.path().join("BTO_1_edges.tsv"), "id\tsubject\tpredicate\tobject\ne\tA\tp\n")
            .expect("e");

        let counts = check_tables(temp.path()).expect("check");
        assert_eq!(counts.nodes, 2);
        assert_eq!(counts.edges, 1);
        assert!(counts.is_valid());
        assert!(counts.error.is_none());
    }

    #[test]
    fn counts_across_chunk_boundaries() {
        let temp = tempdir().expect("tempdir");
        let mut body = String::from("id\tcategory\n");
        for idx in 0..(CHUNK_ROWS + 5) {
            body.push_str(&format!("N{idx}\tbiolink:NamedThing\n"));
        }
        fs::write(temp.path().join("X_nodes.tsv"), body).expect("nodes");

        let counts = check_tables(temp.path()).expect("check");
        assert_eq!(counts.nodes, CHUNK_ROWS + 5);
    }

    #[test]
    fn overlong_row_zeroes_both_counts() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("BTO_1_nodes.tsv"), "id\tcategory\nA\tx\n").expect("n");
        fs::write(temp.path().join("BTO_1_edges.tsv"), "id\tsubject\ne\tA\tB\n").expect("e");

        let counts = check_tables(temp.path()).expect("check");
        assert_eq!((counts.nodes, counts.edges), (0, 0));
        assert!(!counts.is_valid());
        assert!(counts.error.expect("error").contains("line 2"));
    }

    #[test]
    fn empty_table_is_an_empty_data_error() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("BTO_1_nodes.tsv"), "").expect("n");
        let counts = check_tables(temp.path()).expect("check");
        assert!(!counts.is_valid());
        assert!(counts.error.is_some());
    }

    #[test]
    fn semantic_validation_writes_pretty_log() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("BTO_1_nodes.tsv"), "id\nA\n").expect("n");
        fs::write(temp.path().join("BTO_1_edges.tsv"), "id\n").expect("e");
        let etl = FakeEtl::new("", "");
        let log = temp.path().join("kgx_validate_BTO_1.log");

        assert!(semantic_validate(&etl, temp.path(), &log).expect("validate"));
        assert_eq!(etl.calls(), vec!["validate 1"]);
        assert_eq!(
            fs::read_to_string(&log).expect("log"),
            "{\n  \"ERROR\": {}\n}"
        );
    }

    #[test]
    fn engine_error_means_incomplete() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("BTO_1_nodes.tsv"), "id\nA\n").expect("n");
        let etl = FakeEtl::new("", "").with_validate_error(EngineError::Failed("TypeError".into()));
        let log = temp.path().join("kgx_validate_BTO_1.log");

        assert!(!semantic_validate(&etl, temp.path(), &log).expect("validate"));
        assert!(!log.exists());
    }

    #[test]
    fn only_short_tables_means_incomplete_without_engine_call() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("BTO_1_nodes.tsv"), "id\n").expect("n");
        let etl = FakeEtl::new("", "");
        let log = temp.path().join("kgx_validate_BTO_1.log");
        assert!(!semantic_validate(&etl, temp.path(), &log).expect("validate"));
        assert!(etl.calls().is_empty());
    }
}
