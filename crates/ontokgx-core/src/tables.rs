//! KGX tab-separated node/edge tables.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::{OntoKgxError, Result};

pub const FIELD_DELIMITER: char = '\t';
pub const NODES_SUFFIX: &str = "nodes.tsv";
pub const EDGES_SUFFIX: &str = "edges.tsv";

pub const ID_COLUMN: &str = "id";
pub const CATEGORY_COLUMN: &str = "category";
pub const SUBJECT_COLUMN: &str = "subject";
pub const PREDICATE_COLUMN: &str = "predicate";
pub const OBJECT_COLUMN: &str = "object";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Nodes,
    Edges,
}

impl TableKind {
    #[must_use]
    pub fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(NODES_SUFFIX) {
            Some(Self::Nodes)
        } else if name.ends_with(EDGES_SUFFIX) {
            Some(Self::Edges)
        } else {
            None
        }
    }
}

/// Node and edge tables of one output directory, sorted by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphTables {
    pub nodes: Vec<PathBuf>,
    pub edges: Vec<PathBuf>,
}

impl GraphTables {
    pub fn list(dir: &Path) -> Result<Self> {
        let mut tables = Self::default();
        if !dir.is_dir() {
            return Ok(tables);
        }
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            match TableKind::of(&path) {
                Some(TableKind::Nodes) => tables.nodes.push(path),
                Some(TableKind::Edges) => tables.edges.push(path),
                None => {}
            }
        }
        tables.nodes.sort();
        tables.edges.sort();
        Ok(tables)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.nodes.len() + self.edges.len()
    }

    pub fn all(&self) -> impl Iterator<Item = &PathBuf> {
        self.nodes.iter().chain(self.edges.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsvTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TsvTable {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::parse(path, &raw)
    }

    pub fn parse(path: &Path, raw: &str) -> Result<Self> {
        let mut lines = raw.split_terminator('\n');
        let header = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| OntoKgxError::malformed_table(path, "missing header row"))?;
        Ok(Self {
            header: split_fields(header),
            rows: lines.map(split_fields).collect(),
        })
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|heading| heading == name)
    }

    pub fn require_column(&self, path: &Path, name: &str) -> Result<usize> {
        self.column(name)
            .ok_or_else(|| OntoKgxError::malformed_table(path, format!("missing '{name}' column")))
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for fields in std::iter::once(&self.header).chain(self.rows.iter()) {
            out.push_str(&fields.join("\t"));
            out.push('\n');
        }
        out
    }
}

fn split_fields(line: &str) -> Vec<String> {
    line.split(FIELD_DELIMITER).map(ToString::to_string).collect()
}

/// Field `idx` of `row`, or the empty string for a short row.
#[must_use]
pub fn field(row: &[String], idx: usize) -> &str {
    row.get(idx).map_or("", String::as_str)
}

pub fn set_field(row: &mut Vec<String>, idx: usize, value: String) {
    if row.len() <= idx {
        row.resize(idx + 1, String::new());
    }
    row[idx] = value;
}

pub fn read_header_line(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(fs::File::open(path)?);
    let mut header = String::new();
    reader.read_line(&mut header)?;
    Ok(header.trim_end_matches(['\n', '\r']).to_string())
}

/// Writes `content` next to `path` under a unique name and returns the
/// staged path; [`commit_staged`] moves it into place.
pub fn stage_write(path: &Path, content: &str) -> Result<PathBuf> {
    let parent = path.parent().ok_or_else(|| {
        OntoKgxError::Validation(format!("target has no parent: {}", path.display()))
    })?;
    let file_name = path
        .file_name()
        .and_then(|x| x.to_str())
        .ok_or_else(|| {
            OntoKgxError::Validation(format!("invalid target filename: {}", path.display()))
        })?;
    let tmp_path = parent.join(format!(
        ".{file_name}.ontokgx.tmp.{}",
        uuid::Uuid::new_v4().simple()
    ));

    let written = (|| -> std::io::Result<()> {
        let mut tmp = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&tmp_path)?;
        tmp.write_all(content.as_bytes())?;
        tmp.sync_all()
    })();
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(tmp_path)
}

pub fn commit_staged(staged: &Path, path: &Path) -> Result<()> {
    if let Err(err) = fs::rename(staged, path) {
        let _ = fs::remove_file(staged);
        return Err(OntoKgxError::from(err));
    }
    Ok(())
}

pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let staged = stage_write(path, content)?;
    commit_staged(&staged, path)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn parse_keeps_header_rows_and_short_rows() {
        let table = TsvTable::parse(
            Path::new("x_nodes.tsv"),
            "id\tcategory\tname\nA\tbiolink:NamedThing\tAlpha\nB\n",
        )
        .expect("parse");
        assert_eq!(table.header, vec!["id", "category", "name"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(field(&table.rows[1], 1), "");
        assert_eq!(table.column("name"), Some(2));
        assert_eq!(table.column("missing"), None);
    }

    #[test]
    fn render_round_trips_newline_terminated_input() {
        let raw = "id\tcategory\nA\tbiolink:NamedThing\n\nB\tx\n";
        let table = TsvTable::parse(Path::new("x_nodes.tsv"), raw).expect("parse");
        assert_eq!(table.render(), raw);
    }

    #[test]
    fn empty_file_has_no_header() {
        let err = TsvTable::parse(Path::new("x_edges.tsv"), "").expect_err("must fail");
        assert_eq!(err.code(), "MALFORMED_TABLE");
    }

    #[test]
    fn set_field_pads_short_rows() {
        let mut row = vec!["A".to_string()];
        set_field(&mut row, 2, "c".to_string());
        assert_eq!(row, vec!["A", "", "c"]);
    }

    #[test]
    fn graph_tables_lists_by_suffix() {
        let temp = tempdir().expect("tempdir");
        for name in ["BTO_1_nodes.tsv", "BTO_1_edges.tsv", "robot.report", "notes.txt"] {
            fs::write(temp.path().join(name), "id\n").expect("write");
        }
        let tables = GraphTables::list(temp.path()).expect("list");
        assert_eq!(tables.nodes, vec![temp.path().join("BTO_1_nodes.tsv")]);
        assert_eq!(tables.edges, vec![temp.path().join("BTO_1_edges.tsv")]);
        assert_eq!(tables.count(), 2);

        let missing = GraphTables::list(&temp.path().join("absent")).expect("list missing");
        assert!(missing.is_empty());
    }

    #[test]
    fn write_atomic_overwrites_and_leaves_no_staging_files() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("BTO_1_nodes.tsv");
        fs::write(&path, "old").expect("seed");
        write_atomic(&path, "new").expect("write atomic");
        assert_eq!(fs::read_to_string(&path).expect("read"), "new");
        let leftovers = fs::read_dir(temp.path()).expect("read dir").count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn read_header_line_returns_first_line_only() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("BTO_1_edges.tsv");
        fs::write(&path, "id\tsubject\r\nrow\n").expect("seed");
        assert_eq!(read_header_line(&path).expect("header"), "id\tsubject");
    }
}
