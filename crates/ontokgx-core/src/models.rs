use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identity of one dump file, derived from its header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DumpRecord {
    pub path: PathBuf,
    pub ontology_id: String,
    pub version: String,
    pub output_dir: PathBuf,
    pub output_base: String,
}

impl DumpRecord {
    /// `{output_dir}/{output_base}`: the base the graph engine appends
    /// `_nodes.tsv` / `_edges.tsv` to, and the empty-source placeholder.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_base)
    }

    #[must_use]
    pub fn relaxed_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_relaxed.json", self.output_base))
    }

    #[must_use]
    pub fn nodes_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_nodes.tsv", self.output_base))
    }

    #[must_use]
    pub fn edges_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_edges.tsv", self.output_base))
    }

    #[must_use]
    pub fn validation_log_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("kgx_validate_{}.log", self.output_base))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAIL")]
    Fail,
}

impl TransformStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Fail => "FAIL",
        }
    }
}

/// Per-file failure taxonomy. Each kind is attributed to exactly one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MalformedHeader,
    EmptySource,
    ConversionFailure,
    TransformFailure,
    PostProcessFailure,
    ValidationIncomplete,
    InvalidTables,
    MetadataUnavailable,
}

impl FailureKind {
    /// Whether this kind turns the file's status into FAIL.
    #[must_use]
    pub const fn fails_file(self) -> bool {
        !matches!(self, Self::MalformedHeader | Self::MetadataUnavailable)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedHeader => "malformed_header",
            Self::EmptySource => "empty_source",
            Self::ConversionFailure => "conversion_failure",
            Self::TransformFailure => "transform_failure",
            Self::PostProcessFailure => "post_process_failure",
            Self::ValidationIncomplete => "validation_incomplete",
            Self::InvalidTables => "invalid_tables",
            Self::MetadataUnavailable => "metadata_unavailable",
        }
    }
}

/// Final record for one processed dump; written to the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRecord {
    pub id: String,
    pub status: TransformStatus,
    pub node_count: usize,
    pub edge_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub unresolved_ids: usize,
}

impl TransformRecord {
    #[must_use]
    pub fn ok(id: impl Into<String>, node_count: usize, edge_count: usize) -> Self {
        Self {
            id: id.into(),
            status: TransformStatus::Ok,
            node_count,
            edge_count,
            failure: None,
            unresolved_ids: 0,
        }
    }

    #[must_use]
    pub fn failed(id: impl Into<String>, failure: FailureKind) -> Self {
        Self {
            id: id.into(),
            status: TransformStatus::Fail,
            node_count: 0,
            edge_count: 0,
            failure: Some(failure),
            unresolved_ids: 0,
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, TransformStatus::Ok)
    }
}

const fn is_zero(value: &usize) -> bool {
    *value == 0
}
