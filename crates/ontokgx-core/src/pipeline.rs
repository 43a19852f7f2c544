//! Per-file orchestration: decide what work a dump still needs, run it, and
//! turn the outcome into a [`TransformRecord`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::artifacts::{ArtifactState, inspect_output_dir};
use crate::audit::write_audit_reports;
use crate::config::StageOptions;
use crate::convert::convert;
use crate::engines::{GraphEtl, Reasoner};
use crate::error::Result;
use crate::identity::{DumpReader, IdentityOutcome, parse_header};
use crate::metadata::{MetadataSource, OntologyMetadata, add_metadata_column};
use crate::models::{DumpRecord, FailureKind, TransformRecord, TransformStatus};
use crate::postprocess::{PostProcessPlan, RunTables, post_process};
use crate::retry::RetryOutcome;
use crate::stats::{RunSummary, summarize};
use crate::tables::GraphTables;
use crate::transform::{knowledge_source_tags, transform};
use crate::validate::{check_tables, semantic_validate};


/// One step a file went through, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum FileStage {
    Scanned,
    SkipComplete,
    NeedsConversion,
    ParsePrecheck { valid: bool },
    AuditReports { complete: bool },
    SemanticValidation { complete: bool },
    MetadataFetched { available: bool },
    MetadataBackfilled { tables: usize },
    EmptySource,
    Converted { repaired: bool },
    ConversionFailed,
    SkipTransform,
    NeedsTransform,
    Transformed { repaired: bool },
    TransformFailed,
    PostProcessed { files_written: usize },
    PostProcessFailed,
    Validated { nodes: usize, edges: usize },
    Final { status: TransformStatus },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub record: TransformRecord,
    pub stages: Vec<FileStage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDump {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Processed(FileReport),
    Skipped(SkippedDump),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub files: Vec<FileReport>,
    pub skipped: Vec<SkippedDump>,
    pub summary: RunSummary,
}

/// The external engines a run talks to.
#[derive(Clone, Copy)]
pub struct Engines<'a> {
    pub reasoner: &'a dyn Reasoner,
    pub etl: &'a dyn GraphEtl,
    /// Absent when no API key is configured.
    pub metadata: Option<&'a dyn MetadataSource>,
}

pub struct Pipeline<'a> {
    transforms_root: PathBuf,
    options: StageOptions,
    tables: &'a RunTables,
    engines: Engines<'a>,
}

/// Mutable bookkeeping for the file currently being processed.
struct FileRun {
    record: DumpRecord,
    stages: Vec<FileStage>,
    failure: Option<FailureKind>,
    node_count: usize,
    edge_count: usize,
    unresolved_ids: usize,
}

impl FileRun {
    fn new(record: DumpRecord) -> Self {
        Self {
            record,
            stages: Vec::new(),
            failure: None,
            node_count: 0,
            edge_count: 0,
            unresolved_ids: 0,
        }
    }

    fn enter(&mut self, stage: FileStage) {
        tracing::info!(
            ontology = %self.record.ontology_id,
            output_base = %self.record.output_base,
            stage = ?stage,
            "stage"
        );
        self.stages.push(stage);
    }

    /// Records `kind` unless an earlier failure already decided the file.
    fn fail(&mut self, kind: FailureKind) {
        if kind.fails_file() && self.failure.is_none() {
            self.failure = Some(kind);
        }
    }

    fn finish(mut self, path: &Path) -> FileReport {
        let status = if self.failure.is_some() {
            TransformStatus::Fail
        } else {
            TransformStatus::Ok
        };
        self.enter(FileStage::Final { status });
        FileReport {
            path: path.to_path_buf(),
            record: TransformRecord {
                id: self.record.ontology_id.clone(),
                status,
                node_count: self.node_count,
                edge_count: self.edge_count,
                failure: self.failure,
                unresolved_ids: self.unresolved_ids,
            },
            stages: self.stages,
        }
    }
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(
        transforms_root: impl Into<PathBuf>,
        options: StageOptions,
        tables: &'a RunTables,
        engines: Engines<'a>,
    ) -> Self {
        Self {
            transforms_root: transforms_root.into(),
            options,
            tables,
            engines,
        }
    }

    /// Processes every dump in order. A failing file never stops the run.
    pub fn run(&self, paths: &[PathBuf]) -> RunReport {
        tracing::info!(files = paths.len(), options = ?self.options, "transforming all");
        let mut files = Vec::new();
        let mut skipped = Vec::new();
        for path in paths {
            match self.process_file(path) {
                FileOutcome::Processed(report) => files.push(report),
                FileOutcome::Skipped(skip) => skipped.push(skip),
            }
        }

        let failed = files
            .iter()
            .filter(|report| !report.record.is_ok())
            .map(|report| report.record.id.as_str())
            .collect::<Vec<_>>();
        if !failed.is_empty() {
            tracing::warn!(?failed, "some transforms may have issues");
        }

        let records = files
            .iter()
            .map(|report| report.record.clone())
            .collect::<Vec<_>>();
        RunReport {
            summary: summarize(&records),
            files,
            skipped,
        }
    }

    pub fn process_file(&self, path: &Path) -> FileOutcome {
        tracing::info!(path = %path.display(), "starting on dump");
        let reader = match DumpReader::open(path) {
            Ok(reader) => reader,
            Err(err) => return skip(path, format!("cannot read dump: {err}")),
        };
        let record = match parse_header(reader.header(), path, &self.transforms_root) {
            IdentityOutcome::Parsed(record) => record,
            IdentityOutcome::Skipped(reason) => return skip(path, reason.describe()),
        };

        let mut run = FileRun::new(record);
        run.enter(FileStage::Scanned);
        self.drive(&mut run, reader);
        FileOutcome::Processed(run.finish(path))
    }

    fn drive(&self, run: &mut FileRun, reader: DumpReader) {
        let output_dir = run.record.output_dir.clone();
        let state = match prepare_output_dir(&output_dir) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(dir = %output_dir.display(), error = %err, "output directory unusable");
                run.fail(FailureKind::ConversionFailure);
                return;
            }
        };

        let needs_conversion = !state.has_tables();
        if needs_conversion {
            run.enter(FileStage::NeedsConversion);
        } else {
            run.enter(FileStage::SkipComplete);
            self.backfill_existing(run, &state);
        }
        let metadata = self.backfill_metadata(run, &state);

        if needs_conversion {
            if !self.convert_fresh(run, reader, metadata.as_ref()) {
                return;
            }
        } else {
            match reader.has_body() {
                Ok(true) => run.enter(FileStage::SkipTransform),
                Ok(false) => {
                    mark_empty_source(run);
                    return;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "cannot read dump body");
                    run.fail(FailureKind::ConversionFailure);
                    return;
                }
            }
        }

        if self.options.post_processing_enabled() && !self.post_process(run) {
            return;
        }

        match check_tables(&output_dir) {
            Ok(counts) => {
                run.node_count = counts.nodes;
                run.edge_count = counts.edges;
                run.enter(FileStage::Validated {
                    nodes: counts.nodes,
                    edges: counts.edges,
                });
                if !counts.is_valid() {
                    run.fail(FailureKind::InvalidTables);
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot read graph tables");
                run.fail(FailureKind::InvalidTables);
            }
        }
    }

    /// Checks that only make sense once tables exist, each guarded by its
    /// own artifact.
    fn backfill_existing(&self, run: &mut FileRun, state: &ArtifactState) {
        let output_dir = run.record.output_dir.clone();
        if self.options.parse_check {
            let valid = check_tables(&output_dir).is_ok_and(|counts| counts.is_valid());
            run.enter(FileStage::ParsePrecheck { valid });
            if !valid {
                run.fail(FailureKind::InvalidTables);
            }
        }
        if self.options.robot_validate && !state.has_report {
            let complete = write_audit_reports(self.engines.reasoner, &run.record.path, &output_dir);
            run.enter(FileStage::AuditReports { complete });
        }
        if self.options.kgx_validate && !state.has_validation_log {
            let complete = semantic_validate(
                self.engines.etl,
                &output_dir,
                &run.record.validation_log_path(),
            )
            .unwrap_or(false);
            run.enter(FileStage::SemanticValidation { complete });
        }
    }

    /// Fetches metadata when asked and not already present; existing edge
    /// tables get the metadata column added.
    fn backfill_metadata(&self, run: &mut FileRun, state: &ArtifactState) -> Option<OntologyMetadata> {
        if !self.options.fetch_metadata || state.has_metadata {
            return None;
        }
        let Some(source) = self.engines.metadata else {
            tracing::warn!("metadata requested but no metadata source configured");
            return None;
        };
        let metadata = source.fetch(&run.record.ontology_id);
        run.enter(FileStage::MetadataFetched {
            available: metadata.is_available(),
        });
        if !metadata.is_available() {
            tracing::warn!(
                ontology = %run.record.ontology_id,
                failure = FailureKind::MetadataUnavailable.as_str(),
                "continuing without metadata"
            );
            return Some(metadata);
        }

        if state.has_edges {
            let mut tables = 0usize;
            match GraphTables::list(&run.record.output_dir) {
                Ok(graph) => {
                    for edges in &graph.edges {
                        match add_metadata_column(edges, &metadata) {
                            Ok(()) => tables += 1,
                            Err(err) => tracing::warn!(
                                path = %edges.display(),
                                error = %err,
                                "metadata writing failed"
                            ),
                        }
                    }
                }
                Err(err) => tracing::warn!(error = %err, "cannot list graph tables"),
            }
            run.enter(FileStage::MetadataBackfilled { tables });
        }
        Some(metadata)
    }

    /// Copies the body to scratch space and runs conversion and transform
    /// over it. The scratch directory is gone once this returns.
    fn convert_fresh(
        &self,
        run: &mut FileRun,
        reader: DumpReader,
        metadata: Option<&OntologyMetadata>,
    ) -> bool {
        let scratch = match tempfile::Builder::new().prefix("ontokgx-").tempdir() {
            Ok(scratch) => scratch,
            Err(err) => {
                tracing::warn!(error = %err, "cannot create scratch directory");
                run.fail(FailureKind::ConversionFailure);
                return false;
            }
        };
        let body = scratch.path().join(&run.record.output_base);
        match reader.write_body(&body) {
            Ok(0) => {
                mark_empty_source(run);
                false
            }
            Ok(_) => self.convert_and_transform(run, &body, scratch.path(), metadata),
            Err(err) => {
                tracing::warn!(error = %err, "cannot copy dump body");
                run.fail(FailureKind::ConversionFailure);
                false
            }
        }
    }

    fn convert_and_transform(
        &self,
        run: &mut FileRun,
        body: &Path,
        scratch: &Path,
        metadata: Option<&OntologyMetadata>,
    ) -> bool {
        let relaxed = match convert(self.engines.reasoner, body, &run.record.relaxed_path(), scratch) {
            RetryOutcome::Succeeded { value, repaired } => {
                run.enter(FileStage::Converted { repaired });
                value
            }
            RetryOutcome::Exhausted { failures } => {
                tracing::warn!(?failures, "unresolvable conversion failure; will skip");
                run.enter(FileStage::ConversionFailed);
                run.fail(FailureKind::ConversionFailure);
                return false;
            }
        };

        if self.options.robot_validate {
            let complete =
                write_audit_reports(self.engines.reasoner, &run.record.path, &run.record.output_dir);
            run.enter(FileStage::AuditReports { complete });
        }

        run.enter(FileStage::NeedsTransform);
        let tags = knowledge_source_tags(&OntologyMetadata::primary_source(metadata));
        match transform(
            self.engines.etl,
            &relaxed,
            &run.record.output_path(),
            &tags,
            scratch,
        ) {
            RetryOutcome::Succeeded { repaired, .. } => {
                run.enter(FileStage::Transformed { repaired });
            }
            RetryOutcome::Exhausted { failures } => {
                tracing::warn!(?failures, "unresolvable transform failure");
                discard_partial_tables(&run.record);
                run.enter(FileStage::TransformFailed);
                run.fail(FailureKind::TransformFailure);
                return false;
            }
        }

        if self.options.kgx_validate {
            let complete = semantic_validate(
                self.engines.etl,
                &run.record.output_dir,
                &run.record.validation_log_path(),
            )
            .unwrap_or(false);
            run.enter(FileStage::SemanticValidation { complete });
            if !complete {
                run.fail(FailureKind::ValidationIncomplete);
            }
        }
        true
    }

    fn post_process(&self, run: &mut FileRun) -> bool {
        let result = inspect_output_dir(&run.record.output_dir).and_then(|state| {
            let plan = PostProcessPlan {
                remap_types: self.options.remap_types,
                write_curies: self.options.write_curies && !state.has_compact_ids,
            };
            let tables = GraphTables::list(&run.record.output_dir)?;
            post_process(&tables, &run.record.ontology_id, self.tables, plan)
        });
        match result {
            Ok(summary) => {
                run.unresolved_ids = summary.unresolved_ids;
                run.enter(FileStage::PostProcessed {
                    files_written: summary.files_written,
                });
                true
            }
            Err(err) => {
                tracing::warn!(code = err.code(), error = %err, "normalization did not complete");
                run.enter(FileStage::PostProcessFailed);
                run.fail(FailureKind::PostProcessFailure);
                false
            }
        }
    }
}

fn prepare_output_dir(output_dir: &Path) -> Result<ArtifactState> {
    fs::create_dir_all(output_dir)?;
    inspect_output_dir(output_dir)
}

fn mark_empty_source(run: &mut FileRun) {
    tracing::warn!(output_base = %run.record.output_base, "dump is empty; writing placeholder");
    if let Err(err) = fs::write(run.record.output_path(), "") {
        tracing::warn!(error = %err, "cannot write placeholder");
    }
    run.enter(FileStage::EmptySource);
    run.fail(FailureKind::EmptySource);
}

/// Whatever a failed transform left behind must not look like a finished
/// table pair to the next run.
fn discard_partial_tables(record: &DumpRecord) {
    for path in [record.nodes_path(), record.edges_path()] {
        match fs::remove_file(&path) {
            Ok(()) => tracing::info!(path = %path.display(), "removed partial table"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "cannot remove partial table"),
        }
    }
}

fn skip(path: &Path, reason: String) -> FileOutcome {
    tracing::warn!(path = %path.display(), reason = %reason, "will skip dump");
    FileOutcome::Skipped(SkippedDump {
        path: path.to_path_buf(),
        reason,
    })
}
