use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::TransformRecord;
use crate::tables::write_atomic;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTotals {
    pub total: usize,
    pub ok: usize,
    pub failed: usize,
    pub nodes: usize,
    pub edges: usize,
    pub unresolved_ids: usize,
    pub generated_at: String,
}

/// The run summary as persisted: per-ontology records, then totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ontologies: Vec<TransformRecord>,
    pub summary: SummaryTotals,
}

#[must_use]
pub fn summarize(records: &[TransformRecord]) -> RunSummary {
    let mut totals = SummaryTotals {
        total: records.len(),
        generated_at: Utc::now().to_rfc3339(),
        ..SummaryTotals::default()
    };
    for record in records {
        if record.is_ok() {
            totals.ok += 1;
        } else {
            totals.failed += 1;
        }
        totals.nodes += record.node_count;
        totals.edges += record.edge_count;
        totals.unresolved_ids += record.unresolved_ids;
    }
    RunSummary {
        ontologies: records.to_vec(),
        summary: totals,
    }
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let rendered = serde_norway::to_string(summary)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    write_atomic(path, &rendered)?;
    tracing::info!(
        path = %path.display(),
        total = summary.summary.total,
        failed = summary.summary.failed,
        "wrote run summary"
    );
    Ok(())
}
