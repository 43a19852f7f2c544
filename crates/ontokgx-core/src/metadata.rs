use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::MetadataConfig;
use crate::error::Result;
use crate::tables::{TsvTable, read_header_line, write_atomic};

pub const AGGREGATOR_KNOWLEDGE_SOURCE: &str = "aggregator_knowledge_source";
pub const PRIMARY_KNOWLEDGE_SOURCE: &str = "primary_knowledge_source";
pub const AGGREGATOR: &str = "BioPortal";
/// Primary source recorded when no metadata could be retrieved.
pub const UNKNOWN_SOURCE: &str = "unknown";

const LATEST_SUBMISSION: &str = "latest_submission";

/// What the metadata service told us about one ontology.
///
/// `name` is empty when any page failed to load; callers treat that as
/// "metadata unavailable" and fall back to [`UNKNOWN_SOURCE`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OntologyMetadata {
    pub name: String,
    pub ontology_type: Option<String>,
    pub submission_id: Option<String>,
    pub creation_date: Option<String>,
    pub missing_pages: Vec<String>,
}

impl OntologyMetadata {
    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.name.is_empty()
    }

    /// `"{name} - submission {id}"`, or just the name without a submission.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        if self.name.is_empty() {
            return None;
        }
        Some(match &self.submission_id {
            Some(id) => format!("{} - submission {id}", self.name),
            None => self.name.clone(),
        })
    }

    /// The display name tagged onto freshly transformed edges. Backfilled
    /// columns carry [`Self::full_name`] instead.
    #[must_use]
    pub fn primary_source(metadata: Option<&Self>) -> String {
        metadata
            .filter(|metadata| metadata.is_available())
            .map_or_else(|| UNKNOWN_SOURCE.to_string(), |metadata| metadata.name.clone())
    }
}

pub trait MetadataSource {
    /// Never fails: network trouble degrades to a partial record.
    fn fetch(&self, ontology_id: &str) -> OntologyMetadata;
}

#[derive(Clone)]
pub struct BioPortalClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl std::fmt::Debug for BioPortalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BioPortalClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl BioPortalClient {
    pub fn new(config: &MetadataConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            base_url: config.base_url.clone(),
            api_key: api_key.into(),
            http,
        })
    }

    fn fetch_page(&self, url: &str) -> Option<Value> {
        tracing::info!(url, "accessing metadata service");
        let response = self
            .http
            .get(url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("display_context", "false"),
                ("include", "all"),
            ])
            .send();
        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>() {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::warn!(url, error = %err, "metadata response was not JSON");
                    None
                }
            },
            Ok(resp) => {
                tracing::warn!(url, status = %resp.status(), "metadata page unavailable");
                None
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "metadata request failed");
                None
            }
        }
    }
}

impl MetadataSource for BioPortalClient {
    fn fetch(&self, ontology_id: &str) -> OntologyMetadata {
        let ontology_url = format!("{}{ontology_id}/", self.base_url);
        let submission_url = format!("{ontology_url}{LATEST_SUBMISSION}");

        let mut missing = Vec::new();
        let ontology = self.fetch_page(&ontology_url);
        if ontology.is_none() {
            missing.push(ontology_url);
        }
        let submission = self.fetch_page(&submission_url);
        if submission.is_none() {
            missing.push(submission_url);
        }

        let metadata = assemble_metadata(ontology.as_ref(), submission.as_ref(), missing);
        if metadata.is_available() {
            tracing::info!(ontology = ontology_id, name = %metadata.name, "retrieved metadata");
        } else {
            tracing::warn!(
                ontology = ontology_id,
                missing = ?metadata.missing_pages,
                "metadata retrieval incomplete"
            );
        }
        metadata
    }
}

fn assemble_metadata(
    ontology: Option<&Value>,
    submission: Option<&Value>,
    missing_pages: Vec<String>,
) -> OntologyMetadata {
    let mut metadata = OntologyMetadata {
        name: ontology
            .and_then(|value| json_text(value, "name"))
            .unwrap_or_default(),
        ontology_type: ontology.and_then(|value| json_text(value, "ontologyType")),
        submission_id: submission.and_then(|value| json_text(value, "submissionId")),
        creation_date: submission.and_then(|value| json_text(value, "creationDate")),
        missing_pages,
    };
    if !metadata.missing_pages.is_empty() {
        metadata.name.clear();
    }
    metadata
}

fn json_text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// True when the table header already carries a metadata heading.
pub fn header_has_metadata(path: &Path) -> Result<bool> {
    let header = read_header_line(path)?;
    Ok(header
        .split('\t')
        .any(|heading| heading == PRIMARY_KNOWLEDGE_SOURCE))
}

/// Appends a `primary_knowledge_source` column to an existing edge table.
pub fn add_metadata_column(path: &Path, metadata: &OntologyMetadata) -> Result<()> {
    let Some(value) = metadata.full_name() else {
        return Err(crate::error::OntoKgxError::Validation(
            "metadata has no name to record".to_string(),
        ));
    };
    let mut table = TsvTable::read(path)?;
    table.header.push(PRIMARY_KNOWLEDGE_SOURCE.to_string());
    for row in &mut table.rows {
        row.push(value.clone());
    }
    write_atomic(path, &table.render())
}
