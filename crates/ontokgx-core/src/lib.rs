// Public fallible APIs in this crate share one concrete error contract (`OntoKgxError`).
// Repeating per-function `# Errors` boilerplate obscures behavior more than it clarifies.
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod artifacts;
pub mod audit;
pub mod config;
pub mod convert;
pub mod curie;
pub mod discovery;
pub mod engines;
pub mod error;
pub mod identity;
pub mod metadata;
pub mod models;
pub mod pipeline;
pub mod postprocess;
pub mod prefixes;
pub mod remap;
pub mod retry;
pub mod stats;
pub mod tables;
pub mod transform;
pub mod typemap;
pub mod validate;

pub use config::{PipelineConfig, StageOptions};
pub use error::{OntoKgxError, Result};
pub use models::{DumpRecord, FailureKind, TransformRecord, TransformStatus};
pub use pipeline::{Engines, FileReport, FileStage, Pipeline, RunReport};
