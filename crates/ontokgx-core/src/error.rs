use thiserror::Error;

pub type Result<T> = std::result::Result<T, OntoKgxError>;

#[derive(Debug, Error)]
pub enum OntoKgxError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("malformed table {path}: {message}")]
    MalformedTable { path: String, message: String },

    #[error("post-processing failed: {0}")]
    PostProcess(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_norway::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl OntoKgxError {
    /// Stable upper-snake code for logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Config(_) => "INVALID_CONFIG",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::MalformedTable { .. } => "MALFORMED_TABLE",
            Self::PostProcess(_) => "POST_PROCESS_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Yaml(_) => "YAML_ERROR",
            Self::Toml(_) => "TOML_ERROR",
            Self::Http(_) => "HTTP_ERROR",
        }
    }

    pub(crate) fn malformed_table(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::MalformedTable {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}
