use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OntoKgxError, Result};

mod env;

pub(crate) use env::read_non_empty_env;

pub const DEFAULT_TRANSFORMS_ROOT: &str = "transformed";
pub const DEFAULT_MAPPING_DIR: &str = "mappings";
pub const DEFAULT_PREFIX_DIR: &str = "prefixes";
pub const PREFIX_FILENAME: &str = "bioportal-prefixes-curated.tsv";
pub const PREF_PREFIX_FILENAME: &str = "bioportal-preferred-prefixes.tsv";
pub const DEFAULT_SUMMARY_PATH: &str = "onto_status.yaml";
pub const DEFAULT_ROBOT_PROGRAM: &str = "robot";
pub const DEFAULT_ROBOT_JAVA_ARGS: &str = "-Xmx12g -XX:+UseG1GC";
pub const DEFAULT_KGX_PROGRAM: &str = "kgx";
pub const DEFAULT_METADATA_URL: &str = "https://data.bioontology.org/ontologies/";
pub const DEFAULT_METADATA_TIMEOUT_MS: u64 = 30_000;

pub const TRANSFORMS_ROOT_ENV: &str = "ONTOKGX_TRANSFORMS_ROOT";
pub const MAPPING_DIR_ENV: &str = "ONTOKGX_MAPPING_DIR";
pub const PREFIX_DIR_ENV: &str = "ONTOKGX_PREFIX_DIR";
pub const SUMMARY_PATH_ENV: &str = "ONTOKGX_SUMMARY_PATH";
pub const ROBOT_PATH_ENV: &str = "ONTOKGX_ROBOT_PATH";
pub const ROBOT_JAVA_ARGS_ENV: &str = "ONTOKGX_ROBOT_JAVA_ARGS";
pub const KGX_PATH_ENV: &str = "ONTOKGX_KGX_PATH";
pub const METADATA_URL_ENV: &str = "ONTOKGX_METADATA_URL";
pub const METADATA_TIMEOUT_MS_ENV: &str = "ONTOKGX_METADATA_TIMEOUT_MS";
pub const NCBO_API_KEY_ENV: &str = "NCBO_API_KEY";

/// Paths and engine settings for one run.
///
/// Resolved once at startup: built-in defaults, then the optional TOML file,
/// then environment variables. CLI flags are applied by the caller afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub transforms_root: PathBuf,
    pub mapping_dir: PathBuf,
    pub prefix_dir: PathBuf,
    pub summary_path: PathBuf,
    pub robot: RobotConfig,
    pub kgx: KgxConfig,
    pub metadata: MetadataConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotConfig {
    pub program: PathBuf,
    pub java_args: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KgxConfig {
    pub program: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

/// Optional stages toggled per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageOptions {
    pub kgx_validate: bool,
    pub robot_validate: bool,
    pub parse_check: bool,
    pub fetch_metadata: bool,
    pub remap_types: bool,
    pub write_curies: bool,
}

impl StageOptions {
    #[must_use]
    pub const fn post_processing_enabled(&self) -> bool {
        self.remap_types || self.write_curies
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelineConfigFile {
    transforms_root: Option<PathBuf>,
    mapping_dir: Option<PathBuf>,
    prefix_dir: Option<PathBuf>,
    summary_path: Option<PathBuf>,
    robot: Option<RobotConfigFile>,
    kgx: Option<KgxConfigFile>,
    metadata: Option<MetadataConfigFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RobotConfigFile {
    program: Option<PathBuf>,
    java_args: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct KgxConfigFile {
    program: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MetadataConfigFile {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_ms: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transforms_root: PathBuf::from(DEFAULT_TRANSFORMS_ROOT),
            mapping_dir: PathBuf::from(DEFAULT_MAPPING_DIR),
            prefix_dir: PathBuf::from(DEFAULT_PREFIX_DIR),
            summary_path: PathBuf::from(DEFAULT_SUMMARY_PATH),
            robot: RobotConfig {
                program: PathBuf::from(DEFAULT_ROBOT_PROGRAM),
                java_args: DEFAULT_ROBOT_JAVA_ARGS.to_string(),
            },
            kgx: KgxConfig {
                program: PathBuf::from(DEFAULT_KGX_PROGRAM),
            },
            metadata: MetadataConfig {
                base_url: DEFAULT_METADATA_URL.to_string(),
                api_key: None,
                timeout_ms: DEFAULT_METADATA_TIMEOUT_MS,
            },
        }
    }
}

impl PipelineConfig {
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = config_file {
            let raw = fs::read_to_string(path).map_err(|err| {
                OntoKgxError::Config(format!("cannot read {}: {err}", path.display()))
            })?;
            config.apply_toml(&raw)?;
        }
        config.apply_env_with(read_non_empty_env);
        Ok(config)
    }

    pub fn apply_toml(&mut self, raw: &str) -> Result<()> {
        let file = toml::from_str::<PipelineConfigFile>(raw)?;
        if let Some(value) = file.transforms_root {
            self.transforms_root = value;
        }
        if let Some(value) = file.mapping_dir {
            self.mapping_dir = value;
        }
        if let Some(value) = file.prefix_dir {
            self.prefix_dir = value;
        }
        if let Some(value) = file.summary_path {
            self.summary_path = value;
        }
        if let Some(robot) = file.robot {
            if let Some(value) = robot.program {
                self.robot.program = value;
            }
            if let Some(value) = robot.java_args {
                self.robot.java_args = value;
            }
        }
        if let Some(value) = file.kgx.and_then(|kgx| kgx.program) {
            self.kgx.program = value;
        }
        if let Some(metadata) = file.metadata {
            if let Some(value) = metadata.base_url {
                self.metadata.base_url = normalize_base_url(&value);
            }
            if let Some(value) = env::non_empty(metadata.api_key) {
                self.metadata.api_key = Some(value);
            }
            if let Some(value) = metadata.timeout_ms {
                self.metadata.timeout_ms = value;
            }
        }
        Ok(())
    }

    /// Overlays values from an environment lookup; blank values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| env::non_empty(lookup(name));

        if let Some(value) = lookup(TRANSFORMS_ROOT_ENV) {
            self.transforms_root = PathBuf::from(value);
        }
        if let Some(value) = lookup(MAPPING_DIR_ENV) {
            self.mapping_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(PREFIX_DIR_ENV) {
            self.prefix_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(SUMMARY_PATH_ENV) {
            self.summary_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ROBOT_PATH_ENV) {
            self.robot.program = PathBuf::from(value);
        }
        if let Some(value) = lookup(ROBOT_JAVA_ARGS_ENV) {
            self.robot.java_args = value;
        }
        if let Some(value) = lookup(KGX_PATH_ENV) {
            self.kgx.program = PathBuf::from(value);
        }
        if let Some(value) = lookup(METADATA_URL_ENV) {
            self.metadata.base_url = normalize_base_url(&value);
        }
        if let Some(value) = env::parse_u64(lookup(METADATA_TIMEOUT_MS_ENV).as_deref()) {
            self.metadata.timeout_ms = value;
        }
        if let Some(value) = lookup(NCBO_API_KEY_ENV) {
            self.metadata.api_key = Some(value);
        }
    }

    #[must_use]
    pub fn prefix_table_path(&self) -> PathBuf {
        self.prefix_dir.join(PREFIX_FILENAME)
    }

    #[must_use]
    pub fn preferred_prefix_path(&self) -> PathBuf {
        self.prefix_dir.join(PREF_PREFIX_FILENAME)
    }
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}
