use std::path::PathBuf;

use clap::Args;
use ontokgx_core::StageOptions;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Directory holding the 4store dump files; searched recursively.
    #[arg(long, default_value = "data/raw")]
    pub input: PathBuf,
    /// Run the KGX validator over the tables and keep its log.
    #[arg(long, default_value_t = false)]
    pub kgx_validate: bool,
    /// Write ROBOT report and measure output next to the tables.
    #[arg(long, default_value_t = false)]
    pub robot_validate: bool,
    /// Parse existing tables before deciding they are complete.
    #[arg(long, default_value_t = false)]
    pub parse_check: bool,
    /// Fetch ontology metadata from BioPortal (requires an API key).
    #[arg(long = "get-metadata", default_value_t = false)]
    pub get_metadata: bool,
    /// BioPortal API key; falls back to `NCBO_API_KEY`.
    #[arg(long, value_name = "KEY")]
    pub ncbo_key: Option<String>,
    /// Add Biolink categories from the SSSOM mappings.
    #[arg(long, default_value_t = false)]
    pub remap_types: bool,
    /// Rewrite node IRIs as CURIEs.
    #[arg(long, default_value_t = false)]
    pub write_curies: bool,
    /// Only process dumps whose file name matches (glob; repeatable).
    #[arg(long = "include-only", value_name = "NAME")]
    pub include_only: Vec<String>,
    /// Skip dumps whose file name matches (glob; repeatable).
    #[arg(long = "exclude", value_name = "NAME")]
    pub exclude: Vec<String>,
}

impl RunArgs {
    pub fn stage_options(&self) -> StageOptions {
        StageOptions {
            kgx_validate: self.kgx_validate,
            robot_validate: self.robot_validate,
            parse_check: self.parse_check,
            fetch_metadata: self.get_metadata,
            remap_types: self.remap_types,
            write_curies: self.write_curies,
        }
    }
}

#[derive(Debug, Args)]
pub struct DirArg {
    pub dir: PathBuf,
}
