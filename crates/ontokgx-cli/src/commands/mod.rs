use std::path::Path;

use anyhow::{Context, Result, bail};
use ontokgx_core::artifacts::inspect_output_dir;
use ontokgx_core::discovery::{DiscoveryFilter, discover_dumps};
use ontokgx_core::engines::{KgxEngine, RobotEngine};
use ontokgx_core::metadata::{BioPortalClient, MetadataSource};
use ontokgx_core::postprocess::RunTables;
use ontokgx_core::stats::write_summary;
use ontokgx_core::validate::check_tables;
use ontokgx_core::{Engines, Pipeline, PipelineConfig};

use crate::cli::{Commands, RunArgs};

mod support;


use self::support::{non_empty, print_json};

pub(crate) fn run(config_path: Option<&Path>, command: Commands) -> Result<()> {
    match command {
        Commands::Run(args) => {
            let config = PipelineConfig::load(config_path).context("failed to load configuration")?;
            run_pipeline(config, &args)
        }
        Commands::Inspect(args) => {
            let state = inspect_output_dir(&args.dir)
                .with_context(|| format!("failed to inspect {}", args.dir.display()))?;
            print_json(&state)
        }
        Commands::Check(args) => {
            let counts = check_tables(&args.dir)
                .with_context(|| format!("failed to check {}", args.dir.display()))?;
            print_json(&counts)
        }
    }
}

fn run_pipeline(mut config: PipelineConfig, args: &RunArgs) -> Result<()> {
    let options = args.stage_options();
    if let Some(key) = non_empty(args.ncbo_key.as_deref()) {
        config.metadata.api_key = Some(key);
    }
    let api_key = resolve_api_key(options.fetch_metadata, config.metadata.api_key.as_deref())?;

    let filter = DiscoveryFilter {
        include_only: args.include_only.clone(),
        exclude: args.exclude.clone(),
    };
    let dumps = discover_dumps(&args.input, &filter)?;
    let tables = RunTables::load(&config, options).context("failed to load lookup tables")?;

    let reasoner = RobotEngine::new(&config.robot);
    let etl = KgxEngine::new(&config.kgx);
    let client = api_key
        .map(|key| BioPortalClient::new(&config.metadata, key))
        .transpose()
        .context("failed to build metadata client")?;
    let engines = Engines {
        reasoner: &reasoner,
        etl: &etl,
        metadata: client.as_ref().map(|client| client as &dyn MetadataSource),
    };

    let report = Pipeline::new(&config.transforms_root, options, &tables, engines).run(&dumps);
    write_summary(&config.summary_path, &report.summary)
        .with_context(|| format!("failed to write {}", config.summary_path.display()))?;
    print_json(&report.summary)
}

/// Metadata needs a key; asking for it without one is a usage error.
fn resolve_api_key(fetch_metadata: bool, configured: Option<&str>) -> Result<Option<String>> {
    if !fetch_metadata {
        return Ok(None);
    }
    match non_empty(configured) {
        Some(key) => Ok(Some(key)),
        None => bail!("--get-metadata requires an API key (--ncbo-key or NCBO_API_KEY)"),
    }
}
