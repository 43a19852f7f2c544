use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod args;


pub use args::{DirArg, RunArgs};

#[derive(Debug, Parser)]
#[command(name = "ontokgx")]
#[command(about = "Transform BioPortal ontology dumps into KGX node/edge tables", version)]
pub struct Cli {
    /// TOML file overriding the built-in defaults; environment variables win over it.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Transform every dump under the input directory.
    Run(RunArgs),
    /// Show which artifacts an output directory already holds.
    Inspect(DirArg),
    /// Parse an output directory's tables and count nodes and edges.
    Check(DirArg),
}
