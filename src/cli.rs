use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "artifact-unzip")]
#[command(about = "Unzip build artifact bundles and re-upload their files", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $UNZIP_CONFIG or config/unzip.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the worker pool and the control API
    Worker,
    /// Unzip one build inline and exit
    Unzip(UnzipArgs),
}

#[derive(clap::Args, Debug)]
pub struct UnzipArgs {
    /// Build whose SD_ARTIFACT.zip is extracted
    #[arg(long)]
    pub build_id: u64,

    /// Credential sent as the Authorization header
    #[arg(long)]
    pub token: String,
}
