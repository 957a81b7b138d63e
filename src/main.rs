mod cli;
mod server;

use artifact_unzip::config::Config;
use artifact_unzip::observability;
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    observability::init_tracing();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Worker => server::run(config).await?,
        Commands::Unzip(args) => server::unzip_once(config, args.build_id, args.token).await?,
    }

    Ok(())
}
