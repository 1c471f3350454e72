use anyhow::Result;
use clap::Parser;
use colored::*;
use seowatch::cli::Cli;
use seowatch::config::Config;
use seowatch::run;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "seowatch=debug" } else { "seowatch=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_args(cli: Cli) -> Result<Cli> {
    let config = match &cli.config {
        Some(path) => Some(Config::from_file(Path::new(path))?),
        None => Config::from_default_paths()?,
    };
    Ok(match config {
        Some(config) => config.merge_with_cli(cli),
        None => cli,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = match resolve_args(cli) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
            std::process::exit(1);
        }
    };
    init_tracing(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
