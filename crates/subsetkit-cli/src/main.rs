use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;

use args::{Cli, Command};

#[tokio::main]
async fn main() {
    // Load .env before parsing so clap sees the URL variables
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Command::Run(args) => commands::run::run(args, config).await,
        Command::Plan(args) => commands::plan::run(args, config).await,
        Command::Graph(args) => commands::graph::run(args, config).await,
        Command::Diff(args) => commands::diff::run(args, config).await,
    };

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
