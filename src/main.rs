use clap::Parser;
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;
use worker_locator::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting worker-locator v{}", worker_locator::VERSION);

    let command = cli.command.unwrap_or(Commands::Serve);

    if let Err(e) = commands::handle_command(command, &cli.config_dir).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
