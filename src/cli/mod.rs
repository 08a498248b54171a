pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "worker-locator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serves the set of live, scheduled query workers reconciled from Kubernetes and etcd", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        short,
        long,
        global = true,
        default_value = "config",
        help = "Directory containing config.yaml"
    )]
    pub config_dir: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Run the HTTP query service (default)")]
    Serve,
    #[command(about = "Reconcile once and print the worker list as JSON")]
    Workers,
    #[command(about = "Print the sessions registered in etcd as JSON")]
    Sessions {
        #[arg(short, long, default_value = "", help = "Session name prefix, e.g. querynode")]
        prefix: String,
    },
}
