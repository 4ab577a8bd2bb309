mod commands;
mod executor;
mod input;
mod retry;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lookout_core::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lookout")]
#[command(version, about = "Memory observer with whitelisted key reactions")]
struct Args {
    #[arg(short, long, default_value = "lookout.toml", env = "LOOKOUT_CONFIG")]
    config: PathBuf,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log reactions instead of sending input
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Attach and track until Esc, q or Ctrl+C (default)
    Watch,
    /// Run one entity scan around the observer and print the results
    Scan {
        /// Only print the nearest N objects
        #[arg(short, long)]
        limit: Option<usize>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Resolve the configured pointer chains once and print them
    Chains,
    /// Write the default config and rule files
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let directive = if args.verbose {
        "lookout=debug"
    } else {
        "lookout=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    info!("lookout {}", env!("CARGO_PKG_VERSION"));

    let config = || Config::load_or_default(&args.config);
    match args.command.unwrap_or(Command::Watch) {
        Command::Watch => commands::watch::run(&config(), args.dry_run),
        Command::Scan { limit, json } => commands::scan::run(&config(), limit, json),
        Command::Chains => commands::chains::run(&config()),
        Command::Init { force } => commands::init::run(&args.config, force),
    }
}
