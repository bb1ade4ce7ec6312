//! Wikimig CLI - runs wiki store migrations and inspects pending ones

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::Cli;
use commands::{changelog, common::ExitCode, migrate, status};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        cli::Commands::Migrate(args) => migrate::execute(args, &cli.global),
        cli::Commands::Status(args) => status::execute(args, &cli.global),
        cli::Commands::Changelog(args) => changelog::execute(args, &cli.global),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    if let Err(e) = run(&cli) {
        if let Some(ExitCode(code)) = e.downcast_ref::<ExitCode>() {
            std::process::exit(*code);
        }
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
