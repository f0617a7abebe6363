//! SmartLease CLI
//!
//! Hybrid search over rental listings from the command line.

use clap::Parser;
use smartlease_core::error::exit_codes;
use smartlease_core::{Config, SmartLeaseError};

mod app;
mod commands;
mod output;
mod progress;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The server logs request milestones, everything else stays quiet
    let default_level = match cli.command {
        Commands::Serve => tracing::Level::INFO,
        _ if cli.verbose => tracing::Level::DEBUG,
        _ => tracing::Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<SmartLeaseError>()
            .map(SmartLeaseError::exit_code)
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match cli.config {
        Some(ref path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env_overrides();
            config.validate()?;
            config
        }
        None => Config::load()?,
    };

    match cli.command {
        Commands::Ingest(args) => commands::ingest::run(args, &config, cli.format).await,
        Commands::Add(args) => commands::add::run(args, &config, cli.format).await,
        Commands::Search(args) => commands::search::run(args, &config, cli.format).await,
        Commands::Status => commands::status::run(&config, cli.format).await,
        Commands::Serve => smartlease_api::start_server(config).await,
    }
}
