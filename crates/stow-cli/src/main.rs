//! stow - verified artifact cache and module materializer CLI

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stow_cli::cmd;
use stow_cli::ui::Output;
use stow_cli::{CacheCommands, Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = Output::new(cli.quiet);

    match run(cli, &output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let config = cli.config();

    match cli.command {
        Commands::Integrity { locators } => {
            cmd::integrity::integrity(&config, &locators, output).await
        }
        Commands::Fetch { locator, integrity } => {
            cmd::fetch::fetch(&config, &locator, integrity.as_deref(), output).await
        }
        Commands::Materialize {
            modules,
            dest,
            search_paths,
            from,
        } => {
            cmd::materialize::materialize(&modules, &dest, &search_paths, from.as_deref(), output)
                .await
        }
        Commands::Cache { command } => match command {
            CacheCommands::Path => {
                cmd::cache::path(&config);
                Ok(())
            }
            CacheCommands::Clean => cmd::cache::clean(&config, output).await,
        },
    }
}
