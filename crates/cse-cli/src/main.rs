use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cse_cli::commands::{client_id, export, export_aics, import_aics, list, validate};
use cse_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // stdout is reserved for command output.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match command {
        Commands::List(args) => list::run(&mut out, args, &config)?,
        Commands::Export(args) => {
            export::run(&mut out, args, &config)?;
        }
        Commands::ExportAics(args) => {
            export_aics::run(&mut out, args, &config)?;
        }
        Commands::ImportAics(args) => {
            let report = import_aics::run(&mut out, args)?;
            tracing::debug!(written = report.written, total = report.total, "import finished");
        }
        Commands::Validate(args) => validate::run(&mut out, args)?,
        Commands::ClientId => client_id::run(&mut out, &config)?,
    }
    out.flush()?;

    Ok(())
}
