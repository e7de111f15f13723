mod acroform;
mod cli;
mod config;
mod discover;
mod error;
mod fill;
mod flatten;
mod merge;
mod model;
#[cfg(test)]
mod testutil;

use clap::Parser;
use cli::{Cli, Command};
use config::Config;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn run(cli: &Cli) -> error::Result<()> {
    let cfg = Config::resolve(cli.config.as_deref())?;
    info!(
        input_dir = %cfg.input_dir.display(),
        output_dir = %cfg.output_dir.display(),
        "Configuration ready"
    );

    match &cli.command {
        Command::Discover => {
            let summary = discover::run_discover(&cfg)?;
            info!(
                documents = summary.documents,
                mapping = %summary.mapping_path.display(),
                data = %summary.data_path.display(),
                "Discovery complete"
            );
        }
        Command::List => discover::run_list(&cfg)?,
        Command::Fill(args) => {
            let summary = fill::run_fill(&cfg, args.output_mode())?;
            let written: usize = summary.documents.iter().map(|(_, r)| r.written).sum();
            info!(
                documents = summary.documents.len(),
                fields = written,
                outputs = summary.outputs.len(),
                "Fill complete"
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // logs on stderr, summaries on stdout
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
