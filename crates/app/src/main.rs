//! archive: compress or extract files with Huffman coding.

mod config;
mod runner;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::{Cli, Config};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level());

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(err) => {
            error!("{err:#}");
            return ExitCode::from(2);
        }
    };
    config.log_summary();

    match runner::run(&config) {
        Ok(stats) => {
            stats.log_summary();
            if config.print_stats {
                print!("{}", stats.export_text());
            }
            info!(output = %config.output.display(), "done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
