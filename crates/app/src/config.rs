//! Configuration for the archive command.
//!
//! Command-line arguments are parsed by clap into `Cli`, then validated and
//! resolved into a `Config` the runner works from.

use std::path::PathBuf;

use anyhow::{bail, Result};
use archiver_core::ArchiveOptions;
use clap::{ArgAction, Parser};
use tracing::debug;

/// Compress or extract a file with Huffman coding.
#[derive(Debug, Parser)]
#[command(name = "archive", version, about)]
pub struct Cli {
    /// Input file
    #[arg(short, long, value_name = "PATH")]
    pub input: PathBuf,

    /// Output file
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    /// Apply the run-length pre-pass (extract must use the same value)
    #[arg(long, value_name = "BOOL", default_value_t = false, action = ArgAction::Set)]
    pub rle: bool,

    /// Extract an archive instead of creating one
    #[arg(short = 'x', long)]
    pub extract: bool,

    /// Print run statistics to stdout as key=value lines
    #[arg(long)]
    pub stats: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Default log filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Compress,
    Extract,
}

/// Resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mode: Mode,
    pub options: ArchiveOptions,
    pub print_stats: bool,
}

impl Config {
    /// Validate parsed arguments.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        if cli.input == cli.output {
            bail!(
                "input and output must be different files: {}",
                cli.input.display()
            );
        }

        Ok(Self {
            input: cli.input,
            output: cli.output,
            mode: if cli.extract {
                Mode::Extract
            } else {
                Mode::Compress
            },
            options: ArchiveOptions {
                run_length: cli.rle,
            },
            print_stats: cli.stats,
        })
    }

    /// Log the resolved configuration.
    pub fn log_summary(&self) {
        debug!(
            input = %self.input.display(),
            output = %self.output.display(),
            mode = ?self.mode,
            run_length = self.options.run_length,
            print_stats = self.print_stats,
            "resolved configuration"
        );
    }
}
