//! Executes one compress or extract run against the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use archiver_core::framing::{compress_and_frame, parse_and_decompress};
use archiver_core::metrics::CompressionStats;
use tracing::{debug, warn};

use crate::config::{Config, Mode};

/// Run the configured operation.
///
/// The output file only appears once the whole result is ready: bytes go to
/// a sibling `.partial` file that is renamed into place on success and removed
/// on failure.
pub fn run(config: &Config) -> Result<CompressionStats> {
    let input = fs::read(&config.input)
        .with_context(|| format!("failed to read {}", config.input.display()))?;
    debug!(path = %config.input.display(), bytes = input.len(), "read input");

    let (output, stats) = match config.mode {
        Mode::Compress => compress_and_frame(&input, config.options)
            .with_context(|| format!("failed to compress {}", config.input.display()))?,
        Mode::Extract => parse_and_decompress(&input, config.options)
            .with_context(|| format!("failed to extract {}", config.input.display()))?,
    };

    write_all_or_nothing(&config.output, &output)?;
    debug!(path = %config.output.display(), bytes = output.len(), "wrote output");
    Ok(stats)
}

fn write_all_or_nothing(path: &Path, bytes: &[u8]) -> Result<()> {
    let partial = partial_path(path);
    let result = fs::write(&partial, bytes)
        .with_context(|| format!("failed to write {}", partial.display()))
        .and_then(|()| {
            fs::rename(&partial, path)
                .with_context(|| format!("failed to move output into {}", path.display()))
        });

    if result.is_err() {
        if let Err(err) = fs::remove_file(&partial) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %partial.display(), %err, "failed to remove partial output");
            }
        }
    }
    result
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}
