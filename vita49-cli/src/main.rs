// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Command-line front-end for the `vita49` capture-file parsing engine
(§6). Parses a capture file against a chosen profile and writes its
columnar datasets plus a metadata sidecar to an output directory.
*/

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use thiserror::Error;

use vita49::sink::ExistingDataPolicy;
use vita49::{DriverOptions, ProfileName};

/// Parses a VITA-49.2-style or MikeLima capture file into columnar datasets.
#[derive(Parser, Debug)]
#[command(name = "vita49-cli", version, about)]
struct Cli {
    /// Capture file to read.
    #[arg(short, long)]
    input: PathBuf,

    /// Directory to write sinks and the metadata sidecar into.
    #[arg(short, long)]
    output: PathBuf,

    /// Overwrite existing output at the destination instead of erroring.
    #[arg(short, long)]
    force: bool,

    /// Framing/dispatch profile to use.
    #[arg(short, long, default_value = "juliet")]
    parser: String,

    /// Compression codec for sink output (passed through, not interpreted).
    #[arg(short = 'z', long)]
    compression: Option<String>,

    /// Compression level, meaningful only alongside `--compression`.
    #[arg(long)]
    compression_level: Option<i32>,

    /// Tango only: excise `DEADBEEF` needles found at the frame boundary.
    #[arg(long)]
    clean: bool,

    /// Tango only: fan signal-data out into one file per context key.
    #[arg(long)]
    partition_data: bool,

    /// Prefix prepended to every generated context key.
    #[arg(long, default_value = "ctx-")]
    partition_key_prefix: String,

    /// Context key attached to signal-data with no governing context packet.
    #[arg(long, default_value = "ORPHAN_DATA")]
    partition_orphan_key: String,

    /// Route signal-data through the dwell aggregator (§4.9) instead of a
    /// flat or partitioned sink.
    #[arg(long)]
    dwell_output: bool,

    /// Rows buffered per sink before a batch is flushed.
    #[arg(long, default_value_t = 4096)]
    batch_size: usize,

    /// Log level: error, warn, info, debug, or trace.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("input path does not exist: {0}")]
    MissingInput(PathBuf),
    #[error("output directory already has data and --force was not given: {0}")]
    OutputExists(PathBuf),
    #[error("unknown parser profile: {0}")]
    UnknownProfile(String),
    #[error(transparent)]
    Engine(#[from] vita49::errors::EngineError),
}

fn build_options(cli: &Cli) -> Result<DriverOptions, CliError> {
    if !cli.input.exists() {
        return Err(CliError::MissingInput(cli.input.clone()));
    }
    if cli.output.exists() && !cli.force {
        return Err(CliError::OutputExists(cli.output.clone()));
    }

    let profile: ProfileName = cli
        .parser
        .parse()
        .map_err(|_| CliError::UnknownProfile(cli.parser.clone()))?;

    Ok(DriverOptions {
        input: cli.input.clone(),
        output: cli.output.clone(),
        profile,
        batch_size: cli.batch_size,
        existing_data: if cli.force {
            ExistingDataPolicy::DeleteMatching
        } else {
            ExistingDataPolicy::Error
        },
        compression: cli.compression.clone(),
        compression_level: cli.compression_level,
        clean: cli.clean,
        partition_data: cli.partition_data,
        partition_key_prefix: cli.partition_key_prefix.clone(),
        partition_orphan_key: cli.partition_orphan_key.clone(),
        dwell_output: cli.dwell_output,
        iq_type: 0,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    let options = match build_options(&cli) {
        Ok(options) => options,
        Err(e @ (CliError::MissingInput(_) | CliError::OutputExists(_) | CliError::UnknownProfile(_))) => {
            error!("{e}");
            return ExitCode::from(1);
        }
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match vita49::run(&options) {
        Ok(stats) => {
            info!(
                "read {} bytes, {} frames, {} packets ({} bad, {} unknown)",
                stats.bytes_read,
                stats.frames_read,
                stats.packets_read,
                stats.bad_packets,
                stats.unknown_packets,
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("run failed: {e}");
            ExitCode::FAILURE
        }
    }
}
