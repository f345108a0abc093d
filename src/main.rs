// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rack-modbus-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the sensor rack telemetry logger

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use rack_modbus_logger::config::Config;
use rack_modbus_logger::daemon::{PollScheduler, RepeatCount, RequestPlan};
use rack_modbus_logger::directory::RackSelector;
use rack_modbus_logger::logfile::FileSink;
use rack_modbus_logger::modbus::ModbusSession;

/// Log sensor rack telemetry read over Modbus/TCP
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The sensor rack from which to log data (A - J, or 'all')
    #[arg(value_name = "rack_to_log")]
    rack_to_log: RackSelector,

    /// The number of data requests to make of the sensor rack(s);
    /// -1 requests indefinitely
    #[arg(value_name = "number_of_requests", allow_negative_numbers = true,
          value_parser = parse_request_count)]
    number_of_requests: RepeatCount,

    /// The file to which data request results will be logged
    #[arg(value_name = "log_file", value_parser = parse_log_path)]
    log_file: PathBuf,

    /// The interval, in seconds, between requests for data from a rack
    #[arg(short, long, default_value_t = 1)]
    interval: u64,

    /// Path to a YAML rack directory file (defaults to the built-in
    /// deployment table)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

/// Parse the request count; `-1` is the "run forever" sentinel, anything
/// below it is rejected.
fn parse_request_count(s: &str) -> Result<RepeatCount, String> {
    let number: i64 = s.parse().map_err(|_| {
        format!(
            "{} is not an integer - please choose a non-negative \
             integer or -1 for indefinite requests",
            s
        )
    })?;

    match number {
        -1 => Ok(RepeatCount::Forever),
        n if n >= 0 => Ok(RepeatCount::Finite(n as u64)),
        n => Err(format!(
            "{} is not a valid value - please choose a non-negative \
             integer or -1 for indefinite requests",
            n
        )),
    }
}

/// Validate the log file path: an existing writable file, or a new file in
/// an existing directory.
fn parse_log_path(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);

    if path.exists() {
        if !path.is_file() {
            return Err(format!(
                "{} is a path to a non-file - please choose a different \
                 path for the log file",
                path.display()
            ));
        }
        OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|err| {
                format!(
                    "{} is a path to a non-writable file ({}) - please \
                     choose a different path for the log file",
                    path.display(),
                    err
                )
            })?;
        return Ok(path);
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if parent.is_dir() {
        Ok(path)
    } else {
        Err(format!(
            "The directory {} doesn't exist - please choose a different \
             path for the log file",
            parent.display()
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let directory = config
        .build_directory()
        .context("Invalid rack directory configuration")?;

    let sink = FileSink::open(&args.log_file).with_context(|| {
        format!(
            "Failed to open log file {} for appending",
            args.log_file.display()
        )
    })?;
    info!("Logging telemetry to {}", args.log_file.display());

    let plan = RequestPlan {
        selector: args.rack_to_log,
        repeat: args.number_of_requests,
        interval: Duration::from_secs(args.interval),
    };

    let scheduler = PollScheduler::new(&directory, plan, ModbusSession::new(), sink)
        .context("Rack selector does not match the rack directory")?;
    scheduler.run().await?;

    Ok(())
}
