//! shardrun - parallel runner for sharded googletest binaries
//!
//! Splits a test binary's test set into shards through the native
//! `GTEST_SHARD_INDEX` / `GTEST_TOTAL_SHARDS` support, runs each shard in its
//! own worker process and aggregates the results into one verdict.
//!
//! ## Usage
//!
//! ```bash
//! # Run with the default pool size (1.5x CPU cores)
//! shardrun ./unit_tests
//!
//! # Eight workers, show output of every shard
//! shardrun -j 8 -v 2 ./unit_tests
//!
//! # Pass arguments through to the test binary
//! shardrun ./unit_tests -- --gtest_filter='Parser.*'
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{debug, warn};

mod cli;
mod config;
mod executor;
mod models;
mod output;
mod utils;

use cli::Args;
use config::EnvConfig;
use executor::ShardedRun;
use output::{ProgressPrinter, ReportFormatter};
use utils::init_logger;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<u8> {
    let args = Args::parse();
    let env = EnvConfig::load()?;

    init_logger(args.log_level(&env));

    let config = args.to_config(&env);
    config.validate()?;
    debug!("Run configuration: {:?}", config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            // Force a newline after the progress marks
            let _ = writeln!(io::stdout(), "\nCaught interrupt, terminating workers");
            warn!("Interrupt received, stopping all workers");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut progress = ProgressPrinter::stdout(config.verbosity > 0, config.color);
    let report = ShardedRun::new(&config)
        .run(shutdown_rx, &mut progress)
        .await?;
    progress.finish()?;

    let formatter = ReportFormatter::new(config.verbosity).with_color(config.color);
    formatter
        .write_report(&mut io::stdout().lock(), &report)
        .context("Failed to write report")?;

    Ok(report.exit_code())
}
