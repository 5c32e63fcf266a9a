//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::config::{default_jobs, env_help, EnvConfig, RunConfig};
use crate::utils::LogLevel;

/// Run a sharded googletest binary across a pool of worker processes
#[derive(Parser, Debug)]
#[command(name = "shardrun")]
#[command(version)]
#[command(about = "Run a googletest binary in parallel shards")]
#[command(long_about = None)]
#[command(after_help = env_help())]
pub struct Args {
    /// Test binary to run
    pub binary: PathBuf,

    /// Number of parallel jobs to spawn [default: 1.5x CPU cores]
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Total number of shards [default: number of jobs]
    #[arg(long)]
    pub shards: Option<usize>,

    /// Output verbosity: 0 only shows the summary, 1 also shows full logs of
    /// failed shards, anything above 1 shows all output [default: 1]
    #[arg(short, long)]
    pub verbosity: Option<u8>,

    /// When to use colored output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Log level for diagnostics on stderr [default: warn]
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Arguments passed verbatim to the test binary
    #[arg(last = true)]
    pub test_args: Vec<String>,
}

/// Color selection for the report and the test binary
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn enabled(self) -> bool {
        match self {
            ColorChoice::Auto => std::io::stdout().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

impl Args {
    /// Resolve the log level from the flag, then the environment
    pub fn log_level(&self, env: &EnvConfig) -> LogLevel {
        self.log_level.or(env.log_level).unwrap_or_default()
    }

    /// Build the run configuration; flags win over environment overrides
    pub fn to_config(&self, env: &EnvConfig) -> RunConfig {
        let jobs = self.jobs.or(env.jobs).unwrap_or_else(default_jobs);
        let shards = self.shards.unwrap_or(jobs);
        let verbosity = self.verbosity.or(env.verbosity).unwrap_or(1);

        RunConfig::new(&self.binary, jobs)
            .with_shards(shards)
            .with_verbosity(verbosity)
            .with_test_args(self.test_args.clone())
            .with_color(self.color.enabled())
    }
}
