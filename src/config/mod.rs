//! Configuration module
//!
//! Builds and validates the run configuration handed to the executor.

mod env;

pub use env::{env_help, EnvConfig};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable carrying the zero-based shard index
pub const SHARD_INDEX_VAR: &str = "GTEST_SHARD_INDEX";

/// Environment variable carrying the total shard count
pub const TOTAL_SHARDS_VAR: &str = "GTEST_TOTAL_SHARDS";

/// Argument that forces colored googletest output
pub const COLOR_ARG: &str = "--gtest_color=yes";

/// Configuration errors, detected before any worker starts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("File '{0}' does not exist")]
    BinaryNotFound(PathBuf),

    #[error("File '{0}' is not a regular file")]
    NotAFile(PathBuf),

    #[error("File '{0}' is not executable")]
    NotExecutable(PathBuf),

    #[error("number of jobs must be at least 1")]
    ZeroJobs,

    #[error("number of shards must be at least 1")]
    ZeroShards,

    #[error("invalid value '{value}' for environment variable {key}")]
    InvalidEnv { key: String, value: String },
}

/// Configuration for one sharded run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Test binary to execute
    pub binary: PathBuf,

    /// Total number of shards the test set is split into
    pub shards: usize,

    /// Maximum number of concurrently running workers
    pub jobs: usize,

    /// Output verbosity: 0 summary only, 1 failed output, 2+ all output
    pub verbosity: u8,

    /// Arguments passed verbatim to every worker
    pub test_args: Vec<String>,

    /// Ask the test binary for colored output
    pub color: bool,
}

impl RunConfig {
    /// Create a configuration with one shard per job
    pub fn new(binary: impl Into<PathBuf>, jobs: usize) -> Self {
        Self {
            binary: binary.into(),
            shards: jobs,
            jobs,
            verbosity: 1,
            test_args: Vec::new(),
            color: false,
        }
    }

    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_test_args(mut self, args: Vec<String>) -> Self {
        self.test_args = args;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Check the invariants the executor relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == 0 {
            return Err(ConfigError::ZeroJobs);
        }
        if self.shards == 0 {
            return Err(ConfigError::ZeroShards);
        }
        check_binary(&self.binary)
    }

    /// Arguments for one worker invocation
    pub fn worker_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.test_args.len() + 1);
        // Users may still override coloring through their own flag
        if self.color && !self.test_args.iter().any(|a| a.starts_with("--gtest_color")) {
            args.push(COLOR_ARG.to_string());
        }
        args.extend(self.test_args.iter().cloned());
        args
    }
}

/// Default pool size: 1.5x the available cores
pub fn default_jobs() -> usize {
    jobs_for_cores(num_cpus::get())
}

fn jobs_for_cores(cores: usize) -> usize {
    ((cores as f64) * 1.5).round().max(1.0) as usize
}

fn check_binary(path: &Path) -> Result<(), ConfigError> {
    let metadata =
        std::fs::metadata(path).map_err(|_| ConfigError::BinaryNotFound(path.to_path_buf()))?;

    if !metadata.is_file() {
        return Err(ConfigError::NotAFile(path.to_path_buf()));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(ConfigError::NotExecutable(path.to_path_buf()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_default_jobs_scale_with_cores() {
        assert_eq!(jobs_for_cores(1), 2);
        assert_eq!(jobs_for_cores(4), 6);
        assert_eq!(jobs_for_cores(3), 5);
        assert_eq!(jobs_for_cores(0), 1);
        assert!(default_jobs() >= 1);
    }

    #[test]
    fn test_shards_default_to_jobs() {
        let config = RunConfig::new("/bin/true", 8);
        assert_eq!(config.shards, 8);
        assert_eq!(config.verbosity, 1);

        let config = config.with_shards(20);
        assert_eq!(config.shards, 20);
        assert_eq!(config.jobs, 8);
    }

    #[test]
    fn test_zero_jobs_or_shards_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("tests");
        fs::write(&bin, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        make_executable(&bin);

        assert_eq!(RunConfig::new(&bin, 0).validate(), Err(ConfigError::ZeroJobs));
        assert_eq!(
            RunConfig::new(&bin, 2).with_shards(0).validate(),
            Err(ConfigError::ZeroShards)
        );
        assert_eq!(RunConfig::new(&bin, 2).validate(), Ok(()));
    }

    #[test]
    fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("missing");
        let err = RunConfig::new(&bin, 1).validate().unwrap_err();
        assert_eq!(err, ConfigError::BinaryNotFound(bin.clone()));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_directory_is_not_a_binary() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunConfig::new(dir.path(), 1).validate().unwrap_err();
        assert_eq!(err, ConfigError::NotAFile(dir.path().to_path_buf()));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_binary() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("tests");
        fs::write(&bin, "data").unwrap();
        let err = RunConfig::new(&bin, 1).validate().unwrap_err();
        assert_eq!(err, ConfigError::NotExecutable(bin));
    }

    #[test]
    fn test_worker_args_add_color_flag() {
        let config = RunConfig::new("/bin/true", 1)
            .with_test_args(vec!["--gtest_repeat=2".into()])
            .with_color(true);
        assert_eq!(config.worker_args(), vec![COLOR_ARG, "--gtest_repeat=2"]);
    }

    #[test]
    fn test_worker_args_respect_user_color_flag() {
        let config = RunConfig::new("/bin/true", 1)
            .with_test_args(vec!["--gtest_color=no".into()])
            .with_color(true);
        assert_eq!(config.worker_args(), vec!["--gtest_color=no"]);

        let plain = RunConfig::new("/bin/true", 1).with_test_args(vec!["-x".into()]);
        assert_eq!(plain.worker_args(), vec!["-x"]);
    }
}
