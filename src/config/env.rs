//! Environment variable configuration
//!
//! Provides environment variable overrides for flags left unset on the
//! command line.

#![allow(dead_code)]

use std::env;
use std::str::FromStr;

use super::ConfigError;
use crate::utils::LogLevel;

/// Environment variable prefix
const ENV_PREFIX: &str = "SHARDRUN";

/// Overrides read from `SHARDRUN_*` variables
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Pool size from SHARDRUN_JOBS
    pub jobs: Option<usize>,
    /// Verbosity from SHARDRUN_VERBOSITY
    pub verbosity: Option<u8>,
    /// Log level from SHARDRUN_LOG
    pub log_level: Option<LogLevel>,
}

impl EnvConfig {
    /// Load overrides from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load overrides through an arbitrary lookup function
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            jobs: parse_var(&lookup, "JOBS")?,
            verbosity: parse_var(&lookup, "VERBOSITY")?,
            log_level: parse_var(&lookup, "LOG")?,
        })
    }

    pub fn has_any(&self) -> bool {
        self.jobs.is_some() || self.verbosity.is_some() || self.log_level.is_some()
    }
}

fn var_name(name: &str) -> String {
    format!("{ENV_PREFIX}_{name}")
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let key = var_name(name);
    match lookup(&key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key, value: raw }),
    }
}

/// Help text appended to `--help`
pub fn env_help() -> String {
    format!(
        "Environment Variables:\n  \
         {ENV_PREFIX}_JOBS        Default worker pool size\n  \
         {ENV_PREFIX}_VERBOSITY   Default output verbosity\n  \
         {ENV_PREFIX}_LOG         Log level (trace, debug, info, warn, error)"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, EnvConfig::default());
        assert!(!config.has_any());
    }

    #[test]
    fn test_env_overrides() {
        let config = EnvConfig::from_lookup(lookup_from(&[
            ("SHARDRUN_JOBS", "6"),
            ("SHARDRUN_VERBOSITY", " 2 "),
            ("SHARDRUN_LOG", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.jobs, Some(6));
        assert_eq!(config.verbosity, Some(2));
        assert_eq!(config.log_level, Some(LogLevel::Debug));
        assert!(config.has_any());
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let config =
            EnvConfig::from_lookup(lookup_from(&[("SHARDRUN_JOBS", ""), ("SHARDRUN_LOG", " ")]))
                .unwrap();
        assert!(!config.has_any());
    }

    #[test]
    fn test_unknown_log_level_is_an_error() {
        let err = EnvConfig::from_lookup(lookup_from(&[("SHARDRUN_LOG", "loud")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                key: "SHARDRUN_LOG".into(),
                value: "loud".into()
            }
        );
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let err = EnvConfig::from_lookup(lookup_from(&[("SHARDRUN_JOBS", "many")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value 'many' for environment variable SHARDRUN_JOBS"
        );
    }
}
