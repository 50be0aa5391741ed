use crate::counter::ResetSchedule;
use reqwest::Url;
use std::{env, path::PathBuf, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid port: {value}")]
    Port { var: &'static str, value: String },
    #[error("XUSKA_RESET_TIMES: {0}")]
    ResetTimes(String),
    #[error("{var} is not a valid url: {value}")]
    Url { var: &'static str, value: String },
    #[error("{var} must be a whole number of seconds: {value}")]
    Seconds { var: &'static str, value: String },
    #[error("XUSKA_CACHE_GENERATION must be a plain name, got {0:?}")]
    Generation(String),
}

/// Settings for the counter server.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub state_path: PathBuf,
    pub content_dir: PathBuf,
    pub reset_schedule: ResetSchedule,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let reset_schedule = match env::var("XUSKA_RESET_TIMES") {
            Ok(value) => ResetSchedule::parse(&value).map_err(ConfigError::ResetTimes)?,
            Err(_) => ResetSchedule::default(),
        };

        Ok(Self {
            port: port_from_env("PORT", 8080)?,
            state_path: path_from_env("XUSKA_STATE_PATH", "data/state.json"),
            content_dir: path_from_env("XUSKA_CONTENT_DIR", "content"),
            reset_schedule,
        })
    }
}

/// Settings for the offline caching proxy.
#[derive(Debug, Clone)]
pub struct OfflineConfig {
    pub port: u16,
    pub upstream: Url,
    pub cache_dir: PathBuf,
    pub generation: String,
    pub sync_interval: Duration,
}

impl OfflineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let upstream = env::var("XUSKA_UPSTREAM").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());
        let upstream = Url::parse(&upstream).map_err(|_| ConfigError::Url {
            var: "XUSKA_UPSTREAM",
            value: upstream.clone(),
        })?;

        let generation = env::var("XUSKA_CACHE_GENERATION").unwrap_or_else(|_| "xuska-v1".to_string());
        if !is_plain_name(&generation) {
            return Err(ConfigError::Generation(generation));
        }

        let sync_interval = match env::var("XUSKA_SYNC_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::Seconds {
                    var: "XUSKA_SYNC_SECS",
                    value,
                })?,
            Err(_) => Duration::from_secs(3600),
        };

        Ok(Self {
            port: port_from_env("XUSKA_OFFLINE_PORT", 8081)?,
            upstream,
            cache_dir: path_from_env("XUSKA_CACHE_DIR", "data/cache"),
            generation,
            sync_interval,
        })
    }
}

pub fn is_plain_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && value != "."
        && value != ".."
}

fn port_from_env(var: &'static str, default: u16) -> Result<u16, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse::<u16>()
            .map_err(|_| ConfigError::Port { var, value }),
        Err(_) => Ok(default),
    }
}

fn path_from_env(var: &str, default: &str) -> PathBuf {
    env::var(var).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_generation_names() {
        assert!(is_plain_name("xuska-v2"));
        assert!(is_plain_name("build_2026.10"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("../etc"));
        assert!(!is_plain_name("a/b"));
    }
}
